use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;

use crate::{
    application::repos::{Backend, ErrorKind, RepoError, StoreBackend},
    domain::{
        entities::{DeletedMemo, MemoRecord},
        memo::{MemoId, NewMemo},
    },
};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct MemoRow {
    id: i64,
    text: String,
    created_at: OffsetDateTime,
}

impl From<MemoRow> for MemoRecord {
    fn from(row: MemoRow) -> Self {
        Self {
            id: MemoId::new(row.id),
            text: row.text,
            created_at: row.created_at,
        }
    }
}

fn encode<T: Serialize>(value: &T, kind: ErrorKind) -> Result<Bytes, RepoError> {
    serde_json::to_vec(value).map(Bytes::from).map_err(|err| {
        RepoError::new(
            kind,
            Backend::Store.as_str(),
            format!("failed to serialize result: {err}"),
        )
    })
}

#[async_trait]
impl StoreBackend for PostgresRepositories {
    async fn list_all(&self) -> Result<Bytes, RepoError> {
        let rows = sqlx::query_as::<_, MemoRow>(
            r#"
            SELECT id, text, created_at
            FROM memos
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|err| map_sqlx_error(err, ErrorKind::ReadFailure))?;

        let records: Vec<MemoRecord> = rows.into_iter().map(MemoRecord::from).collect();
        encode(&records, ErrorKind::ReadFailure)
    }

    async fn insert(&self, memo: &NewMemo) -> Result<Bytes, RepoError> {
        let row = sqlx::query_as::<_, MemoRow>(
            r#"
            INSERT INTO memos (text)
            VALUES ($1)
            RETURNING id, text, created_at
            "#,
        )
        .bind(memo.text())
        .fetch_one(self.pool())
        .await
        .map_err(|err| map_sqlx_error(err, ErrorKind::WriteFailure))?;

        encode(&MemoRecord::from(row), ErrorKind::WriteFailure)
    }

    async fn delete_by_id(&self, id: MemoId) -> Result<Bytes, RepoError> {
        let deleted: Option<i64> = sqlx::query_scalar(
            r#"
            DELETE FROM memos
            WHERE id = $1
            RETURNING id
            "#,
        )
        .bind(id.get())
        .fetch_optional(self.pool())
        .await
        .map_err(|err| map_sqlx_error(err, ErrorKind::WriteFailure))?;

        match deleted {
            Some(value) => encode(
                &DeletedMemo {
                    id: MemoId::new(value),
                },
                ErrorKind::WriteFailure,
            ),
            None => Err(RepoError::not_found(
                Backend::Store,
                format!("memo {id} not found"),
            )),
        }
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        PostgresRepositories::health_check(self)
            .await
            .map_err(|err| map_sqlx_error(err, ErrorKind::ConnectionFailure))
    }
}
