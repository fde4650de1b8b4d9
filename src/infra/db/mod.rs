//! Postgres-backed store implementation.

mod memos;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};
use tracing::info;

use crate::application::repos::{Backend, RepoError, StoreBackend, StoreConnector};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

/// Opens the store pool on demand for the repository selector.
pub struct PostgresConnector {
    url: String,
    max_connections: u32,
    migrate: bool,
}

impl PostgresConnector {
    pub fn new(url: impl Into<String>, max_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            migrate: false,
        }
    }

    /// Apply embedded migrations whenever a connection is opened.
    pub fn with_migrations(mut self, migrate: bool) -> Self {
        self.migrate = migrate;
        self
    }
}

#[async_trait]
impl StoreConnector for PostgresConnector {
    async fn connect(&self) -> Result<Arc<dyn StoreBackend>, RepoError> {
        let pool = PostgresRepositories::connect(&self.url, self.max_connections)
            .await
            .map_err(|err| RepoError::connection(Backend::Store, err.to_string()))?;

        if self.migrate {
            PostgresRepositories::run_migrations(&pool)
                .await
                .map_err(|err| {
                    RepoError::connection(Backend::Store, format!("migrations failed: {err}"))
                })?;
            info!("store migrations applied");
        }

        Ok(Arc::new(PostgresRepositories::new(pool)))
    }
}
