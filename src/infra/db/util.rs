use crate::application::repos::{Backend, ErrorKind, RepoError};

/// Map a driver error onto the repository taxonomy.
///
/// `fallback` is the kind reported for anything that is not clearly a
/// connection, lookup, constraint or cancellation problem.
pub fn map_sqlx_error(err: sqlx::Error, fallback: ErrorKind) -> RepoError {
    let component = Backend::Store.as_str();
    match err {
        sqlx::Error::RowNotFound => RepoError::not_found(Backend::Store, "memo not found"),
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => RepoError::connection(Backend::Store, err.to_string()),
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request")
                || db.message().contains("statement timeout") =>
        {
            RepoError::cancelled(Backend::Store, db.message())
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates") || db.message().contains("invalid input syntax") =>
        {
            RepoError::new(ErrorKind::ValidationFailure, component, db.message())
        }
        other => RepoError::new(fallback, component, other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = map_sqlx_error(sqlx::Error::RowNotFound, ErrorKind::ReadFailure);
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(err.component(), "store");
    }

    #[test]
    fn pool_timeout_is_a_connection_failure() {
        let err = map_sqlx_error(sqlx::Error::PoolTimedOut, ErrorKind::WriteFailure);
        assert_eq!(err.kind(), ErrorKind::ConnectionFailure);
    }

    #[test]
    fn unclassified_errors_use_fallback_kind() {
        let err = map_sqlx_error(
            sqlx::Error::Protocol("unexpected message".to_string()),
            ErrorKind::WriteFailure,
        );
        assert_eq!(err.kind(), ErrorKind::WriteFailure);
    }
}
