//! PostgreSQL error mapping.
//!
//! Maps `sqlx::Error` to `RepositoryError` from `logbook_core::storage`.
//! Constraint violations are classified by SQLSTATE so callers can tell a
//! duplicate from a broken reference.

use logbook_core::storage::RepositoryError;

const UNIQUE_VIOLATION: &str = "23505";
const INTEGRITY_CONSTRAINT_CLASS: &str = "23";
const DATA_EXCEPTION_CLASS: &str = "22";
const CONNECTION_EXCEPTION_CLASS: &str = "08";

/// Maps a sqlx error to a RepositoryError.
///
/// # Error Mapping
///
/// - `23505` unique violation → `RepositoryError::AlreadyExists`
/// - other class `23` (foreign key, check, not null, trigger) → `RepositoryError::InvalidData`
/// - class `22` data exceptions → `RepositoryError::InvalidData`
/// - pool and transport errors, class `08` → `RepositoryError::ConnectionFailed`
/// - `RowNotFound` → `RepositoryError::NotFound`
/// - column decode failures (unknown enum label, malformed JSON) → `RepositoryError::Serialization`
/// - All other errors → `RepositoryError::QueryFailed`
pub fn map_sqlx_error(err: sqlx::Error, entity_type: &'static str) -> RepositoryError {
    map_sqlx_error_with_id(err, entity_type, "unknown")
}

/// Maps a sqlx error with a known ID to a RepositoryError.
pub fn map_sqlx_error_with_id(
    err: sqlx::Error,
    entity_type: &'static str,
    id: impl Into<String>,
) -> RepositoryError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code();
            map_database_error(code.as_deref(), db_err.message(), entity_type, id.into())
        }
        sqlx::Error::RowNotFound => RepositoryError::NotFound {
            entity_type,
            id: id.into(),
        },
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => RepositoryError::ConnectionFailed(err.to_string()),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) => {
            RepositoryError::Serialization(format!("{entity_type}: {err}"))
        }
        _ => RepositoryError::QueryFailed(err.to_string()),
    }
}

/// Pure classification of a server-side error by SQLSTATE.
fn map_database_error(
    code: Option<&str>,
    message: &str,
    entity_type: &'static str,
    id: String,
) -> RepositoryError {
    match code {
        Some(UNIQUE_VIOLATION) => RepositoryError::AlreadyExists { entity_type, id },
        Some(c) if c.starts_with(INTEGRITY_CONSTRAINT_CLASS) => {
            RepositoryError::InvalidData(format!("Constraint violation for {entity_type}: {message}"))
        }
        Some(c) if c.starts_with(DATA_EXCEPTION_CLASS) => {
            RepositoryError::InvalidData(format!("Invalid value for {entity_type}: {message}"))
        }
        Some(c) if c.starts_with(CONNECTION_EXCEPTION_CLASS) => {
            RepositoryError::ConnectionFailed(message.to_string())
        }
        _ => RepositoryError::QueryFailed(message.to_string()),
    }
}
