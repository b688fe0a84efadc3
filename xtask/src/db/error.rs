//! Error types for database commands.

use thiserror::Error;

/// Result type alias for db module.
pub type Result<T> = std::result::Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error(transparent)]
    Compose(#[from] logbook_db::ComposeError),

    #[error(transparent)]
    Migrate(#[from] logbook_db::MigrateError),

    #[error(transparent)]
    Config(#[from] logbook_db::DatabaseConfigError),

    #[error(transparent)]
    Seed(#[from] logbook_db::SeedError),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Operation cancelled by user")]
    UserCancelled,
}
