//! PostgreSQL persistence for LogbookLM.
//!
//! - [`compose`] validates the schema fragments and writes the generated schema.
//! - [`migrate`] applies the migrations to a target database.
//! - [`seed`] loads baseline fixture data idempotently.
//! - [`PgRepository`] implements the `logbook_core::storage` traits.

pub mod compose;
pub mod config;
pub mod migrate;
pub mod repository;
pub mod seed;

#[cfg(test)]
mod testing;

pub use compose::{compose_schema, ComposeError, ComposedSchema};
pub use config::{DatabaseConfig, DatabaseConfigError};
pub use migrate::{apply_migrations, MigrateError, MigrationOptions, MigrationReport};
pub use repository::PgRepository;
pub use seed::{seed, seed_from_path, SeedError, SeedSummary, DEFAULT_FIXTURE};
