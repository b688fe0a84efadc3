//! PostgreSQL storage backend implementation.
//!
//! Implements the repository traits from `logbook_core::storage` using
//! `sqlx`. Queries are plain SQL constants checked at runtime.

mod conversions;
mod error;
mod postgres;
mod queries;

pub use error::{map_sqlx_error, map_sqlx_error_with_id};
pub use postgres::PgRepository;
