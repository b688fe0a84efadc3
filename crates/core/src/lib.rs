//! Domain model and storage contracts for LogbookLM.
//!
//! This crate is pure: types, validation and repository traits. Storage
//! backends live in `logbook_db`.

pub mod fixture;
pub mod maintenance;
pub mod storage;
