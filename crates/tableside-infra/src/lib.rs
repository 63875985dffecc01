//! Infrastructure layer for tableside.
//!
//! Contains the SQLite implementation of the `SessionRepository` trait defined
//! in `tableside-core`, data directory resolution, and the `config.toml` loader.

pub mod config;
pub mod filesystem;
pub mod sqlite;
