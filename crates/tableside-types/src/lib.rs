//! Shared domain types for tableside.
//!
//! This crate contains the types every other layer agrees on: the game-state
//! blob, the chat log entries, the tagged wire protocol, connection ids,
//! server configuration, and the error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod connection;
pub mod error;
pub mod game;
pub mod protocol;
pub mod session;
