//! HTTP and WebSocket request handlers.

pub mod session;
pub mod ws;
