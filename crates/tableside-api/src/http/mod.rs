//! HTTP layer for tableside.
//!
//! Axum router carrying the session WebSocket endpoint, the admin REST API at
//! `/api/v1/` with envelope responses, and optional static client assets.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
