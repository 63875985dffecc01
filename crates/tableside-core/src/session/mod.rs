//! Per-session coordination: one actor per session id, processing every
//! connect, inbound frame and disconnect for that session serially.

pub mod actor;
pub mod chat_log;
pub mod hub;
pub mod registry;

pub use actor::{SessionActor, SessionCommand};
pub use hub::{SessionHandle, SessionHub};
pub use registry::{ConnectionRegistry, Frame, Outbound};
