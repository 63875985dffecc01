//! Session coordination core for tableside.
//!
//! This crate owns the per-session actor, the connection registry, and the
//! hub that activates sessions lazily. It defines the persistence "port"
//! (`SessionRepository`) that the infrastructure layer implements, and
//! depends only on `tableside-types` -- never on `tableside-infra` or any
//! database/IO crate.

pub mod repository;
pub mod session;
