//! Repository trait definitions.
//!
//! Implementations live in tableside-infra.

#[cfg(test)]
pub(crate) mod memory;
pub mod session;
