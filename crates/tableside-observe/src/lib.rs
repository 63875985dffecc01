//! Observability setup for tableside.

pub mod tracing_setup;
