//! Observability: metrics exposition.

pub mod metrics;
