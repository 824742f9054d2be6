//! Observability setup for xmem: `tracing` subscriber plus optional
//! OpenTelemetry span export.

pub mod tracing_setup;
