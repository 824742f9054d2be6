//! Business logic services (use cases).
//!
//! Services orchestrate repository calls, provider lookups and validation.
//! They depend on traits (ports) -- never on concrete infrastructure
//! implementations.

pub mod memory;
pub mod project;
pub mod source;
