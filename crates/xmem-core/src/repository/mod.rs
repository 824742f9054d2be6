//! Repository trait definitions (ports).
//!
//! These traits define the storage interface that the infrastructure layer
//! (xmem-infra) implements. The core crate never depends on any specific
//! storage technology.
//!
//! Every read and write takes the tenant explicitly; a row owned by another
//! tenant is indistinguishable from an absent one.

pub mod memory;
pub mod project;
pub mod source;
