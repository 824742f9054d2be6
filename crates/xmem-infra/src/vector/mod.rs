//! Vector-store adapters.
//!
//! One module per backend family, all implementing
//! `xmem_core::vector::store::VectorStore`:
//!
//! - `qdrant`: point-oriented, explicit collections
//! - `chroma`: document/listing API, implicit collections
//! - `pinecone`: managed index with namespaces
//! - `document`: document store scanned and ranked in process
//! - `memory`: in-process store for tests and single-node use

pub mod chroma;
pub mod document;
pub mod memory;
pub mod pinecone;
pub mod qdrant;
