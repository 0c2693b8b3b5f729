//! Storage contracts for the provenance graph.
//!
//! Two interfaces are consumed by the deletion engine:
//! - [`GraphStore`]: node/link rows, with an atomic bulk delete
//! - [`ArtifactRepository`]: per-node payload folders, erased after the rows
//!
//! Design stance:
//! - The graph store is the transactional source of truth for existence.
//! - The repository is auxiliary. Losing a race there leaves an orphaned
//!   folder, never a dangling row.

#![deny(unsafe_code)]
#![cfg_attr(feature = "strict-docs", warn(missing_docs))]
#![cfg_attr(not(feature = "strict-docs"), allow(missing_docs))]
#![warn(rust_2018_idioms)]

mod error;
pub mod fs;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{RepositoryError, RepositoryResult, StoreError, StoreResult};
pub use fs::FsArtifactRepository;
pub use memory::{InMemoryArtifactRepository, InMemoryGraphStore};
pub use traits::{ArtifactHandle, ArtifactRepository, GraphStore};
