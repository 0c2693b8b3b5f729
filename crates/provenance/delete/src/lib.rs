#![deny(unsafe_code)]
//! # provenance-delete
//!
//! Provenance-consistent node deletion.
//!
//! Deleting a node from a provenance graph usually means deleting more:
//! a calculation without its input data is fine, but data whose creator is
//! gone is not. This crate computes the full set to delete and applies it.
//!
//! ```text
//! seeds ──▶ ClosureComputer ──▶ Closure { nodes, missing }
//!                                   │
//!               dry run / confirm ◀─┘
//!                                   │
//!           DeletionExecutor: snapshot ▶ store transaction ▶ artifact cleanup
//! ```
//!
//! - [`ClosureComputer`] expands seeds under a [`RuleSet`] to a fixed point.
//! - [`DeletionExecutor`] deletes rows atomically, then erases artifacts
//!   best-effort. Artifact failures are reported, never rolled back.
//! - [`delete_nodes`] is the command entry point used by front ends.
//!
//! [`RuleSet`]: provenance_rules::RuleSet

pub mod closure;
pub mod command;
pub mod config;
pub mod console;
pub mod error;
pub mod executor;

pub use closure::{Closure, ClosureComputer, MissingNodeWarning};
pub use command::{delete_nodes, DeleteOptions, DeleteOutcome};
pub use config::{ConfigError, DeleteConfig};
pub use console::{BufferedEcho, Confirm, Echo, StdEcho, Verbosity};
pub use error::DeleteError;
pub use executor::{
    DeletionExecutor, DeletionReport, DryRunReport, ExecutionOutcome, RepositoryEraseError,
};
