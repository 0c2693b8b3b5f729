#![deny(unsafe_code)]
//! # provenance-rules
//!
//! Traversal rules for provenance-consistent deletion.
//!
//! Each [`TraversalRule`] names one (link kind, process endpoint, direction)
//! combination. A [`RuleSet`] maps every rule to a boolean and is the only
//! input the closure computation needs to decide whether a link is followed.
//!
//! Default policy:
//!
//! 1. Deleting DATA pulls in every process that consumed or produced it.
//! 2. Deleting a CALCULATION pulls in its calling workflows and its outputs,
//!    but never its inputs. Output deletion can be switched off.
//! 3. Deleting a WORKFLOW pulls in its calling workflows but never data.
//!    Called processes are kept unless switched on.
//!
//! The rules apply recursively: outputs of a deleted calculation drag in the
//! calculations that consumed them, and so on.

pub mod error;
pub mod rule;
pub mod set;

pub use error::RuleError;
pub use rule::TraversalRule;
pub use set::RuleSet;
