#![deny(unsafe_code)]
//! # provenance-types
//!
//! Shared vocabulary of the provenance graph.
//!
//! The graph is a DAG of three node kinds:
//!
//! ```text
//! Data ──INPUT──▶ Calculation ──CREATE──▶ Data
//!   │                  ▲
//!   └──INPUT──▶ Workflow ──CALL──┘   Workflow ──RETURN──▶ Data
//! ```
//!
//! Calculations and workflows are both *process* nodes. Only workflows may
//! call other processes or return data they did not create.
//!
//! Node identifiers are opaque: nothing in this workspace inspects node
//! payloads, only ids, kinds and links.

pub mod link;
pub mod node;

pub use link::{Link, LinkDirection, LinkKind};
pub use node::{Node, NodeId, NodeKind};
