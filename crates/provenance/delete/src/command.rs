//! The `delete_nodes` command: closure, report, confirm, execute.

use provenance_rules::{RuleError, RuleSet};
use provenance_store::{ArtifactRepository, GraphStore};
use provenance_types::NodeId;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument};

use crate::closure::{ClosureComputer, MissingNodeWarning};
use crate::config::DeleteConfig;
use crate::console::{Confirm, Echo, Verbosity};
use crate::error::DeleteError;
use crate::executor::{DeletionExecutor, DeletionReport, DryRunReport, ExecutionOutcome};

/// Per-invocation options of [`delete_nodes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteOptions {
    pub verbosity: Verbosity,
    /// Report what would be deleted, change nothing.
    pub dry_run: bool,
    /// Skip the confirmation prompt.
    pub force: bool,
    /// Rule overrides by name, applied on top of the defaults.
    pub traversal_rules: BTreeMap<String, bool>,
    /// Reject overrides of rules that are not user-toggleable.
    pub strict_rules: bool,
}

impl DeleteOptions {
    pub fn from_config(config: &DeleteConfig) -> Self {
        Self {
            verbosity: config.verbosity,
            strict_rules: config.strict_rules,
            traversal_rules: config.rules.clone(),
            ..Self::default()
        }
    }

    pub fn with_rule(mut self, name: impl Into<String>, enabled: bool) -> Self {
        self.traversal_rules.insert(name.into(), enabled);
        self
    }

    pub fn rule_set(&self) -> Result<RuleSet, RuleError> {
        let overrides = self
            .traversal_rules
            .iter()
            .map(|(name, value)| (name.as_str(), *value));
        if self.strict_rules {
            RuleSet::resolve_strict(overrides)
        } else {
            RuleSet::resolve(overrides)
        }
    }
}

/// How a [`delete_nodes`] invocation ended.
#[derive(Debug, Clone, Serialize)]
pub enum DeleteOutcome {
    /// The closure was empty. Carries the requested ids that did not exist.
    NothingToDelete { missing: BTreeSet<NodeId> },
    DryRun(DryRunReport),
    /// Confirmation was declined. Nothing was touched.
    Aborted { closure_size: usize },
    Deleted(DeletionReport),
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(_))
    }
}

/// Delete `ids` and everything the traversal rules say must go with them.
///
/// Unknown rule names fail before the graph is read. Missing ids are
/// reported through `echo` as warnings and otherwise ignored. Unless
/// `options.force` is set, `confirm` must approve before anything is deleted.
#[instrument(skip_all, fields(requested = ids.len(), dry_run = options.dry_run, force = options.force))]
pub async fn delete_nodes<G, R, C, E>(
    ids: &[NodeId],
    options: &DeleteOptions,
    graph: &G,
    repository: &R,
    confirm: &mut C,
    echo: &mut E,
) -> Result<DeleteOutcome, DeleteError>
where
    G: GraphStore + ?Sized,
    R: ArtifactRepository + ?Sized,
    C: Confirm + ?Sized,
    E: Echo + ?Sized,
{
    let rules = options.rule_set()?;
    let verbosity = options.verbosity;

    let closure = ClosureComputer::new(rules)
        .compute_reporting(graph, ids.iter().cloned(), |missing| {
            for id in missing {
                let warning = MissingNodeWarning {
                    node_id: id.clone(),
                };
                echo.warn(&warning.to_string());
            }
        })
        .await?;

    if closure.is_empty() {
        if verbosity >= Verbosity::Summary {
            echo.echo("Nothing to delete");
        }
        return Ok(DeleteOutcome::NothingToDelete {
            missing: closure.missing,
        });
    }

    let count = closure.len();
    let mode = if options.dry_run { "would" } else { "will" };
    if verbosity >= Verbosity::Summary {
        let plural = if count > 1 { "s" } else { "" };
        echo.echo(&format!("I {mode} delete {count} node{plural}"));
    }

    let executor = DeletionExecutor::new(verbosity);
    let listing = if verbosity >= Verbosity::Itemized {
        let nodes = executor.listing(graph, &closure).await?;
        echo.echo(&format!("The nodes I {mode} delete:"));
        for node in &nodes {
            echo.echo(&format!(
                "   {} {} {} {}",
                node.uuid,
                node.id,
                node.kind.short_name(),
                node.label
            ));
        }
        Some(nodes)
    } else {
        None
    };

    if options.dry_run {
        if verbosity >= Verbosity::Summary {
            echo.echo("This was a dry run, exiting without deleting anything");
        }
        return Ok(DeleteOutcome::DryRun(DryRunReport {
            node_count: count,
            listing,
        }));
    }

    if !options.force {
        echo.warn(&format!(
            "YOU ARE ABOUT TO DELETE {count} NODES! THIS CANNOT BE UNDONE!"
        ));
        if !confirm.confirm("Shall I continue?") {
            echo.echo("Exiting without deleting");
            info!(closure = count, "Deletion declined");
            return Ok(DeleteOutcome::Aborted {
                closure_size: count,
            });
        }
    }

    match executor
        .execute(&closure, graph, repository, false, echo)
        .await?
    {
        ExecutionOutcome::Deleted(report) => Ok(DeleteOutcome::Deleted(report)),
        ExecutionOutcome::DryRun(report) => Ok(DeleteOutcome::DryRun(report)),
    }
}
