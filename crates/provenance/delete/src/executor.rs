//! Applies a deletion closure to the graph store and the artifact repository.
//!
//! Three phases, in this order:
//!
//! 1. **Snapshot**: resolve every artifact handle while the rows still exist.
//! 2. **Transaction**: delete all rows and incident links atomically.
//! 3. **Cleanup**: erase the snapshotted artifacts one by one.
//!
//! A failure in phase 2 leaves rows and artifacts untouched. A failure in
//! phase 3 is recorded per artifact and leaves an orphaned folder behind; the
//! committed row deletion stands.

use chrono::{DateTime, Utc};
use provenance_store::{ArtifactHandle, ArtifactRepository, GraphStore};
use provenance_types::{Node, NodeId};
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::closure::Closure;
use crate::console::{Echo, Verbosity};
use crate::error::DeleteError;

/// An artifact that could not be erased after its node was deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("failed to erase artifact {location} of node {node_id}: {message}")]
pub struct RepositoryEraseError {
    pub node_id: NodeId,
    pub location: String,
    pub message: String,
}

/// What a dry run would delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DryRunReport {
    pub node_count: usize,
    /// Present when the listing was requested.
    pub listing: Option<Vec<Node>>,
}

/// Outcome of a committed deletion.
#[derive(Debug, Clone, Serialize)]
pub struct DeletionReport {
    pub nodes_deleted: usize,
    pub artifacts_erased: usize,
    pub artifact_failures: Vec<RepositoryEraseError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DeletionReport {
    fn empty() -> Self {
        let now = Utc::now();
        Self {
            nodes_deleted: 0,
            artifacts_erased: 0,
            artifact_failures: Vec::new(),
            started_at: now,
            finished_at: now,
        }
    }

    /// True when every artifact was erased.
    pub fn is_clean(&self) -> bool {
        self.artifact_failures.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Clone, Serialize)]
pub enum ExecutionOutcome {
    DryRun(DryRunReport),
    Deleted(DeletionReport),
}

/// Executes deletion closures.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeletionExecutor {
    verbosity: Verbosity,
    include_listing: bool,
}

impl DeletionExecutor {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            include_listing: verbosity >= Verbosity::Itemized,
        }
    }

    /// Attach the node listing to dry-run reports.
    pub fn with_listing(mut self, include: bool) -> Self {
        self.include_listing = include;
        self
    }

    /// Rows for the closure, read through the store's query interface.
    pub async fn listing<G>(&self, graph: &G, closure: &Closure) -> Result<Vec<Node>, DeleteError>
    where
        G: GraphStore + ?Sized,
    {
        Ok(graph.list_nodes(&closure.nodes).await?)
    }

    #[instrument(skip_all, fields(closure = closure.len(), dry_run = dry_run))]
    pub async fn execute<G, R, E>(
        &self,
        closure: &Closure,
        graph: &G,
        repository: &R,
        dry_run: bool,
        echo: &mut E,
    ) -> Result<ExecutionOutcome, DeleteError>
    where
        G: GraphStore + ?Sized,
        R: ArtifactRepository + ?Sized,
        E: Echo + ?Sized,
    {
        if dry_run {
            let listing = if self.include_listing {
                Some(self.listing(graph, closure).await?)
            } else {
                None
            };
            return Ok(ExecutionOutcome::DryRun(DryRunReport {
                node_count: closure.len(),
                listing,
            }));
        }

        if closure.is_empty() {
            return Ok(ExecutionOutcome::Deleted(DeletionReport::empty()));
        }

        let started_at = Utc::now();
        let handles = self.snapshot(closure, repository).await?;

        self.phase(echo, "Starting node deletion...");
        graph
            .delete_nodes_and_links(&closure.nodes)
            .await
            .map_err(|source| DeleteError::StoreDeletion {
                count: closure.len(),
                source,
            })?;
        info!(nodes = closure.len(), "Nodes deleted from store");

        self.phase(
            echo,
            "Nodes deleted from database, deleting files from the repository now...",
        );
        let (artifacts_erased, artifact_failures) = self.cleanup(handles, repository, echo).await;

        self.phase(echo, "Deletion completed.");
        Ok(ExecutionOutcome::Deleted(DeletionReport {
            nodes_deleted: closure.len(),
            artifacts_erased,
            artifact_failures,
            started_at,
            finished_at: Utc::now(),
        }))
    }

    /// Resolve artifact handles before any row is touched.
    async fn snapshot<R>(
        &self,
        closure: &Closure,
        repository: &R,
    ) -> Result<Vec<ArtifactHandle>, DeleteError>
    where
        R: ArtifactRepository + ?Sized,
    {
        let mut handles = Vec::new();
        for id in &closure.nodes {
            if let Some(handle) = repository.locate_artifact(id).await? {
                handles.push(handle);
            }
        }
        Ok(handles)
    }

    async fn cleanup<R, E>(
        &self,
        handles: Vec<ArtifactHandle>,
        repository: &R,
        echo: &mut E,
    ) -> (usize, Vec<RepositoryEraseError>)
    where
        R: ArtifactRepository + ?Sized,
        E: Echo + ?Sized,
    {
        let mut erased = 0;
        let mut failures = Vec::new();
        for handle in handles {
            match repository.erase(&handle, true).await {
                Ok(()) => erased += 1,
                Err(e) => {
                    let failure = RepositoryEraseError {
                        node_id: handle.node_id,
                        location: handle.location,
                        message: e.to_string(),
                    };
                    warn!(node_id = %failure.node_id, error = %e, "Artifact erase failed");
                    echo.warn(&failure.to_string());
                    failures.push(failure);
                }
            }
        }
        (erased, failures)
    }

    fn phase<E: Echo + ?Sized>(&self, echo: &mut E, message: &str) {
        if self.verbosity >= Verbosity::Summary {
            echo.echo(message);
        }
    }
}
