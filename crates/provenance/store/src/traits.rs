use crate::{RepositoryResult, StoreResult};
use async_trait::async_trait;
use provenance_types::{Link, LinkDirection, LinkKind, Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Read and delete access to provenance rows.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Fetch one node, `None` if it does not exist.
    async fn get_node(&self, id: &NodeId) -> StoreResult<Option<Node>>;

    /// Links incident to `id` in the given direction, optionally filtered by kind.
    async fn get_links(
        &self,
        id: &NodeId,
        direction: LinkDirection,
        kind: Option<LinkKind>,
    ) -> StoreResult<Vec<Link>>;

    /// Read query over a set of ids, ordered by id. Unknown ids are skipped.
    async fn list_nodes(&self, ids: &BTreeSet<NodeId>) -> StoreResult<Vec<Node>>;

    /// Delete the nodes and every link touching them as one atomic unit.
    ///
    /// On error no row may have been removed.
    async fn delete_nodes_and_links(&self, ids: &BTreeSet<NodeId>) -> StoreResult<()>;
}

/// Location of a node's payload in an artifact repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub node_id: NodeId,
    pub location: String,
}

/// Auxiliary storage for node payloads.
#[async_trait]
pub trait ArtifactRepository: Send + Sync {
    /// Resolve the artifact of a node, `None` if it has none.
    async fn locate_artifact(&self, node_id: &NodeId) -> RepositoryResult<Option<ArtifactHandle>>;

    /// Erase an artifact. Without `force`, non-empty artifacts are refused.
    /// Erasing an artifact that is already gone succeeds.
    async fn erase(&self, handle: &ArtifactHandle, force: bool) -> RepositoryResult<()>;
}
