//! In-memory reference implementations of the storage traits.
//!
//! Deterministic and test-friendly. Both adapters support failure injection
//! so callers can exercise the deletion engine's failure boundaries.

use crate::traits::{ArtifactHandle, ArtifactRepository, GraphStore};
use crate::{RepositoryError, RepositoryResult, StoreError, StoreResult};
use async_trait::async_trait;
use provenance_types::{Link, LinkDirection, LinkKind, Node, NodeId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;
use tracing::debug;

#[derive(Clone, Default)]
struct GraphState {
    nodes: BTreeMap<NodeId, Node>,
    links: Vec<Link>,
}

/// In-memory provenance graph.
#[derive(Default)]
pub struct InMemoryGraphStore {
    state: RwLock<GraphState>,
    fail_deletions: AtomicBool,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node. Fails if the id is taken.
    pub fn insert_node(&self, node: Node) -> StoreResult<()> {
        let mut guard = self.write()?;
        if guard.nodes.contains_key(&node.id) {
            return Err(StoreError::Conflict(format!("node {} already exists", node.id)));
        }
        guard.nodes.insert(node.id.clone(), node);
        Ok(())
    }

    /// Insert a link between two existing nodes whose kinds fit the link kind.
    pub fn insert_link(&self, link: Link) -> StoreResult<()> {
        let mut guard = self.write()?;
        let source = guard
            .nodes
            .get(&link.source)
            .ok_or_else(|| StoreError::NotFound(format!("link source {}", link.source)))?;
        let target = guard
            .nodes
            .get(&link.target)
            .ok_or_else(|| StoreError::NotFound(format!("link target {}", link.target)))?;
        if !link.kind.admits(source.kind, target.kind) {
            return Err(StoreError::InvalidInput(format!(
                "{} link cannot connect {} {} to {} {}",
                link.kind, source.kind, source.id, target.kind, target.id
            )));
        }
        guard.links.push(link);
        Ok(())
    }

    /// Insert a link without checking its endpoints.
    ///
    /// Models rows written by a concurrent writer, e.g. a link whose target
    /// was removed between two reads.
    pub fn insert_link_unchecked(&self, link: Link) -> StoreResult<()> {
        self.write()?.links.push(link);
        Ok(())
    }

    /// Make every subsequent `delete_nodes_and_links` fail before committing.
    pub fn set_fail_deletions(&self, fail: bool) {
        self.fail_deletions.store(fail, Ordering::SeqCst);
    }

    pub fn contains(&self, id: &NodeId) -> StoreResult<bool> {
        Ok(self.read()?.nodes.contains_key(id))
    }

    pub fn node_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.nodes.len())
    }

    pub fn link_count(&self) -> StoreResult<usize> {
        Ok(self.read()?.links.len())
    }

    fn read(&self) -> StoreResult<std::sync::RwLockReadGuard<'_, GraphState>> {
        self.state
            .read()
            .map_err(|_| StoreError::Backend("graph lock poisoned".to_string()))
    }

    fn write(&self) -> StoreResult<std::sync::RwLockWriteGuard<'_, GraphState>> {
        self.state
            .write()
            .map_err(|_| StoreError::Backend("graph lock poisoned".to_string()))
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn get_node(&self, id: &NodeId) -> StoreResult<Option<Node>> {
        Ok(self.read()?.nodes.get(id).cloned())
    }

    async fn get_links(
        &self,
        id: &NodeId,
        direction: LinkDirection,
        kind: Option<LinkKind>,
    ) -> StoreResult<Vec<Link>> {
        let guard = self.read()?;
        let links = guard
            .links
            .iter()
            .filter(|link| link.direction_from(id) == Some(direction))
            .filter(|link| kind.map_or(true, |k| link.kind == k))
            .cloned()
            .collect();
        Ok(links)
    }

    async fn list_nodes(&self, ids: &BTreeSet<NodeId>) -> StoreResult<Vec<Node>> {
        let guard = self.read()?;
        Ok(ids
            .iter()
            .filter_map(|id| guard.nodes.get(id).cloned())
            .collect())
    }

    async fn delete_nodes_and_links(&self, ids: &BTreeSet<NodeId>) -> StoreResult<()> {
        let mut guard = self.write()?;

        // Stage on a copy; the live state is only replaced on commit.
        let mut staged = guard.clone();
        staged.nodes.retain(|id, _| !ids.contains(id));
        staged
            .links
            .retain(|link| !ids.contains(&link.source) && !ids.contains(&link.target));

        if self.fail_deletions.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(
                "transaction aborted before commit".to_string(),
            ));
        }

        let removed_nodes = guard.nodes.len() - staged.nodes.len();
        let removed_links = guard.links.len() - staged.links.len();
        *guard = staged;
        debug!(removed_nodes, removed_links, "Committed node deletion");
        Ok(())
    }
}

#[derive(Clone, Default)]
struct ArtifactEntry {
    files: BTreeMap<String, Vec<u8>>,
}

/// In-memory artifact repository keyed by node id.
#[derive(Default)]
pub struct InMemoryArtifactRepository {
    artifacts: RwLock<BTreeMap<NodeId, ArtifactEntry>>,
    failing_erases: RwLock<BTreeSet<NodeId>>,
}

impl InMemoryArtifactRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty artifact for a node if it has none.
    pub fn create_artifact(&self, node_id: &NodeId) -> RepositoryResult<()> {
        self.write()?.entry(node_id.clone()).or_default();
        Ok(())
    }

    /// Store a file inside a node's artifact, creating the artifact if needed.
    pub fn put_file(
        &self,
        node_id: &NodeId,
        name: impl Into<String>,
        content: Vec<u8>,
    ) -> RepositoryResult<()> {
        self.write()?
            .entry(node_id.clone())
            .or_default()
            .files
            .insert(name.into(), content);
        Ok(())
    }

    /// Make every erase of this node's artifact fail.
    pub fn inject_erase_failure(&self, node_id: &NodeId) -> RepositoryResult<()> {
        self.failing_erases
            .write()
            .map_err(|_| RepositoryError::Backend("failure set lock poisoned".to_string()))?
            .insert(node_id.clone());
        Ok(())
    }

    pub fn has_artifact(&self, node_id: &NodeId) -> RepositoryResult<bool> {
        Ok(self.read()?.contains_key(node_id))
    }

    pub fn artifact_count(&self) -> RepositoryResult<usize> {
        Ok(self.read()?.len())
    }

    fn read(
        &self,
    ) -> RepositoryResult<std::sync::RwLockReadGuard<'_, BTreeMap<NodeId, ArtifactEntry>>> {
        self.artifacts
            .read()
            .map_err(|_| RepositoryError::Backend("artifact lock poisoned".to_string()))
    }

    fn write(
        &self,
    ) -> RepositoryResult<std::sync::RwLockWriteGuard<'_, BTreeMap<NodeId, ArtifactEntry>>> {
        self.artifacts
            .write()
            .map_err(|_| RepositoryError::Backend("artifact lock poisoned".to_string()))
    }
}

#[async_trait]
impl ArtifactRepository for InMemoryArtifactRepository {
    async fn locate_artifact(&self, node_id: &NodeId) -> RepositoryResult<Option<ArtifactHandle>> {
        Ok(self.read()?.get(node_id).map(|_| ArtifactHandle {
            node_id: node_id.clone(),
            location: format!("memory://{}", node_id),
        }))
    }

    async fn erase(&self, handle: &ArtifactHandle, force: bool) -> RepositoryResult<()> {
        let failing = self
            .failing_erases
            .read()
            .map_err(|_| RepositoryError::Backend("failure set lock poisoned".to_string()))?
            .contains(&handle.node_id);
        if failing {
            return Err(RepositoryError::Backend(format!(
                "erase rejected for {}",
                handle.location
            )));
        }

        let mut guard = self.write()?;
        let Some(entry) = guard.get(&handle.node_id) else {
            return Ok(());
        };
        if !force && !entry.files.is_empty() {
            return Err(RepositoryError::NotEmpty(handle.location.clone()));
        }
        guard.remove(&handle.node_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> InMemoryGraphStore {
        let store = InMemoryGraphStore::new();
        store.insert_node(Node::data("D1")).unwrap();
        store.insert_node(Node::calculation("C1")).unwrap();
        store.insert_node(Node::data("D2")).unwrap();
        store
            .insert_link(Link::new("D1", "C1", LinkKind::Input, "structure"))
            .unwrap();
        store
            .insert_link(Link::new("C1", "D2", LinkKind::Create, "result"))
            .unwrap();
        store
    }

    #[test]
    fn insert_rejects_duplicates() {
        let store = chain();
        assert!(matches!(
            store.insert_node(Node::data("D1")),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn insert_link_checks_endpoints() {
        let store = chain();
        assert!(matches!(
            store.insert_link(Link::new("D1", "D2", LinkKind::Input, "")),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            store.insert_link(Link::new("D1", "missing", LinkKind::Input, "")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn only_calculations_create_data() {
        let store = chain();
        store.insert_node(Node::workflow("W1")).unwrap();
        assert!(matches!(
            store.insert_link(Link::new("W1", "D2", LinkKind::Create, "result")),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(store
            .insert_link(Link::new("W1", "D2", LinkKind::Return, "result"))
            .is_ok());
    }

    #[tokio::test]
    async fn get_links_by_direction_and_kind() {
        let store = chain();
        let c1 = NodeId::from("C1");

        let incoming = store.get_links(&c1, LinkDirection::Incoming, None).await.unwrap();
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0].source, NodeId::from("D1"));

        let outgoing = store.get_links(&c1, LinkDirection::Outgoing, None).await.unwrap();
        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0].target, NodeId::from("D2"));

        let filtered = store
            .get_links(&c1, LinkDirection::Outgoing, Some(LinkKind::Return))
            .await
            .unwrap();
        assert!(filtered.is_empty());
    }

    #[tokio::test]
    async fn list_nodes_skips_unknown_ids() {
        let store = chain();
        let ids: BTreeSet<NodeId> = ["D2", "D1", "zzz"].into_iter().map(NodeId::from).collect();
        let nodes = store.list_nodes(&ids).await.unwrap();
        let listed: Vec<_> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(listed, vec!["D1", "D2"]);
    }

    #[tokio::test]
    async fn delete_removes_nodes_and_incident_links() {
        let store = chain();
        let ids: BTreeSet<NodeId> = [NodeId::from("C1")].into_iter().collect();
        store.delete_nodes_and_links(&ids).await.unwrap();
        assert_eq!(store.node_count().unwrap(), 2);
        assert_eq!(store.link_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn failed_delete_leaves_everything_in_place() {
        let store = chain();
        store.set_fail_deletions(true);
        let ids: BTreeSet<NodeId> = ["D1", "C1", "D2"].into_iter().map(NodeId::from).collect();
        assert!(store.delete_nodes_and_links(&ids).await.is_err());
        assert_eq!(store.node_count().unwrap(), 3);
        assert_eq!(store.link_count().unwrap(), 2);
    }

    #[tokio::test]
    async fn erase_respects_force() {
        let repo = InMemoryArtifactRepository::new();
        let id = NodeId::from("D1");
        repo.put_file(&id, "input.txt", b"steps = 10".to_vec()).unwrap();
        let handle = repo.locate_artifact(&id).await.unwrap().unwrap();

        assert!(matches!(
            repo.erase(&handle, false).await,
            Err(RepositoryError::NotEmpty(_))
        ));
        repo.erase(&handle, true).await.unwrap();
        assert!(!repo.has_artifact(&id).unwrap());

        // Already gone.
        repo.erase(&handle, true).await.unwrap();
    }

    #[tokio::test]
    async fn empty_artifact_erases_without_force() {
        let repo = InMemoryArtifactRepository::new();
        let id = NodeId::from("C1");
        repo.create_artifact(&id).unwrap();
        let handle = repo.locate_artifact(&id).await.unwrap().unwrap();
        repo.erase(&handle, false).await.unwrap();
        assert_eq!(repo.artifact_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn injected_erase_failure() {
        let repo = InMemoryArtifactRepository::new();
        let id = NodeId::from("D2");
        repo.create_artifact(&id).unwrap();
        repo.inject_erase_failure(&id).unwrap();
        let handle = repo.locate_artifact(&id).await.unwrap().unwrap();
        assert!(repo.erase(&handle, true).await.is_err());
        assert!(repo.has_artifact(&id).unwrap());
    }

    #[tokio::test]
    async fn locate_returns_none_without_artifact() {
        let repo = InMemoryArtifactRepository::new();
        assert!(repo
            .locate_artifact(&NodeId::from("nothing"))
            .await
            .unwrap()
            .is_none());
    }
}
