//! Deletion closure: the seed set expanded under the traversal rules.

use std::collections::{BTreeSet, HashMap, VecDeque};

use provenance_rules::{RuleSet, TraversalRule};
use provenance_store::GraphStore;
use provenance_types::{Link, LinkDirection, NodeId, NodeKind};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::error::DeleteError;

/// A requested or referenced node that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node {node_id} does not exist, skipping")]
pub struct MissingNodeWarning {
    pub node_id: NodeId,
}

/// Result of a closure computation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Closure {
    /// Every node that must be deleted together with the seeds.
    pub nodes: BTreeSet<NodeId>,
    /// Seeds and link endpoints that did not resolve to a node.
    pub missing: BTreeSet<NodeId>,
    /// Links followed between closure members. Only filled when link
    /// collection was requested.
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub links: BTreeSet<Link>,
}

impl Closure {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains(id)
    }

    pub fn missing_warnings(&self) -> impl Iterator<Item = MissingNodeWarning> + '_ {
        self.missing.iter().map(|id| MissingNodeWarning {
            node_id: id.clone(),
        })
    }
}

/// Computes deletion closures against a [`GraphStore`].
///
/// Breadth-first expansion to a fixed point: a link is followed when the
/// rule selected by (link kind, endpoint kinds, direction) is enabled. Final
/// membership depends only on the graph, the seeds and the rules, never on
/// visiting order.
#[derive(Debug, Clone, Default)]
pub struct ClosureComputer {
    rules: RuleSet,
    collect_links: bool,
}

impl ClosureComputer {
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            collect_links: false,
        }
    }

    /// Also record the links followed between closure members.
    pub fn collecting_links(mut self) -> Self {
        self.collect_links = true;
        self
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Compute the closure and hand the missing ids to `on_missing`.
    ///
    /// `on_missing` is called at most once, with the complete set, and only
    /// when it is non-empty.
    pub async fn compute_reporting<G, I, F>(
        &self,
        graph: &G,
        seeds: I,
        on_missing: F,
    ) -> Result<Closure, DeleteError>
    where
        G: GraphStore + ?Sized,
        I: IntoIterator<Item = NodeId>,
        F: FnOnce(&BTreeSet<NodeId>),
    {
        let closure = self.compute(graph, seeds).await?;
        if !closure.missing.is_empty() {
            on_missing(&closure.missing);
        }
        Ok(closure)
    }

    /// Compute the closure and the links followed between its members.
    pub async fn compute_with_links<G, I>(&self, graph: &G, seeds: I) -> Result<Closure, DeleteError>
    where
        G: GraphStore + ?Sized,
        I: IntoIterator<Item = NodeId>,
    {
        self.clone().collecting_links().compute(graph, seeds).await
    }

    /// Compute the closure of `seeds`. Read-only against `graph`.
    #[instrument(skip_all)]
    pub async fn compute<G, I>(&self, graph: &G, seeds: I) -> Result<Closure, DeleteError>
    where
        G: GraphStore + ?Sized,
        I: IntoIterator<Item = NodeId>,
    {
        let requested: BTreeSet<NodeId> = seeds.into_iter().collect();
        let mut traversal = Traversal::default();

        for id in requested {
            if let Some(node) = traversal.resolve(graph, &id).await? {
                traversal.visit(node);
            }
        }
        let seed_count = traversal.visited.len();

        while let Some(node) = traversal.frontier.pop_front() {
            for direction in [LinkDirection::Outgoing, LinkDirection::Incoming] {
                self.expand(graph, &node, direction, &mut traversal).await?;
            }
        }

        debug!(
            seeds = seed_count,
            closure = traversal.visited.len(),
            missing = traversal.missing.len(),
            "Computed deletion closure"
        );

        Ok(Closure {
            nodes: traversal.visited,
            missing: traversal.missing,
            links: traversal.links,
        })
    }

    async fn expand<G>(
        &self,
        graph: &G,
        node: &Resolved,
        direction: LinkDirection,
        traversal: &mut Traversal,
    ) -> Result<(), DeleteError>
    where
        G: GraphStore + ?Sized,
    {
        for link in graph.get_links(&node.id, direction, None).await? {
            if !self.may_follow(&link, direction) {
                continue;
            }

            let neighbour_id = link.neighbour(direction).clone();
            let Some(neighbour) = traversal.resolve(graph, &neighbour_id).await? else {
                continue;
            };

            let (source, target) = match direction {
                LinkDirection::Outgoing => (node.kind, neighbour.kind),
                LinkDirection::Incoming => (neighbour.kind, node.kind),
            };
            let Some(rule) = TraversalRule::for_edge(link.kind, source, target, direction) else {
                warn!(
                    source = %link.source,
                    target = %link.target,
                    kind = %link.kind,
                    "Skipping link with endpoint kinds invalid for its kind"
                );
                continue;
            };
            if !self.rules.is_enabled(rule) {
                continue;
            }

            if self.collect_links {
                traversal.links.insert(link.clone());
            }
            if !traversal.visited.contains(&neighbour.id) {
                debug!(from = %node.id, to = %neighbour.id, %rule, "Pulled into closure");
                traversal.visit(neighbour);
            }
        }
        Ok(())
    }

    /// Cheap pre-check before resolving the neighbour: some rule for this
    /// link kind and direction must be enabled.
    fn may_follow(&self, link: &Link, direction: LinkDirection) -> bool {
        TraversalRule::ALL
            .iter()
            .any(|rule| {
                rule.link_kind() == link.kind
                    && rule.direction() == direction
                    && self.rules.is_enabled(*rule)
            })
    }
}

/// The parts of a node the traversal needs.
#[derive(Clone, Debug)]
struct Resolved {
    id: NodeId,
    kind: NodeKind,
}

/// Per-invocation traversal state.
#[derive(Default)]
struct Traversal {
    visited: BTreeSet<NodeId>,
    frontier: VecDeque<Resolved>,
    missing: BTreeSet<NodeId>,
    links: BTreeSet<Link>,
    known: HashMap<NodeId, NodeKind>,
}

impl Traversal {
    fn visit(&mut self, node: Resolved) {
        if self.visited.insert(node.id.clone()) {
            self.frontier.push_back(node);
        }
    }

    /// Look a node up, remembering misses so each is reported once.
    async fn resolve<G>(&mut self, graph: &G, id: &NodeId) -> Result<Option<Resolved>, DeleteError>
    where
        G: GraphStore + ?Sized,
    {
        if self.missing.contains(id) {
            return Ok(None);
        }
        if let Some(kind) = self.known.get(id) {
            return Ok(Some(Resolved {
                id: id.clone(),
                kind: *kind,
            }));
        }
        match graph.get_node(id).await? {
            Some(node) => {
                self.known.insert(node.id.clone(), node.kind);
                Ok(Some(Resolved {
                    id: node.id,
                    kind: node.kind,
                }))
            }
            None => {
                warn!(node_id = %id, "Node does not exist, skipping");
                self.missing.insert(id.clone());
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use provenance_store::InMemoryGraphStore;
    use provenance_types::{LinkKind, Node};

    fn ids(items: &[&str]) -> BTreeSet<NodeId> {
        items.iter().map(|s| NodeId::from(*s)).collect()
    }

    /// D1 -INPUT-> C1 -CREATE-> D2
    fn chain() -> InMemoryGraphStore {
        let g = InMemoryGraphStore::new();
        g.insert_node(Node::data("D1")).unwrap();
        g.insert_node(Node::calculation("C1")).unwrap();
        g.insert_node(Node::data("D2")).unwrap();
        g.insert_link(Link::new("D1", "C1", LinkKind::Input, "x")).unwrap();
        g.insert_link(Link::new("C1", "D2", LinkKind::Create, "y")).unwrap();
        g
    }

    /// W1 calls C1 and C2. D0 -> W1 and D0 -> C1 as input. C1 creates D1,
    /// which C2 consumes; C2 creates D2, which W1 returns.
    fn workflow_graph() -> InMemoryGraphStore {
        let g = InMemoryGraphStore::new();
        for node in [
            Node::data("D0"),
            Node::workflow("W1"),
            Node::calculation("C1"),
            Node::data("D1"),
            Node::calculation("C2"),
            Node::data("D2"),
        ] {
            g.insert_node(node).unwrap();
        }
        for link in [
            Link::new("D0", "W1", LinkKind::Input, "structure"),
            Link::new("W1", "C1", LinkKind::Call, "step_1"),
            Link::new("D0", "C1", LinkKind::Input, "structure"),
            Link::new("C1", "D1", LinkKind::Create, "out"),
            Link::new("W1", "C2", LinkKind::Call, "step_2"),
            Link::new("D1", "C2", LinkKind::Input, "in"),
            Link::new("C2", "D2", LinkKind::Create, "out"),
            Link::new("W1", "D2", LinkKind::Return, "result"),
        ] {
            g.insert_link(link).unwrap();
        }
        g
    }

    #[tokio::test]
    async fn data_seed_pulls_consumer_and_its_outputs() {
        let g = chain();
        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from("D1")])
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["D1", "C1", "D2"]));
        assert!(closure.missing.is_empty());
    }

    #[tokio::test]
    async fn calculation_without_outputs_keeps_everything_else() {
        let g = chain();
        let rules = RuleSet::default().with(TraversalRule::CreateForward, false);
        let closure = ClosureComputer::new(rules)
            .compute(&g, [NodeId::from("C1")])
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["C1"]));
    }

    #[tokio::test]
    async fn missing_seed_yields_empty_closure() {
        let g = chain();
        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from(999u64)])
            .await
            .unwrap();
        assert!(closure.is_empty());
        assert_eq!(closure.missing, ids(&["999"]));
    }

    #[tokio::test]
    async fn duplicate_seeds_are_tolerated() {
        let g = chain();
        let closure = ClosureComputer::default()
            .compute(&g, ["D2", "D2", "D2"].map(NodeId::from))
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["C1", "D2"]));
    }

    #[tokio::test]
    async fn output_data_pulls_its_creator_but_not_the_creators_inputs() {
        let g = chain();
        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from("D2")])
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["C1", "D2"]));
    }

    #[tokio::test]
    async fn calculation_pulls_calling_workflow_but_not_siblings_by_default() {
        let g = workflow_graph();
        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from("C2")])
            .await
            .unwrap();
        // C2 -> caller W1; C2 -> output D2. W1 keeps C1 (call_calc_forward off)
        // and never deletes data through RETURN forward or INPUT backward.
        assert_eq!(closure.nodes, ids(&["C2", "D2", "W1"]));
    }

    #[tokio::test]
    async fn enabling_called_process_rule_pulls_sub_processes() {
        let g = workflow_graph();
        let rules = RuleSet::default().with(TraversalRule::CallCalcForward, true);
        let closure = ClosureComputer::new(rules)
            .compute(&g, [NodeId::from("W1")])
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["C1", "C2", "D1", "D2", "W1"]));
    }

    #[tokio::test]
    async fn workflow_alone_by_default() {
        let g = workflow_graph();
        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from("W1")])
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["W1"]));
    }

    #[tokio::test]
    async fn shared_input_pulls_everything_downstream() {
        let g = workflow_graph();
        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from("D0")])
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["C1", "C2", "D0", "D1", "D2", "W1"]));
    }

    #[tokio::test]
    async fn dangling_neighbour_is_reported_and_skipped() {
        let g = chain();
        g.insert_link_unchecked(Link::new("C1", "ghost", LinkKind::Create, "lost"))
            .unwrap();

        let mut reported = Vec::new();
        let closure = ClosureComputer::default()
            .compute_reporting(&g, [NodeId::from("C1")], |missing| {
                reported.push(missing.clone())
            })
            .await
            .unwrap();

        assert_eq!(closure.nodes, ids(&["C1", "D2"]));
        assert_eq!(reported, vec![ids(&["ghost"])]);
    }

    #[tokio::test]
    async fn callback_not_invoked_without_missing_ids() {
        let g = chain();
        let mut called = false;
        ClosureComputer::default()
            .compute_reporting(&g, [NodeId::from("D1")], |_| called = true)
            .await
            .unwrap();
        assert!(!called);
    }

    #[tokio::test]
    async fn workflow_never_deletes_data_through_create() {
        let g = InMemoryGraphStore::new();
        g.insert_node(Node::workflow("W1")).unwrap();
        g.insert_node(Node::data("D1")).unwrap();
        g.insert_link_unchecked(Link::new("W1", "D1", LinkKind::Create, "out"))
            .unwrap();

        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from("W1")])
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["W1"]));

        // Same from the data side: no creator is pulled in either.
        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from("D1")])
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["D1"]));
    }

    #[tokio::test]
    async fn links_are_collected_on_request() {
        let g = chain();
        let closure = ClosureComputer::default()
            .compute_with_links(&g, [NodeId::from("D1")])
            .await
            .unwrap();
        assert_eq!(closure.links.len(), 2);
        assert!(closure
            .links
            .iter()
            .all(|l| closure.contains(&l.source) && closure.contains(&l.target)));
    }

    #[tokio::test]
    async fn links_are_not_collected_by_default() {
        let g = chain();
        let closure = ClosureComputer::default()
            .compute(&g, [NodeId::from("D1")])
            .await
            .unwrap();
        assert!(closure.links.is_empty());
    }

    #[tokio::test]
    async fn no_rules_means_seeds_only() {
        let g = workflow_graph();
        let closure = ClosureComputer::new(RuleSet::none())
            .compute(&g, ["D0", "C2"].map(NodeId::from))
            .await
            .unwrap();
        assert_eq!(closure.nodes, ids(&["C2", "D0"]));
    }

    #[test]
    fn missing_warning_text() {
        let closure = Closure {
            missing: ids(&["999"]),
            ..Default::default()
        };
        let warnings: Vec<String> = closure.missing_warnings().map(|w| w.to_string()).collect();
        assert_eq!(warnings, vec!["node 999 does not exist, skipping"]);
    }
}
