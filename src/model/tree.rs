//! Result tree builder.
//!
//! Nodes live in an arena owned by one History. A memoization table keyed by
//! package and by (package, path-prefix) guarantees that a given prefix maps
//! to exactly one node no matter how often its events are re-ingested, and
//! sibling order is fixed by first appearance.

use std::collections::{HashMap, HashSet};

use crate::model::event::TestEvent;
use crate::model::status::{
    StatusTone, TestStatus, expand_icon, format_node_text, resolve_test_status,
};

/// Package icon prefix on package rows.
const PACKAGE_ICON: &str = "📦";

/// Label of the synthetic root node.
const ROOT_LABEL: &str = ".";

/// Index of a node inside its [`ResultTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Identity of one test: its package plus its full slash-delimited name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestKey {
    pub package: String,
    pub name: String,
}

impl TestKey {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Key of the test an event belongs to. Root events have no key.
    #[must_use]
    pub fn of(event: &TestEvent) -> Option<Self> {
        (!event.is_root_event()).then(|| Self::new(&event.package, &event.test))
    }

    /// Last `/`-separated segment of the test name.
    #[must_use]
    pub fn last_segment(&self) -> &str {
        last_path_component(&self.name)
    }
}

/// What a node points at, deciding whether and how it can be rerun.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NodeRef {
    /// Synthetic root, or an intermediate segment never addressed directly.
    #[default]
    None,
    /// A whole package, identified by its import path.
    Package(String),
    /// The test whose exact name equals this node's path.
    Test(TestKey),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Package,
    Test,
}

/// One element of the result tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Display name: last package path component or test name segment.
    pub name: String,
    /// `None` until the node is addressed by its own events.
    pub status: Option<TestStatus>,
    pub elapsed: f64,
    pub children: Vec<NodeId>,
    pub reference: NodeRef,
}

impl Node {
    fn new(kind: NodeKind, name: impl Into<String>, reference: NodeRef) -> Self {
        Self {
            kind,
            name: name.into(),
            status: None,
            elapsed: 0.0,
            children: Vec::new(),
            reference,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Package(String),
    Path { package: String, prefix: String },
}

/// Owned, lock-free view of one visible tree line.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRow {
    pub id: NodeId,
    pub depth: usize,
    pub kind: NodeKind,
    pub name: String,
    pub status: Option<TestStatus>,
    pub elapsed: f64,
    pub has_children: bool,
    pub expanded: bool,
    pub reference: NodeRef,
}

impl TreeRow {
    /// Display text, using `spinner` for running tests.
    #[must_use]
    pub fn text(&self, spinner: &str) -> String {
        let expand = expand_icon(self.has_children, self.expanded);
        match (self.kind, self.status) {
            (NodeKind::Root, _) => ROOT_LABEL.to_string(),
            (NodeKind::Package, None) => {
                format_node_text(expand, PACKAGE_ICON, &self.name, self.elapsed)
            }
            (NodeKind::Package, Some(status)) => format_node_text(
                expand,
                &format!("{PACKAGE_ICON} {}", status.icon(spinner)),
                &self.name,
                self.elapsed,
            ),
            (NodeKind::Test, Some(status)) => {
                format_node_text(expand, status.icon(spinner), &self.name, self.elapsed)
            }
            (NodeKind::Test, None) => format!("{expand}{}", self.name),
        }
    }

    /// Color tone; `None` means the front-end's neutral/package color.
    #[must_use]
    pub fn tone(&self) -> Option<StatusTone> {
        match self.kind {
            NodeKind::Test => self.status.map(TestStatus::tone),
            NodeKind::Root | NodeKind::Package => None,
        }
    }
}

/// Hierarchical result model for one History.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTree {
    nodes: Vec<Node>,
    index: HashMap<NodeKey, NodeId>,
}

impl Default for ResultTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultTree {
    /// Empty tree holding only the synthetic root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Root, ROOT_LABEL, NodeRef::None)],
            index: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Package node for an import path, if one was created.
    #[must_use]
    pub fn package_node(&self, package: &str) -> Option<NodeId> {
        self.index.get(&NodeKey::Package(package.to_string())).copied()
    }

    /// Node whose path is exactly `key`, if one was created.
    #[must_use]
    pub fn test_node(&self, key: &TestKey) -> Option<NodeId> {
        self.index
            .get(&NodeKey::Path {
                package: key.package.clone(),
                prefix: key.name.clone(),
            })
            .copied()
    }

    /// Node carrying `reference`, if any.
    #[must_use]
    pub fn find_by_ref(&self, reference: &NodeRef) -> Option<NodeId> {
        match reference {
            NodeRef::None => None,
            NodeRef::Package(package) => self.package_node(package),
            NodeRef::Test(key) => self
                .test_node(key)
                .filter(|id| self.nodes[id.0].reference == *reference),
        }
    }

    /// Fold the accumulated events of one test into the tree.
    ///
    /// Creates the package node and every missing path-prefix node, then
    /// re-resolves the deepest node's status from `events` and tags it with
    /// the test's key. Intermediate nodes are left untouched. An empty event
    /// list is a no-op.
    pub fn ingest(&mut self, key: &TestKey, events: &[TestEvent]) -> Option<NodeId> {
        if events.is_empty() || key.name.is_empty() {
            return None;
        }

        let mut parent = self.ensure_package(&key.package);
        let mut prefix_end = 0;
        for segment in key.name.split('/') {
            prefix_end += segment.len();
            let prefix = &key.name[..prefix_end];
            prefix_end += 1;

            let node_key = NodeKey::Path {
                package: key.package.clone(),
                prefix: prefix.to_string(),
            };
            parent = match self.index.get(&node_key) {
                Some(&id) => id,
                None => {
                    let node = Node::new(NodeKind::Test, segment, NodeRef::None);
                    let id = self.push_child(parent, node);
                    self.index.insert(node_key, id);
                    id
                }
            };
        }

        let (status, elapsed) = resolve_test_status(events);
        let node = &mut self.nodes[parent.0];
        node.status = Some(status);
        node.elapsed = elapsed;
        node.reference = NodeRef::Test(key.clone());
        Some(parent)
    }

    /// Refresh a package node from its root events, if the node exists.
    ///
    /// Root events never create nodes; they only annotate packages that
    /// already have at least one test in the tree.
    pub fn update_package(&mut self, package: &str, root_events: &[TestEvent]) -> Option<NodeId> {
        if root_events.is_empty() {
            return None;
        }
        let id = self.package_node(package)?;
        let (status, elapsed) = resolve_test_status(root_events);
        let node = &mut self.nodes[id.0];
        node.status = Some(status);
        node.elapsed = elapsed;
        Some(id)
    }

    /// Flatten the visible tree depth-first, skipping collapsed subtrees.
    #[must_use]
    pub fn rows(&self, collapsed: &HashSet<NodeId>) -> Vec<TreeRow> {
        let mut rows = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = &self.nodes[id.0];
            let expanded = !collapsed.contains(&id);
            rows.push(TreeRow {
                id,
                depth,
                kind: node.kind,
                name: node.name.clone(),
                status: node.status,
                elapsed: node.elapsed,
                has_children: !node.children.is_empty(),
                expanded,
                reference: node.reference.clone(),
            });
            if expanded {
                stack.extend(node.children.iter().rev().map(|&child| (child, depth + 1)));
            }
        }
        rows
    }

    fn ensure_package(&mut self, package: &str) -> NodeId {
        let key = NodeKey::Package(package.to_string());
        if let Some(&id) = self.index.get(&key) {
            return id;
        }
        let node = Node::new(
            NodeKind::Package,
            last_path_component(package),
            NodeRef::Package(package.to_string()),
        );
        let id = self.push_child(self.root(), node);
        self.index.insert(key, id);
        id
    }

    fn push_child(&mut self, parent: NodeId, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        id
    }
}

/// Last component of a slash-separated path.
#[must_use]
pub fn last_path_component(path: &str) -> &str {
    path.rsplit_once('/').map_or(path, |(_, last)| last)
}
