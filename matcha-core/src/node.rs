//! Reconciled node tree
//!
//! A [`Tree`] is an arena of [`Node`]s rebuilt from scratch on every render
//! pass. Parent links are plain indices into the arena: they are lookup-only
//! and the arena is dropped as one unit once a newer tree is published.

use std::fmt;
use std::sync::Arc;

use ratatui::layout::Rect;

use crate::component::Text;

/// Path segment of the root node
pub const ROOT: &str = "root";

/// Stable identity of a rendered position, e.g. `root/1/0`
///
/// Derived purely from the structural position: the parent's identity plus
/// the child index. Survives content changes, not reordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(Arc<str>);

impl ComponentId {
    /// Create an identity from a full path.
    pub fn new(path: impl Into<Arc<str>>) -> Self {
        Self(path.into())
    }

    /// The identity of the root node.
    pub fn root() -> Self {
        Self::new(ROOT)
    }

    /// Identity of the child at `index` below this node.
    pub fn child(&self, index: usize) -> Self {
        Self(format!("{}/{}", self.0, index).into())
    }

    /// The full path.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of path segments below the root.
    pub fn depth(&self) -> usize {
        self.0.matches('/').count()
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

impl From<String> for ComponentId {
    fn from(path: String) -> Self {
        Self::new(path)
    }
}

/// Index of a node inside its [`Tree`].
pub type NodeIndex = usize;

/// What a node resolved to during reconciliation
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Leaf with text content, rasterized by the layout engine
    Text(Text),
    /// Vertical container
    Column,
    /// Horizontal container
    Row,
    /// User component; its rendered delegate is the single child at `<id>/0`
    Composite(&'static str),
}

/// Reconciliation-time record for one position in the tree
#[derive(Debug, Clone)]
pub struct Node {
    /// Path identity
    pub id: ComponentId,
    /// Resolved shape
    pub kind: NodeKind,
    /// Children in render order
    pub children: Vec<NodeIndex>,
    /// Non-owning link used for event bubbling
    pub parent: Option<NodeIndex>,
    /// Bounding box assigned by the layout engine
    pub area: Rect,
}

impl Node {
    /// Create a node with no children and an empty box.
    pub fn new(id: ComponentId, kind: NodeKind, parent: Option<NodeIndex>) -> Self {
        Self {
            id,
            kind,
            children: Vec::new(),
            parent,
            area: Rect::default(),
        }
    }

    /// Whether the point lies inside the node's box.
    pub fn contains(&self, x: u16, y: u16) -> bool {
        x >= self.area.x
            && x < self.area.x.saturating_add(self.area.width)
            && y >= self.area.y
            && y < self.area.y.saturating_add(self.area.height)
    }
}

/// Arena holding one render pass worth of nodes; index 0 is the root
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node, linking it under its parent. Returns the new index.
    pub fn push(&mut self, node: Node) -> NodeIndex {
        let index = self.nodes.len();
        let parent = node.parent;
        self.nodes.push(node);
        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(p)) {
            parent.children.push(index);
        }
        index
    }

    /// Index of the root node, if any.
    pub fn root(&self) -> Option<NodeIndex> {
        (!self.nodes.is_empty()).then_some(0)
    }

    /// Node at `index`.
    pub fn get(&self, index: NodeIndex) -> Option<&Node> {
        self.nodes.get(index)
    }

    /// Mutable node at `index`.
    pub fn get_mut(&mut self, index: NodeIndex) -> Option<&mut Node> {
        self.nodes.get_mut(index)
    }

    /// Find a node by identity.
    pub fn find(&self, id: &ComponentId) -> Option<NodeIndex> {
        self.nodes.iter().position(|node| &node.id == id)
    }

    /// Iterate from `index` up to the root through parent links.
    pub fn ancestors(&self, index: NodeIndex) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.get(index).map(|_| index),
        }
    }

    /// All nodes in build order (pre-order).
    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        index: NodeIndex,
        prefix: &str,
        is_last: bool,
        is_root: bool,
    ) -> fmt::Result {
        let Some(node) = self.get(index) else {
            return Ok(());
        };

        let connector = match (is_root, is_last) {
            (true, _) => "",
            (false, true) => "└── ",
            (false, false) => "├── ",
        };
        write!(
            f,
            "{prefix}{connector}{} ({} children)",
            node.id,
            node.children.len()
        )?;

        let child_prefix = match (is_root, is_last) {
            (true, _) => String::new(),
            (false, true) => format!("{prefix}    "),
            (false, false) => format!("{prefix}│   "),
        };

        for (i, &child) in node.children.iter().enumerate() {
            writeln!(f)?;
            let last = i + 1 == node.children.len();
            self.write_node(f, child, &child_prefix, last, false)?;
        }
        Ok(())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root() {
            Some(root) => self.write_node(f, root, "", true, true),
            None => f.write_str("<empty>"),
        }
    }
}

/// Iterator over a node and its ancestors
pub struct Ancestors<'a> {
    tree: &'a Tree,
    next: Option<NodeIndex>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = (NodeIndex, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next?;
        let node = self.tree.get(index)?;
        self.next = node.parent;
        Some((index, node))
    }
}
