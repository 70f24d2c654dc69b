//! Layout engine
//!
//! Packs a [`Tree`] into a single [`Grid`]: columns stack children top to
//! bottom, rows stack them left to right, text leaves are rasterized by the
//! [`StyleResolver`]. Every node's `area` is updated so dispatch can hit-test
//! against exactly what was painted.
//!
//! Containers size their grid to the exact extent of their children before
//! copying them in. Copies are bounds-checked; anything that does not fit
//! (only possible at the edge of the `u16` coordinate space) is dropped and
//! logged.

use std::sync::Arc;

use tracing::warn;

use crate::grid::{clamped_rect, Grid};
use crate::node::{NodeIndex, NodeKind, Tree};
use crate::style::{DefaultStyleResolver, StyleResolver};

#[derive(Clone, Copy)]
enum Axis {
    Vertical,
    Horizontal,
}

/// Rasterizes node trees
#[derive(Clone)]
pub struct Packer {
    resolver: Arc<dyn StyleResolver>,
}

impl Default for Packer {
    fn default() -> Self {
        Self::new(Arc::new(DefaultStyleResolver))
    }
}

impl std::fmt::Debug for Packer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Packer").finish_non_exhaustive()
    }
}

impl Packer {
    pub fn new(resolver: Arc<dyn StyleResolver>) -> Self {
        Self { resolver }
    }

    /// Pack the whole tree with its root at `(x, y)`.
    pub fn pack(&self, tree: &mut Tree, x: u16, y: u16) -> Grid {
        match tree.root() {
            Some(root) => self.pack_node(tree, root, x, y),
            None => Grid::empty(x, y),
        }
    }

    fn pack_node(&self, tree: &mut Tree, index: NodeIndex, x: u16, y: u16) -> Grid {
        let Some(node) = tree.get(index) else {
            return Grid::empty(x, y);
        };
        let delegate = node.children.first().copied();

        let grid = match &node.kind {
            NodeKind::Text(text) => {
                let mut grid = self.resolver.resolve(&text.content, &text.style);
                grid.set_origin(x, y);
                grid
            }
            NodeKind::Column => self.pack_stack(tree, index, x, y, Axis::Vertical),
            NodeKind::Row => self.pack_stack(tree, index, x, y, Axis::Horizontal),
            NodeKind::Composite(_) => match delegate {
                Some(delegate) => self.pack_node(tree, delegate, x, y),
                None => Grid::empty(x, y),
            },
        };

        if let Some(node) = tree.get_mut(index) {
            node.area = grid.area();
        }
        grid
    }

    fn pack_stack(&self, tree: &mut Tree, index: NodeIndex, x: u16, y: u16, axis: Axis) -> Grid {
        let children = tree
            .get(index)
            .map(|node| node.children.clone())
            .unwrap_or_default();

        let mut packed = Vec::with_capacity(children.len());
        let mut offset: u16 = 0;
        let mut cross: u16 = 0;
        for child in children {
            let grid = match axis {
                Axis::Vertical => self.pack_node(tree, child, x, y.saturating_add(offset)),
                Axis::Horizontal => self.pack_node(tree, child, x.saturating_add(offset), y),
            };
            let (main, other) = match axis {
                Axis::Vertical => (grid.height(), grid.width()),
                Axis::Horizontal => (grid.width(), grid.height()),
            };
            offset = offset.saturating_add(main);
            cross = cross.max(other);
            packed.push(grid);
        }

        let (width, height) = match axis {
            Axis::Vertical => (cross, offset),
            Axis::Horizontal => (offset, cross),
        };
        let mut grid = Grid::new(clamped_rect(x, y, width, height));

        let mut clipped = 0;
        for child in &packed {
            clipped += grid.blit(child).clipped;
        }
        if clipped > 0 {
            let id = tree.get(index).map(|node| node.id.to_string());
            warn!(component = ?id, clipped, "cells outside the screen space were dropped");
        }
        grid
    }
}

/// Pack a tree with the default style resolver.
pub fn pack(tree: &mut Tree, x: u16, y: u16) -> Grid {
    Packer::default().pack(tree, x, y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Text;
    use crate::node::{ComponentId, Node};
    use crate::style::{Borders, TextStyle};
    use ratatui::layout::Rect;

    fn leaf(tree: &mut Tree, id: ComponentId, parent: NodeIndex, content: &str) -> NodeIndex {
        tree.push(Node::new(id, NodeKind::Text(Text::new(content)), Some(parent)))
    }

    fn container(kind: NodeKind, children: &[&str]) -> Tree {
        let mut tree = Tree::new();
        let root = tree.push(Node::new(ComponentId::root(), kind, None));
        for (i, content) in children.iter().enumerate() {
            leaf(&mut tree, ComponentId::root().child(i), root, content);
        }
        tree
    }

    #[test]
    fn test_column_of_two_texts() {
        let mut tree = container(NodeKind::Column, &["A", "BB"]);
        let grid = pack(&mut tree, 0, 0);
        assert_eq!((grid.width(), grid.height()), (2, 2));
        assert_eq!(grid.to_lines(), vec!["A ", "BB"]);
    }

    #[test]
    fn test_column_sizes() {
        // (3,2) and (5,1)
        let mut tree = container(NodeKind::Column, &["abc\ndef", "ghijk"]);
        let grid = pack(&mut tree, 0, 0);
        assert_eq!((grid.width(), grid.height()), (5, 3));
        assert_eq!(grid.to_lines(), vec!["abc  ", "def  ", "ghijk"]);
    }

    #[test]
    fn test_row_sizes() {
        let mut tree = container(NodeKind::Row, &["abc\ndef", "ghijk"]);
        let grid = pack(&mut tree, 0, 0);
        assert_eq!((grid.width(), grid.height()), (8, 2));
        assert_eq!(grid.to_lines(), vec!["abcghijk", "def     "]);
    }

    #[test]
    fn test_areas_are_recorded() {
        let mut tree = container(NodeKind::Row, &["ab", "c"]);
        pack(&mut tree, 2, 1);
        let areas: Vec<_> = tree.iter().map(|node| node.area).collect();
        assert_eq!(
            areas,
            vec![Rect::new(2, 1, 3, 1), Rect::new(2, 1, 2, 1), Rect::new(4, 1, 1, 1)]
        );
    }

    #[test]
    fn test_nested_and_composite() {
        let mut tree = Tree::new();
        let root = tree.push(Node::new(ComponentId::root(), NodeKind::Column, None));
        let composite = tree.push(Node::new(
            ComponentId::root().child(0),
            NodeKind::Composite("Wrapper"),
            Some(root),
        ));
        let row = tree.push(Node::new(
            ComponentId::root().child(0).child(0),
            NodeKind::Row,
            Some(composite),
        ));
        leaf(&mut tree, ComponentId::from("root/0/0/0"), row, "x");
        leaf(&mut tree, ComponentId::from("root/0/0/1"), row, "yz");
        leaf(&mut tree, ComponentId::root().child(1), root, "end");

        let grid = pack(&mut tree, 0, 0);
        assert_eq!(grid.to_lines(), vec!["xyz", "end"]);
        assert_eq!(tree.get(composite).unwrap().area, Rect::new(0, 0, 3, 1));
    }

    #[test]
    fn test_styled_leaf_uses_resolver() {
        let mut tree = Tree::new();
        tree.push(Node::new(
            ComponentId::root(),
            NodeKind::Text(Text::new("hi").style(TextStyle::new().borders(Borders::ALL))),
            None,
        ));
        let grid = pack(&mut tree, 0, 0);
        assert_eq!(grid.to_lines(), vec!["┌──┐", "│hi│", "└──┘"]);
    }

    #[test]
    fn test_empty_tree_and_empty_container() {
        assert_eq!(pack(&mut Tree::new(), 0, 0).area(), Rect::default());

        let mut tree = container(NodeKind::Column, &[]);
        let grid = pack(&mut tree, 0, 0);
        assert_eq!((grid.width(), grid.height()), (0, 0));
    }

    #[test]
    fn test_content_past_coordinate_space_is_clipped() {
        let mut tree = container(NodeKind::Row, &["abc", "def"]);
        let grid = pack(&mut tree, u16::MAX - 4, 0);
        assert_eq!(grid.width(), 4);
        assert_eq!(grid.to_lines(), vec!["abcd"]);
    }
}
