//! Tree builder
//!
//! Expands an element tree into a fresh [`Tree`] on every render pass.
//! Identities come from structural position only: the root is `root`, the
//! child at index `i` of node `p` is `p/i`, and a composite's rendered
//! delegate sits at `p/0`.

use tracing::{debug, trace};

use crate::component::Element;
use crate::context::{AppHandle, BuildPass, Context};
use crate::node::{ComponentId, Node, NodeIndex, NodeKind, Tree};

/// Builds node trees and reaps state left behind by vanished components
#[derive(Debug, Clone)]
pub struct Reconciler {
    app: AppHandle,
}

impl Reconciler {
    pub fn new(app: AppHandle) -> Self {
        Self { app }
    }

    pub fn app(&self) -> &AppHandle {
        &self.app
    }

    /// Build the tree for `root`.
    ///
    /// A position whose element kind changed since the last build loses the
    /// slots, handler and focus registrations of its old occupant before the
    /// new one renders. After the walk, the same are dropped for identities
    /// that were not reached.
    ///
    /// # Panics
    ///
    /// Panics when a component changes the number or types of its hooks
    /// between renders, or when a component's `render` panics.
    pub fn build(&self, root: &Element) -> Tree {
        let mut tree = Tree::new();
        let mut pass = BuildPass::default();
        self.walk(root, ComponentId::root(), None, &mut tree, &mut pass);

        let slots = self.app.state().sweep(&pass.observed);
        let handlers = self.app.handlers().retain(&pass.handler_owners);
        let focusables = self.app.focus().sweep(&pass.observed);
        debug!(
            nodes = tree.len(),
            reaped_slots = slots,
            reaped_handlers = handlers,
            reaped_focusables = focusables,
            "tree built"
        );
        tree
    }

    fn walk(
        &self,
        element: &Element,
        id: ComponentId,
        parent: Option<NodeIndex>,
        tree: &mut Tree,
        pass: &mut BuildPass,
    ) -> NodeIndex {
        trace!(component = %id, kind = element.label(), "walk");
        pass.observed.insert(id.clone());
        if self.app.state().claim(&id, element.label()) {
            self.app.handlers().unregister(&id);
            self.app.focus().release_owner(&id);
        }

        match element {
            Element::Text(text) => tree.push(Node::new(id, NodeKind::Text(text.clone()), parent)),
            Element::Column(children) => {
                let index = tree.push(Node::new(id.clone(), NodeKind::Column, parent));
                self.walk_children(children, &id, index, tree, pass);
                index
            }
            Element::Row(children) => {
                let index = tree.push(Node::new(id.clone(), NodeKind::Row, parent));
                self.walk_children(children, &id, index, tree, pass);
                index
            }
            Element::Component(component) => {
                let index = tree.push(Node::new(
                    id.clone(),
                    NodeKind::Composite(component.name()),
                    parent,
                ));

                let (delegate, hooks) = {
                    let mut ctx = Context::new(id.clone(), &self.app, pass);
                    let delegate = component.render(&mut ctx);
                    (delegate, ctx.hooks_called())
                };
                if let Err(previous) = self.app.state().record_hooks(&id, hooks) {
                    panic!(
                        "component `{}` at {id} called {hooks} state hooks, \
                         but {previous} on its previous render; hooks must not be \
                         called conditionally",
                        component.name()
                    );
                }

                // the composite stays in the parent chain of its delegate
                self.walk(&delegate, id.child(0), Some(index), tree, pass);
                index
            }
        }
    }

    fn walk_children(
        &self,
        children: &[Element],
        id: &ComponentId,
        index: NodeIndex,
        tree: &mut Tree,
        pass: &mut BuildPass,
    ) {
        for (i, child) in children.iter().enumerate() {
            self.walk(child, id.child(i), Some(index), tree, pass);
        }
    }
}
