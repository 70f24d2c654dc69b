//! Event dispatch: start-node resolution and bubbling

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, error, trace};

use crate::context::AppHandle;
use crate::error::panic_message;
use crate::event::{EventClass, EventKind};
use crate::focus::FocusRegistry;
use crate::handler::HandlerRegistry;
use crate::node::{ComponentId, NodeIndex, Tree};
use crate::scheduler::RenderTrigger;

/// Result of dispatching one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler on this component reported the event handled
    Handled(ComponentId),
    /// The event bubbled to the root (or had no start node) unhandled
    Unhandled,
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, DispatchOutcome::Handled(_))
    }
}

/// Routes events through the most recently published tree
#[derive(Debug, Clone)]
pub struct Dispatcher {
    focus: Arc<FocusRegistry>,
    handlers: Arc<HandlerRegistry>,
    renderer: RenderTrigger,
}

impl Dispatcher {
    pub fn new(app: &AppHandle) -> Self {
        Self {
            focus: app.focus().clone(),
            handlers: app.handlers().clone(),
            renderer: app.renderer().clone(),
        }
    }

    /// Node the event starts bubbling from.
    ///
    /// Keyboard events start at the focused component, falling back to the
    /// root. Pointer events start at the deepest node under the pointer and
    /// have no start node outside the painted area. Everything else starts
    /// at the root.
    pub fn start_node(&self, tree: &Tree, event: &EventKind) -> Option<NodeIndex> {
        let root = tree.root()?;
        match event.class() {
            EventClass::Keyboard => Some(
                self.focus
                    .focused()
                    .and_then(|id| tree.find(&id))
                    .unwrap_or(root),
            ),
            EventClass::Pointer => {
                let (x, y) = event.position()?;
                node_at(tree, x, y)
            }
            EventClass::Other => Some(root),
        }
    }

    /// Deliver `event`, bubbling from the start node toward the root.
    ///
    /// Handlers come from a snapshot taken before the first one runs. The
    /// first handler returning `true` stops the walk and a render is
    /// requested. A panicking handler is logged and counts as unhandled.
    pub fn dispatch(&self, tree: &Tree, event: &EventKind) -> DispatchOutcome {
        let Some(start) = self.start_node(tree, event) else {
            trace!(?event, "no start node; event dropped");
            return DispatchOutcome::Unhandled;
        };

        let handlers = self.handlers.snapshot();
        for (_, node) in tree.ancestors(start) {
            let Some(handler) = handlers.get(&node.id) else {
                continue;
            };

            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(true) => {
                    debug!(component = %node.id, "event handled");
                    self.renderer.request();
                    return DispatchOutcome::Handled(node.id.clone());
                }
                Ok(false) => {}
                Err(payload) => {
                    error!(
                        component = %node.id,
                        panic = %panic_message(payload.as_ref()),
                        "event handler panicked"
                    );
                }
            }
        }

        trace!(?event, "event bubbled to root unhandled");
        DispatchOutcome::Unhandled
    }
}

/// Deepest node whose box contains `(x, y)`.
///
/// Descends only into children of a node that contains the point and takes
/// the first containing child at each level.
pub fn node_at(tree: &Tree, x: u16, y: u16) -> Option<NodeIndex> {
    let mut current = tree.root()?;
    if !tree.get(current)?.contains(x, y) {
        return None;
    }

    'descend: loop {
        let node = tree.get(current)?;
        for &child in &node.children {
            if tree.get(child).is_some_and(|c| c.contains(x, y)) {
                current = child;
                continue 'descend;
            }
        }
        return Some(current);
    }
}
