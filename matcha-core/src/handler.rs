//! Event handler registry

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::error::lock;
use crate::event::EventKind;
use crate::node::ComponentId;

/// Event handler: returns `true` when the event was handled
pub type Handler = Arc<dyn Fn(&EventKind) -> bool + Send + Sync>;

/// One handler per component identity; the last registration wins
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Mutex<HashMap<ComponentId, Handler>>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = lock(&self.handlers);
        let mut ids: Vec<_> = handlers.keys().map(ComponentId::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("HandlerRegistry").field("ids", &ids).finish()
    }
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: ComponentId, handler: Handler) {
        trace!(component = %id, "handler registered");
        lock(&self.handlers).insert(id, handler);
    }

    pub fn unregister(&self, id: &ComponentId) -> bool {
        lock(&self.handlers).remove(id).is_some()
    }

    pub fn get(&self, id: &ComponentId) -> Option<Handler> {
        lock(&self.handlers).get(id).cloned()
    }

    /// Point-in-time copy used for one dispatch pass.
    ///
    /// Handlers registered while the pass runs are not visible to it.
    pub fn snapshot(&self) -> HashMap<ComponentId, Handler> {
        lock(&self.handlers).clone()
    }

    /// Keep only handlers registered by components rendered in the last
    /// build. Returns the number removed.
    pub fn retain(&self, registered: &HashSet<ComponentId>) -> usize {
        let mut handlers = lock(&self.handlers);
        let before = handlers.len();
        handlers.retain(|id, _| registered.contains(id));
        before - handlers.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.handlers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
