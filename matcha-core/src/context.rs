//! Render context and the hook family

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::atom::{Atom, AtomSetter};
use crate::event::EventKind;
use crate::focus::{Focus, FocusRegistry, FocusableId};
use crate::handler::HandlerRegistry;
use crate::node::ComponentId;
use crate::scheduler::RenderTrigger;
use crate::state::{Setter, StateKey, StateStore};

/// Shared services behind every render context
///
/// Cheap to clone; handlers capture it to request renders or quit.
#[derive(Debug, Clone)]
pub struct AppHandle {
    state: Arc<StateStore>,
    focus: Arc<FocusRegistry>,
    handlers: Arc<HandlerRegistry>,
    renderer: RenderTrigger,
    cancel: CancellationToken,
}

impl AppHandle {
    pub fn new(renderer: RenderTrigger, cancel: CancellationToken) -> Self {
        Self {
            state: Arc::new(StateStore::new()),
            focus: Arc::new(FocusRegistry::new(renderer.clone())),
            handlers: Arc::new(HandlerRegistry::new()),
            renderer,
            cancel,
        }
    }

    pub fn state(&self) -> &Arc<StateStore> {
        &self.state
    }

    pub fn focus(&self) -> &Arc<FocusRegistry> {
        &self.focus
    }

    pub fn handlers(&self) -> &Arc<HandlerRegistry> {
        &self.handlers
    }

    pub fn renderer(&self) -> &RenderTrigger {
        &self.renderer
    }

    /// The quit signal shared by every runtime task.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Ask for a new frame.
    pub fn request_render(&self) {
        self.renderer.request();
    }

    /// Raise the quit signal.
    pub fn quit(&self) {
        if !self.cancel.is_cancelled() {
            info!("quit requested");
        }
        self.cancel.cancel();
    }

    pub fn is_quit(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Identities touched during one build; drives reaping after the pass
#[derive(Debug, Default)]
pub(crate) struct BuildPass {
    pub(crate) observed: HashSet<ComponentId>,
    pub(crate) handler_owners: HashSet<ComponentId>,
}

/// Per-render context handed to [`Component::render`](crate::Component::render)
///
/// Bound to one component identity for one render. Hooks called through it
/// are indexed by call order.
pub struct Context<'a> {
    id: ComponentId,
    hook_index: usize,
    app: &'a AppHandle,
    pass: &'a mut BuildPass,
}

impl<'a> Context<'a> {
    pub(crate) fn new(id: ComponentId, app: &'a AppHandle, pass: &'a mut BuildPass) -> Self {
        Self {
            id,
            hook_index: 0,
            app,
            pass,
        }
    }

    /// Identity of the component being rendered.
    pub fn id(&self) -> &ComponentId {
        &self.id
    }

    /// Number of `use_state` calls made so far in this render.
    pub fn hooks_called(&self) -> usize {
        self.hook_index
    }

    /// Local state that survives re-renders of this position.
    ///
    /// `init` runs only the first time this slot is reached.
    ///
    /// # Panics
    ///
    /// Panics if the slot was created with a different type, i.e. hooks
    /// were called in a different order than on the previous render.
    pub fn use_state<T>(&mut self, init: impl FnOnce() -> T) -> (T, Setter<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        let key = StateKey::new(self.id.clone(), self.hook_index);
        self.hook_index += 1;
        let value = self.app.state.get_or_init(&key, init);
        let setter = Setter::new(key, self.app.state.clone(), self.app.renderer.clone());
        (value, setter)
    }

    fn subscribe<T>(&self, atom: &Atom<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        let renderer = self.app.renderer.clone();
        atom.subscribe(self.id.as_str(), move |_| renderer.request());
    }

    /// Read a shared atom and get a setter; re-renders when it changes.
    pub fn use_atom<T>(&mut self, atom: &Arc<Atom<T>>) -> (T, AtomSetter<T>)
    where
        T: Clone + Send + Sync + 'static,
    {
        self.subscribe(atom);
        (atom.read(), AtomSetter::new(atom.clone()))
    }

    /// Read a shared atom; re-renders when it changes.
    pub fn use_atom_value<T>(&mut self, atom: &Arc<Atom<T>>) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        self.subscribe(atom);
        atom.read()
    }

    /// Setter for a shared atom; re-renders when it changes.
    pub fn use_atom_setter<T>(&mut self, atom: &Arc<Atom<T>>) -> AtomSetter<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        self.subscribe(atom);
        AtomSetter::new(atom.clone())
    }

    /// Register `id` as a focusable element owned by this component.
    pub fn use_focus(&mut self, id: impl Into<FocusableId>) -> Focus {
        let focusable = id.into();
        let registry = self.app.focus.clone();
        registry.register(focusable.clone(), self.id.clone());
        let focused = registry.is_focused(&self.id);
        Focus::new(self.id.clone(), focusable, focused, registry)
    }

    /// Handle events that reach this component.
    ///
    /// Return `true` to stop bubbling. Only the last registration made in a
    /// render is kept.
    pub fn use_event(&mut self, handler: impl Fn(&EventKind) -> bool + Send + Sync + 'static) {
        self.app.handlers.register(self.id.clone(), Arc::new(handler));
        self.pass.handler_owners.insert(self.id.clone());
    }

    /// A handle for use inside event handlers.
    pub fn handle(&self) -> AppHandle {
        self.app.clone()
    }

    /// Ask for another frame.
    pub fn request_render(&self) {
        self.app.request_render();
    }

    /// Raise the quit signal.
    pub fn quit(&self) {
        self.app.quit();
    }
}
