//! Global focus registry
//!
//! Components register focusable identifiers while rendering. At most one
//! component identity is focused at a time, and only a registered focusable
//! identifier can move focus to its owner.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::error::lock;
use crate::node::ComponentId;
use crate::scheduler::RenderTrigger;

/// Caller-chosen identifier of one focusable element inside a component
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FocusableId(Arc<str>);

impl FocusableId {
    pub fn new(id: impl Into<Arc<str>>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FocusableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FocusableId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FocusableId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

#[derive(Debug, Default)]
struct FocusState {
    focused: Option<ComponentId>,
    registered: HashMap<FocusableId, ComponentId>,
    inverse: HashMap<ComponentId, FocusableId>,
}

/// Tracks focusable registrations and the single focused owner
pub struct FocusRegistry {
    state: Mutex<FocusState>,
    renderer: RenderTrigger,
}

impl fmt::Debug for FocusRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusRegistry")
            .field("state", &*lock(&self.state))
            .finish()
    }
}

impl FocusRegistry {
    pub fn new(renderer: RenderTrigger) -> Self {
        Self {
            state: Mutex::new(FocusState::default()),
            renderer,
        }
    }

    /// Link `focusable` to `owner`, replacing any previous owner.
    pub fn register(&self, focusable: FocusableId, owner: ComponentId) {
        let mut state = lock(&self.state);
        trace!(focusable = %focusable, owner = %owner, "focusable registered");
        state.inverse.insert(owner.clone(), focusable.clone());
        state.registered.insert(focusable, owner);
    }

    /// Remove a registration. Returns whether it existed.
    pub fn unregister(&self, focusable: &FocusableId) -> bool {
        let mut state = lock(&self.state);
        let Some(owner) = state.registered.remove(focusable) else {
            return false;
        };
        if state.inverse.get(&owner) == Some(focusable) {
            state.inverse.remove(&owner);
        }
        true
    }

    /// Move focus to the owner of `focusable`.
    ///
    /// Returns `false` without side effects if the identifier is not
    /// registered or its owner already has focus. On success a render is
    /// requested.
    pub fn set_focus(&self, focusable: &FocusableId) -> bool {
        let changed = {
            let mut state = lock(&self.state);
            match state.registered.get(focusable).cloned() {
                Some(owner) if state.focused.as_ref() != Some(&owner) => {
                    debug!(focusable = %focusable, owner = %owner, "focus moved");
                    state.focused = Some(owner);
                    true
                }
                Some(_) => false,
                None => {
                    trace!(focusable = %focusable, "focus target not registered");
                    false
                }
            }
        };
        if changed {
            self.renderer.request();
        }
        changed
    }

    /// Clear focus. Requests a render if something was focused.
    pub fn blur(&self) -> bool {
        let had_focus = lock(&self.state).focused.take().is_some();
        if had_focus {
            debug!("focus cleared");
            self.renderer.request();
        }
        had_focus
    }

    /// Whether `owner` currently holds focus.
    pub fn is_focused(&self, owner: &ComponentId) -> bool {
        lock(&self.state).focused.as_ref() == Some(owner)
    }

    /// The focused component identity, if any.
    pub fn focused(&self) -> Option<ComponentId> {
        lock(&self.state).focused.clone()
    }

    /// Owner of a focusable identifier.
    pub fn owner_of(&self, focusable: &FocusableId) -> Option<ComponentId> {
        lock(&self.state).registered.get(focusable).cloned()
    }

    /// Drop every registration that does not belong to the focused owner.
    pub fn clean(&self) {
        let mut state = lock(&self.state);
        let FocusState {
            focused,
            registered,
            inverse,
        } = &mut *state;
        registered.retain(|_, owner| Some(&*owner) == focused.as_ref());
        inverse.retain(|owner, _| Some(owner) == focused.as_ref());
    }

    /// Drop registrations whose owner was not rendered in the last build.
    ///
    /// Focus held by an owner that is gone is released without a render
    /// request; the caller is finishing a render pass already.
    pub fn sweep(&self, observed: &HashSet<ComponentId>) -> usize {
        let mut state = lock(&self.state);
        let before = state.registered.len();
        state.registered.retain(|_, owner| observed.contains(owner));
        state.inverse.retain(|owner, _| observed.contains(owner));
        if state
            .focused
            .as_ref()
            .is_some_and(|owner| !observed.contains(owner))
        {
            debug!("focused component left the tree; focus released");
            state.focused = None;
        }
        before - state.registered.len()
    }

    /// Drop every registration owned by `owner` and release focus it holds.
    ///
    /// Used when another component takes over the owner's position, so no
    /// render is requested. Returns the number of registrations removed.
    pub fn release_owner(&self, owner: &ComponentId) -> usize {
        let mut state = lock(&self.state);
        let before = state.registered.len();
        state.registered.retain(|_, registered| registered != owner);
        state.inverse.remove(owner);
        if state.focused.as_ref() == Some(owner) {
            debug!(owner = %owner, "focus released by replaced component");
            state.focused = None;
        }
        before - state.registered.len()
    }

    /// Number of registered focusable identifiers.
    pub fn len(&self) -> usize {
        lock(&self.state).registered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Focus helpers returned by `use_focus`
#[derive(Clone)]
pub struct Focus {
    owner: ComponentId,
    focusable: FocusableId,
    focused: bool,
    registry: Arc<FocusRegistry>,
}

impl fmt::Debug for Focus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Focus")
            .field("owner", &self.owner)
            .field("focusable", &self.focusable)
            .field("focused", &self.focused)
            .finish()
    }
}

impl Focus {
    pub(crate) fn new(
        owner: ComponentId,
        focusable: FocusableId,
        focused: bool,
        registry: Arc<FocusRegistry>,
    ) -> Self {
        Self {
            owner,
            focusable,
            focused,
            registry,
        }
    }

    /// Whether the component was focused when it rendered.
    pub fn is_focused(&self) -> bool {
        self.focused
    }

    /// Move focus to the owner of another focusable identifier.
    pub fn set_focus(&self, focusable: impl Into<FocusableId>) -> bool {
        self.registry.set_focus(&focusable.into())
    }

    /// Focus the component that created this handle.
    pub fn focus_self(&self) -> bool {
        self.registry.set_focus(&self.focusable)
    }

    /// Clear focus globally.
    pub fn blur(&self) -> bool {
        self.registry.blur()
    }

    /// The focusable identifier this handle registered.
    pub fn id(&self) -> &FocusableId {
        &self.focusable
    }

    pub fn owner(&self) -> &ComponentId {
        &self.owner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (FocusRegistry, crate::scheduler::RenderRequests) {
        let (trigger, requests) = RenderTrigger::channel(16);
        (FocusRegistry::new(trigger), requests)
    }

    fn owner(path: &str) -> ComponentId {
        ComponentId::from(path)
    }

    #[test]
    fn test_set_focus_requires_registration() {
        let (focus, mut requests) = registry();
        assert!(!focus.set_focus(&"input".into()));
        assert_eq!(focus.focused(), None);
        assert_eq!(requests.drain(), 0);
    }

    #[test]
    fn test_focus_is_exclusive() {
        let (focus, mut requests) = registry();
        focus.register("id1".into(), owner("root/0"));
        focus.register("id2".into(), owner("root/1"));

        assert!(focus.set_focus(&"id1".into()));
        assert!(focus.set_focus(&"id2".into()));

        assert!(focus.is_focused(&owner("root/1")));
        assert!(!focus.is_focused(&owner("root/0")));
        assert_eq!(requests.drain(), 2);
    }

    #[test]
    fn test_set_focus_same_owner_is_noop() {
        let (focus, mut requests) = registry();
        focus.register("a".into(), owner("root/0"));
        focus.register("b".into(), owner("root/0"));
        assert!(focus.set_focus(&"a".into()));
        assert!(!focus.set_focus(&"b".into()));
        assert_eq!(requests.drain(), 1);
    }

    #[test]
    fn test_blur() {
        let (focus, mut requests) = registry();
        assert!(!focus.blur());
        focus.register("a".into(), owner("root/0"));
        focus.set_focus(&"a".into());
        requests.drain();

        assert!(focus.blur());
        assert_eq!(focus.focused(), None);
        assert_eq!(requests.drain(), 1);
    }

    #[test]
    fn test_register_overwrites_owner() {
        let (focus, _requests) = registry();
        focus.register("a".into(), owner("root/0"));
        focus.register("a".into(), owner("root/1"));
        assert_eq!(focus.owner_of(&"a".into()), Some(owner("root/1")));
        assert_eq!(focus.len(), 1);
    }

    #[test]
    fn test_unregister() {
        let (focus, _requests) = registry();
        focus.register("a".into(), owner("root/0"));
        assert!(focus.unregister(&"a".into()));
        assert!(!focus.unregister(&"a".into()));
        assert!(!focus.set_focus(&"a".into()));
    }

    #[test]
    fn test_clean_keeps_focused_owner() {
        let (focus, _requests) = registry();
        focus.register("a".into(), owner("root/0"));
        focus.register("b".into(), owner("root/1"));
        focus.set_focus(&"b".into());

        focus.clean();
        assert_eq!(focus.len(), 1);
        assert_eq!(focus.owner_of(&"b".into()), Some(owner("root/1")));
    }

    #[test]
    fn test_sweep_releases_missing_owner() {
        let (focus, _requests) = registry();
        focus.register("a".into(), owner("root/0"));
        focus.register("b".into(), owner("root/1"));
        focus.set_focus(&"a".into());

        let observed: HashSet<_> = [owner("root"), owner("root/1")].into_iter().collect();
        assert_eq!(focus.sweep(&observed), 1);
        assert_eq!(focus.focused(), None);
        assert!(focus.owner_of(&"b".into()).is_some());
    }

    #[test]
    fn test_focus_handle() {
        let (trigger, _requests) = RenderTrigger::channel(16);
        let registry = Arc::new(FocusRegistry::new(trigger));
        registry.register("a".into(), owner("root/0"));
        registry.register("b".into(), owner("root/1"));

        let handle = Focus::new(owner("root/0"), "a".into(), false, registry.clone());
        assert!(handle.focus_self());
        assert!(registry.is_focused(&owner("root/0")));
        assert!(handle.set_focus("b"));
        assert!(registry.is_focused(&owner("root/1")));
        assert!(handle.blur());
    }
}
