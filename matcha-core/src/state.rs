//! Per-component hook state
//!
//! Slots are keyed by `(component identity, hook index)`. The store is shared
//! by every render pass and every setter. Values are only touched under its
//! lock; `init` functions run outside it and update functions inside it.

use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use tracing::{debug, trace};

use crate::error::lock;
use crate::node::ComponentId;
use crate::scheduler::RenderTrigger;

/// Address of one hook slot
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub component: ComponentId,
    pub hook: usize,
}

impl StateKey {
    pub fn new(component: ComponentId, hook: usize) -> Self {
        Self { component, hook }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.component, self.hook)
    }
}

struct Slot {
    value: Box<dyn Any + Send + Sync>,
    type_name: &'static str,
}

#[derive(Default)]
struct StoreInner {
    slots: HashMap<StateKey, Slot>,
    hook_counts: HashMap<ComponentId, usize>,
    kinds: HashMap<ComponentId, &'static str>,
}

/// Storage for every hook slot in the application
#[derive(Default)]
pub struct StateStore {
    inner: Mutex<StoreInner>,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("StateStore")
            .field("slots", &inner.slots.len())
            .field("components", &inner.hook_counts.len())
            .finish()
    }
}

impl StateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a slot, creating it from `init` on first access.
    ///
    /// # Panics
    ///
    /// Panics if the slot already holds a value of another type, which means
    /// the component called its hooks in a different order than last time.
    pub fn get_or_init<T>(&self, key: &StateKey, init: impl FnOnce() -> T) -> T
    where
        T: Clone + Send + Sync + 'static,
    {
        if let Some(value) = self.read::<T>(key) {
            return value;
        }

        // init runs unlocked; a concurrent initializer wins if it got there first
        let initial = init();
        let mut inner = lock(&self.inner);
        let slot = inner.slots.entry(key.clone()).or_insert_with(|| {
            trace!(key = %key, "hook slot created");
            Slot {
                value: Box::new(initial),
                type_name: type_name::<T>(),
            }
        });
        match slot.value.downcast_ref::<T>() {
            Some(value) => value.clone(),
            None => {
                let stored = slot.type_name;
                drop(inner);
                type_mismatch::<T>(key, stored)
            }
        }
    }

    /// Clone the current value of a slot, if it exists.
    ///
    /// # Panics
    ///
    /// Panics on a type mismatch, like [`get_or_init`](Self::get_or_init).
    pub fn read<T>(&self, key: &StateKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let inner = lock(&self.inner);
        let slot = inner.slots.get(key)?;
        match slot.value.downcast_ref::<T>() {
            Some(value) => Some(value.clone()),
            None => {
                let stored = slot.type_name;
                drop(inner);
                type_mismatch::<T>(key, stored)
            }
        }
    }

    /// Replace a slot's value with `f(previous)`.
    ///
    /// `f` runs under the store lock, so concurrent updates of one slot
    /// apply in sequence and none is lost. It must not call back into this
    /// store. Returns `false` if the slot no longer exists (its component was
    /// not rendered in the last pass) or holds a different type.
    pub fn update<T>(&self, key: &StateKey, f: impl FnOnce(&T) -> T) -> bool
    where
        T: Clone + Send + Sync + 'static,
    {
        let mut inner = lock(&self.inner);
        match inner
            .slots
            .get_mut(key)
            .and_then(|slot| slot.value.downcast_mut::<T>())
        {
            Some(value) => {
                *value = f(value);
                true
            }
            None => false,
        }
    }

    /// Record how many hooks a component called during this render.
    ///
    /// Returns the previous count when it differs.
    pub fn record_hooks(&self, component: &ComponentId, count: usize) -> Result<(), usize> {
        let mut inner = lock(&self.inner);
        match inner.hook_counts.insert(component.clone(), count) {
            Some(previous) if previous != count => Err(previous),
            _ => Ok(()),
        }
    }

    /// Record what kind of element occupies `component` in this build.
    ///
    /// When a different kind occupied it before, the slots and hook count
    /// left by the old occupant are dropped and `true` is returned, so a
    /// component swapped in at the same position starts from fresh state.
    pub fn claim(&self, component: &ComponentId, kind: &'static str) -> bool {
        let mut inner = lock(&self.inner);
        match inner.kinds.insert(component.clone(), kind) {
            Some(previous) if previous != kind => {
                inner.slots.retain(|key, _| key.component != *component);
                inner.hook_counts.remove(component);
                debug!(component = %component, from = previous, to = kind, "occupant replaced");
                true
            }
            _ => false,
        }
    }

    /// Drop every slot whose component was not observed in the last build.
    ///
    /// Returns the number of slots removed.
    pub fn sweep(&self, observed: &HashSet<ComponentId>) -> usize {
        let mut inner = lock(&self.inner);
        let before = inner.slots.len();
        inner.slots.retain(|key, _| observed.contains(&key.component));
        inner.hook_counts.retain(|id, _| observed.contains(id));
        inner.kinds.retain(|id, _| observed.contains(id));
        let removed = before - inner.slots.len();
        if removed > 0 {
            debug!(removed, remaining = inner.slots.len(), "reaped hook slots");
        }
        removed
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        lock(&self.inner).slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn type_mismatch<T>(key: &StateKey, stored: &'static str) -> ! {
    panic!(
        "hook order changed at {key}: slot holds `{stored}` but `{}` was requested; \
         hooks must be called in the same order on every render",
        type_name::<T>()
    )
}

/// Writes one hook slot and schedules a re-render
pub struct Setter<T> {
    key: StateKey,
    store: Arc<StateStore>,
    renderer: RenderTrigger,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            store: self.store.clone(),
            renderer: self.renderer.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Setter").field("key", &self.key).finish()
    }
}

impl<T> Setter<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(key: StateKey, store: Arc<StateStore>, renderer: RenderTrigger) -> Self {
        Self {
            key,
            store,
            renderer,
            _marker: PhantomData,
        }
    }

    /// The slot this setter writes.
    pub fn key(&self) -> &StateKey {
        &self.key
    }

    /// Store `f(previous)` and request a render.
    ///
    /// Concurrent updates of one slot never lose a write. `f` must not use
    /// another [`Setter`] of the same application.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        if self.store.update(&self.key, f) {
            self.renderer.request();
        } else {
            debug!(key = %self.key, "setter called for a reaped slot; ignoring");
        }
    }

    /// Store `value` and request a render.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }
}
