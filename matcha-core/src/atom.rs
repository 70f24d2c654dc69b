//! Shared, versioned, subscribable state cells
//!
//! An [`Atom`] is created once by the application and referenced by any
//! number of components. Components subscribe on every render through the
//! `use_atom*` hooks; the subscription identity embeds the atom version, so
//! re-subscribing is idempotent until the next update and an update sheds
//! every subscription it notified.

use std::collections::HashMap;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tracing::{error, trace};

use crate::error::{lock, panic_message};

/// Identity of one subscription: the consumer plus the atom version it saw
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    pub consumer: String,
    pub version: u64,
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.consumer, self.version)
    }
}

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct AtomInner<T> {
    value: T,
    version: u64,
    subscribers: HashMap<SubscriptionId, Callback<T>>,
}

/// A globally shared state cell
///
/// ```ignore
/// static THEME: LazyLock<Arc<Atom<Theme>>> = LazyLock::new(|| Atom::shared("theme", Theme::Dark));
/// ```
pub struct Atom<T> {
    name: String,
    inner: Mutex<AtomInner<T>>,
}

impl<T> fmt::Debug for Atom<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = lock(&self.inner);
        f.debug_struct("Atom")
            .field("name", &self.name)
            .field("version", &inner.version)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl<T> Atom<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(name: impl Into<String>, value: T) -> Self {
        Self {
            name: name.into(),
            inner: Mutex::new(AtomInner {
                value,
                version: 0,
                subscribers: HashMap::new(),
            }),
        }
    }

    /// Create an atom ready to be shared between components.
    pub fn shared(name: impl Into<String>, value: T) -> Arc<Self> {
        Arc::new(Self::new(name, value))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Clone the current value.
    pub fn read(&self) -> T {
        lock(&self.inner).value.clone()
    }

    /// Number of updates applied so far.
    pub fn version(&self) -> u64 {
        lock(&self.inner).version
    }

    /// Subscribe `consumer` at the current version.
    ///
    /// A no-op if the consumer already subscribed at this version.
    pub fn subscribe(
        &self,
        consumer: impl Into<String>,
        callback: impl Fn(&T) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut inner = lock(&self.inner);
        let id = SubscriptionId {
            consumer: consumer.into(),
            version: inner.version,
        };
        if !inner.subscribers.contains_key(&id) {
            trace!(atom = %self.name, subscription = %id, "subscribed");
            inner.subscribers.insert(id.clone(), Arc::new(callback));
        }
        id
    }

    /// Remove one subscription. Returns whether it existed.
    pub fn unsubscribe(&self, id: &SubscriptionId) -> bool {
        lock(&self.inner).subscribers.remove(id).is_some()
    }

    /// Live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner).subscribers.len()
    }

    /// Replace the value with `f(previous)` and notify subscribers.
    ///
    /// `f` runs while the atom is locked, so it must not touch this atom.
    /// Subscriber callbacks run after the lock is released; a panicking
    /// callback is logged and the rest still run. Every notified
    /// subscription is removed afterwards.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let (value, snapshot) = {
            let mut inner = lock(&self.inner);
            let next = f(&inner.value);
            inner.value = next.clone();
            inner.version += 1;
            let snapshot: Vec<(SubscriptionId, Callback<T>)> = inner
                .subscribers
                .iter()
                .map(|(id, cb)| (id.clone(), cb.clone()))
                .collect();
            (next, snapshot)
        };

        trace!(
            atom = %self.name,
            subscribers = snapshot.len(),
            "atom updated"
        );

        for (id, callback) in &snapshot {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| callback(&value))) {
                error!(
                    atom = %self.name,
                    subscription = %id,
                    panic = %panic_message(payload.as_ref()),
                    "atom subscriber panicked"
                );
            }
        }

        let mut inner = lock(&self.inner);
        for (id, _) in &snapshot {
            inner.subscribers.remove(id);
        }
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: T) {
        self.update(move |_| value);
    }
}

/// Write access to an atom, handed out by `use_atom` and `use_atom_setter`
pub struct AtomSetter<T> {
    atom: Arc<Atom<T>>,
}

impl<T> Clone for AtomSetter<T> {
    fn clone(&self) -> Self {
        Self {
            atom: self.atom.clone(),
        }
    }
}

impl<T> fmt::Debug for AtomSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AtomSetter").field(&self.atom.name).finish()
    }
}

impl<T> AtomSetter<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(atom: Arc<Atom<T>>) -> Self {
        Self { atom }
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.atom.update(f);
    }

    pub fn set(&self, value: T) {
        self.atom.set(value);
    }
}
