use std::{
    cell::RefCell,
    collections::BTreeMap,
    rc::{Rc, Weak},
};

use derive_ex::derive_ex;
use serde::{Deserialize, Serialize};
use slabmap::SlabMap;

use crate::Subscription;


/// Callback invoked with the key of every entry that changes in a [`PreferenceStore`].
pub type StoreListener = Rc<dyn Fn(&str)>;

/// Key-value store of boolean preferences with change notification.
///
/// Notifications are delivered synchronously on the calling thread,
/// after the new value is visible through [`get_bool`](Self::get_bool).
pub trait PreferenceStore {
    /// Returns the stored value for `key`, or `default` if there is none.
    fn get_bool(&self, key: &str, default: bool) -> bool;

    /// Stores `value` under `key` and notifies every subscriber.
    fn put_bool(&self, key: &str, value: bool);

    fn contains(&self, key: &str) -> bool;

    /// Registers a listener called with the changed key for every change in the store.
    ///
    /// The listener stays registered until the returned [`Subscription`] is dropped.
    fn subscribe(&self, listener: StoreListener) -> Subscription;
}

/// In-process [`PreferenceStore`].
///
/// Cloning yields another handle to the same store.
#[derive(Default)]
#[derive_ex(Clone)]
pub struct MemoryStore(Rc<StoreNode>);

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries<K: Into<String>>(entries: impl IntoIterator<Item = (K, bool)>) -> Self {
        let this = Self::new();
        this.0
            .values
            .borrow_mut()
            .extend(entries.into_iter().map(|(k, v)| (k.into(), v)));
        this
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        Self::with_entries(snapshot.entries)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            entries: self.0.values.borrow().clone(),
        }
    }

    /// Returns all entries sorted by key.
    pub fn entries(&self) -> Vec<(String, bool)> {
        self.0
            .values
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect()
    }

    /// Removes the entry for `key`, notifying subscribers if it existed.
    pub fn remove(&self, key: &str) -> Option<bool> {
        let old = self.0.values.borrow_mut().remove(key);
        if old.is_some() {
            self.0.notify(key);
        }
        old
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.0.listeners.borrow().len()
    }
}

impl PreferenceStore for MemoryStore {
    fn get_bool(&self, key: &str, default: bool) -> bool {
        self.0.values.borrow().get(key).copied().unwrap_or(default)
    }

    fn put_bool(&self, key: &str, value: bool) {
        self.0.values.borrow_mut().insert(key.to_owned(), value);
        self.0.notify(key);
    }

    fn contains(&self, key: &str) -> bool {
        self.0.values.borrow().contains_key(key)
    }

    fn subscribe(&self, listener: StoreListener) -> Subscription {
        let id = self.0.listeners.borrow_mut().insert(listener);
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |node: Rc<StoreNode>| {
            node.listeners.borrow_mut().remove(id);
        })
    }
}
impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.values.try_borrow() {
            Ok(values) => f.debug_map().entries(values.iter()).finish(),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}

#[derive(Default)]
struct StoreNode {
    values: RefCell<BTreeMap<String, bool>>,
    listeners: RefCell<SlabMap<StoreListener>>,
}
impl StoreNode {
    fn notify(&self, key: &str) {
        // Listeners may write, subscribe or unsubscribe while being notified.
        let listeners: Vec<StoreListener> = self.listeners.borrow().values().cloned().collect();
        tracing::trace!(key, listeners = listeners.len(), "preference changed");
        for listener in listeners {
            listener(key);
        }
    }
}

/// Serializable contents of a [`MemoryStore`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoreSnapshot {
    pub entries: BTreeMap<String, bool>,
}

/// Wraps `f` into a listener that holds `owner` weakly.
pub(crate) fn weak_listener<T: 'static>(
    owner: &Rc<T>,
    f: impl Fn(&T, &str) + 'static,
) -> StoreListener {
    let owner: Weak<T> = Rc::downgrade(owner);
    Rc::new(move |key: &str| {
        if let Some(owner) = owner.upgrade() {
            f(&owner, key)
        }
    })
}
