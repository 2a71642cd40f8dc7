//! Identity to external-handle cache with invalidation callbacks.
//!
//! Consumers with their own object model (garbage collected or reference
//! counted) keep one wrapper per internal object. The cache maps the internal
//! object's identity to the consumer's handle and keeps the mapping honest
//! when the wrapped library deletes an object or replaces all uses of one
//! object with another.
//!
//! ```text
//!            insert                 notify_replaced(old, new)
//! absent ─────────────▶ present ───────────────────────────▶ present (re-keyed)
//!   ▲                     │
//!   └─────────────────────┘
//!     remove / notify_deleted
//! ```
//!
//! Callbacks run with the cache in a dispatching state. Host notifications
//! raised while a callback runs are queued and applied in order once it
//! returns; caller operations fail with [`CacheError::CallbackInProgress`].
//! Read-only diagnostics ([`ValueCache::len`], [`ValueCache::dump`]) stay
//! available.
//!
//! ```
//! use nativebridge_core::ValueCache;
//!
//! let cache = ValueCache::<u32>::new();
//! cache.insert(1, 100).unwrap();
//! cache.notify_replaced(1, 2);
//! assert_eq!(cache.lookup(1), Ok(None));
//! assert_eq!(cache.lookup(2), Ok(Some(100)));
//! ```

use rustc_hash::FxHashMap;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::collections::hash_map::Entry;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

/// Consumer-side token stored for a cached value (`intptr_t` at the boundary).
pub type ExternalHandle = isize;

/// Called with `(key, handle)` before the mapping for `key` is dropped.
pub type DeletedCallback<K> = Box<dyn FnMut(K, ExternalHandle)>;

/// Called with `(old, handle, new)`; the returned handle is stored for `new`.
pub type ReplacedCallback<K> = Box<dyn FnMut(K, ExternalHandle, K) -> ExternalHandle>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    #[error("value is already cached with handle {existing}")]
    AlreadyMapped { existing: ExternalHandle },

    #[error("value cache cannot be used while one of its callbacks is running")]
    CallbackInProgress,
}

#[derive(Debug, Clone, Copy)]
enum CacheEvent<K> {
    Deleted(K),
    Replaced { old: K, new: K },
}

/// Single-threaded map from value identity to [`ExternalHandle`].
///
/// Keys are identities only. A key delivered to a callback may name an
/// object that the host has already released and must not be dereferenced.
///
/// Dropping the cache runs no callbacks.
pub struct ValueCache<K> {
    entries: RefCell<FxHashMap<K, ExternalHandle>>,
    pending: RefCell<VecDeque<CacheEvent<K>>>,
    dispatching: Cell<bool>,
    on_deleted: RefCell<Option<DeletedCallback<K>>>,
    on_replaced: RefCell<Option<ReplacedCallback<K>>>,
}

impl<K> ValueCache<K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    pub fn new() -> Self {
        Self {
            entries: RefCell::new(FxHashMap::default()),
            pending: RefCell::new(VecDeque::new()),
            dispatching: Cell::new(false),
            on_deleted: RefCell::new(None),
            on_replaced: RefCell::new(None),
        }
    }

    pub fn with_deleted_callback(self, callback: impl FnMut(K, ExternalHandle) + 'static) -> Self {
        *self.on_deleted.borrow_mut() = Some(Box::new(callback));
        self
    }

    /// Without a replacement callback the existing handle moves to the new key.
    pub fn with_replaced_callback(
        self,
        callback: impl FnMut(K, ExternalHandle, K) -> ExternalHandle + 'static,
    ) -> Self {
        *self.on_replaced.borrow_mut() = Some(Box::new(callback));
        self
    }

    pub fn lookup(&self, key: K) -> Result<Option<ExternalHandle>, CacheError> {
        self.ensure_idle()?;
        Ok(self.entries.borrow().get(&key).copied())
    }

    /// Adds a mapping. An existing mapping is left untouched and reported.
    pub fn insert(&self, key: K, handle: ExternalHandle) -> Result<(), CacheError> {
        self.ensure_idle()?;
        match self.entries.borrow_mut().entry(key) {
            Entry::Occupied(entry) => Err(CacheError::AlreadyMapped {
                existing: *entry.get(),
            }),
            Entry::Vacant(entry) => {
                tracing::trace!(target: "nativebridge::cache", ?key, handle, "insert");
                entry.insert(handle);
                Ok(())
            }
        }
    }

    /// Returns the cached handle, creating one with `create` on a miss.
    ///
    /// `create` runs with no borrow held, so it may use the cache.
    pub fn get_or_insert_with(
        &self,
        key: K,
        create: impl FnOnce() -> ExternalHandle,
    ) -> Result<ExternalHandle, CacheError> {
        if let Some(handle) = self.lookup(key)? {
            return Ok(handle);
        }
        let handle = create();
        match self.insert(key, handle) {
            Ok(()) => Ok(handle),
            Err(CacheError::AlreadyMapped { existing }) => Ok(existing),
            Err(err) => Err(err),
        }
    }

    /// Drops a mapping without running callbacks.
    pub fn remove(&self, key: K) -> Result<Option<ExternalHandle>, CacheError> {
        self.ensure_idle()?;
        Ok(self.entries.borrow_mut().remove(&key))
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    pub fn is_dispatching(&self) -> bool {
        self.dispatching.get()
    }

    /// Host notification: `key` is about to be destroyed.
    pub fn notify_deleted(&self, key: K) {
        self.enqueue(CacheEvent::Deleted(key));
    }

    /// Host notification: every use of `old` now refers to `new`.
    pub fn notify_replaced(&self, old: K, new: K) {
        self.enqueue(CacheEvent::Replaced { old, new });
    }

    pub fn dump(&self) -> String {
        self.to_string()
    }

    pub fn write_debug_representation(&self, out: &mut impl fmt::Write) -> fmt::Result {
        write!(out, "{self}")
    }

    fn ensure_idle(&self) -> Result<(), CacheError> {
        if self.dispatching.get() {
            Err(CacheError::CallbackInProgress)
        } else {
            Ok(())
        }
    }

    fn enqueue(&self, event: CacheEvent<K>) {
        self.pending.borrow_mut().push_back(event);
        if self.dispatching.get() {
            tracing::trace!(target: "nativebridge::cache", ?event, "deferred");
            return;
        }
        self.drain();
    }

    fn drain(&self) {
        let _guard = DispatchGuard::enter(&self.dispatching);
        loop {
            let Some(event) = self.pending.borrow_mut().pop_front() else {
                break;
            };
            match event {
                CacheEvent::Deleted(key) => self.apply_deleted(key),
                CacheEvent::Replaced { old, new } => self.apply_replaced(old, new),
            }
        }
    }

    fn apply_deleted(&self, key: K) {
        let Some(handle) = self.entries.borrow().get(&key).copied() else {
            return;
        };
        tracing::trace!(target: "nativebridge::cache", ?key, handle, "deleted");
        self.invoke_deleted(key, handle);
        self.entries.borrow_mut().remove(&key);
    }

    fn apply_replaced(&self, old: K, new: K) {
        if old == new {
            return;
        }
        let Some(handle) = self.entries.borrow().get(&old).copied() else {
            return;
        };
        let replacement = match self.on_replaced.borrow_mut().as_mut() {
            Some(callback) => callback(old, handle, new),
            None => handle,
        };
        tracing::trace!(target: "nativebridge::cache", ?old, ?new, handle, replacement, "replaced");

        let orphaned = {
            let mut entries = self.entries.borrow_mut();
            entries.remove(&old);
            match entries.entry(new) {
                Entry::Vacant(entry) => {
                    entry.insert(replacement);
                    None
                }
                Entry::Occupied(entry) => (*entry.get() != replacement).then_some(replacement),
            }
        };
        // `new` was already cached; its mapping wins and the consumer is told
        // the replacement handle is no longer referenced.
        if let Some(handle) = orphaned {
            self.invoke_deleted(old, handle);
        }
    }

    fn invoke_deleted(&self, key: K, handle: ExternalHandle) {
        if let Some(callback) = self.on_deleted.borrow_mut().as_mut() {
            callback(key, handle);
        }
    }
}

impl<K> Default for ValueCache<K>
where
    K: Copy + Eq + Hash + fmt::Debug,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Display for ValueCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.borrow();
        writeln!(f, "ValueCache ({} entries)", entries.len())?;
        for (key, handle) in entries.iter() {
            writeln!(f, "  {key:?} => {handle:#x}")?;
        }
        Ok(())
    }
}

impl<K: fmt::Debug> fmt::Debug for ValueCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCache")
            .field("entries", &self.entries.borrow())
            .field("pending", &self.pending.borrow().len())
            .field("dispatching", &self.dispatching.get())
            .finish_non_exhaustive()
    }
}

struct DispatchGuard<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        Self { flag }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
