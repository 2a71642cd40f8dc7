//! JIT session bookkeeping: dylibs and the shared symbol string pool.

use crate::arena::Arena;
use crate::error::{HostError, HostResult};
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::fmt;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Interned symbol name with an atomic reference count.
#[derive(Debug)]
pub struct PoolEntry {
    name: Box<str>,
    ref_count: AtomicUsize,
}

impl PoolEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the count. Other threads may change it at any time.
    pub fn ref_count(&self) -> usize {
        self.ref_count.load(Ordering::Relaxed)
    }
}

/// Interning table shared by a session and every dylib in it.
///
/// Entries whose count drops to zero stay in the table until
/// [`SymbolStringPool::clear_dead_entries`].
#[derive(Debug, Default)]
pub struct SymbolStringPool {
    entries: Mutex<FxHashMap<Box<str>, Box<PoolEntry>>>,
}

impl SymbolStringPool {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<Box<str>, Box<PoolEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn intern(self: &Arc<Self>, name: &str) -> SymbolStringPtr {
        let mut entries = self.lock();
        let entry = entries.entry(name.into()).or_insert_with(|| {
            Box::new(PoolEntry {
                name: name.into(),
                ref_count: AtomicUsize::new(0),
            })
        });
        entry.ref_count.fetch_add(1, Ordering::Relaxed);
        SymbolStringPtr {
            pool: Arc::clone(self),
            entry: NonNull::from(&**entry),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Drops entries nobody references.
    pub fn clear_dead_entries(&self) {
        self.lock().retain(|_, entry| entry.ref_count() > 0);
    }
}

impl fmt::Display for SymbolStringPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.lock();
        let mut sorted: Vec<&PoolEntry> = entries.values().map(|e| &**e).collect();
        sorted.sort_unstable_by(|a, b| a.name.cmp(&b.name));
        for entry in sorted {
            writeln!(f, "{}: {}", entry.name, entry.ref_count())?;
        }
        Ok(())
    }
}

/// Counted reference to a pool entry.
pub struct SymbolStringPtr {
    pool: Arc<SymbolStringPool>,
    entry: NonNull<PoolEntry>,
}

impl SymbolStringPtr {
    fn entry_ref(&self) -> &PoolEntry {
        // SAFETY: a referenced entry has a non-zero count and is never
        // removed from its pool, which this pointer keeps alive.
        unsafe { self.entry.as_ref() }
    }

    pub fn as_str(&self) -> &str {
        self.entry_ref().name()
    }

    pub fn entry(&self) -> NonNull<PoolEntry> {
        self.entry
    }
}

impl Clone for SymbolStringPtr {
    fn clone(&self) -> Self {
        self.entry_ref().ref_count.fetch_add(1, Ordering::Relaxed);
        Self {
            pool: Arc::clone(&self.pool),
            entry: self.entry,
        }
    }
}

impl Drop for SymbolStringPtr {
    fn drop(&mut self) {
        self.entry_ref().ref_count.fetch_sub(1, Ordering::Release);
    }
}

impl fmt::Debug for SymbolStringPtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SymbolStringPtr").field(&self.as_str()).finish()
    }
}

#[derive(Debug)]
pub struct JitDylib {
    name: String,
    pool: Arc<SymbolStringPool>,
    symbols: RefCell<Vec<SymbolStringPtr>>,
}

impl JitDylib {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn define(&self, symbol: &str) -> SymbolStringPtr {
        let interned = self.pool.intern(symbol);
        self.symbols.borrow_mut().push(interned.clone());
        interned
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.borrow().len()
    }
}

pub struct ExecutionSession {
    pool: Arc<SymbolStringPool>,
    dylibs: Arena<JitDylib>,
}

impl ExecutionSession {
    pub fn new() -> Self {
        Self {
            pool: SymbolStringPool::new(),
            dylibs: Arena::new(),
        }
    }

    pub fn symbol_string_pool(&self) -> &Arc<SymbolStringPool> {
        &self.pool
    }

    pub fn create_dylib(&self, name: &str) -> HostResult<NonNull<JitDylib>> {
        if self.dylib(name).is_some() {
            return Err(HostError::DuplicateDylib(name.to_owned()));
        }
        Ok(self.dylibs.alloc(JitDylib {
            name: name.to_owned(),
            pool: Arc::clone(&self.pool),
            symbols: RefCell::new(Vec::new()),
        }))
    }

    pub fn dylib(&self, name: &str) -> Option<NonNull<JitDylib>> {
        self.dylibs.find(|lib| lib.name == name)
    }

    pub fn dylib_count(&self) -> usize {
        self.dylibs.len()
    }

    /// Releases a dylib and its symbol references.
    pub fn remove_dylib(&self, dylib: NonNull<JitDylib>) -> HostResult<()> {
        match self.dylibs.remove(dylib) {
            Some(removed) => {
                tracing::debug!(target: "nativebridge::host", name = %removed.name, "removed dylib");
                Ok(())
            }
            None => Err(HostError::UnknownDylib(format!("{dylib:p}"))),
        }
    }
}

impl Default for ExecutionSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_counts_references() {
        let pool = SymbolStringPool::new();
        assert!(pool.is_empty());
        let a = pool.intern("main");
        let b = pool.intern("main");
        assert_eq!(a.entry(), b.entry());
        assert_eq!(unsafe { a.entry().as_ref() }.ref_count(), 2);
        drop(b);
        assert_eq!(unsafe { a.entry().as_ref() }.ref_count(), 1);
        let c = a.clone();
        assert_eq!(c.as_str(), "main");
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn dead_entries_linger_until_cleared() {
        let pool = SymbolStringPool::new();
        drop(pool.intern("gone"));
        assert!(!pool.is_empty());
        pool.clear_dead_entries();
        assert!(pool.is_empty());
    }

    #[test]
    fn display_is_sorted() {
        let pool = SymbolStringPool::new();
        let _b = pool.intern("b");
        let _a1 = pool.intern("a");
        let _a2 = pool.intern("a");
        assert_eq!(pool.to_string(), "a: 2\nb: 1\n");
    }

    #[test]
    fn removing_dylibs() {
        let session = ExecutionSession::new();
        let lib = session.create_dylib("main").unwrap();
        assert_eq!(
            session.create_dylib("main"),
            Err(HostError::DuplicateDylib("main".into()))
        );
        unsafe { lib.as_ref() }.define("f");
        assert_eq!(session.symbol_string_pool().to_string(), "f: 1\n");

        session.remove_dylib(lib).unwrap();
        assert_eq!(session.dylib_count(), 0);
        assert_eq!(session.symbol_string_pool().to_string(), "f: 0\n");
        assert!(matches!(
            session.remove_dylib(lib),
            Err(HostError::UnknownDylib(_))
        ));
    }
}
