//! C surface of the value cache.
//!
//! A cache created for a context registers itself as a value listener, so
//! deletions and replace-all-uses-with on that context keep it current. The
//! consumer callbacks receive the `ctx` pointer given at creation and must
//! not call back into the cache.
//!
//! Handle 0 is reserved: it is what lookups report for an absent value and
//! it cannot be inserted.

use crate::types::{ContextRef, ValueCacheRef, ValueRef};
use nativebridge_core::debug_stream::DebugStream;
use nativebridge_core::error::error_ref;
use nativebridge_core::handle::to_c_bool;
use nativebridge_core::message::{self, write_out};
use nativebridge_core::value_cache::ExternalHandle;
use nativebridge_core::{BridgeError, BridgeResult, ErrorRef, ValueCache};
use nativebridge_host::{Value, ValueListener};
use std::ffi::{c_char, c_void};
use std::ptr::{self, NonNull};
use std::rc::{Rc, Weak};

/// Handle value meaning "nothing cached".
pub const NO_HANDLE: ExternalHandle = 0;

pub type ValueCacheItemDeletedCallback =
    Option<unsafe extern "C" fn(ctx: *mut c_void, value: ValueRef, handle: isize)>;

/// Returns the handle to store for the new value; it must not be 0.
pub type ValueCacheItemReplacedCallback = Option<
    unsafe extern "C" fn(ctx: *mut c_void, old: ValueRef, handle: isize, new: ValueRef) -> isize,
>;

struct CacheListener {
    cache: ValueCache<NonNull<Value>>,
}

impl ValueListener for CacheListener {
    fn value_deleted(&self, value: NonNull<Value>) {
        self.cache.notify_deleted(value);
    }

    fn value_replaced(&self, old: NonNull<Value>, new: NonNull<Value>) {
        self.cache.notify_replaced(old, new);
    }
}

/// Owner behind a `ValueCacheRef`.
///
/// The context only holds a weak reference to the listener, so disposing
/// the binding unregisters it.
pub struct ValueCacheBinding {
    listener: Rc<CacheListener>,
}

impl ValueCacheBinding {
    fn cache(&self) -> &ValueCache<NonNull<Value>> {
        &self.listener.cache
    }
}

/// Creates a cache tracking values of `context`. Either callback may be null.
///
/// Returns null for a null context. Release with `nb_value_cache_dispose`
/// before the context is disposed.
///
/// # Safety
/// `context` must be null or a live context. `ctx` is passed through to the
/// callbacks untouched and must stay valid for them.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_cache_create(
    context: ContextRef,
    ctx: *mut c_void,
    deleted: ValueCacheItemDeletedCallback,
    replaced: ValueCacheItemReplacedCallback,
) -> ValueCacheRef {
    let Some(context) = (unsafe { context.as_ref() }) else {
        return ValueCacheRef::null();
    };

    let mut cache = ValueCache::new();
    if let Some(deleted) = deleted {
        cache = cache.with_deleted_callback(move |value: NonNull<Value>, handle| {
            // SAFETY: the consumer supplied both the function and its context.
            unsafe { deleted(ctx, value.into(), handle) }
        });
    }
    if let Some(replaced) = replaced {
        cache = cache.with_replaced_callback(move |old: NonNull<Value>, handle, new: NonNull<Value>| {
            // SAFETY: as above.
            unsafe { replaced(ctx, old.into(), handle, new.into()) }
        });
    }

    let listener = Rc::new(CacheListener { cache });
    let weak: Weak<dyn ValueListener> = Rc::downgrade(&listener) as Weak<dyn ValueListener>;
    context.add_value_listener(weak);
    tracing::debug!(target: "nativebridge", "value cache created");
    ValueCacheRef::from_box(Box::new(ValueCacheBinding { listener }))
}

/// # Safety
/// `cache` must be null or an undisposed result of `nb_value_cache_create`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_cache_dispose(cache: ValueCacheRef) {
    unsafe { cache.dispose() }
}

/// Writes the handle cached for `value` to `handle`, or 0 when absent.
///
/// Fails while one of the cache's callbacks is running; `handle` is then
/// left at 0.
///
/// # Safety
/// `cache` must be null or a live cache; `handle` must be valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_cache_lookup(
    cache: ValueCacheRef,
    value: ValueRef,
    handle: *mut isize,
) -> ErrorRef {
    error_ref(unsafe { lookup(cache, value, handle) })
}

unsafe fn lookup(cache: ValueCacheRef, value: ValueRef, out: *mut isize) -> BridgeResult<()> {
    if out.is_null() {
        return Err(BridgeError::NullOutParam { name: "handle" });
    }
    unsafe { write_out(out, NO_HANDLE) };
    let (cache, value) = unsafe { operands(cache, value) }?;
    let found = cache.cache().lookup(value)?;
    unsafe { write_out(out, found.unwrap_or(NO_HANDLE)) };
    Ok(())
}

/// Maps `value` to `handle`. Fails without modification when `value` is
/// already cached or `handle` is the reserved value 0.
///
/// # Safety
/// `cache` must be null or a live cache.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_cache_insert(
    cache: ValueCacheRef,
    value: ValueRef,
    handle: isize,
) -> ErrorRef {
    error_ref(unsafe { insert(cache, value, handle) })
}

unsafe fn insert(cache: ValueCacheRef, value: ValueRef, handle: ExternalHandle) -> BridgeResult<()> {
    let (cache, value) = unsafe { operands(cache, value) }?;
    if handle == NO_HANDLE {
        return Err(BridgeError::OutOfRange {
            name: "handle",
            value: 0,
        });
    }
    cache.cache().insert(value, handle)?;
    Ok(())
}

/// Drops the mapping for `value` without running callbacks and writes the
/// handle it held to `removed`, or 0 when nothing was cached. `removed` may
/// be null.
///
/// # Safety
/// `cache` must be null or a live cache; `removed` must be null or valid for
/// a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_cache_remove(
    cache: ValueCacheRef,
    value: ValueRef,
    removed: *mut isize,
) -> ErrorRef {
    error_ref(unsafe { remove(cache, value, removed) })
}

unsafe fn remove(cache: ValueCacheRef, value: ValueRef, out: *mut isize) -> BridgeResult<()> {
    unsafe { write_out(out, NO_HANDLE) };
    let (cache, value) = unsafe { operands(cache, value) }?;
    let handle = cache.cache().remove(value)?;
    unsafe { write_out(out, handle.unwrap_or(NO_HANDLE)) };
    Ok(())
}

unsafe fn operands<'a>(
    cache: ValueCacheRef,
    value: ValueRef,
) -> BridgeResult<(&'a ValueCacheBinding, NonNull<Value>)> {
    let cache = unsafe { cache.as_ref() }.ok_or(BridgeError::NullOrEmpty { name: "cache" })?;
    let value = value.as_non_null().ok_or(BridgeError::NullOrEmpty { name: "value" })?;
    Ok((cache, value))
}

/// # Safety
/// `cache` must be null or a live cache.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_cache_is_empty(cache: ValueCacheRef) -> i32 {
    to_c_bool(unsafe { cache.as_ref() }.is_none_or(|c| c.cache().is_empty()))
}

/// Text dump of the mappings. Release with `nb_dispose_message`.
///
/// # Safety
/// `cache` must be null or a live cache.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_cache_dump(cache: ValueCacheRef) -> *mut c_char {
    match unsafe { cache.as_ref() } {
        Some(cache) => message::allocate(cache.cache().dump().as_bytes()),
        None => ptr::null_mut(),
    }
}

/// Writes the dump to the debug channel.
///
/// # Safety
/// `cache` must be null or a live cache.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_cache_write_debug_representation(cache: ValueCacheRef) {
    let Some(cache) = (unsafe { cache.as_ref() }) else {
        return;
    };
    let mut stream = DebugStream::new();
    let _ = cache.cache().write_debug_representation(&mut stream);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_text;
    use nativebridge_core::message::OwnedMessage;
    use nativebridge_host::Context;

    #[derive(Default)]
    struct Events {
        deleted: Vec<(*mut Value, isize)>,
        replaced: Vec<(*mut Value, isize, *mut Value)>,
    }

    unsafe extern "C" fn on_deleted(ctx: *mut c_void, value: ValueRef, handle: isize) {
        let events = unsafe { &mut *ctx.cast::<Events>() };
        events.deleted.push((value.unwrap(), handle));
    }

    unsafe extern "C" fn on_replaced(
        ctx: *mut c_void,
        old: ValueRef,
        handle: isize,
        new: ValueRef,
    ) -> isize {
        let events = unsafe { &mut *ctx.cast::<Events>() };
        events.replaced.push((old.unwrap(), handle, new.unwrap()));
        handle + 1
    }

    fn ctx(events: &mut Events) -> *mut c_void {
        (events as *mut Events).cast()
    }

    fn cached(cache: ValueCacheRef, value: ValueRef) -> isize {
        let mut handle = -1isize;
        let err = unsafe { nb_value_cache_lookup(cache, value, &mut handle) };
        assert_eq!(error_text(err), None);
        handle
    }

    fn removed(cache: ValueCacheRef, value: ValueRef) -> isize {
        let mut handle = -1isize;
        let err = unsafe { nb_value_cache_remove(cache, value, &mut handle) };
        assert_eq!(error_text(err), None);
        handle
    }

    #[test]
    fn null_context_creates_nothing() {
        let cache = unsafe { nb_value_cache_create(ContextRef::null(), ptr::null_mut(), None, None) };
        assert!(cache.is_null());
        assert_eq!(unsafe { nb_value_cache_is_empty(cache) }, 1);
        let mut handle = -1isize;
        let err = unsafe { nb_value_cache_lookup(cache, ValueRef::null(), &mut handle) };
        assert_eq!(error_text(err).as_deref(), Some("cache is null or empty"));
        assert_eq!(handle, NO_HANDLE);
    }

    #[test]
    fn insert_lookup_remove() {
        let context = Context::new();
        let value: ValueRef = context.create_instruction("tmp").into();
        let cache =
            unsafe { nb_value_cache_create(ContextRef::wrap_ref(&context), ptr::null_mut(), None, None) };
        assert_eq!(context.listener_count(), 1);

        assert!(unsafe { nb_value_cache_insert(cache, value, 42) }.is_null());
        assert_eq!(cached(cache, value), 42);
        assert_eq!(unsafe { nb_value_cache_is_empty(cache) }, 0);

        let err = unsafe { nb_value_cache_insert(cache, value, 7) };
        let text = error_text(err).unwrap_or_default();
        assert!(text.contains("42"), "{text}");
        assert_eq!(cached(cache, value), 42);

        assert_eq!(removed(cache, value), 42);
        assert_eq!(removed(cache, value), 0);
        assert_eq!(unsafe { nb_value_cache_is_empty(cache) }, 1);

        unsafe { nb_value_cache_dispose(cache) };
        assert_eq!(context.listener_count(), 0);
    }

    #[test]
    fn insert_rejects_null_value() {
        let context = Context::new();
        let cache =
            unsafe { nb_value_cache_create(ContextRef::wrap_ref(&context), ptr::null_mut(), None, None) };
        let err = unsafe { nb_value_cache_insert(cache, ValueRef::null(), 1) };
        assert_eq!(error_text(err).as_deref(), Some("value is null or empty"));
        unsafe { nb_value_cache_dispose(cache) };
    }

    #[test]
    fn deleting_a_value_runs_callback_and_drops_mapping() {
        let context = Context::new();
        let mut events = Events::default();
        let cache = unsafe {
            nb_value_cache_create(
                ContextRef::wrap_ref(&context),
                ctx(&mut events),
                Some(on_deleted),
                Some(on_replaced),
            )
        };
        let inst = context.create_instruction("tmp");
        let value: ValueRef = inst.into();
        assert!(unsafe { nb_value_cache_insert(cache, value, 9) }.is_null());

        assert!(context.delete_value(inst));
        assert_eq!(events.deleted, [(inst.as_ptr(), 9)]);
        assert!(events.replaced.is_empty());
        assert_eq!(unsafe { nb_value_cache_is_empty(cache) }, 1);
        unsafe { nb_value_cache_dispose(cache) };
    }

    #[test]
    fn replace_all_uses_rekeys_with_callback_handle() {
        let context = Context::new();
        let mut events = Events::default();
        let cache = unsafe {
            nb_value_cache_create(
                ContextRef::wrap_ref(&context),
                ctx(&mut events),
                Some(on_deleted),
                Some(on_replaced),
            )
        };
        let old = context.create_instruction("old");
        let new = context.create_instruction("new");
        assert!(unsafe { nb_value_cache_insert(cache, old.into(), 100) }.is_null());

        context.replace_all_uses_with(old, new);
        assert_eq!(events.replaced, [(old.as_ptr(), 100, new.as_ptr())]);
        assert_eq!(cached(cache, old.into()), 0);
        assert_eq!(cached(cache, new.into()), 101);
        unsafe { nb_value_cache_dispose(cache) };
    }

    #[test]
    fn replacement_without_callback_moves_handle() {
        let context = Context::new();
        let cache =
            unsafe { nb_value_cache_create(ContextRef::wrap_ref(&context), ptr::null_mut(), None, None) };
        let old = context.create_instruction("old");
        let new = context.create_instruction("new");
        assert!(unsafe { nb_value_cache_insert(cache, old.into(), 5) }.is_null());

        context.replace_all_uses_with(old, new);
        assert_eq!(cached(cache, new.into()), 5);
        unsafe { nb_value_cache_dispose(cache) };
    }

    #[test]
    fn disposed_cache_stops_listening() {
        let context = Context::new();
        let mut events = Events::default();
        let cache = unsafe {
            nb_value_cache_create(
                ContextRef::wrap_ref(&context),
                ctx(&mut events),
                Some(on_deleted),
                None,
            )
        };
        let inst = context.create_instruction("tmp");
        assert!(unsafe { nb_value_cache_insert(cache, inst.into(), 3) }.is_null());
        unsafe { nb_value_cache_dispose(cache) };

        assert!(context.delete_value(inst));
        assert!(events.deleted.is_empty());
    }

    #[test]
    fn dump_lists_entries() {
        let context = Context::new();
        let cache =
            unsafe { nb_value_cache_create(ContextRef::wrap_ref(&context), ptr::null_mut(), None, None) };
        let value: ValueRef = context.const_int(32, 1).into();
        assert!(unsafe { nb_value_cache_insert(cache, value, 0x2a) }.is_null());

        let dump = unsafe { OwnedMessage::from_raw(nb_value_cache_dump(cache)) }
            .map(|m| m.to_string_lossy())
            .unwrap_or_default();
        assert!(dump.starts_with("ValueCache (1 entries)"), "{dump}");
        assert!(dump.contains("=> 0x2a"), "{dump}");

        unsafe { nb_value_cache_write_debug_representation(cache) };
        assert!(unsafe { nb_value_cache_dump(ValueCacheRef::null()) }.is_null());
        unsafe { nb_value_cache_dispose(cache) };
    }

    #[test]
    fn zero_handle_is_reserved() {
        let context = Context::new();
        let cache =
            unsafe { nb_value_cache_create(ContextRef::wrap_ref(&context), ptr::null_mut(), None, None) };
        let mapped: ValueRef = context.create_instruction("mapped").into();
        let absent: ValueRef = context.create_instruction("absent").into();

        let err = unsafe { nb_value_cache_insert(cache, mapped, NO_HANDLE) };
        assert_eq!(error_text(err).as_deref(), Some("handle value 0 is out of range"));
        assert_eq!(unsafe { nb_value_cache_is_empty(cache) }, 1);

        // a miss leaves the value insertable
        assert_eq!(cached(cache, mapped), NO_HANDLE);
        assert!(unsafe { nb_value_cache_insert(cache, mapped, 5) }.is_null());
        assert_eq!(cached(cache, mapped), 5);
        assert_eq!(cached(cache, absent), NO_HANDLE);

        assert_eq!(removed(cache, mapped), 5);
        assert_eq!(removed(cache, mapped), NO_HANDLE);
        assert_eq!(removed(cache, absent), NO_HANDLE);
        unsafe { nb_value_cache_dispose(cache) };
    }

    #[test]
    fn lookup_requires_out_param_and_remove_tolerates_null() {
        let context = Context::new();
        let cache =
            unsafe { nb_value_cache_create(ContextRef::wrap_ref(&context), ptr::null_mut(), None, None) };
        let value: ValueRef = context.create_instruction("v").into();
        assert!(unsafe { nb_value_cache_insert(cache, value, 8) }.is_null());

        let err = unsafe { nb_value_cache_lookup(cache, value, ptr::null_mut()) };
        assert_eq!(error_text(err).as_deref(), Some("out parameter 'handle' is null"));

        assert!(unsafe { nb_value_cache_remove(cache, value, ptr::null_mut()) }.is_null());
        assert_eq!(unsafe { nb_value_cache_is_empty(cache) }, 1);
        unsafe { nb_value_cache_dispose(cache) };
    }

    struct Reentrant {
        cache: ValueCacheRef,
        other: ValueRef,
        lookup_error: Option<String>,
        remove_error: Option<String>,
        lookup_handle: isize,
    }

    unsafe extern "C" fn reenter(ctx: *mut c_void, _value: ValueRef, _handle: isize) {
        let state = unsafe { &mut *ctx.cast::<Reentrant>() };
        let mut handle = -1isize;
        let err = unsafe { nb_value_cache_lookup(state.cache, state.other, &mut handle) };
        state.lookup_error = error_text(err);
        state.lookup_handle = handle;
        let err = unsafe { nb_value_cache_remove(state.cache, state.other, ptr::null_mut()) };
        state.remove_error = error_text(err);
    }

    #[test]
    fn use_inside_callback_reports_error() {
        let context = Context::new();
        let doomed = context.create_instruction("doomed");
        let other: ValueRef = context.create_instruction("other").into();
        let mut state = Reentrant {
            cache: ValueCacheRef::null(),
            other,
            lookup_error: None,
            remove_error: None,
            lookup_handle: -1,
        };
        let cache = unsafe {
            nb_value_cache_create(
                ContextRef::wrap_ref(&context),
                (&mut state as *mut Reentrant).cast(),
                Some(reenter),
                None,
            )
        };
        state.cache = cache;
        assert!(unsafe { nb_value_cache_insert(cache, doomed.into(), 1) }.is_null());
        assert!(unsafe { nb_value_cache_insert(cache, other, 2) }.is_null());

        assert!(context.delete_value(doomed));
        let busy = "value cache cannot be used while one of its callbacks is running";
        assert_eq!(state.lookup_error.as_deref(), Some(busy));
        assert_eq!(state.remove_error.as_deref(), Some(busy));
        assert_eq!(state.lookup_handle, NO_HANDLE);

        // the refused remove left the other mapping alone
        assert_eq!(cached(cache, other), 2);
        unsafe { nb_value_cache_dispose(cache) };
    }
}
