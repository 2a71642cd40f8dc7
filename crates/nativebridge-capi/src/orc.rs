//! JIT session support: session and dylib lifetime, symbol string pool
//! diagnostics.

use crate::types::{ExecutionSessionRef, JitDylibRef, SymbolStringPoolEntryRef, SymbolStringPoolRef};
use nativebridge_core::debug_stream::DebugStream;
use nativebridge_core::error::error_ref;
use nativebridge_core::handle::to_c_bool;
use nativebridge_core::message::{self, require_str, write_out};
use nativebridge_core::{BridgeError, BridgeResult, ErrorRef};
use nativebridge_host::ExecutionSession;
use std::ffi::c_char;
use std::fmt::Write;
use std::ptr;

const DEBUG_MARKER: &str = "nb_symbol_string_pool_write_debug_representation";

/// Creates a session with an empty symbol string pool. Release with
/// [`nb_execution_session_dispose`].
#[unsafe(no_mangle)]
pub extern "C" fn nb_execution_session_create() -> ExecutionSessionRef {
    ExecutionSessionRef::from_box(Box::new(ExecutionSession::new()))
}

/// Releases a session and its dylibs. Null is ignored.
///
/// # Safety
/// `session` must be null or an undisposed result of
/// [`nb_execution_session_create`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_execution_session_dispose(session: ExecutionSessionRef) {
    unsafe { session.dispose() }
}

/// Creates an empty dylib called `name` and writes it to `dylib`.
///
/// Fails when the name is empty or already used in this session.
///
/// # Safety
/// `session` must be null or a live session; `name` must be null or valid
/// for `len` bytes; `dylib` must be valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_execution_session_create_jit_dylib(
    session: ExecutionSessionRef,
    name: *const c_char,
    len: usize,
    dylib: *mut JitDylibRef,
) -> ErrorRef {
    error_ref(unsafe { create_dylib(session, name, len, dylib) })
}

unsafe fn create_dylib(
    session: ExecutionSessionRef,
    name: *const c_char,
    len: usize,
    out: *mut JitDylibRef,
) -> BridgeResult<()> {
    if out.is_null() {
        return Err(BridgeError::NullOutParam { name: "dylib" });
    }
    unsafe { write_out(out, JitDylibRef::null()) };
    let session = unsafe { session.as_ref() }.ok_or(BridgeError::NullOrEmpty { name: "session" })?;
    let name = unsafe { require_str("name", name, len) }?;
    let dylib = session
        .create_dylib(name)
        .map_err(|e| BridgeError::message(e.to_string()))?;
    unsafe { write_out(out, dylib.into()) };
    Ok(())
}

/// The pool shared by `session` and its dylibs, borrowed from the session.
///
/// # Safety
/// `session` must be null or a live session.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_execution_session_get_symbol_string_pool(
    session: ExecutionSessionRef,
) -> SymbolStringPoolRef {
    match unsafe { session.as_ref() } {
        Some(session) => SymbolStringPoolRef::wrap_ref(session.symbol_string_pool()),
        None => SymbolStringPoolRef::null(),
    }
}

/// Removes `dylib` from `session` and releases it.
///
/// # Safety
/// `session` must be a live session; `dylib` must be null or a dylib handle.
/// On success `dylib` dangles.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_execution_session_remove_dylib(
    session: ExecutionSessionRef,
    dylib: JitDylibRef,
) -> ErrorRef {
    error_ref(unsafe { remove_dylib(session, dylib) })
}

unsafe fn remove_dylib(session: ExecutionSessionRef, dylib: JitDylibRef) -> BridgeResult<()> {
    let session = unsafe { session.as_ref() }.ok_or(BridgeError::NullOrEmpty { name: "session" })?;
    let dylib = dylib.as_non_null().ok_or(BridgeError::NullOrEmpty { name: "dylib" })?;
    session
        .remove_dylib(dylib)
        .map_err(|e| BridgeError::message(e.to_string()))
}

/// Whether the pool holds no entries, live or dead. Null counts as empty.
///
/// # Safety
/// `pool` must be null or a live pool.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_string_pool_is_empty(pool: SymbolStringPoolRef) -> i32 {
    to_c_bool(unsafe { pool.as_ref() }.is_none_or(|p| p.is_empty()))
}

/// One `name: count` line per entry, sorted by name. Release with
/// `nb_dispose_message`.
///
/// # Safety
/// `pool` must be null or a live pool.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_string_pool_get_diagnostic_representation(
    pool: SymbolStringPoolRef,
) -> *mut c_char {
    match unsafe { pool.as_ref() } {
        Some(pool) => message::allocate(pool.to_string().as_bytes()),
        None => ptr::null_mut(),
    }
}

/// Writes the pool dump to the debug channel between `+` and `-` marker
/// lines. Nothing is written in release builds.
///
/// # Safety
/// `pool` must be null or a live pool.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_string_pool_write_debug_representation(pool: SymbolStringPoolRef) {
    let Some(pool) = (unsafe { pool.as_ref() }) else {
        return;
    };
    let mut stream = DebugStream::new();
    let _ = write!(stream, "+{DEBUG_MARKER}\n{pool}-{DEBUG_MARKER}\n");
}

/// Current reference count of a pool entry.
///
/// The count is read atomically but may change before the caller looks at
/// it; use it for diagnostics only.
///
/// # Safety
/// `entry` must be null or an entry of a live pool.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_string_pool_get_ref_count(entry: SymbolStringPoolEntryRef) -> usize {
    unsafe { entry.as_ref() }.map_or(0, |e| e.ref_count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_text;
    use nativebridge_core::message::OwnedMessage;

    #[test]
    fn remove_dylib_reports_unknown_handles() {
        let session = ExecutionSession::new();
        let lib = session.create_dylib("main").unwrap();
        let handle = ExecutionSessionRef::wrap_ref(&session);

        let error = unsafe { nb_execution_session_remove_dylib(handle, lib.into()) };
        assert!(error.is_null());
        assert_eq!(session.dylib_count(), 0);

        let error = unsafe { nb_execution_session_remove_dylib(handle, lib.into()) };
        let text = error_text(error).unwrap_or_default();
        assert!(text.contains("dylib"), "{text}");

        let error = unsafe { nb_execution_session_remove_dylib(handle, JitDylibRef::null()) };
        assert_eq!(error_text(error).as_deref(), Some("dylib is null or empty"));
    }

    #[test]
    fn pool_diagnostics() {
        let session = ExecutionSession::new();
        let pool = unsafe { nb_execution_session_get_symbol_string_pool(ExecutionSessionRef::wrap_ref(&session)) };
        assert_eq!(unsafe { nb_symbol_string_pool_is_empty(pool) }, 1);

        let lib = unsafe { session.create_dylib("main").unwrap().as_ref() };
        let printf = lib.define("printf");
        let _main = lib.define("main");

        assert_eq!(unsafe { nb_symbol_string_pool_is_empty(pool) }, 0);
        let text = unsafe { nb_symbol_string_pool_get_diagnostic_representation(pool) };
        let text = unsafe { OwnedMessage::from_raw(text) }.unwrap();
        assert_eq!(text.to_string_lossy(), "main: 2\nprintf: 2\n");

        let entry = SymbolStringPoolEntryRef::from(printf.entry());
        assert_eq!(unsafe { nb_symbol_string_pool_get_ref_count(entry) }, 2);
        let extra = printf.clone();
        assert_eq!(unsafe { nb_symbol_string_pool_get_ref_count(entry) }, 3);
        drop(extra);
        assert_eq!(unsafe { nb_symbol_string_pool_get_ref_count(entry) }, 2);

        unsafe { nb_symbol_string_pool_write_debug_representation(pool) };
        assert_eq!(unsafe { nb_symbol_string_pool_get_ref_count(SymbolStringPoolEntryRef::null()) }, 0);
    }

    #[test]
    fn session_and_dylib_lifetime_through_c_surface() {
        let session = nb_execution_session_create();
        assert!(!session.is_null());

        let name = "main";
        let mut dylib = JitDylibRef::null();
        let error = unsafe {
            nb_execution_session_create_jit_dylib(session, name.as_ptr().cast(), name.len(), &mut dylib)
        };
        assert_eq!(error_text(error), None);
        assert!(!dylib.is_null());

        let mut duplicate = JitDylibRef::null();
        let error = unsafe {
            nb_execution_session_create_jit_dylib(session, name.as_ptr().cast(), name.len(), &mut duplicate)
        };
        assert_eq!(
            error_text(error).as_deref(),
            Some("JIT dylib 'main' already exists in this session")
        );
        assert!(duplicate.is_null());

        let error = unsafe { nb_execution_session_create_jit_dylib(session, ptr::null(), 0, &mut duplicate) };
        assert_eq!(error_text(error).as_deref(), Some("name is null or empty"));

        assert_eq!(error_text(unsafe { nb_execution_session_remove_dylib(session, dylib) }), None);
        unsafe { nb_execution_session_dispose(session) };
        unsafe { nb_execution_session_dispose(ExecutionSessionRef::null()) };
    }
}
