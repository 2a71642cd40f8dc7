//! Error values and owned messages.

use nativebridge_core::error::{into_error_ref, take_error};
use nativebridge_core::message::{self, read_bytes};
use nativebridge_core::{BridgeError, ErrorRef};
use std::ffi::c_char;

/// Creates an error carrying `message`. Invalid UTF-8 is replaced.
///
/// # Safety
/// `message` must be null or valid for `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_create_string_error(message: *const c_char, len: usize) -> ErrorRef {
    let bytes = unsafe { read_bytes(message, len) }.unwrap_or_default();
    into_error_ref(BridgeError::message(String::from_utf8_lossy(bytes)))
}

/// Consumes `error` and returns its text as an owned message.
///
/// Returns null for a null error. Release the result with
/// [`nb_dispose_message`].
///
/// # Safety
/// `error` must be null or an error that has not been consumed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_error_message(error: ErrorRef) -> *mut c_char {
    match unsafe { take_error(error) } {
        Some(error) => message::allocate(error.to_string().as_bytes()),
        None => std::ptr::null_mut(),
    }
}

/// Releases `error` without reading it. Null is ignored.
///
/// # Safety
/// `error` must be null or an error that has not been consumed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_consume_error(error: ErrorRef) {
    drop(unsafe { take_error(error) });
}

/// Releases a message returned by any allocating entry point.
///
/// # Safety
/// `message` must be null or an owned message that has not been released.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_dispose_message(message: *mut c_char) {
    unsafe { message::dispose(message) };
}

#[cfg(test)]
pub(crate) fn error_text(error: ErrorRef) -> Option<String> {
    let raw = unsafe { nb_get_error_message(error) };
    unsafe { message::OwnedMessage::from_raw(raw) }.map(|m| m.to_string_lossy())
}
