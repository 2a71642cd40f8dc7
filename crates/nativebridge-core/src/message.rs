//! String marshaling.
//!
//! Three shapes cross the boundary:
//!
//! * input strings arrive as `(ptr, len)`, so embedded NULs and slices work
//!   without copying ([`read_bytes`], [`require_str`]);
//! * strings stored inside the wrapped library go out as a borrowed pointer
//!   plus an explicit length ([`borrowed`]); no terminator is promised and
//!   nothing is freed;
//! * synthesized text goes out as an owned, NUL-terminated buffer made by a
//!   single `malloc` ([`allocate`]) and released with [`dispose`].

use crate::error::{BridgeError, BridgeResult};
use std::ffi::{CStr, c_char};
use std::ptr::{self, NonNull};

/// Copies `text` into one freshly allocated, NUL-terminated buffer.
///
/// Returns null if the allocation fails. The caller owns the result and must
/// release it with [`dispose`].
pub fn allocate(text: &[u8]) -> *mut c_char {
    let len = text.len();
    // SAFETY: `len + 1` bytes are requested, `len` are copied and the last
    // byte is the terminator.
    unsafe {
        let buffer = libc::malloc(len + 1) as *mut u8;
        if buffer.is_null() {
            return ptr::null_mut();
        }
        ptr::copy_nonoverlapping(text.as_ptr(), buffer, len);
        *buffer.add(len) = 0;
        buffer as *mut c_char
    }
}

/// Releases a buffer from [`allocate`]. Null is ignored.
///
/// # Safety
/// `message` must be null or come from [`allocate`] and not be freed yet.
pub unsafe fn dispose(message: *mut c_char) {
    if !message.is_null() {
        unsafe { libc::free(message as *mut libc::c_void) };
    }
}

/// RAII owner for a message produced by [`allocate`], mostly for Rust callers
/// of the C surface.
#[derive(Debug)]
pub struct OwnedMessage {
    ptr: NonNull<c_char>,
}

impl OwnedMessage {
    /// # Safety
    /// `ptr` must be null or an undisposed result of [`allocate`].
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: `allocate` always writes a terminator.
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }

    pub fn to_string_lossy(&self) -> String {
        self.as_c_str().to_string_lossy().into_owned()
    }

    pub fn into_raw(self) -> *mut c_char {
        let ptr = self.ptr.as_ptr();
        std::mem::forget(self);
        ptr
    }
}

impl Drop for OwnedMessage {
    fn drop(&mut self) {
        unsafe { dispose(self.ptr.as_ptr()) }
    }
}

/// Returns a borrowed pointer to `bytes` and writes its length to `len_out`.
///
/// An empty slice yields null with length 0. A null `len_out` is tolerated.
///
/// # Safety
/// `len_out` must be null or valid for a write.
pub unsafe fn borrowed(bytes: &[u8], len_out: *mut usize) -> *const c_char {
    unsafe { write_out(len_out, bytes.len()) };
    if bytes.is_empty() {
        ptr::null()
    } else {
        bytes.as_ptr() as *const c_char
    }
}

/// Same as [`borrowed`] for `u32` length out parameters. Lengths that do not
/// fit are reported as absent (null, 0).
///
/// # Safety
/// `len_out` must be null or valid for a write.
pub unsafe fn borrowed_u32(bytes: &[u8], len_out: *mut u32) -> *const c_char {
    match u32::try_from(bytes.len()) {
        Ok(len) if len > 0 => {
            unsafe { write_out(len_out, len) };
            bytes.as_ptr() as *const c_char
        }
        _ => {
            unsafe { write_out(len_out, 0) };
            ptr::null()
        }
    }
}

/// Writes `value` through an optional out pointer.
///
/// # Safety
/// `out` must be null or valid for a write of `T`.
#[inline]
pub unsafe fn write_out<T>(out: *mut T, value: T) {
    if !out.is_null() {
        unsafe { out.write(value) };
    }
}

/// Views a `(ptr, len)` input. A null pointer is only accepted with `len == 0`.
///
/// # Safety
/// When non-null, `ptr` must be valid for `len` bytes for `'a`.
pub unsafe fn read_bytes<'a>(ptr: *const c_char, len: usize) -> Option<&'a [u8]> {
    if ptr.is_null() {
        return (len == 0).then_some(&[][..]);
    }
    Some(unsafe { std::slice::from_raw_parts(ptr as *const u8, len) })
}

/// Views a required, non-empty UTF-8 `(ptr, len)` input.
///
/// # Safety
/// Same contract as [`read_bytes`].
pub unsafe fn require_str<'a>(
    name: &'static str,
    ptr: *const c_char,
    len: usize,
) -> BridgeResult<&'a str> {
    let bytes = match unsafe { read_bytes(ptr, len) } {
        Some(bytes) if !bytes.is_empty() => bytes,
        _ => return Err(BridgeError::NullOrEmpty { name }),
    };
    std::str::from_utf8(bytes).map_err(|source| BridgeError::InvalidUtf8 { name, source })
}

/// Views an optional UTF-8 `(ptr, len)` input; null or empty map to `""`.
///
/// # Safety
/// Same contract as [`read_bytes`].
pub unsafe fn optional_str<'a>(
    name: &'static str,
    ptr: *const c_char,
    len: usize,
) -> BridgeResult<&'a str> {
    match unsafe { read_bytes(ptr, len) } {
        Some(bytes) => {
            std::str::from_utf8(bytes).map_err(|source| BridgeError::InvalidUtf8 { name, source })
        }
        None => Err(BridgeError::NullOrEmpty { name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_copies_and_terminates() {
        let raw = allocate(b"nounwind");
        let message = unsafe { OwnedMessage::from_raw(raw) }.expect("allocation");
        assert_eq!(message.as_c_str().to_bytes(), b"nounwind");
        assert_eq!(message.to_string_lossy(), "nounwind");
    }

    #[test]
    fn allocate_empty_text() {
        let message = unsafe { OwnedMessage::from_raw(allocate(b"")) }.expect("allocation");
        assert_eq!(message.as_c_str().to_bytes(), b"");
    }

    #[test]
    fn dispose_ignores_null() {
        unsafe { dispose(ptr::null_mut()) };
    }

    #[test]
    fn borrowed_reports_length_without_copy() {
        let text = "x86-64";
        let mut len = usize::MAX;
        let ptr = unsafe { borrowed(text.as_bytes(), &mut len) };
        assert_eq!(len, 6);
        assert_eq!(ptr as *const u8, text.as_ptr());

        let ptr = unsafe { borrowed(b"", &mut len) };
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn borrowed_tolerates_null_length() {
        let ptr = unsafe { borrowed(b"abc", ptr::null_mut()) };
        assert!(!ptr.is_null());
    }

    #[test]
    fn read_bytes_keeps_embedded_nul() {
        let data = b"a\0b";
        let view = unsafe { read_bytes(data.as_ptr() as *const c_char, data.len()) };
        assert_eq!(view, Some(&data[..]));
        assert_eq!(unsafe { read_bytes(ptr::null(), 0) }, Some(&[][..]));
        assert_eq!(unsafe { read_bytes(ptr::null(), 3) }, None);
    }

    #[test]
    fn require_str_rejects_null_and_empty() {
        let err = unsafe { require_str("name", ptr::null(), 0) }.unwrap_err();
        assert_eq!(err, BridgeError::NullOrEmpty { name: "name" });

        let text = "alwaysinline";
        let view = unsafe { require_str("name", text.as_ptr() as *const c_char, 0) };
        assert!(view.is_err());

        let view = unsafe { require_str("name", text.as_ptr() as *const c_char, 6) };
        assert_eq!(view, Ok("always"));
    }

    #[test]
    fn require_str_rejects_invalid_utf8() {
        let data = [0xffu8, 0xfe];
        let err = unsafe { require_str("name", data.as_ptr() as *const c_char, 2) }.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidUtf8 { name: "name", .. }));
    }
}
