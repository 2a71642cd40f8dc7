//! Kind-tagged opaque pointers.
//!
//! Every internal object kind that crosses the boundary gets its own
//! `Opaque<T>` type. The representation is a bare pointer, so foreign callers
//! see an ordinary `void*`-sized token, but on the Rust side handles of
//! different kinds are different types:
//!
//! ```compile_fail
//! use nativebridge_core::Opaque;
//!
//! struct Value;
//! struct Metadata;
//!
//! fn takes_metadata(_: Opaque<Metadata>) {}
//!
//! let value = Value;
//! takes_metadata(Opaque::wrap_ref(&value));
//! ```
//!
//! Foreign callers have no such check; unwrapping a handle as the wrong kind
//! is undefined behavior and is documented on each entry point instead.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ptr::{self, NonNull};

/// A pointer-sized, non-owning reference to an internal object of kind `T`.
///
/// The handle carries no lifetime: it is valid only while whatever owns the
/// pointee keeps it alive. Handles produced by [`Opaque::from_box`] are the
/// exception; those are owned by the caller and must be released exactly
/// once through the matching disposal entry point.
///
/// ```
/// use nativebridge_core::Opaque;
///
/// let mut value = 7u32;
/// let handle = Opaque::wrap(&mut value as *mut u32);
/// assert_eq!(handle.unwrap(), &mut value as *mut u32);
/// assert!(Opaque::<u32>::null().is_null());
/// ```
#[repr(transparent)]
pub struct Opaque<T> {
    ptr: *mut T,
}

impl<T> Opaque<T> {
    /// The null handle.
    #[inline]
    pub const fn null() -> Self {
        Self {
            ptr: ptr::null_mut(),
        }
    }

    /// Reinterprets an internal pointer as a handle. A null pointer yields
    /// the null handle.
    #[inline]
    pub const fn wrap(ptr: *mut T) -> Self {
        Self { ptr }
    }

    /// Wraps a borrowed internal object.
    #[inline]
    pub const fn wrap_ref(value: &T) -> Self {
        Self {
            ptr: value as *const T as *mut T,
        }
    }

    /// Wraps an optional internal pointer, mapping `None` to null.
    #[inline]
    pub fn wrap_option(ptr: Option<NonNull<T>>) -> Self {
        ptr.map_or_else(Self::null, |p| Self::wrap(p.as_ptr()))
    }

    /// Recovers the internal pointer.
    #[inline]
    pub const fn unwrap(self) -> *mut T {
        self.ptr
    }

    #[inline]
    pub fn is_null(self) -> bool {
        self.ptr.is_null()
    }

    #[inline]
    pub fn as_non_null(self) -> Option<NonNull<T>> {
        NonNull::new(self.ptr)
    }

    /// Borrows the pointee.
    ///
    /// # Safety
    /// The handle must be null or point to a live object of kind `T` that is
    /// not mutated through another path for `'a`.
    #[inline]
    pub unsafe fn as_ref<'a>(self) -> Option<&'a T> {
        unsafe { self.ptr.as_ref() }
    }

    /// Transfers ownership of a boxed object to the caller.
    #[inline]
    pub fn from_box(value: Box<T>) -> Self {
        Self {
            ptr: Box::into_raw(value),
        }
    }

    /// Takes back ownership of an object created by [`Opaque::from_box`].
    ///
    /// # Safety
    /// The handle must be null or have come from [`Opaque::from_box`] and not
    /// have been reclaimed already.
    #[inline]
    pub unsafe fn into_box(self) -> Option<Box<T>> {
        if self.ptr.is_null() {
            None
        } else {
            Some(unsafe { Box::from_raw(self.ptr) })
        }
    }

    /// Drops an owned handle. Null is ignored.
    ///
    /// # Safety
    /// Same contract as [`Opaque::into_box`].
    #[inline]
    pub unsafe fn dispose(self) {
        drop(unsafe { self.into_box() });
    }
}

impl<T> Clone for Opaque<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Opaque<T> {}

impl<T> PartialEq for Opaque<T> {
    fn eq(&self, other: &Self) -> bool {
        ptr::eq(self.ptr, other.ptr)
    }
}

impl<T> Eq for Opaque<T> {}

impl<T> Hash for Opaque<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr.hash(state);
    }
}

impl<T> Default for Opaque<T> {
    fn default() -> Self {
        Self::null()
    }
}

impl<T> fmt::Debug for Opaque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Opaque<{}>({:p})", std::any::type_name::<T>(), self.ptr)
    }
}

impl<T> From<NonNull<T>> for Opaque<T> {
    fn from(ptr: NonNull<T>) -> Self {
        Self::wrap(ptr.as_ptr())
    }
}

/// Converts a Rust `bool` into the C `int`-sized boolean used at the boundary.
#[inline]
pub const fn to_c_bool(value: bool) -> i32 {
    value as i32
}

/// Converts a C boolean (any non-zero value is true) into `bool`.
#[inline]
pub const fn from_c_bool(value: i32) -> bool {
    value != 0
}
