//! Boundary error taxonomy.
//!
//! Inside Rust every fallible step returns [`BridgeResult`]. At the C
//! boundary a result collapses into an [`ErrorRef`]: null on success, or an
//! owned [`ErrorInfo`] that the caller releases with exactly one of the
//! disposal entry points (consume it, or turn it into a message).
//!
//! ```text
//! BridgeError
//! ├── NullOrEmpty     - required input string missing
//! ├── NullOutParam    - out parameter pointer is null
//! ├── OutOfRange      - enumerated or index input outside its domain
//! ├── BufferTooSmall  - caller capacity below the required count
//! ├── Unsupported     - configuration not compiled into this build
//! ├── InvalidUtf8     - input text is not UTF-8
//! ├── Cache           - value cache misuse (double insert, reentrancy)
//! └── Message         - free-form diagnostic from the wrapped library
//! ```

use crate::handle::Opaque;
use crate::value_cache::CacheError;
use std::str::Utf8Error;
use thiserror::Error;

pub type BridgeResult<T> = Result<T, BridgeError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    #[error("{name} is null or empty")]
    NullOrEmpty { name: &'static str },

    #[error("out parameter '{name}' is null")]
    NullOutParam { name: &'static str },

    #[error("{name} value {value} is out of range")]
    OutOfRange { name: &'static str, value: i64 },

    #[error(
        "{name} array is too small: {required} elements required, {provided} provided"
    )]
    BufferTooSmall {
        name: &'static str,
        required: usize,
        provided: usize,
    },

    #[error("{0} is not supported by this build")]
    Unsupported(String),

    #[error("{name} is not valid UTF-8: {source}")]
    InvalidUtf8 {
        name: &'static str,
        source: Utf8Error,
    },

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("{0}")]
    Message(String),
}

impl BridgeError {
    pub fn message(text: impl Into<String>) -> Self {
        BridgeError::Message(text.into())
    }
}

/// Owned error value handed across the boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    error: BridgeError,
}

impl ErrorInfo {
    pub fn new(error: BridgeError) -> Self {
        Self { error }
    }

    pub fn error(&self) -> &BridgeError {
        &self.error
    }

    pub fn into_error(self) -> BridgeError {
        self.error
    }
}

/// Nullable boundary error. Null means success.
pub type ErrorRef = Opaque<ErrorInfo>;

/// Converts a failure into an owned boundary error.
pub fn into_error_ref(error: BridgeError) -> ErrorRef {
    tracing::debug!(target: "nativebridge", %error, "boundary call failed");
    Opaque::from_box(Box::new(ErrorInfo::new(error)))
}

/// Collapses a result into the boundary convention.
pub fn error_ref(result: BridgeResult<()>) -> ErrorRef {
    match result {
        Ok(()) => ErrorRef::null(),
        Err(error) => into_error_ref(error),
    }
}

/// Reclaims an error produced by [`error_ref`]. Null yields `None`.
///
/// # Safety
/// `error` must be null or an unconsumed error from this crate.
pub unsafe fn take_error(error: ErrorRef) -> Option<BridgeError> {
    unsafe { error.into_box() }.map(|info| info.into_error())
}
