//! Marshaling conventions shared by every nativebridge C entry point.
//!
//! This crate knows nothing about the wrapped library. It provides the
//! pieces a binding needs to move objects, strings and errors across a C
//! ABI boundary:
//!
//! - [`flags`] - query helpers over `bitflags` types
//! - [`handle`] - kind-tagged opaque pointers
//! - [`error`] - the boundary error taxonomy and owned error values
//! - [`message`] - borrowed `(ptr, len)` strings and owned, disposable messages
//! - [`sizing`] - the query-then-fill protocol for variable length results
//! - [`version`] - the ordered 64-bit file version
//! - [`value_cache`] - identity to external-handle cache with invalidation
//! - [`debug_stream`] - debugger output channel (null sink in release builds)
//! - [`logging`] - `tracing-subscriber` setup

pub mod debug_stream;
pub mod error;
pub mod flags;
pub mod handle;
pub mod logging;
pub mod message;
pub mod sizing;
pub mod value_cache;
pub mod version;

pub use error::{BridgeError, BridgeResult, ErrorInfo, ErrorRef};
pub use flags::FlagsExt;
pub use handle::Opaque;
pub use value_cache::{CacheError, ExternalHandle, ValueCache};
pub use version::FileVersion;
