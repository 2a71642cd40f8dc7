//! C-ABI handle and lifetime marshaling over a native object library.
//!
//! This crate bundles the workspace into a single library. Built as a
//! `cdylib` it exports every `nb_*` entry point of [`capi`]; used as an rlib
//! it gives Rust callers the marshaling layer ([`marshal`]) and the host object
//! model ([`host`]) directly.
//!
//! ```
//! use nativebridge::prelude::*;
//!
//! let context = Context::new();
//! let value = context.const_int(32, 7);
//! let handle = ValueRef::from(value);
//! assert_eq!(handle.unwrap(), value.as_ptr());
//! ```

pub use nativebridge_capi as capi;
pub use nativebridge_core as marshal;
pub use nativebridge_host as host;

pub use nativebridge_core::version::VERSION_STRING;

/// Library file version, see [`marshal::FileVersion`].
pub fn version() -> marshal::FileVersion {
    marshal::version::current()
}

pub mod prelude {
    pub use nativebridge_capi::types::*;
    pub use nativebridge_capi::{CodeGenTarget, NB_INVALID_INDEX, TargetRegistrationKind};
    pub use nativebridge_core::logging::{LoggingConfig, init as init_logging};
    pub use nativebridge_core::{
        BridgeError, BridgeResult, CacheError, ErrorRef, FileVersion, FlagsExt, Opaque, ValueCache,
    };
    pub use nativebridge_host::{
        Context, ExecutionSession, HostError, Module, ObjectFile, TargetMachine,
        TargetMachineOptions, Value, ValueListener,
    };
}
