//! Flat C entry points over the nativebridge host object model.
//!
//! Every exported symbol is an `nb_*` function with the C calling
//! convention. Objects cross the boundary as kind-tagged opaque handles
//! ([`types`]), strings as `(ptr, len)` pairs or owned messages, and failures
//! as a nullable [`ErrorRef`](nativebridge_core::ErrorRef).
//!
//! Root objects are created and released here too: contexts
//! (`nb_context_create`), modules (`nb_module_create_with_name`) and JIT
//! sessions (`nb_execution_session_create`), each with a matching dispose.
//! Object files have no parser on this side; an embedding Rust host builds
//! them with `ObjectFile::builder` and hands out `ObjectFileRef`s.
//!
//! Entry points never panic on caller input: indices are checked before
//! they reach the host, null handles produce a neutral result, and anything
//! the host would reject is reported through the error value. Passing a
//! handle of the wrong kind, or one whose object is gone, is undefined
//! behavior.

pub mod attributes;
pub mod context;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod module;
pub mod object_file;
pub mod orc;
pub mod target_machine;
pub mod target_registration;
pub mod types;
pub mod value;
pub mod value_cache;
pub mod version;

pub use attributes::{AttributeAllowedOn, AttributeArgKind, AttributeInfo};
pub use target_registration::{CodeGenTarget, TargetRegistrationKind};
pub use types::*;
pub use value::NB_INVALID_INDEX;
