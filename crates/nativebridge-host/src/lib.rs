//! In-process object model behind the nativebridge C entry points.
//!
//! Objects live in arenas owned by a [`Context`] (or a module, session or
//! object file) and are handed out as `NonNull` pointers whose addresses
//! never change while the object is alive. State is kept behind `Cell` and
//! `RefCell`, so every operation works through shared references, the way a
//! foreign caller holding plain pointers sees the objects.
//!
//! Invalid indices and wrong object kinds are programming errors here and
//! panic; callers across the C boundary check them first.

mod arena;

pub mod attribute;
pub mod context;
pub mod error;
pub mod metadata;
pub mod module;
pub mod object;
pub mod orc;
pub mod target;
pub mod value;

pub use attribute::Attribute;
pub use context::{Context, ValueListener};
pub use error::{HostError, HostResult};
pub use metadata::{MdNode, MdOperand, Metadata, MetadataKind, NodeStorage};
pub use module::{Comdat, ComdatSelectionKind, Module, NamedMetadata};
pub use object::{ObjectFile, RelocationIter, SectionIter, SymbolIter};
pub use orc::{ExecutionSession, JitDylib, PoolEntry, SymbolStringPool, SymbolStringPtr};
pub use target::{TargetMachine, TargetMachineOptions};
pub use value::{DataSequence, Value, ValueKind};
