//! Handle types of the C surface.
//!
//! Each alias is a distinct `Opaque<T>` instantiation, so Rust callers
//! cannot mix kinds up. The C header sees every one as an opaque pointer.

use crate::module::ComdatIterator;
use crate::value_cache::ValueCacheBinding;
use nativebridge_core::Opaque;
use nativebridge_host::orc::PoolEntry;
use nativebridge_host::{
    Attribute, Comdat, Context, ExecutionSession, JitDylib, MdOperand, Metadata, Module,
    NamedMetadata, ObjectFile, RelocationIter, SectionIter, SymbolIter, SymbolStringPool,
    TargetMachine, TargetMachineOptions, Value,
};

pub type ContextRef = Opaque<Context>;
pub type ValueRef = Opaque<Value>;
pub type MetadataRef = Opaque<Metadata>;
pub type MdOperandRef = Opaque<MdOperand>;
pub type NamedMdNodeRef = Opaque<NamedMetadata>;
pub type ModuleRef = Opaque<Module>;
pub type ComdatRef = Opaque<Comdat>;
pub type ComdatIteratorRef = Opaque<ComdatIterator>;
pub type AttributeRef = Opaque<Attribute>;

pub type ObjectFileRef = Opaque<ObjectFile>;
pub type SectionIteratorRef = Opaque<SectionIter>;
pub type SymbolIteratorRef = Opaque<SymbolIter>;
pub type RelocationIteratorRef = Opaque<RelocationIter>;

pub type ExecutionSessionRef = Opaque<ExecutionSession>;
pub type JitDylibRef = Opaque<JitDylib>;
pub type SymbolStringPoolRef = Opaque<SymbolStringPool>;
pub type SymbolStringPoolEntryRef = Opaque<PoolEntry>;

pub type TargetMachineRef = Opaque<TargetMachine>;
pub type TargetMachineOptionsRef = Opaque<TargetMachineOptions>;

pub type ValueCacheRef = Opaque<ValueCacheBinding>;
