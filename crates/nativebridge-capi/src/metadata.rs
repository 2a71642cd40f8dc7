//! Metadata nodes, strings and named metadata.
//!
//! Node accessors take any metadata handle; non-node metadata reads as a
//! node without operands. Index-taking getters return null past the end and
//! index-taking setters ignore out-of-range indices.

use crate::types::{ContextRef, MdOperandRef, MetadataRef, ModuleRef, NamedMdNodeRef, ValueRef};
use crate::value::NB_INVALID_INDEX;
use nativebridge_core::handle::to_c_bool;
use nativebridge_core::message::{self, borrowed_u32};
use nativebridge_host::{MdNode, Metadata};
use std::ffi::c_char;
use std::ptr;

unsafe fn node<'a>(metadata: MetadataRef) -> Option<&'a MdNode> {
    unsafe { metadata.as_ref() }.and_then(Metadata::as_node)
}

/// Text of an `MDString`, borrowed from the metadata. Null for other kinds.
///
/// # Safety
/// `metadata` must be null or live metadata; `len` must be null or valid for
/// a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_md_string_text(metadata: MetadataRef, len: *mut u32) -> *const c_char {
    let text = unsafe { metadata.as_ref() }
        .and_then(Metadata::as_string)
        .unwrap_or_default();
    unsafe { borrowed_u32(text.as_bytes(), len) }
}

/// # Safety
/// `node` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_md_node_get_num_operands(node: MetadataRef) -> u32 {
    unsafe { self::node(node) }.map_or(0, |n| u32::try_from(n.num_operands()).unwrap_or(u32::MAX))
}

/// Operand slot `index` of `node`; null when `index` is out of range.
///
/// # Safety
/// `node` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_md_node_get_operand(node: MetadataRef, index: u32) -> MdOperandRef {
    match unsafe { self::node(node) } {
        Some(n) if (index as usize) < n.num_operands() => MdOperandRef::wrap_ref(n.operand(index as usize)),
        _ => MdOperandRef::null(),
    }
}

/// Points operand `index` of `node` at `operand` (null clears the slot).
/// Out-of-range indices are ignored.
///
/// # Safety
/// `node` must be null or live metadata; `operand` must be null or live
/// metadata of the same context.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_md_node_replace_operand(node: MetadataRef, index: u32, operand: MetadataRef) {
    match unsafe { self::node(node) } {
        Some(n) if (index as usize) < n.num_operands() => {
            n.replace_operand_with(index as usize, operand.as_non_null());
        }
        _ => tracing::debug!(target: "nativebridge", index, "operand index out of range, ignored"),
    }
}

/// The metadata an operand slot refers to; null for an empty slot.
///
/// # Safety
/// `operand` must be null or a slot of a live node.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_operand_node(operand: MdOperandRef) -> MetadataRef {
    MetadataRef::wrap_option(unsafe { operand.as_ref() }.and_then(|op| op.get()))
}

/// Renders metadata as text. Release with `nb_dispose_message`.
///
/// # Safety
/// `metadata` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_metadata_as_string(metadata: MetadataRef) -> *mut c_char {
    match unsafe { metadata.as_ref() } {
        Some(md) => message::allocate(md.to_string().as_bytes()),
        None => ptr::null_mut(),
    }
}

/// The metadata's `MetadataKind` discriminant, `NB_INVALID_INDEX` for null.
///
/// # Safety
/// `metadata` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_metadata_kind(metadata: MetadataRef) -> u32 {
    unsafe { metadata.as_ref() }.map_or(NB_INVALID_INDEX, |md| md.kind() as u32)
}

/// # Safety
/// `metadata` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_node_context(metadata: MetadataRef) -> ContextRef {
    ContextRef::wrap_option(unsafe { metadata.as_ref() }.map(Metadata::context))
}

/// # Safety
/// `metadata` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_is_temporary(metadata: MetadataRef) -> i32 {
    to_c_bool(unsafe { node(metadata) }.is_some_and(MdNode::is_temporary))
}

/// Non-node metadata counts as resolved.
///
/// # Safety
/// `metadata` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_is_resolved(metadata: MetadataRef) -> i32 {
    match unsafe { metadata.as_ref() } {
        Some(md) => to_c_bool(md.as_node().is_none_or(MdNode::is_resolved)),
        None => 0,
    }
}

/// # Safety
/// `metadata` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_is_uniqued(metadata: MetadataRef) -> i32 {
    to_c_bool(unsafe { node(metadata) }.is_some_and(MdNode::is_uniqued))
}

/// # Safety
/// `metadata` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_is_distinct(metadata: MetadataRef) -> i32 {
    to_c_bool(unsafe { node(metadata) }.is_some_and(MdNode::is_distinct))
}

/// Wraps a constant as metadata; null when `value` is not a constant.
///
/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_constant_as_metadata(value: ValueRef) -> MetadataRef {
    let Some(v) = (unsafe { value.as_ref() }) else {
        return MetadataRef::null();
    };
    // SAFETY: a value's context outlives it.
    let context = unsafe { v.context().as_ref() };
    MetadataRef::wrap_option(context.constant_as_metadata(v.into()))
}

// Named metadata

/// # Safety
/// `named` must be null or live named metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_named_md_node_get_num_operands(named: NamedMdNodeRef) -> u32 {
    unsafe { named.as_ref() }.map_or(0, |n| u32::try_from(n.num_operands()).unwrap_or(u32::MAX))
}

/// Operand `index`; null when out of range.
///
/// # Safety
/// `named` must be null or live named metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_named_md_node_get_operand(named: NamedMdNodeRef, index: u32) -> MetadataRef {
    match unsafe { named.as_ref() } {
        Some(n) if (index as usize) < n.num_operands() => MetadataRef::from(n.operand(index as usize)),
        _ => MetadataRef::null(),
    }
}

/// Replaces operand `index`. Out-of-range indices and null nodes are ignored.
///
/// # Safety
/// `named` must be null or live named metadata; `node` must be null or a
/// live node.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_named_md_node_set_operand(named: NamedMdNodeRef, index: u32, node: MetadataRef) {
    let (Some(named), Some(node)) = (unsafe { named.as_ref() }, node.as_non_null()) else {
        return;
    };
    if (index as usize) < named.num_operands() {
        named.set_operand(index as usize, node);
    } else {
        tracing::debug!(target: "nativebridge", index, "named metadata index out of range, ignored");
    }
}

/// # Safety
/// `named` must be null or live named metadata; `node` must be null or a
/// live node.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_named_md_node_add_operand(named: NamedMdNodeRef, node: MetadataRef) {
    if let (Some(named), Some(node)) = (unsafe { named.as_ref() }, node.as_non_null()) {
        named.add_operand(node);
    }
}

/// # Safety
/// `named` must be null or live named metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_named_md_node_clear_operands(named: NamedMdNodeRef) {
    if let Some(named) = unsafe { named.as_ref() } {
        named.clear_operands();
    }
}

/// # Safety
/// `named` must be null or live named metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_named_metadata_get_parent_module(named: NamedMdNodeRef) -> ModuleRef {
    ModuleRef::wrap_option(unsafe { named.as_ref() }.map(|n| n.parent()))
}

/// Removes named metadata from its module and releases it; `named` dangles
/// afterwards.
///
/// # Safety
/// `named` must be null or live named metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_named_metadata_erase_from_parent(named: NamedMdNodeRef) {
    let Some(handle) = named.as_non_null() else {
        return;
    };
    // SAFETY: the caller vouches for `named`; its module outlives it.
    let module = unsafe { handle.as_ref().parent().as_ref() };
    module.erase_named_metadata(handle);
}
