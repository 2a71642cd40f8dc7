//! Value queries.
//!
//! Kind-specific accessors accept any value and return a neutral result
//! (null, zero, [`NB_INVALID_INDEX`]) when the value is of another kind.

use crate::types::{MetadataRef, ValueRef};
use nativebridge_core::handle::to_c_bool;
use nativebridge_core::message::borrowed;
use std::ffi::c_char;

/// Returned where an index does not apply.
pub const NB_INVALID_INDEX: u32 = u32::MAX;

/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_is_constant_zero_value(value: ValueRef) -> i32 {
    let value = unsafe { value.as_ref() };
    to_c_bool(value.is_some_and(|v| v.is_zero_value()))
}

/// Unlinks a global variable from its module without releasing it. Other
/// values are left alone.
///
/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_remove_global_from_parent(value: ValueRef) {
    let Some(v) = (unsafe { value.as_ref() }) else {
        return;
    };
    if v.kind() != nativebridge_host::ValueKind::GlobalVariable {
        return;
    }
    if let Some(module) = v.parent() {
        // SAFETY: a global's parent module is live while it is linked.
        unsafe { module.as_ref() }.remove_global_variable(v.into());
    }
}

/// The value's kind as its `ValueKind` discriminant, `NB_INVALID_INDEX` for
/// null.
///
/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_value_kind(value: ValueRef) -> u32 {
    unsafe { value.as_ref() }.map_or(NB_INVALID_INDEX, |v| v.kind() as u32)
}

/// Target of a global alias; null for anything else.
///
/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_aliasee(value: ValueRef) -> ValueRef {
    ValueRef::wrap_option(unsafe { value.as_ref() }.and_then(|v| v.aliasee()))
}

/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_argument_index(value: ValueRef) -> u32 {
    unsafe { value.as_ref() }
        .and_then(|v| v.argument_index())
        .unwrap_or(NB_INVALID_INDEX)
}

/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_is_constant_cstring(value: ValueRef) -> i32 {
    let sequence = unsafe { value.as_ref() }.and_then(|v| v.data_sequence());
    to_c_bool(sequence.is_some_and(|s| s.is_cstring()))
}

/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_constant_data_sequential_element_count(value: ValueRef) -> u32 {
    unsafe { value.as_ref() }
        .and_then(|v| v.data_sequence())
        .map_or(0, |s| u32::try_from(s.element_count()).unwrap_or(u32::MAX))
}

/// Raw element bytes of a constant data sequence, borrowed from the value.
///
/// # Safety
/// `value` must be null or a live value; `len` must be null or valid for a
/// write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_constant_data_sequential_raw_data(
    value: ValueRef,
    len: *mut usize,
) -> *const c_char {
    let raw = unsafe { value.as_ref() }
        .and_then(|v| v.data_sequence())
        .map_or(&[][..], |s| s.raw_data());
    unsafe { borrowed(raw, len) }
}

/// Whether an instruction carries debug records. `0` for non-instructions.
///
/// # Safety
/// `value` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_has_dbg_records(value: ValueRef) -> i32 {
    let records = unsafe { value.as_ref() }.and_then(|v| v.debug_record_count());
    to_c_bool(records.is_some_and(|count| count > 0))
}

/// The value wrapped by value-as-metadata; null for other metadata or when
/// the value was deleted.
///
/// # Safety
/// `metadata` must be null or live metadata.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_value_as_metadata_get_value(metadata: MetadataRef) -> ValueRef {
    ValueRef::wrap_option(unsafe { metadata.as_ref() }.and_then(|md| md.value()))
}
