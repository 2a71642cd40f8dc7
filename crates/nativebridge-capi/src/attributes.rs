//! Attribute catalog queries and attribute value helpers.

use crate::types::AttributeRef;
use bitflags::bitflags;
use nativebridge_core::error::error_ref;
use nativebridge_core::handle::to_c_bool;
use nativebridge_core::message::{self, borrowed_u32, require_str};
use nativebridge_core::sizing::fill_array;
use nativebridge_core::{BridgeError, BridgeResult, ErrorRef};
use nativebridge_host::attribute::{self, AttrArgKind};
use std::ffi::{CString, c_char};
use std::ptr;
use std::sync::LazyLock;

/// Argument shape of an attribute kind.
///
/// String attributes (anything not in the catalog) have id `0` and kind
/// `String`; their value is free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum AttributeArgKind {
    #[default]
    None = 0,
    Int = 1,
    Type = 2,
    ConstantRange = 3,
    ConstantRangeList = 4,
    String = 5,
}

impl From<AttrArgKind> for AttributeArgKind {
    fn from(kind: AttrArgKind) -> Self {
        match kind {
            AttrArgKind::None => AttributeArgKind::None,
            AttrArgKind::Int => AttributeArgKind::Int,
            AttrArgKind::Type => AttributeArgKind::Type,
            AttrArgKind::ConstantRange => AttributeArgKind::ConstantRange,
            AttrArgKind::ConstantRangeList => AttributeArgKind::ConstantRangeList,
        }
    }
}

bitflags! {
    /// Positions an attribute may be attached to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[repr(transparent)]
    pub struct AttributeAllowedOn: u32 {
        const RETURN = 0x0001;
        const PARAMETER = 0x0002;
        const FUNCTION = 0x0004;
        const CALL_SITE = 0x0008;
        const GLOBAL = 0x0010;
    }
}

/// Blittable description of one attribute name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(C)]
pub struct AttributeInfo {
    pub id: u32,
    pub arg_kind: AttributeArgKind,
    pub allowed_on: AttributeAllowedOn,
}

impl AttributeInfo {
    fn for_name(name: &str) -> Self {
        let Some((id, def)) =
            attribute::kind_from_name(name).and_then(|id| Some((id, attribute::definition(id)?)))
        else {
            return Self {
                id: 0,
                arg_kind: AttributeArgKind::String,
                allowed_on: AttributeAllowedOn::all(),
            };
        };

        let mut allowed_on = AttributeAllowedOn::empty();
        allowed_on.set(AttributeAllowedOn::FUNCTION, def.on_function);
        allowed_on.set(AttributeAllowedOn::PARAMETER, def.on_parameter);
        allowed_on.set(AttributeAllowedOn::RETURN, def.on_return);
        Self {
            id,
            arg_kind: def.arg.into(),
            allowed_on,
        }
    }
}

// NUL-terminated copies of the catalog names, alive for the whole process.
static KNOWN_NAMES: LazyLock<Box<[CString]>> = LazyLock::new(|| {
    attribute::known_names()
        .filter_map(|name| CString::new(name).ok())
        .collect()
});

/// Number of entries [`nb_get_known_attribute_names`] writes.
#[unsafe(no_mangle)]
pub extern "C" fn nb_get_num_known_attribs() -> usize {
    KNOWN_NAMES.len()
}

/// Fills `names` with pointers to static, NUL-terminated attribute names.
///
/// Fails without writing anything when `len` is below
/// [`nb_get_num_known_attribs`]. The names are never released.
///
/// # Safety
/// `names` must be valid for `len` pointer writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_known_attribute_names(
    names: *mut *const c_char,
    len: usize,
) -> ErrorRef {
    let pointers: Vec<*const c_char> = KNOWN_NAMES.iter().map(|name| name.as_ptr()).collect();
    error_ref(unsafe { fill_array("names", names, len, &pointers) })
}

/// Renders `attribute` as text. Release with `nb_dispose_message`.
///
/// # Safety
/// `attribute` must be null or a live attribute.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_attribute_to_string(attribute: AttributeRef) -> *mut c_char {
    match unsafe { attribute.as_ref() } {
        Some(attribute) => message::allocate(attribute.to_string().as_bytes()),
        None => ptr::null_mut(),
    }
}

/// # Safety
/// `attribute` must be null or a live attribute.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_is_constant_range_attribute(attribute: AttributeRef) -> i32 {
    let attribute = unsafe { attribute.as_ref() };
    to_c_bool(attribute.is_some_and(|a| a.is_constant_range_attribute()))
}

/// # Safety
/// `attribute` must be null or a live attribute.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_is_constant_range_list_attribute(attribute: AttributeRef) -> i32 {
    let attribute = unsafe { attribute.as_ref() };
    to_c_bool(attribute.is_some_and(|a| a.is_constant_range_list_attribute()))
}

/// Describes the attribute called `name`.
///
/// Names outside the catalog are reported as string attributes: id `0`,
/// kind `String`, allowed everywhere.
///
/// # Safety
/// `name` must be valid for `len` bytes; `info` must be null or valid for a
/// write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_attribute_info(
    name: *const c_char,
    len: usize,
    info: *mut AttributeInfo,
) -> ErrorRef {
    error_ref(unsafe { attribute_info(name, len, info) })
}

unsafe fn attribute_info(name: *const c_char, len: usize, info: *mut AttributeInfo) -> BridgeResult<()> {
    let name = unsafe { require_str("attribName", name, len) }?;
    if info.is_null() {
        return Err(BridgeError::NullOutParam { name: "pInfo" });
    }
    unsafe { info.write(AttributeInfo::for_name(name)) };
    Ok(())
}

/// Name of the attribute kind `id`. Id `0` is `"none"`; ids past the catalog
/// yield null with `*len == 0`.
///
/// # Safety
/// `len` must be null or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_attribute_name_from_id(id: u32, len: *mut u32) -> *const c_char {
    if id >= attribute::end_attr_kinds() {
        unsafe { message::write_out(len, 0) };
        return ptr::null();
    }
    unsafe { borrowed_u32(attribute::name_from_kind(id).as_bytes(), len) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::error_text;
    use nativebridge_core::message::OwnedMessage;
    use nativebridge_host::Context;
    use std::ffi::CStr;

    fn info_for(name: &str) -> AttributeInfo {
        let mut info = AttributeInfo::default();
        let error = unsafe { nb_get_attribute_info(name.as_ptr().cast(), name.len(), &mut info) };
        assert!(error.is_null());
        info
    }

    #[test]
    fn known_names_two_call() {
        let count = nb_get_num_known_attribs();
        assert_eq!(count, attribute::known_count());

        let mut names = vec![ptr::null(); count];
        let error = unsafe { nb_get_known_attribute_names(names.as_mut_ptr(), names.len()) };
        assert!(error.is_null());
        let first = unsafe { CStr::from_ptr(names[0]) };
        assert_eq!(first.to_str(), Ok("alwaysinline"));
        assert!(names.iter().all(|name| !name.is_null()));
    }

    #[test]
    fn known_names_rejects_short_array() {
        let count = nb_get_num_known_attribs();
        let mut names = vec![ptr::null(); count - 1];
        let error = unsafe { nb_get_known_attribute_names(names.as_mut_ptr(), names.len()) };
        let text = error_text(error).unwrap_or_default();
        assert!(text.contains("too small"), "{text}");
        assert!(names.iter().all(|name| name.is_null()));
    }

    #[test]
    fn enum_attribute_info() {
        let info = info_for("nounwind");
        assert_eq!(info.id, attribute::kind_from_name("nounwind").unwrap());
        assert_eq!(info.arg_kind, AttributeArgKind::None);
        assert_eq!(info.allowed_on, AttributeAllowedOn::FUNCTION);
    }

    #[test]
    fn int_attribute_info() {
        let info = info_for("align");
        assert_eq!(info.arg_kind, AttributeArgKind::Int);
        assert_eq!(
            info.allowed_on,
            AttributeAllowedOn::PARAMETER | AttributeAllowedOn::RETURN
        );
    }

    #[test]
    fn unknown_name_is_string_attribute() {
        let info = info_for("target-features");
        assert_eq!(info.id, 0);
        assert_eq!(info.arg_kind, AttributeArgKind::String);
        assert_eq!(info.allowed_on, AttributeAllowedOn::all());
    }

    #[test]
    fn info_argument_checks() {
        let mut info = AttributeInfo::default();
        let error = unsafe { nb_get_attribute_info(ptr::null(), 0, &mut info) };
        assert_eq!(error_text(error).as_deref(), Some("attribName is null or empty"));

        let name = "cold";
        let error = unsafe { nb_get_attribute_info(name.as_ptr().cast(), 4, ptr::null_mut()) };
        assert_eq!(error_text(error).as_deref(), Some("out parameter 'pInfo' is null"));
    }

    #[test]
    fn name_from_id() {
        let mut len = u32::MAX;
        let ptr = unsafe { nb_get_attribute_name_from_id(0, &mut len) };
        let name = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize) };
        assert_eq!(name, b"none");

        let id = attribute::kind_from_name("noinline").unwrap();
        let ptr = unsafe { nb_get_attribute_name_from_id(id, &mut len) };
        let name = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len as usize) };
        assert_eq!(name, b"noinline");

        let ptr = unsafe { nb_get_attribute_name_from_id(attribute::end_attr_kinds(), &mut len) };
        assert!(ptr.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn attribute_queries() {
        let context = Context::new();
        let align = context.int_attribute(attribute::kind_from_name("align").unwrap(), 8);
        let range = context.range_attribute(attribute::kind_from_name("range").unwrap(), 8, 0, 10);

        let text = unsafe { nb_attribute_to_string(AttributeRef::from(align)) };
        let text = unsafe { OwnedMessage::from_raw(text) }.unwrap();
        assert_eq!(text.to_string_lossy(), "align 8");

        assert_eq!(unsafe { nb_is_constant_range_attribute(range.into()) }, 1);
        assert_eq!(unsafe { nb_is_constant_range_attribute(align.into()) }, 0);
        assert_eq!(unsafe { nb_is_constant_range_list_attribute(range.into()) }, 0);
        assert_eq!(unsafe { nb_is_constant_range_list_attribute(AttributeRef::null()) }, 0);
        assert!(unsafe { nb_attribute_to_string(AttributeRef::null()) }.is_null());
    }
}
