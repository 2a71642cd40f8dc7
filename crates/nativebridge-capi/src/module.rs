//! Module names, comdats and global aliases.

use crate::types::{ComdatIteratorRef, ComdatRef, ContextRef, ModuleRef, ValueRef};
use nativebridge_core::handle::to_c_bool;
use nativebridge_core::message::{borrowed, read_bytes, require_str, write_out};
use nativebridge_host::{Comdat, ComdatSelectionKind, Module};
use std::ffi::c_char;
use std::ptr::NonNull;

/// Cursor over a module's comdats.
///
/// The cursor starts on the first comdat. Adding or removing comdats while
/// a cursor is open shifts what it points at but never makes it unsound:
/// positions past the end read as null.
#[derive(Debug)]
pub struct ComdatIterator {
    module: NonNull<Module>,
    index: usize,
}

impl ComdatIterator {
    fn module(&self) -> &Module {
        // SAFETY: cursors are disposed before their module.
        unsafe { self.module.as_ref() }
    }

    fn current(&self) -> Option<NonNull<Comdat>> {
        self.module().comdat_at(self.index)
    }
}

unsafe fn comdat_name_in<'a>(name: *const c_char, len: usize) -> Option<&'a str> {
    match unsafe { require_str("name", name, len) } {
        Ok(name) => Some(name),
        Err(error) => {
            tracing::debug!(target: "nativebridge", %error, "rejected comdat name");
            None
        }
    }
}

// Lifetime

/// Creates an empty module owned by `context`.
///
/// Returns null for a null context or a null `name` with a non-zero `len`.
/// The module lives until [`nb_module_dispose`] or until its context is
/// disposed.
///
/// # Safety
/// `context` must be null or a live context; `name` must be null or valid
/// for `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_create_with_name(
    context: ContextRef,
    name: *const c_char,
    len: usize,
) -> ModuleRef {
    let (Some(context), Some(bytes)) = (unsafe { context.as_ref() }, unsafe { read_bytes(name, len) }) else {
        return ModuleRef::null();
    };
    context.create_module(&String::from_utf8_lossy(bytes)).into()
}

/// Deletes `module` and every global it still owns. Null is ignored.
///
/// # Safety
/// `module` must be null or a live module. Handles into the module dangle
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_dispose(module: ModuleRef) {
    let Some(ptr) = module.as_non_null() else {
        return;
    };
    // SAFETY: the caller vouches for the module; its context outlives it.
    let context = unsafe { ptr.as_ref().context() };
    unsafe { context.as_ref() }.dispose_module(ptr);
}

// Names

/// Module identifier, borrowed from the module.
///
/// The pointer stays valid until the name changes.
///
/// # Safety
/// `module` must be null or a live module; `len` must be null or valid for a
/// write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_get_name(module: ModuleRef, len: *mut usize) -> *const c_char {
    match unsafe { module.as_ref() } {
        Some(m) => unsafe { borrowed(m.name().as_bytes(), len) },
        None => unsafe { borrowed(&[], len) },
    }
}

/// # Safety
/// `module` must be null or a live module; `name` must be null or valid for
/// `len` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_set_name(module: ModuleRef, name: *const c_char, len: usize) {
    let Some(m) = (unsafe { module.as_ref() }) else {
        return;
    };
    if let Some(bytes) = unsafe { read_bytes(name, len) } {
        m.set_name(&String::from_utf8_lossy(bytes));
    }
}

/// Source file name, borrowed from the module. Defaults to the module name.
///
/// # Safety
/// Same contract as [`nb_module_get_name`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_get_source_file_name(
    module: ModuleRef,
    len: *mut usize,
) -> *const c_char {
    match unsafe { module.as_ref() } {
        Some(m) => unsafe { borrowed(m.source_file_name().as_bytes(), len) },
        None => unsafe { borrowed(&[], len) },
    }
}

/// # Safety
/// Same contract as [`nb_module_set_name`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_set_source_file_name(
    module: ModuleRef,
    name: *const c_char,
    len: usize,
) {
    let Some(m) = (unsafe { module.as_ref() }) else {
        return;
    };
    if let Some(bytes) = unsafe { read_bytes(name, len) } {
        m.set_source_file_name(&String::from_utf8_lossy(bytes));
    }
}

// Comdats

/// # Safety
/// `module` must be null or a live module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_get_num_comdats(module: ModuleRef) -> u32 {
    unsafe { module.as_ref() }.map_or(0, |m| u32::try_from(m.comdat_count()).unwrap_or(u32::MAX))
}

/// Looks a comdat up by name; null when absent.
///
/// # Safety
/// `module` must be null or a live module; `name` must be valid for `len`
/// bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_get_comdat(
    module: ModuleRef,
    name: *const c_char,
    len: usize,
) -> ComdatRef {
    let (Some(m), Some(name)) = (unsafe { module.as_ref() }, unsafe { comdat_name_in(name, len) })
    else {
        return ComdatRef::null();
    };
    ComdatRef::wrap_option(m.comdat(name))
}

/// Creates the comdat `name` or updates its selection kind.
///
/// Returns null for an empty name or an undefined selection kind.
///
/// # Safety
/// `module` must be null or a live module; `name` must be valid for `len`
/// bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_insert_or_update_comdat(
    module: ModuleRef,
    name: *const c_char,
    len: usize,
    kind: u32,
) -> ComdatRef {
    let (Some(m), Some(name)) = (unsafe { module.as_ref() }, unsafe { comdat_name_in(name, len) })
    else {
        return ComdatRef::null();
    };
    match ComdatSelectionKind::try_from(kind) {
        Ok(kind) => ComdatRef::from(m.insert_or_update_comdat(name, kind)),
        Err(error) => {
            tracing::debug!(target: "nativebridge", %error, "rejected comdat selection kind");
            ComdatRef::null()
        }
    }
}

/// Removes and releases `comdat`; the handle dangles afterwards.
///
/// # Safety
/// `module` must be null or a live module; `comdat` must be null or a comdat.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_comdat_remove(module: ModuleRef, comdat: ComdatRef) {
    if let (Some(m), Some(comdat)) = (unsafe { module.as_ref() }, comdat.as_non_null()) {
        m.remove_comdat(comdat);
    }
}

/// Removes every comdat of `module`.
///
/// # Safety
/// `module` must be null or a live module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_comdat_clear(module: ModuleRef) {
    if let Some(m) = unsafe { module.as_ref() } {
        m.clear_comdats();
    }
}

/// # Safety
/// `comdat` must be null or a live comdat; `len` must be null or valid for a
/// write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_comdat_get_name(comdat: ComdatRef, len: *mut usize) -> *const c_char {
    let name = unsafe { comdat.as_ref() }.map_or("", Comdat::name);
    unsafe { borrowed(name.as_bytes(), len) }
}

/// The comdat's `ComdatSelectionKind`, `NB_INVALID_INDEX` for null.
///
/// # Safety
/// `comdat` must be null or a live comdat.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_comdat_get_selection_kind(comdat: ComdatRef) -> u32 {
    unsafe { comdat.as_ref() }.map_or(crate::NB_INVALID_INDEX, |c| c.selection_kind().into())
}

// Comdat iteration

/// Opens a cursor on the first comdat of `module`. Release with
/// [`nb_dispose_comdat_iterator`].
///
/// # Safety
/// `module` must be null or a live module that outlives the cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_begin_comdats(module: ModuleRef) -> ComdatIteratorRef {
    match module.as_non_null() {
        Some(module) => ComdatIteratorRef::from_box(Box::new(ComdatIterator { module, index: 0 })),
        None => ComdatIteratorRef::null(),
    }
}

/// The comdat under the cursor; null once the cursor is past the end.
///
/// # Safety
/// `iterator` must be null or an open cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_comdat_iterator_get_current(iterator: ComdatIteratorRef) -> ComdatRef {
    ComdatRef::wrap_option(unsafe { iterator.as_ref() }.and_then(ComdatIterator::current))
}

/// Advances the cursor. Returns whether it now points at a comdat.
///
/// # Safety
/// `iterator` must be null or an open cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_comdat_iterator_move_next(iterator: ComdatIteratorRef) -> i32 {
    let Some(iterator) = (unsafe { iterator.unwrap().as_mut() }) else {
        return 0;
    };
    if iterator.index < iterator.module().comdat_count() {
        iterator.index += 1;
    }
    to_c_bool(iterator.current().is_some())
}

/// Moves the cursor back to the first comdat.
///
/// # Safety
/// `iterator` must be null or an open cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_comdat_iterator_reset(iterator: ComdatIteratorRef) {
    if let Some(iterator) = unsafe { iterator.unwrap().as_mut() } {
        iterator.index = 0;
    }
}

/// # Safety
/// `iterator` must be null or an open cursor; it is closed afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_dispose_comdat_iterator(iterator: ComdatIteratorRef) {
    unsafe { iterator.dispose() };
}

// Aliases

/// Looks a global alias up by name; null when absent.
///
/// # Safety
/// `module` must be null or a live module; `name` must be valid for `len`
/// bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_get_global_alias(
    module: ModuleRef,
    name: *const c_char,
    len: usize,
) -> ValueRef {
    let Some(m) = (unsafe { module.as_ref() }) else {
        return ValueRef::null();
    };
    match unsafe { require_str("name", name, len) } {
        Ok(name) => ValueRef::wrap_option(m.global_alias(name)),
        Err(_) => ValueRef::null(),
    }
}

/// # Safety
/// `module` must be null or a live module.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_get_first_global_alias(module: ModuleRef) -> ValueRef {
    ValueRef::wrap_option(unsafe { module.as_ref() }.and_then(Module::first_global_alias))
}

/// The alias after `alias` in its module; null at the end or when `alias`
/// is not an alias.
///
/// # Safety
/// `alias` must be null or a live value.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_module_get_next_global_alias(alias: ValueRef) -> ValueRef {
    let Some(value) = (unsafe { alias.as_ref() }) else {
        return ValueRef::null();
    };
    let Some(module) = value.parent() else {
        return ValueRef::null();
    };
    // SAFETY: a linked global's module is live.
    let module = unsafe { module.as_ref() };
    ValueRef::wrap_option(module.next_global_alias(value.into()))
}
