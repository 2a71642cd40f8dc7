//! Object file cursors.
//!
//! Section, symbol and relocation cursors are owned by the caller and closed
//! with their `nb_dispose_*` function. A cursor shares the file's data, so
//! names read through it stay valid while any cursor over the file is open.
//! `*_clone` makes an independent cursor at the same position.

use crate::types::{ObjectFileRef, RelocationIteratorRef, SectionIteratorRef, SymbolIteratorRef};
use nativebridge_core::handle::to_c_bool;
use nativebridge_core::message::borrowed;
use std::ffi::c_char;

// Sections

/// Opens a cursor on the first section of `object`.
///
/// # Safety
/// `object` must be null or a live object file.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_object_file_sections(object: ObjectFileRef) -> SectionIteratorRef {
    match unsafe { object.as_ref() } {
        Some(object) => SectionIteratorRef::from_box(Box::new(object.sections())),
        None => SectionIteratorRef::null(),
    }
}

/// # Safety
/// `iterator` must be null or an open section cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_section_iterator_clone(iterator: SectionIteratorRef) -> SectionIteratorRef {
    match unsafe { iterator.as_ref() } {
        Some(it) => SectionIteratorRef::from_box(Box::new(it.object_file().section_at(it.position()))),
        None => SectionIteratorRef::null(),
    }
}

/// # Safety
/// `iterator` must be null or an open section cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_section_iterator_move_next(iterator: SectionIteratorRef) {
    if let Some(it) = unsafe { iterator.unwrap().as_mut() } {
        it.move_next();
    }
}

/// Null cursors count as exhausted.
///
/// # Safety
/// `iterator` must be null or an open section cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_section_iterator_is_at_end(iterator: SectionIteratorRef) -> i32 {
    to_c_bool(unsafe { iterator.as_ref() }.is_none_or(|it| it.is_at_end()))
}

/// # Safety
/// `iterator` must be null or an open section cursor; `len` must be null or
/// valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_section_iterator_get_name(
    iterator: SectionIteratorRef,
    len: *mut usize,
) -> *const c_char {
    let section = unsafe { iterator.as_ref() }.and_then(|it| it.current());
    unsafe { borrowed(section.map_or("", |s| s.name.as_str()).as_bytes(), len) }
}

/// # Safety
/// `iterator` must be null or an open section cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_section_iterator_get_address(iterator: SectionIteratorRef) -> u64 {
    unsafe { iterator.as_ref() }
        .and_then(|it| it.current())
        .map_or(0, |s| s.address)
}

/// Section contents, borrowed from the file.
///
/// # Safety
/// `iterator` must be null or an open section cursor; `len` must be null or
/// valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_section_iterator_get_contents(
    iterator: SectionIteratorRef,
    len: *mut usize,
) -> *const c_char {
    let section = unsafe { iterator.as_ref() }.and_then(|it| it.current());
    unsafe { borrowed(section.map_or(&[][..], |s| s.contents.as_slice()), len) }
}

/// # Safety
/// `iterator` must be null or an open section cursor; it is closed
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_dispose_section_iterator(iterator: SectionIteratorRef) {
    unsafe { iterator.dispose() };
}

// Symbols

/// Opens a cursor on the first symbol of `object`.
///
/// # Safety
/// `object` must be null or a live object file.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_object_file_symbols(object: ObjectFileRef) -> SymbolIteratorRef {
    match unsafe { object.as_ref() } {
        Some(object) => SymbolIteratorRef::from_box(Box::new(object.symbols())),
        None => SymbolIteratorRef::null(),
    }
}

/// # Safety
/// `iterator` must be null or an open symbol cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_iterator_clone(iterator: SymbolIteratorRef) -> SymbolIteratorRef {
    match unsafe { iterator.as_ref() } {
        Some(it) => SymbolIteratorRef::from_box(Box::new(it.object_file().symbol_at(it.position()))),
        None => SymbolIteratorRef::null(),
    }
}

/// # Safety
/// `iterator` must be null or an open symbol cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_iterator_move_next(iterator: SymbolIteratorRef) {
    if let Some(it) = unsafe { iterator.unwrap().as_mut() } {
        it.move_next();
    }
}

/// # Safety
/// `iterator` must be null or an open symbol cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_iterator_is_at_end(iterator: SymbolIteratorRef) -> i32 {
    to_c_bool(unsafe { iterator.as_ref() }.is_none_or(|it| it.is_at_end()))
}

/// # Safety
/// `iterator` must be null or an open symbol cursor; `len` must be null or
/// valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_iterator_get_name(
    iterator: SymbolIteratorRef,
    len: *mut usize,
) -> *const c_char {
    let symbol = unsafe { iterator.as_ref() }.and_then(|it| it.current());
    unsafe { borrowed(symbol.map_or("", |s| s.name.as_str()).as_bytes(), len) }
}

/// # Safety
/// `iterator` must be null or an open symbol cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_symbol_iterator_get_address(iterator: SymbolIteratorRef) -> u64 {
    unsafe { iterator.as_ref() }
        .and_then(|it| it.current())
        .map_or(0, |s| s.address)
}

/// # Safety
/// `iterator` must be null or an open symbol cursor; it is closed afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_dispose_symbol_iterator(iterator: SymbolIteratorRef) {
    unsafe { iterator.dispose() };
}

// Relocations

/// Opens a cursor on the relocations of the section under `section`.
///
/// # Safety
/// `section` must be null or an open section cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_section_relocations(section: SectionIteratorRef) -> RelocationIteratorRef {
    match unsafe { section.as_ref() } {
        Some(it) => RelocationIteratorRef::from_box(Box::new(it.relocations())),
        None => RelocationIteratorRef::null(),
    }
}

/// # Safety
/// `iterator` must be null or an open relocation cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_relocation_iterator_clone(
    iterator: RelocationIteratorRef,
) -> RelocationIteratorRef {
    match unsafe { iterator.as_ref() } {
        Some(it) => RelocationIteratorRef::from_box(Box::new(it.at_same_position())),
        None => RelocationIteratorRef::null(),
    }
}

/// # Safety
/// `iterator` must be null or an open relocation cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_relocation_iterator_move_next(iterator: RelocationIteratorRef) {
    if let Some(it) = unsafe { iterator.unwrap().as_mut() } {
        it.move_next();
    }
}

/// # Safety
/// `iterator` must be null or an open relocation cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_relocation_iterator_is_at_end(iterator: RelocationIteratorRef) -> i32 {
    to_c_bool(unsafe { iterator.as_ref() }.is_none_or(|it| it.is_at_end()))
}

/// Name of the symbol the current relocation targets; null when it has
/// none.
///
/// # Safety
/// `iterator` must be null or an open relocation cursor; `len` must be null
/// or valid for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_relocation_iterator_get_symbol_name(
    iterator: RelocationIteratorRef,
    len: *mut usize,
) -> *const c_char {
    let name = unsafe { iterator.as_ref() }.and_then(|it| it.symbol_name());
    unsafe { borrowed(name.unwrap_or_default().as_bytes(), len) }
}

/// # Safety
/// `iterator` must be null or an open relocation cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_relocation_iterator_get_offset(iterator: RelocationIteratorRef) -> u64 {
    unsafe { iterator.as_ref() }
        .and_then(|it| it.current())
        .map_or(0, |r| r.offset)
}

/// # Safety
/// `iterator` must be null or an open relocation cursor.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_relocation_iterator_get_type(iterator: RelocationIteratorRef) -> u32 {
    unsafe { iterator.as_ref() }
        .and_then(|it| it.current())
        .map_or(0, |r| r.kind)
}

/// # Safety
/// `iterator` must be null or an open relocation cursor; it is closed
/// afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_dispose_relocation_iterator(iterator: RelocationIteratorRef) {
    unsafe { iterator.dispose() };
}
