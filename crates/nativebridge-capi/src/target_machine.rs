//! Read-only target machine and target machine option queries.
//!
//! Enumerations are returned as their `u32` discriminant. A null handle
//! reads as the default configuration.

use crate::types::{TargetMachineOptionsRef, TargetMachineRef};
use nativebridge_core::handle::to_c_bool;
use nativebridge_core::message::borrowed;
use nativebridge_host::target::{CodeGenOptLevel, CodeModel, GlobalISelAbortMode, RelocMode};
use nativebridge_host::{TargetMachine, TargetMachineOptions};
use std::ffi::c_char;

unsafe fn machine<'a>(tm: TargetMachineRef) -> Option<&'a TargetMachine> {
    unsafe { tm.as_ref() }
}

unsafe fn options<'a>(options: TargetMachineOptionsRef) -> Option<&'a TargetMachineOptions> {
    unsafe { options.as_ref() }
}

/// # Safety
/// `tm` must be null or a live target machine.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_target_machine_asm_verbosity(tm: TargetMachineRef) -> i32 {
    to_c_bool(unsafe { machine(tm) }.is_some_and(|tm| tm.asm_verbose))
}

/// # Safety
/// `tm` must be null or a live target machine.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_target_machine_fast_isel(tm: TargetMachineRef) -> i32 {
    to_c_bool(unsafe { machine(tm) }.is_some_and(|tm| tm.fast_isel))
}

/// # Safety
/// `tm` must be null or a live target machine.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_target_machine_global_isel(tm: TargetMachineRef) -> i32 {
    to_c_bool(unsafe { machine(tm) }.is_some_and(|tm| tm.global_isel))
}

/// # Safety
/// `tm` must be null or a live target machine.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_target_machine_global_isel_abort(tm: TargetMachineRef) -> u32 {
    unsafe { machine(tm) }.map_or(GlobalISelAbortMode::default(), |tm| tm.global_isel_abort) as u32
}

/// # Safety
/// `tm` must be null or a live target machine.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_target_machine_machine_outliner(tm: TargetMachineRef) -> i32 {
    to_c_bool(unsafe { machine(tm) }.is_some_and(|tm| tm.machine_outliner))
}

/// # Safety
/// `tm` must be null or a live target machine; `len` must be null or valid
/// for a write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_target_machine_triple(tm: TargetMachineRef, len: *mut usize) -> *const c_char {
    let triple = unsafe { machine(tm) }.map_or("", |tm| tm.triple.as_str());
    unsafe { borrowed(triple.as_bytes(), len) }
}

/// CPU name, borrowed from the options.
///
/// # Safety
/// `opts` must be null or live options; `len` must be null or valid for a
/// write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_target_machine_options_get_cpu(
    opts: TargetMachineOptionsRef,
    len: *mut usize,
) -> *const c_char {
    let cpu = unsafe { options(opts) }.map_or("", |o| o.cpu.as_str());
    unsafe { borrowed(cpu.as_bytes(), len) }
}

/// Feature string, borrowed from the options.
///
/// # Safety
/// Same contract as [`nb_target_machine_options_get_cpu`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_target_machine_options_get_features(
    opts: TargetMachineOptionsRef,
    len: *mut usize,
) -> *const c_char {
    let features = unsafe { options(opts) }.map_or("", |o| o.features.as_str());
    unsafe { borrowed(features.as_bytes(), len) }
}

/// ABI name, borrowed from the options.
///
/// # Safety
/// Same contract as [`nb_target_machine_options_get_cpu`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_target_machine_options_get_abi(
    opts: TargetMachineOptionsRef,
    len: *mut usize,
) -> *const c_char {
    let abi = unsafe { options(opts) }.map_or("", |o| o.abi.as_str());
    unsafe { borrowed(abi.as_bytes(), len) }
}

/// # Safety
/// `opts` must be null or live options.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_target_machine_options_get_code_gen_opt_level(opts: TargetMachineOptionsRef) -> u32 {
    unsafe { options(opts) }.map_or(CodeGenOptLevel::default(), |o| o.opt_level) as u32
}

/// # Safety
/// `opts` must be null or live options.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_target_machine_options_get_reloc_mode(opts: TargetMachineOptionsRef) -> u32 {
    unsafe { options(opts) }.map_or(RelocMode::default(), |o| o.reloc_mode) as u32
}

/// # Safety
/// `opts` must be null or live options.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_target_machine_options_get_code_model(opts: TargetMachineOptionsRef) -> u32 {
    unsafe { options(opts) }.map_or(CodeModel::default(), |o| o.code_model) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(ptr: *const c_char, len: usize) -> String {
        if ptr.is_null() {
            return String::new();
        }
        let bytes = unsafe { std::slice::from_raw_parts(ptr.cast::<u8>(), len) };
        String::from_utf8_lossy(bytes).into_owned()
    }

    fn sample_options() -> TargetMachineOptions {
        TargetMachineOptions {
            cpu: "skylake".into(),
            features: "+avx2,-sse4a".into(),
            abi: String::new(),
            opt_level: CodeGenOptLevel::Aggressive,
            reloc_mode: RelocMode::Pic,
            code_model: CodeModel::Small,
        }
    }

    #[test]
    fn machine_flags() {
        let mut tm = TargetMachine::new("x86_64-pc-linux-gnu", sample_options());
        tm.asm_verbose = true;
        tm.global_isel = true;
        tm.global_isel_abort = GlobalISelAbortMode::DisableWithDiag;
        let handle = TargetMachineRef::wrap_ref(&tm);

        assert_eq!(unsafe { nb_get_target_machine_asm_verbosity(handle) }, 1);
        assert_eq!(unsafe { nb_get_target_machine_fast_isel(handle) }, 0);
        assert_eq!(unsafe { nb_get_target_machine_global_isel(handle) }, 1);
        assert_eq!(unsafe { nb_get_target_machine_global_isel_abort(handle) }, 2);
        assert_eq!(unsafe { nb_get_target_machine_machine_outliner(handle) }, 0);

        let mut len = 0usize;
        let triple = unsafe { nb_get_target_machine_triple(handle, &mut len) };
        assert_eq!(read(triple, len), "x86_64-pc-linux-gnu");
    }

    #[test]
    fn option_strings_are_borrowed() {
        let opts = sample_options();
        let handle = TargetMachineOptionsRef::wrap_ref(&opts);
        let mut len = 0usize;

        let cpu = unsafe { nb_target_machine_options_get_cpu(handle, &mut len) };
        assert_eq!(cpu.cast::<u8>(), opts.cpu.as_ptr());
        assert_eq!(read(cpu, len), "skylake");

        let features = unsafe { nb_target_machine_options_get_features(handle, &mut len) };
        assert_eq!(read(features, len), "+avx2,-sse4a");

        let abi = unsafe { nb_target_machine_options_get_abi(handle, &mut len) };
        assert!(abi.is_null());
        assert_eq!(len, 0);
    }

    #[test]
    fn option_enums() {
        let opts = sample_options();
        let handle = TargetMachineOptionsRef::wrap_ref(&opts);
        assert_eq!(unsafe { nb_target_machine_options_get_code_gen_opt_level(handle) }, 3);
        assert_eq!(unsafe { nb_target_machine_options_get_reloc_mode(handle) }, 2);
        assert_eq!(unsafe { nb_target_machine_options_get_code_model(handle) }, 3);

        let null = TargetMachineOptionsRef::null();
        assert_eq!(unsafe { nb_target_machine_options_get_code_gen_opt_level(null) }, 2);
        assert_eq!(unsafe { nb_target_machine_options_get_reloc_mode(null) }, 0);
    }
}
