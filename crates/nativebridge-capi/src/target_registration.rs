//! Code generation target registration.
//!
//! The set of targets a build supports is fixed at compile time by the
//! `target-*` cargo features. `Native` (the host architecture) and `All`
//! are always accepted.

use bitflags::bitflags;
use nativebridge_core::error::error_ref;
use nativebridge_core::sizing::{capacity_from_i32, fill_array};
use nativebridge_core::{BridgeError, BridgeResult, ErrorRef, FlagsExt};
use nativebridge_host::target::{self, RegistrationStep};
use num_enum::{IntoPrimitive, TryFromPrimitive};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(i32)]
pub enum CodeGenTarget {
    None = 0,
    Native,
    AArch64,
    AMDGPU,
    ARM,
    AVR,
    BPF,
    Hexagon,
    Lanai,
    LoongArch,
    MIPS,
    MSP430,
    NVPTX,
    PowerPC,
    RISCV,
    Sparc,
    SPIRV,
    SystemZ,
    VE,
    WebAssembly,
    X86,
    XCore,
    All = i32::MAX,
}

impl CodeGenTarget {
    pub const fn name(self) -> &'static str {
        match self {
            CodeGenTarget::None => "None",
            CodeGenTarget::Native => "Native",
            CodeGenTarget::AArch64 => "AArch64",
            CodeGenTarget::AMDGPU => "AMDGPU",
            CodeGenTarget::ARM => "ARM",
            CodeGenTarget::AVR => "AVR",
            CodeGenTarget::BPF => "BPF",
            CodeGenTarget::Hexagon => "Hexagon",
            CodeGenTarget::Lanai => "Lanai",
            CodeGenTarget::LoongArch => "LoongArch",
            CodeGenTarget::MIPS => "MIPS",
            CodeGenTarget::MSP430 => "MSP430",
            CodeGenTarget::NVPTX => "NVPTX",
            CodeGenTarget::PowerPC => "PowerPC",
            CodeGenTarget::RISCV => "RISCV",
            CodeGenTarget::Sparc => "Sparc",
            CodeGenTarget::SPIRV => "SPIRV",
            CodeGenTarget::SystemZ => "SystemZ",
            CodeGenTarget::VE => "VE",
            CodeGenTarget::WebAssembly => "WebAssembly",
            CodeGenTarget::X86 => "X86",
            CodeGenTarget::XCore => "XCore",
            CodeGenTarget::All => "All",
        }
    }
}

bitflags! {
    /// Registration steps. Bits outside the declared flags are ignored.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(transparent)]
    pub struct TargetRegistrationKind: u32 {
        const TARGET = 0x01;
        const TARGET_INFO = 0x02;
        const TARGET_MACHINE = 0x04;
        const ASM_PRINTER = 0x08;
        const DISASSEMBLER = 0x10;
        const ASM_PARSER = 0x20;
        const CODE_GEN_REGISTRATION = Self::TARGET.bits() | Self::TARGET_INFO.bits() | Self::TARGET_MACHINE.bits();
        const ALL = Self::CODE_GEN_REGISTRATION.bits()
            | Self::ASM_PRINTER.bits()
            | Self::DISASSEMBLER.bits()
            | Self::ASM_PARSER.bits();
    }
}

/// Targets compiled into this build, in enum order.
pub const AVAILABLE_TARGETS: &[CodeGenTarget] = &[
    #[cfg(feature = "target-aarch64")]
    CodeGenTarget::AArch64,
    #[cfg(feature = "target-arm")]
    CodeGenTarget::ARM,
    #[cfg(feature = "target-riscv")]
    CodeGenTarget::RISCV,
    #[cfg(feature = "target-webassembly")]
    CodeGenTarget::WebAssembly,
    #[cfg(feature = "target-x86")]
    CodeGenTarget::X86,
];

/// Registration name of the host architecture.
const fn native_target_name() -> &'static str {
    if cfg!(any(target_arch = "x86_64", target_arch = "x86")) {
        CodeGenTarget::X86.name()
    } else if cfg!(target_arch = "aarch64") {
        CodeGenTarget::AArch64.name()
    } else if cfg!(target_arch = "arm") {
        CodeGenTarget::ARM.name()
    } else if cfg!(any(target_arch = "riscv64", target_arch = "riscv32")) {
        CodeGenTarget::RISCV.name()
    } else if cfg!(target_arch = "wasm32") {
        CodeGenTarget::WebAssembly.name()
    } else {
        CodeGenTarget::Native.name()
    }
}

const STEPS: [(TargetRegistrationKind, RegistrationStep); 6] = [
    (TargetRegistrationKind::TARGET, RegistrationStep::Target),
    (TargetRegistrationKind::TARGET_INFO, RegistrationStep::TargetInfo),
    (TargetRegistrationKind::TARGET_MACHINE, RegistrationStep::TargetMachine),
    (TargetRegistrationKind::ASM_PRINTER, RegistrationStep::AsmPrinter),
    (TargetRegistrationKind::DISASSEMBLER, RegistrationStep::Disassembler),
    (TargetRegistrationKind::ASM_PARSER, RegistrationStep::AsmParser),
];

fn register_steps(name: &'static str, kinds: TargetRegistrationKind) {
    for (flag, step) in STEPS {
        if kinds.are_all_flags_set(flag) {
            target::register(name, step);
        }
    }
}

// The host target's code generation pieces come as one unit: any of the
// three code generation bits registers all of them.
fn register_native(kinds: TargetRegistrationKind) {
    let mut kinds = kinds;
    if kinds.are_any_flags_set(TargetRegistrationKind::CODE_GEN_REGISTRATION) {
        kinds |= TargetRegistrationKind::CODE_GEN_REGISTRATION;
    }
    register_steps(native_target_name(), kinds);
}

fn validate(raw: i32) -> BridgeResult<CodeGenTarget> {
    let target = match CodeGenTarget::try_from(raw) {
        Ok(CodeGenTarget::None) | Err(_) => {
            return Err(BridgeError::OutOfRange {
                name: "target",
                value: i64::from(raw),
            });
        }
        Ok(target) => target,
    };
    let supported = matches!(target, CodeGenTarget::Native | CodeGenTarget::All)
        || AVAILABLE_TARGETS.contains(&target);
    if !supported {
        return Err(BridgeError::Unsupported(format!("target {}", target.name())));
    }
    Ok(target)
}

fn register_target(raw: i32, kinds: u32) -> BridgeResult<()> {
    let target = validate(raw)?;
    let kinds = TargetRegistrationKind::from_bits_truncate(kinds);
    match target {
        CodeGenTarget::Native => register_native(kinds),
        CodeGenTarget::All => {
            for target in AVAILABLE_TARGETS {
                register_steps(target.name(), kinds);
            }
        }
        target => register_steps(target.name(), kinds),
    }
    Ok(())
}

/// Registers the requested steps for `target`.
///
/// Fails for values outside `CodeGenTarget` (including `None`) and for
/// targets not compiled into this build. Undeclared bits in `kinds` are
/// ignored. Registration is idempotent.
#[unsafe(no_mangle)]
pub extern "C" fn nb_register_target(target: i32, kinds: u32) -> ErrorRef {
    error_ref(register_target(target, kinds))
}

/// Number of entries [`nb_get_runtime_targets`] writes.
#[unsafe(no_mangle)]
pub extern "C" fn nb_get_num_targets() -> i32 {
    AVAILABLE_TARGETS.len() as i32
}

/// Fills `targets` with the targets compiled into this build.
///
/// Fails without writing when `len` is below [`nb_get_num_targets`].
///
/// # Safety
/// `targets` must be valid for `len` element writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn nb_get_runtime_targets(targets: *mut CodeGenTarget, len: i32) -> ErrorRef {
    error_ref(capacity_from_i32("targets", len).and_then(|capacity| unsafe {
        fill_array("targets", targets, capacity, AVAILABLE_TARGETS)
    }))
}
