//! Target registration log and target machines.
//!
//! Registration is process-global: every step is recorded once, repeated
//! registrations are idempotent.

use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RegistrationStep {
    Target,
    TargetInfo,
    TargetMachine,
    AsmPrinter,
    Disassembler,
    AsmParser,
}

impl fmt::Display for RegistrationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RegistrationStep::Target => "target",
            RegistrationStep::TargetInfo => "target info",
            RegistrationStep::TargetMachine => "target machine",
            RegistrationStep::AsmPrinter => "asm printer",
            RegistrationStep::Disassembler => "disassembler",
            RegistrationStep::AsmParser => "asm parser",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Registration {
    pub target: &'static str,
    pub step: RegistrationStep,
}

static REGISTRATIONS: Mutex<Vec<Registration>> = Mutex::new(Vec::new());

/// Records `step` for `target`. Returns `false` if it was already recorded.
pub fn register(target: &'static str, step: RegistrationStep) -> bool {
    let mut log = REGISTRATIONS.lock().unwrap_or_else(PoisonError::into_inner);
    let entry = Registration { target, step };
    if log.contains(&entry) {
        return false;
    }
    tracing::info!(target: "nativebridge::host", target_name = target, %step, "registered");
    log.push(entry);
    true
}

pub fn is_registered(target: &str, step: RegistrationStep) -> bool {
    REGISTRATIONS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .any(|r| r.target == target && r.step == step)
}

pub fn registrations() -> Vec<Registration> {
    REGISTRATIONS
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum CodeGenOptLevel {
    None = 0,
    Less = 1,
    #[default]
    Default = 2,
    Aggressive = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum RelocMode {
    #[default]
    Default = 0,
    Static = 1,
    Pic = 2,
    DynamicNoPic = 3,
    Ropi = 4,
    Rwpi = 5,
    RopiRwpi = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum CodeModel {
    #[default]
    Default = 0,
    JitDefault = 1,
    Tiny = 2,
    Small = 3,
    Kernel = 4,
    Medium = 5,
    Large = 6,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u32)]
pub enum GlobalISelAbortMode {
    #[default]
    Enable = 0,
    Disable = 1,
    DisableWithDiag = 2,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetMachineOptions {
    pub cpu: String,
    pub features: String,
    pub abi: String,
    pub opt_level: CodeGenOptLevel,
    pub reloc_mode: RelocMode,
    pub code_model: CodeModel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMachine {
    pub triple: String,
    pub options: TargetMachineOptions,
    pub asm_verbose: bool,
    pub fast_isel: bool,
    pub global_isel: bool,
    pub global_isel_abort: GlobalISelAbortMode,
    pub machine_outliner: bool,
}

impl TargetMachine {
    pub fn new(triple: &str, options: TargetMachineOptions) -> Self {
        Self {
            triple: triple.to_owned(),
            options,
            asm_verbose: false,
            fast_isel: false,
            global_isel: false,
            global_isel_abort: GlobalISelAbortMode::default(),
            machine_outliner: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_is_idempotent() {
        assert!(register("host-test-target", RegistrationStep::AsmPrinter));
        assert!(!register("host-test-target", RegistrationStep::AsmPrinter));
        assert!(is_registered("host-test-target", RegistrationStep::AsmPrinter));
        assert!(!is_registered("host-test-target", RegistrationStep::AsmParser));
        assert_eq!(
            registrations()
                .iter()
                .filter(|r| r.target == "host-test-target")
                .count(),
            1
        );
    }

    #[test]
    fn machine_defaults() {
        let machine = TargetMachine::new("x86_64-pc-linux", TargetMachineOptions::default());
        assert_eq!(machine.options.opt_level, CodeGenOptLevel::Default);
        assert_eq!(machine.options.code_model, CodeModel::Default);
        assert!(!machine.fast_isel);
    }
}
