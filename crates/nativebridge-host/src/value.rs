//! Values: arguments, constants, globals and instructions.

use crate::context::Context;
use crate::module::Module;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::ptr::NonNull;

/// Discriminant reported for a value, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ValueKind {
    Argument = 0,
    Function = 1,
    GlobalAlias = 2,
    GlobalVariable = 3,
    ConstantDataArray = 4,
    ConstantInt = 5,
    ConstantPointerNull = 6,
    Instruction = 7,
}

/// Packed element data of a constant array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSequence {
    element_bits: u32,
    raw: Vec<u8>,
}

impl DataSequence {
    pub(crate) fn new(element_bits: u32, raw: Vec<u8>) -> Self {
        assert!(
            matches!(element_bits, 8 | 16 | 32 | 64),
            "unsupported element width {element_bits}"
        );
        assert!(
            raw.len() % (element_bits as usize / 8) == 0,
            "raw data is not a whole number of elements"
        );
        Self { element_bits, raw }
    }

    pub fn element_bits(&self) -> u32 {
        self.element_bits
    }

    pub fn element_count(&self) -> usize {
        self.raw.len() / (self.element_bits as usize / 8)
    }

    pub fn raw_data(&self) -> &[u8] {
        &self.raw
    }

    /// An `i8` sequence whose only NUL is the last element.
    pub fn is_cstring(&self) -> bool {
        match self.raw.split_last() {
            Some((0, body)) if self.element_bits == 8 => !body.contains(&0),
            _ => false,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.raw.iter().all(|b| *b == 0)
    }
}

pub(crate) enum ValueData {
    Argument { index: u32 },
    ConstantInt { bits: u32, value: u64 },
    ConstantPointerNull,
    ConstantData(DataSequence),
    GlobalVariable,
    GlobalAlias { aliasee: Cell<Option<NonNull<Value>>> },
    Function { arguments: Box<[NonNull<Value>]> },
    Instruction { debug_records: Cell<u32> },
}

pub struct Value {
    context: NonNull<Context>,
    name: RefCell<String>,
    parent: Cell<Option<NonNull<Module>>>,
    data: ValueData,
}

impl Value {
    pub(crate) fn new(context: NonNull<Context>, name: &str, data: ValueData) -> Self {
        Self {
            context,
            name: RefCell::new(name.to_owned()),
            parent: Cell::new(None),
            data,
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self.data {
            ValueData::Argument { .. } => ValueKind::Argument,
            ValueData::ConstantInt { .. } => ValueKind::ConstantInt,
            ValueData::ConstantPointerNull => ValueKind::ConstantPointerNull,
            ValueData::ConstantData(_) => ValueKind::ConstantDataArray,
            ValueData::GlobalVariable => ValueKind::GlobalVariable,
            ValueData::GlobalAlias { .. } => ValueKind::GlobalAlias,
            ValueData::Function { .. } => ValueKind::Function,
            ValueData::Instruction { .. } => ValueKind::Instruction,
        }
    }

    pub fn context(&self) -> NonNull<Context> {
        self.context
    }

    pub fn name(&self) -> Ref<'_, str> {
        Ref::map(self.name.borrow(), String::as_str)
    }

    pub fn set_name(&self, name: &str) {
        *self.name.borrow_mut() = name.to_owned();
    }

    /// Owning module of a global, `None` once removed from it.
    pub fn parent(&self) -> Option<NonNull<Module>> {
        self.parent.get()
    }

    pub(crate) fn set_parent(&self, parent: Option<NonNull<Module>>) {
        self.parent.set(parent);
    }

    pub fn is_global(&self) -> bool {
        matches!(
            self.data,
            ValueData::GlobalVariable | ValueData::GlobalAlias { .. } | ValueData::Function { .. }
        )
    }

    /// Globals count as constants, as their address is.
    pub fn is_constant(&self) -> bool {
        !matches!(
            self.data,
            ValueData::Argument { .. } | ValueData::Instruction { .. }
        )
    }

    pub fn is_zero_value(&self) -> bool {
        match &self.data {
            ValueData::ConstantInt { value, .. } => *value == 0,
            ValueData::ConstantPointerNull => true,
            ValueData::ConstantData(data) => data.is_zero(),
            _ => false,
        }
    }

    pub fn int_value(&self) -> Option<u64> {
        match self.data {
            ValueData::ConstantInt { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn argument_index(&self) -> Option<u32> {
        match self.data {
            ValueData::Argument { index } => Some(index),
            _ => None,
        }
    }

    pub fn arguments(&self) -> &[NonNull<Value>] {
        match &self.data {
            ValueData::Function { arguments } => arguments,
            _ => &[],
        }
    }

    pub fn aliasee(&self) -> Option<NonNull<Value>> {
        match &self.data {
            ValueData::GlobalAlias { aliasee } => aliasee.get(),
            _ => None,
        }
    }

    pub(crate) fn set_aliasee(&self, target: Option<NonNull<Value>>) {
        if let ValueData::GlobalAlias { aliasee } = &self.data {
            aliasee.set(target);
        }
    }

    pub fn data_sequence(&self) -> Option<&DataSequence> {
        match &self.data {
            ValueData::ConstantData(data) => Some(data),
            _ => None,
        }
    }

    /// Debug records attached to an instruction; `None` for other values.
    pub fn debug_record_count(&self) -> Option<u32> {
        match &self.data {
            ValueData::Instruction { debug_records } => Some(debug_records.get()),
            _ => None,
        }
    }

    pub fn attach_debug_record(&self) {
        match &self.data {
            ValueData::Instruction { debug_records } => debug_records.set(debug_records.get() + 1),
            _ => panic!("debug records can only be attached to instructions"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("kind", &self.kind())
            .field("name", &&*self.name())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            ValueData::ConstantInt { bits, value } => write!(f, "i{bits} {value}"),
            ValueData::ConstantPointerNull => f.write_str("ptr null"),
            ValueData::ConstantData(data) if data.element_bits == 8 => {
                write!(f, "[{} x i8] c\"", data.element_count())?;
                for byte in &data.raw {
                    match byte {
                        b' '..=b'~' if *byte != b'"' && *byte != b'\\' => {
                            write!(f, "{}", *byte as char)?
                        }
                        _ => write!(f, "\\{byte:02X}")?,
                    }
                }
                f.write_str("\"")
            }
            ValueData::ConstantData(data) => {
                write!(f, "[{} x i{}] <data>", data.element_count(), data.element_bits)
            }
            ValueData::GlobalVariable
            | ValueData::GlobalAlias { .. }
            | ValueData::Function { .. } => write!(f, "ptr @{}", self.name()),
            ValueData::Argument { index } => match &*self.name() {
                "" => write!(f, "%{index}"),
                name => write!(f, "%{name}"),
            },
            ValueData::Instruction { .. } => write!(f, "%{}", self.name()),
        }
    }
}
