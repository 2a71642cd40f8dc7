//! Attribute catalog and attribute values.
//!
//! Known attributes are identified by a kind id: `0` is the "none" kind,
//! `1..end_attr_kinds()` index the catalog. String attributes have no id.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrArgKind {
    None,
    Int,
    Type,
    ConstantRange,
    ConstantRangeList,
}

#[derive(Debug, Clone, Copy)]
pub struct AttrDef {
    pub name: &'static str,
    pub arg: AttrArgKind,
    pub on_function: bool,
    pub on_parameter: bool,
    pub on_return: bool,
}

const fn def(
    name: &'static str,
    arg: AttrArgKind,
    on_function: bool,
    on_parameter: bool,
    on_return: bool,
) -> AttrDef {
    AttrDef {
        name,
        arg,
        on_function,
        on_parameter,
        on_return,
    }
}

use AttrArgKind as A;

// Grouped by argument kind, each group sorted by name.
static CATALOG: &[AttrDef] = &[
    def("alwaysinline", A::None, true, false, false),
    def("builtin", A::None, true, false, false),
    def("cold", A::None, true, false, false),
    def("convergent", A::None, true, false, false),
    def("hot", A::None, true, false, false),
    def("inlinehint", A::None, true, false, false),
    def("inreg", A::None, false, true, true),
    def("minsize", A::None, true, false, false),
    def("naked", A::None, true, false, false),
    def("nest", A::None, false, true, false),
    def("noalias", A::None, false, true, true),
    def("noinline", A::None, true, false, false),
    def("nonnull", A::None, false, true, true),
    def("norecurse", A::None, true, false, false),
    def("noreturn", A::None, true, false, false),
    def("nounwind", A::None, true, false, false),
    def("optnone", A::None, true, false, false),
    def("optsize", A::None, true, false, false),
    def("readnone", A::None, false, true, false),
    def("readonly", A::None, false, true, false),
    def("returned", A::None, false, true, false),
    def("signext", A::None, false, true, true),
    def("ssp", A::None, true, false, false),
    def("willreturn", A::None, true, false, false),
    def("zeroext", A::None, false, true, true),
    def("byref", A::Type, false, true, false),
    def("byval", A::Type, false, true, false),
    def("elementtype", A::Type, false, true, false),
    def("inalloca", A::Type, false, true, false),
    def("preallocated", A::Type, true, true, false),
    def("sret", A::Type, false, true, false),
    def("align", A::Int, false, true, true),
    def("allocsize", A::Int, true, false, false),
    def("alignstack", A::Int, true, true, false),
    def("dereferenceable", A::Int, false, true, true),
    def("dereferenceable_or_null", A::Int, false, true, true),
    def("memory", A::Int, true, false, false),
    def("uwtable", A::Int, true, false, false),
    def("vscale_range", A::Int, true, false, false),
    def("range", A::ConstantRange, false, true, true),
    def("initializes", A::ConstantRangeList, false, true, false),
];

/// One past the last valid kind id.
pub fn end_attr_kinds() -> u32 {
    CATALOG.len() as u32 + 1
}

/// Number of named kinds (the "none" kind excluded).
pub fn known_count() -> usize {
    CATALOG.len()
}

pub fn known_names() -> impl ExactSizeIterator<Item = &'static str> {
    CATALOG.iter().map(|d| d.name)
}

pub fn definition(kind: u32) -> Option<&'static AttrDef> {
    (kind as usize).checked_sub(1).and_then(|i| CATALOG.get(i))
}

pub fn kind_from_name(name: &str) -> Option<u32> {
    CATALOG
        .iter()
        .position(|d| d.name == name)
        .map(|i| i as u32 + 1)
}

/// # Panics
/// When `kind >= end_attr_kinds()`.
pub fn name_from_kind(kind: u32) -> &'static str {
    assert!(kind < end_attr_kinds(), "attribute kind {kind} out of range");
    definition(kind).map_or("none", |d| d.name)
}

pub(crate) fn assert_arg_kind(kind: u32, expected: AttrArgKind) {
    let def = definition(kind);
    assert!(
        def.is_some_and(|d| d.arg == expected),
        "attribute kind {kind} does not take a {expected:?} argument"
    );
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttributeData {
    Enum(u32),
    Int(u32, u64),
    Type(u32, String),
    Range(u32, u32, (i64, i64)),
    RangeList(u32, Vec<(i64, i64)>),
    String(String, String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    data: AttributeData,
}

impl Attribute {
    pub(crate) fn new(data: AttributeData) -> Self {
        Self { data }
    }

    /// Kind id, `0` for string attributes.
    pub fn kind_id(&self) -> u32 {
        match self.data {
            AttributeData::Enum(kind)
            | AttributeData::Int(kind, _)
            | AttributeData::Type(kind, _)
            | AttributeData::Range(kind, ..)
            | AttributeData::RangeList(kind, _) => kind,
            AttributeData::String(..) => 0,
        }
    }

    pub fn is_string_attribute(&self) -> bool {
        matches!(self.data, AttributeData::String(..))
    }

    pub fn is_constant_range_attribute(&self) -> bool {
        matches!(self.data, AttributeData::Range(..))
    }

    pub fn is_constant_range_list_attribute(&self) -> bool {
        matches!(self.data, AttributeData::RangeList(..))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            AttributeData::Enum(kind) => f.write_str(name_from_kind(*kind)),
            AttributeData::Int(kind, value) => match name_from_kind(*kind) {
                name @ ("align" | "alignstack") => write!(f, "{name} {value}"),
                name => write!(f, "{name}({value})"),
            },
            AttributeData::Type(kind, ty) => write!(f, "{}({ty})", name_from_kind(*kind)),
            AttributeData::Range(kind, bits, (lower, upper)) => {
                write!(f, "{}(i{bits} {lower}, {upper})", name_from_kind(*kind))
            }
            AttributeData::RangeList(kind, ranges) => {
                write!(f, "{}(", name_from_kind(*kind))?;
                for (i, (lower, upper)) in ranges.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "({lower}, {upper})")?;
                }
                f.write_str(")")
            }
            AttributeData::String(key, value) if value.is_empty() => write!(f, "{key:?}"),
            AttributeData::String(key, value) => write!(f, "{key:?}={value:?}"),
        }
    }
}
