//! Metadata: strings, tuples and value wrappers.

use crate::context::Context;
use crate::value::Value;
use std::cell::Cell;
use std::fmt;
use std::ptr::NonNull;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MetadataKind {
    MdString = 0,
    ConstantAsMetadata = 1,
    LocalAsMetadata = 2,
    MdTuple = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStorage {
    Uniqued,
    Distinct,
    Temporary,
}

/// One operand slot of a node. Slots never move, so a pointer to one stays
/// valid for the life of the node.
#[derive(Debug, Default)]
pub struct MdOperand {
    target: Cell<Option<NonNull<Metadata>>>,
}

impl MdOperand {
    pub fn get(&self) -> Option<NonNull<Metadata>> {
        self.target.get()
    }
}

#[derive(Debug)]
pub struct MdNode {
    storage: Cell<NodeStorage>,
    operands: Box<[MdOperand]>,
}

impl MdNode {
    pub(crate) fn new(storage: NodeStorage, operands: &[Option<NonNull<Metadata>>]) -> Self {
        Self {
            storage: Cell::new(storage),
            operands: operands
                .iter()
                .map(|op| MdOperand {
                    target: Cell::new(*op),
                })
                .collect(),
        }
    }

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    /// # Panics
    /// When `index` is out of range.
    pub fn operand(&self, index: usize) -> &MdOperand {
        &self.operands[index]
    }

    /// # Panics
    /// When `index` is out of range.
    pub fn replace_operand_with(&self, index: usize, target: Option<NonNull<Metadata>>) {
        self.operands[index].target.set(target);
    }

    pub fn storage(&self) -> NodeStorage {
        self.storage.get()
    }

    pub fn is_temporary(&self) -> bool {
        self.storage() == NodeStorage::Temporary
    }

    pub fn is_distinct(&self) -> bool {
        self.storage() == NodeStorage::Distinct
    }

    pub fn is_uniqued(&self) -> bool {
        self.storage() == NodeStorage::Uniqued
    }

    /// Turns a temporary node into a uniqued one.
    pub fn make_uniqued(&self) {
        self.storage.set(NodeStorage::Uniqued);
    }

    /// Permanent, with no temporary node among its direct operands.
    pub fn is_resolved(&self) -> bool {
        !self.is_temporary()
            && self.operands.iter().filter_map(MdOperand::get).all(|op| {
                // SAFETY: operands point at metadata owned by the same context.
                !unsafe { op.as_ref() }
                    .as_node()
                    .is_some_and(MdNode::is_temporary)
            })
    }
}

pub(crate) enum MetadataData {
    String(String),
    Node(MdNode),
    Value {
        value: Cell<Option<NonNull<Value>>>,
        local: bool,
    },
}

impl MetadataData {
    pub(crate) fn value(value: NonNull<Value>, local: bool) -> Self {
        MetadataData::Value {
            value: Cell::new(Some(value)),
            local,
        }
    }
}

pub struct Metadata {
    context: NonNull<Context>,
    data: MetadataData,
}

impl Metadata {
    pub(crate) fn new(context: NonNull<Context>, data: MetadataData) -> Self {
        Self { context, data }
    }

    pub fn kind(&self) -> MetadataKind {
        match self.data {
            MetadataData::String(_) => MetadataKind::MdString,
            MetadataData::Node(_) => MetadataKind::MdTuple,
            MetadataData::Value { local: false, .. } => MetadataKind::ConstantAsMetadata,
            MetadataData::Value { local: true, .. } => MetadataKind::LocalAsMetadata,
        }
    }

    pub fn context(&self) -> NonNull<Context> {
        self.context
    }

    pub fn as_string(&self) -> Option<&str> {
        match &self.data {
            MetadataData::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&MdNode> {
        match &self.data {
            MetadataData::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Wrapped value of a value-as-metadata; `None` for other kinds or once
    /// the value was deleted.
    pub fn value(&self) -> Option<NonNull<Value>> {
        match &self.data {
            MetadataData::Value { value, .. } => value.get(),
            _ => None,
        }
    }

    pub fn is_value_as_metadata(&self) -> bool {
        matches!(self.data, MetadataData::Value { .. })
    }

    pub(crate) fn set_value(&self, target: Option<NonNull<Value>>) {
        if let MetadataData::Value { value, .. } = &self.data {
            value.set(target);
        }
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Metadata({:?}) {self}", self.kind())
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, operand: Option<NonNull<Metadata>>) -> fmt::Result {
    let Some(ptr) = operand else {
        return f.write_str("null");
    };
    // SAFETY: operands point at metadata owned by the same context.
    let md = unsafe { ptr.as_ref() };
    match md.data {
        // Nested nodes may be cyclic; print a reference instead.
        MetadataData::Node(_) => write!(f, "!<{ptr:p}>"),
        _ => write!(f, "{md}"),
    }
}

impl fmt::Display for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            MetadataData::String(text) => write!(f, "!{text:?}"),
            MetadataData::Node(node) => {
                if node.is_distinct() {
                    f.write_str("distinct ")?;
                }
                f.write_str("!{")?;
                for (i, operand) in node.operands.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_operand(f, operand.get())?;
                }
                f.write_str("}")
            }
            MetadataData::Value { value, .. } => match value.get() {
                // SAFETY: deleted values are unlinked before release.
                Some(value) => write!(f, "{}", unsafe { value.as_ref() }),
                None => f.write_str("<deleted value>"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_operands_are_stable_slots() {
        let context = Context::new();
        let a = context.md_string("a");
        let b = context.md_string("b");
        let node_ptr = context.md_node(&[Some(a), None]);
        let node = unsafe { node_ptr.as_ref() }.as_node().unwrap();

        let slot = node.operand(0) as *const MdOperand;
        node.replace_operand_with(0, Some(b));
        assert_eq!(node.operand(0) as *const MdOperand, slot);
        assert_eq!(node.operand(0).get(), Some(b));
        assert_eq!(node.operand(1).get(), None);
    }

    #[test]
    #[should_panic]
    fn operand_index_past_end_panics() {
        let context = Context::new();
        let node_ptr = context.md_node(&[]);
        let node = unsafe { node_ptr.as_ref() }.as_node().unwrap();
        node.operand(0);
    }

    #[test]
    fn storage_flags() {
        let context = Context::new();
        let temp = context.md_temporary_node(&[]);
        let holder = context.md_node(&[Some(temp)]);
        let temp_node = unsafe { temp.as_ref() }.as_node().unwrap();
        let holder_node = unsafe { holder.as_ref() }.as_node().unwrap();

        assert!(temp_node.is_temporary());
        assert!(!temp_node.is_resolved());
        assert!(holder_node.is_uniqued());
        assert!(!holder_node.is_resolved());

        temp_node.make_uniqued();
        assert!(holder_node.is_resolved());

        let distinct = context.md_distinct_node(&[]);
        assert!(unsafe { distinct.as_ref() }.as_node().unwrap().is_distinct());
    }

    #[test]
    fn printing() {
        let context = Context::new();
        let s = context.md_string("file.c");
        let five = context.value_as_metadata(context.const_int(32, 5));
        let node = context.md_distinct_node(&[Some(s), Some(five), None]);
        assert_eq!(unsafe { s.as_ref() }.to_string(), "!\"file.c\"");
        assert_eq!(
            unsafe { node.as_ref() }.to_string(),
            "distinct !{!\"file.c\", i32 5, null}"
        );
    }

    #[test]
    fn kinds() {
        let context = Context::new();
        assert_eq!(
            unsafe { context.md_string("x").as_ref() }.kind(),
            MetadataKind::MdString
        );
        let local = context.value_as_metadata(context.create_instruction("i"));
        assert_eq!(unsafe { local.as_ref() }.kind(), MetadataKind::LocalAsMetadata);
        let constant = context.value_as_metadata(context.const_null());
        assert_eq!(
            unsafe { constant.as_ref() }.kind(),
            MetadataKind::ConstantAsMetadata
        );
    }
}
