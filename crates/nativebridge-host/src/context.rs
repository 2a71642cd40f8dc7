//! The owning context for values, metadata, attributes and modules.

use crate::arena::Arena;
use crate::attribute::{self, AttrArgKind, Attribute, AttributeData};
use crate::metadata::{MdNode, Metadata, MetadataData, NodeStorage};
use crate::module::Module;
use crate::value::{DataSequence, Value, ValueData};
use std::cell::{Cell, RefCell};
use std::ptr::NonNull;
use std::rc::{Rc, Weak};

/// Observer of value lifetime events.
///
/// `value_deleted` runs before the value is released, `value_replaced` after
/// every use of `old` has been rewired to `new`. Listeners must not delete or
/// replace values from inside a notification.
pub trait ValueListener {
    fn value_deleted(&self, value: NonNull<Value>);
    fn value_replaced(&self, old: NonNull<Value>, new: NonNull<Value>);
}

/// Owner of every object created through it.
///
/// Contexts are boxed on creation and objects keep a pointer back to their
/// context, so a context must stay in its box for its whole life.
pub struct Context {
    odr_uniquing_debug_types: Cell<bool>,
    values: Arena<Value>,
    metadata: Arena<Metadata>,
    attributes: Arena<Attribute>,
    modules: Arena<Module>,
    listeners: RefCell<Vec<Weak<dyn ValueListener>>>,
}

impl Context {
    pub fn new() -> Box<Self> {
        Box::new(Self {
            odr_uniquing_debug_types: Cell::new(false),
            values: Arena::new(),
            metadata: Arena::new(),
            attributes: Arena::new(),
            modules: Arena::new(),
            listeners: RefCell::new(Vec::new()),
        })
    }

    fn self_ptr(&self) -> NonNull<Context> {
        NonNull::from(self)
    }

    pub fn is_odr_uniquing_debug_types(&self) -> bool {
        self.odr_uniquing_debug_types.get()
    }

    pub fn set_odr_uniquing_debug_types(&self, enabled: bool) {
        self.odr_uniquing_debug_types.set(enabled);
    }

    pub fn add_value_listener(&self, listener: Weak<dyn ValueListener>) {
        let mut listeners = self.listeners.borrow_mut();
        listeners.retain(|l| l.strong_count() > 0);
        listeners.push(listener);
    }

    pub fn listener_count(&self) -> usize {
        self.listeners
            .borrow()
            .iter()
            .filter(|l| l.strong_count() > 0)
            .count()
    }

    fn live_listeners(&self) -> Vec<Rc<dyn ValueListener>> {
        self.listeners
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    // Values

    pub(crate) fn alloc_value(&self, name: &str, data: ValueData) -> NonNull<Value> {
        self.values.alloc(Value::new(self.self_ptr(), name, data))
    }

    pub fn contains_value(&self, value: NonNull<Value>) -> bool {
        self.values.contains(value)
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn const_int(&self, bits: u32, value: u64) -> NonNull<Value> {
        self.alloc_value("", ValueData::ConstantInt { bits, value })
    }

    pub fn const_null(&self) -> NonNull<Value> {
        self.alloc_value("", ValueData::ConstantPointerNull)
    }

    /// A constant array of `element_bits` wide integers.
    ///
    /// # Panics
    /// Unsupported widths or ragged data.
    pub fn const_data_array(&self, element_bits: u32, raw: Vec<u8>) -> NonNull<Value> {
        self.alloc_value("", ValueData::ConstantData(DataSequence::new(element_bits, raw)))
    }

    pub fn const_string(&self, text: &[u8], null_terminate: bool) -> NonNull<Value> {
        let mut raw = text.to_vec();
        if null_terminate {
            raw.push(0);
        }
        self.const_data_array(8, raw)
    }

    pub fn create_instruction(&self, name: &str) -> NonNull<Value> {
        self.alloc_value(
            name,
            ValueData::Instruction {
                debug_records: Cell::new(0),
            },
        )
    }

    /// Notifies listeners, detaches every use of `value` and releases it.
    ///
    /// Returns `false` if the value is not owned by this context.
    pub fn delete_value(&self, value: NonNull<Value>) -> bool {
        if !self.values.contains(value) {
            return false;
        }
        tracing::trace!(target: "nativebridge::host", ?value, "delete value");
        for listener in self.live_listeners() {
            listener.value_deleted(value);
        }

        // SAFETY: membership was checked above.
        let (parent, arguments) = {
            let v = unsafe { value.as_ref() };
            (v.parent(), v.arguments().to_vec())
        };
        if let Some(module) = parent {
            // SAFETY: a global's parent outlives its membership.
            unsafe { module.as_ref() }.forget_global(value);
        }
        self.rewire_uses(value, None);
        drop(self.values.remove(value));

        for argument in arguments {
            self.delete_value(argument);
        }
        true
    }

    /// Points every alias and value-as-metadata use of `old` at `new`, then
    /// notifies listeners.
    pub fn replace_all_uses_with(&self, old: NonNull<Value>, new: NonNull<Value>) {
        if old == new || !self.values.contains(old) {
            return;
        }
        self.rewire_uses(old, Some(new));
        tracing::trace!(target: "nativebridge::host", ?old, ?new, "replace all uses");
        for listener in self.live_listeners() {
            listener.value_replaced(old, new);
        }
    }

    fn rewire_uses(&self, old: NonNull<Value>, new: Option<NonNull<Value>>) {
        for candidate in self.values.snapshot() {
            // SAFETY: snapshot members are live.
            let candidate = unsafe { candidate.as_ref() };
            if candidate.aliasee() == Some(old) {
                candidate.set_aliasee(new);
            }
        }
        for md in self.metadata.snapshot() {
            // SAFETY: as above.
            let md = unsafe { md.as_ref() };
            if md.value() == Some(old) {
                md.set_value(new);
            }
        }
    }

    // Modules

    pub fn create_module(&self, name: &str) -> NonNull<Module> {
        self.modules.alloc(Module::new(self.self_ptr(), name))
    }

    /// Deletes a module and every global it still owns.
    pub fn dispose_module(&self, module: NonNull<Module>) {
        if !self.modules.contains(module) {
            return;
        }
        // SAFETY: membership was checked above.
        let globals = unsafe { module.as_ref() }.owned_values();
        for value in globals {
            self.delete_value(value);
        }
        drop(self.modules.remove(module));
    }

    // Metadata

    fn alloc_metadata(&self, data: MetadataData) -> NonNull<Metadata> {
        self.metadata.alloc(Metadata::new(self.self_ptr(), data))
    }

    /// Uniqued string metadata.
    pub fn md_string(&self, text: &str) -> NonNull<Metadata> {
        self.metadata
            .find(|md| md.as_string() == Some(text))
            .unwrap_or_else(|| self.alloc_metadata(MetadataData::String(text.to_owned())))
    }

    pub fn md_node(&self, operands: &[Option<NonNull<Metadata>>]) -> NonNull<Metadata> {
        self.alloc_metadata(MetadataData::Node(MdNode::new(NodeStorage::Uniqued, operands)))
    }

    pub fn md_distinct_node(&self, operands: &[Option<NonNull<Metadata>>]) -> NonNull<Metadata> {
        self.alloc_metadata(MetadataData::Node(MdNode::new(NodeStorage::Distinct, operands)))
    }

    pub fn md_temporary_node(&self, operands: &[Option<NonNull<Metadata>>]) -> NonNull<Metadata> {
        self.alloc_metadata(MetadataData::Node(MdNode::new(NodeStorage::Temporary, operands)))
    }

    /// The value-as-metadata wrapper for `value`, created on first use.
    pub fn value_as_metadata(&self, value: NonNull<Value>) -> NonNull<Metadata> {
        if let Some(existing) = self.metadata.find(|md| md.value() == Some(value)) {
            return existing;
        }
        // SAFETY: callers pass values owned by this context.
        let local = !unsafe { value.as_ref() }.is_constant();
        self.alloc_metadata(MetadataData::value(value, local))
    }

    /// Like [`Context::value_as_metadata`], restricted to constants.
    pub fn constant_as_metadata(&self, value: NonNull<Value>) -> Option<NonNull<Metadata>> {
        // SAFETY: callers pass values owned by this context.
        unsafe { value.as_ref() }
            .is_constant()
            .then(|| self.value_as_metadata(value))
    }

    pub fn metadata_count(&self) -> usize {
        self.metadata.len()
    }

    // Attributes

    fn alloc_attribute(&self, data: AttributeData) -> NonNull<Attribute> {
        self.attributes.alloc(Attribute::new(data))
    }

    /// # Panics
    /// When `kind` is not a known attribute taking no argument.
    pub fn enum_attribute(&self, kind: u32) -> NonNull<Attribute> {
        attribute::assert_arg_kind(kind, AttrArgKind::None);
        self.alloc_attribute(AttributeData::Enum(kind))
    }

    /// # Panics
    /// When `kind` is not a known integer attribute.
    pub fn int_attribute(&self, kind: u32, value: u64) -> NonNull<Attribute> {
        attribute::assert_arg_kind(kind, AttrArgKind::Int);
        self.alloc_attribute(AttributeData::Int(kind, value))
    }

    /// # Panics
    /// When `kind` is not a known type attribute.
    pub fn type_attribute(&self, kind: u32, type_name: &str) -> NonNull<Attribute> {
        attribute::assert_arg_kind(kind, AttrArgKind::Type);
        self.alloc_attribute(AttributeData::Type(kind, type_name.to_owned()))
    }

    /// # Panics
    /// When `kind` is not a known constant range attribute.
    pub fn range_attribute(&self, kind: u32, bits: u32, lower: i64, upper: i64) -> NonNull<Attribute> {
        attribute::assert_arg_kind(kind, AttrArgKind::ConstantRange);
        self.alloc_attribute(AttributeData::Range(kind, bits, (lower, upper)))
    }

    /// # Panics
    /// When `kind` is not a known constant range list attribute.
    pub fn range_list_attribute(&self, kind: u32, ranges: &[(i64, i64)]) -> NonNull<Attribute> {
        attribute::assert_arg_kind(kind, AttrArgKind::ConstantRangeList);
        self.alloc_attribute(AttributeData::RangeList(kind, ranges.to_vec()))
    }

    pub fn string_attribute(&self, key: &str, value: &str) -> NonNull<Attribute> {
        self.alloc_attribute(AttributeData::String(key.to_owned(), value.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: RefCell<Vec<String>>,
    }

    impl ValueListener for Recorder {
        fn value_deleted(&self, value: NonNull<Value>) {
            let name = unsafe { value.as_ref() }.name().to_owned();
            self.events.borrow_mut().push(format!("deleted {name}"));
        }

        fn value_replaced(&self, old: NonNull<Value>, new: NonNull<Value>) {
            let (old, new) = unsafe { (old.as_ref(), new.as_ref()) };
            self.events
                .borrow_mut()
                .push(format!("replaced {} {}", old.name(), new.name()));
        }
    }

    #[test]
    fn odr_flag_round_trips() {
        let context = Context::new();
        assert!(!context.is_odr_uniquing_debug_types());
        context.set_odr_uniquing_debug_types(true);
        assert!(context.is_odr_uniquing_debug_types());
    }

    #[test]
    fn delete_notifies_then_releases() {
        let context = Context::new();
        let recorder = Rc::new(Recorder::default());
        let weak: Weak<dyn ValueListener> = Rc::downgrade(&recorder) as Weak<dyn ValueListener>;
        context.add_value_listener(weak);

        let inst = context.create_instruction("tmp");
        assert!(context.delete_value(inst));
        assert!(!context.contains_value(inst));
        assert!(!context.delete_value(inst));
        assert_eq!(*recorder.events.borrow(), ["deleted tmp"]);
    }

    #[test]
    fn replace_rewires_aliases_and_metadata() {
        let context = Context::new();
        let module = unsafe { context.create_module("m").as_ref() };
        let a = module.add_global_variable("a").unwrap();
        let b = module.add_global_variable("b").unwrap();
        let alias = module.add_global_alias("alias", a).unwrap();
        let md = context.value_as_metadata(a);

        let recorder = Rc::new(Recorder::default());
        context.add_value_listener(Rc::downgrade(&recorder) as Weak<dyn ValueListener>);
        context.replace_all_uses_with(a, b);

        assert_eq!(unsafe { alias.as_ref() }.aliasee(), Some(b));
        assert_eq!(unsafe { md.as_ref() }.value(), Some(b));
        assert_eq!(*recorder.events.borrow(), ["replaced a b"]);
    }

    #[test]
    fn deleting_a_global_detaches_it() {
        let context = Context::new();
        let module_ptr = context.create_module("m");
        let module = unsafe { module_ptr.as_ref() };
        let a = module.add_global_variable("a").unwrap();
        let alias = module.add_global_alias("alias", a).unwrap();
        context.delete_value(a);
        assert_eq!(module.global_count(), 0);
        assert_eq!(unsafe { alias.as_ref() }.aliasee(), None);
    }

    #[test]
    fn dropped_listeners_are_skipped() {
        let context = Context::new();
        {
            let recorder = Rc::new(Recorder::default());
            context.add_value_listener(Rc::downgrade(&recorder) as Weak<dyn ValueListener>);
            assert_eq!(context.listener_count(), 1);
        }
        assert_eq!(context.listener_count(), 0);
        let inst = context.create_instruction("x");
        assert!(context.delete_value(inst));
    }

    #[test]
    fn md_strings_are_uniqued() {
        let context = Context::new();
        let a = context.md_string("hello");
        let b = context.md_string("hello");
        let c = context.md_string("world");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn constant_as_metadata_rejects_locals() {
        let context = Context::new();
        let inst = context.create_instruction("x");
        assert!(context.constant_as_metadata(inst).is_none());
        let zero = context.const_int(32, 0);
        let md = context.constant_as_metadata(zero).unwrap();
        assert_eq!(context.constant_as_metadata(zero), Some(md));
    }

    #[test]
    fn dispose_module_deletes_its_globals() {
        let context = Context::new();
        let module = context.create_module("m");
        let f = unsafe { module.as_ref() }.add_function("f", 2).unwrap();
        let before = context.value_count();
        assert_eq!(unsafe { f.as_ref() }.arguments().len(), 2);
        context.dispose_module(module);
        assert_eq!(context.value_count(), before - 3);
    }
}
