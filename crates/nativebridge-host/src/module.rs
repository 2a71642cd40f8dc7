//! Modules, comdats and named metadata.

use crate::arena::Arena;
use crate::context::Context;
use crate::error::{HostError, HostResult};
use crate::metadata::Metadata;
use crate::value::{Value, ValueData};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::cell::{Cell, Ref, RefCell};
use std::ptr::NonNull;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u32)]
pub enum ComdatSelectionKind {
    Any = 0,
    ExactMatch = 1,
    Largest = 2,
    NoDeduplicate = 3,
    SameSize = 4,
}

#[derive(Debug)]
pub struct Comdat {
    name: String,
    selection: Cell<ComdatSelectionKind>,
}

impl Comdat {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn selection_kind(&self) -> ComdatSelectionKind {
        self.selection.get()
    }

    pub fn set_selection_kind(&self, kind: ComdatSelectionKind) {
        self.selection.set(kind);
    }
}

/// Module-level list of metadata nodes under a name.
#[derive(Debug)]
pub struct NamedMetadata {
    name: String,
    parent: NonNull<Module>,
    operands: RefCell<Vec<NonNull<Metadata>>>,
}

impl NamedMetadata {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> NonNull<Module> {
        self.parent
    }

    pub fn num_operands(&self) -> usize {
        self.operands.borrow().len()
    }

    /// # Panics
    /// When `index` is out of range.
    pub fn operand(&self, index: usize) -> NonNull<Metadata> {
        self.operands.borrow()[index]
    }

    /// # Panics
    /// When `index` is out of range.
    pub fn set_operand(&self, index: usize, node: NonNull<Metadata>) {
        self.operands.borrow_mut()[index] = node;
    }

    pub fn add_operand(&self, node: NonNull<Metadata>) {
        self.operands.borrow_mut().push(node);
    }

    pub fn clear_operands(&self) {
        self.operands.borrow_mut().clear();
    }
}

pub struct Module {
    context: NonNull<Context>,
    name: RefCell<String>,
    source_file_name: RefCell<String>,
    comdats: Arena<Comdat>,
    globals: RefCell<Vec<NonNull<Value>>>,
    aliases: RefCell<Vec<NonNull<Value>>>,
    functions: RefCell<Vec<NonNull<Value>>>,
    named_metadata: Arena<NamedMetadata>,
}

impl Module {
    pub(crate) fn new(context: NonNull<Context>, name: &str) -> Self {
        Self {
            context,
            name: RefCell::new(name.to_owned()),
            source_file_name: RefCell::new(name.to_owned()),
            comdats: Arena::new(),
            globals: RefCell::new(Vec::new()),
            aliases: RefCell::new(Vec::new()),
            functions: RefCell::new(Vec::new()),
            named_metadata: Arena::new(),
        }
    }

    fn context_ref(&self) -> &Context {
        // SAFETY: a module never outlives its context.
        unsafe { self.context.as_ref() }
    }

    fn self_ptr(&self) -> NonNull<Module> {
        NonNull::from(self)
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

    pub fn source_file_name(&self) -> Ref<'_, str> {
        Ref::map(self.source_file_name.borrow(), String::as_str)
    }

    pub fn set_source_file_name(&self, name: &str) {
        *self.source_file_name.borrow_mut() = name.to_owned();
    }

    // Comdats

    pub fn comdat_count(&self) -> usize {
        self.comdats.len()
    }

    pub fn comdat_at(&self, index: usize) -> Option<NonNull<Comdat>> {
        self.comdats.get(index)
    }

    pub fn comdat(&self, name: &str) -> Option<NonNull<Comdat>> {
        self.comdats.find(|c| c.name == name)
    }

    /// Returns the comdat called `name`, creating it if needed, with its
    /// selection kind set to `kind`.
    pub fn insert_or_update_comdat(&self, name: &str, kind: ComdatSelectionKind) -> NonNull<Comdat> {
        match self.comdat(name) {
            Some(existing) => {
                // SAFETY: members of `comdats` are live.
                unsafe { existing.as_ref() }.set_selection_kind(kind);
                existing
            }
            None => self.comdats.alloc(Comdat {
                name: name.to_owned(),
                selection: Cell::new(kind),
            }),
        }
    }

    pub fn remove_comdat(&self, comdat: NonNull<Comdat>) -> bool {
        self.comdats.remove(comdat).is_some()
    }

    pub fn clear_comdats(&self) {
        drop(self.comdats.clear());
    }

    // Globals

    fn ensure_unique(&self, name: &str) -> HostResult<()> {
        let taken = [&self.globals, &self.aliases, &self.functions]
            .iter()
            .flat_map(|list| list.borrow().clone())
            // SAFETY: listed globals are live.
            .any(|v| &*unsafe { v.as_ref() }.name() == name);
        if taken {
            Err(HostError::DuplicateGlobal(name.to_owned()))
        } else {
            Ok(())
        }
    }

    fn adopt(&self, list: &RefCell<Vec<NonNull<Value>>>, value: NonNull<Value>) -> NonNull<Value> {
        // SAFETY: freshly allocated by the context.
        unsafe { value.as_ref() }.set_parent(Some(self.self_ptr()));
        list.borrow_mut().push(value);
        value
    }

    pub fn add_global_variable(&self, name: &str) -> HostResult<NonNull<Value>> {
        self.ensure_unique(name)?;
        let value = self.context_ref().alloc_value(name, ValueData::GlobalVariable);
        Ok(self.adopt(&self.globals, value))
    }

    pub fn add_function(&self, name: &str, argument_count: u32) -> HostResult<NonNull<Value>> {
        self.ensure_unique(name)?;
        let context = self.context_ref();
        let arguments = (0..argument_count)
            .map(|index| context.alloc_value("", ValueData::Argument { index }))
            .collect();
        let value = context.alloc_value(name, ValueData::Function { arguments });
        Ok(self.adopt(&self.functions, value))
    }

    pub fn add_global_alias(&self, name: &str, aliasee: NonNull<Value>) -> HostResult<NonNull<Value>> {
        // SAFETY: callers pass values from this module's context.
        if !unsafe { aliasee.as_ref() }.is_global() {
            return Err(HostError::InvalidAliasee(name.to_owned()));
        }
        self.ensure_unique(name)?;
        let value = self.context_ref().alloc_value(
            name,
            ValueData::GlobalAlias {
                aliasee: Cell::new(Some(aliasee)),
            },
        );
        Ok(self.adopt(&self.aliases, value))
    }

    pub fn global_count(&self) -> usize {
        self.globals.borrow().len()
    }

    pub fn global_variable(&self, name: &str) -> Option<NonNull<Value>> {
        find_named(&self.globals, name)
    }

    pub fn function(&self, name: &str) -> Option<NonNull<Value>> {
        find_named(&self.functions, name)
    }

    pub fn global_alias(&self, name: &str) -> Option<NonNull<Value>> {
        find_named(&self.aliases, name)
    }

    pub fn first_global_alias(&self) -> Option<NonNull<Value>> {
        self.aliases.borrow().first().copied()
    }

    /// The alias after `alias` in this module, `None` at the end or when
    /// `alias` is not one of this module's aliases.
    pub fn next_global_alias(&self, alias: NonNull<Value>) -> Option<NonNull<Value>> {
        let aliases = self.aliases.borrow();
        let index = aliases.iter().position(|a| *a == alias)?;
        aliases.get(index + 1).copied()
    }

    /// Unlinks a global variable without releasing it.
    pub fn remove_global_variable(&self, value: NonNull<Value>) -> bool {
        let removed = remove_from(&self.globals, value);
        if removed {
            // SAFETY: the value was a live member until now.
            unsafe { value.as_ref() }.set_parent(None);
        }
        removed
    }

    pub(crate) fn forget_global(&self, value: NonNull<Value>) {
        remove_from(&self.globals, value);
        remove_from(&self.aliases, value);
        remove_from(&self.functions, value);
    }

    pub(crate) fn owned_values(&self) -> Vec<NonNull<Value>> {
        let mut values = self.aliases.borrow().clone();
        values.extend(self.globals.borrow().iter().copied());
        values.extend(self.functions.borrow().iter().copied());
        values
    }

    // Named metadata

    pub fn get_or_insert_named_metadata(&self, name: &str) -> NonNull<NamedMetadata> {
        self.named_metadata(name).unwrap_or_else(|| {
            self.named_metadata.alloc(NamedMetadata {
                name: name.to_owned(),
                parent: self.self_ptr(),
                operands: RefCell::new(Vec::new()),
            })
        })
    }

    pub fn named_metadata(&self, name: &str) -> Option<NonNull<NamedMetadata>> {
        self.named_metadata.find(|md| md.name == name)
    }

    pub fn named_metadata_count(&self) -> usize {
        self.named_metadata.len()
    }

    /// Releases a named metadata entry. Its handle is dangling afterwards.
    pub fn erase_named_metadata(&self, named: NonNull<NamedMetadata>) -> bool {
        self.named_metadata.remove(named).is_some()
    }
}

fn find_named(list: &RefCell<Vec<NonNull<Value>>>, name: &str) -> Option<NonNull<Value>> {
    list.borrow()
        .iter()
        .copied()
        // SAFETY: listed globals are live.
        .find(|v| &*unsafe { v.as_ref() }.name() == name)
}

fn remove_from(list: &RefCell<Vec<NonNull<Value>>>, value: NonNull<Value>) -> bool {
    let mut list = list.borrow_mut();
    match list.iter().position(|v| *v == value) {
        Some(index) => {
            list.remove(index);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        let context = Context::new();
        let module = unsafe { context.create_module("main").as_ref() };
        assert_eq!(&*module.name(), "main");
        assert_eq!(&*module.source_file_name(), "main");
        module.set_source_file_name("main.c");
        module.set_name("renamed");
        assert_eq!(&*module.source_file_name(), "main.c");
        assert_eq!(&*module.name(), "renamed");
    }

    #[test]
    fn comdat_insert_or_update() {
        let context = Context::new();
        let module = unsafe { context.create_module("m").as_ref() };
        let a = module.insert_or_update_comdat("a", ComdatSelectionKind::Any);
        let again = module.insert_or_update_comdat("a", ComdatSelectionKind::Largest);
        assert_eq!(a, again);
        assert_eq!(module.comdat_count(), 1);
        assert_eq!(
            unsafe { a.as_ref() }.selection_kind(),
            ComdatSelectionKind::Largest
        );

        module.insert_or_update_comdat("b", ComdatSelectionKind::Any);
        assert!(module.remove_comdat(a));
        assert_eq!(module.comdat_count(), 1);
        assert!(module.comdat("a").is_none());
        module.clear_comdats();
        assert_eq!(module.comdat_count(), 0);
    }

    #[test]
    fn alias_enumeration() {
        let context = Context::new();
        let module = unsafe { context.create_module("m").as_ref() };
        let g = module.add_global_variable("g").unwrap();
        let a1 = module.add_global_alias("a1", g).unwrap();
        let a2 = module.add_global_alias("a2", g).unwrap();
        assert_eq!(module.first_global_alias(), Some(a1));
        assert_eq!(module.next_global_alias(a1), Some(a2));
        assert_eq!(module.next_global_alias(a2), None);
        assert_eq!(module.global_alias("a2"), Some(a2));
        assert_eq!(module.next_global_alias(g), None);
    }

    #[test]
    fn duplicate_and_invalid_globals() {
        let context = Context::new();
        let module = unsafe { context.create_module("m").as_ref() };
        module.add_global_variable("g").unwrap();
        assert_eq!(
            module.add_function("g", 0),
            Err(HostError::DuplicateGlobal("g".into()))
        );
        let c = context.const_int(8, 1);
        assert_eq!(
            module.add_global_alias("a", c),
            Err(HostError::InvalidAliasee("a".into()))
        );
    }

    #[test]
    fn remove_global_keeps_value_alive() {
        let context = Context::new();
        let module = unsafe { context.create_module("m").as_ref() };
        let g = module.add_global_variable("g").unwrap();
        assert!(module.remove_global_variable(g));
        assert!(!module.remove_global_variable(g));
        assert!(context.contains_value(g));
        assert_eq!(unsafe { g.as_ref() }.parent(), None);
    }

    #[test]
    fn named_metadata_lifecycle() {
        let context = Context::new();
        let module_ptr = context.create_module("m");
        let module = unsafe { module_ptr.as_ref() };
        let named_ptr = module.get_or_insert_named_metadata("llvm.ident");
        assert_eq!(module.get_or_insert_named_metadata("llvm.ident"), named_ptr);

        let named = unsafe { named_ptr.as_ref() };
        let n1 = context.md_node(&[]);
        let n2 = context.md_node(&[]);
        named.add_operand(n1);
        named.add_operand(n1);
        named.set_operand(1, n2);
        assert_eq!(named.num_operands(), 2);
        assert_eq!(named.operand(1), n2);
        assert_eq!(named.parent(), module_ptr);
        named.clear_operands();
        assert_eq!(named.num_operands(), 0);

        assert!(module.erase_named_metadata(named_ptr));
        assert!(module.named_metadata("llvm.ident").is_none());
    }
}
