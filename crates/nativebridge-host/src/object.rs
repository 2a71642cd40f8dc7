//! Read-only object file model with forward-only cursors.
//!
//! Cursors share the file data and are deliberately not `Clone`; a copy at
//! the same position is made by asking the file for a new cursor at
//! [`SectionIter::position`].

use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relocation {
    pub offset: u64,
    pub kind: u32,
    pub symbol: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub address: u64,
    pub contents: Vec<u8>,
    pub relocations: Vec<Relocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub address: u64,
    pub section: Option<usize>,
}

#[derive(Debug, Default)]
struct ObjectData {
    sections: Vec<Section>,
    symbols: Vec<Symbol>,
}

#[derive(Debug, Clone)]
pub struct ObjectFile {
    data: Rc<ObjectData>,
}

impl ObjectFile {
    pub fn builder() -> ObjectFileBuilder {
        ObjectFileBuilder::default()
    }

    pub fn section_count(&self) -> usize {
        self.data.sections.len()
    }

    pub fn symbol_count(&self) -> usize {
        self.data.symbols.len()
    }

    pub fn sections(&self) -> SectionIter {
        self.section_at(0)
    }

    pub fn section_at(&self, position: usize) -> SectionIter {
        SectionIter {
            data: Rc::clone(&self.data),
            position,
        }
    }

    pub fn symbols(&self) -> SymbolIter {
        self.symbol_at(0)
    }

    pub fn symbol_at(&self, position: usize) -> SymbolIter {
        SymbolIter {
            data: Rc::clone(&self.data),
            position,
        }
    }
}

#[derive(Debug, Default)]
pub struct ObjectFileBuilder {
    data: ObjectData,
}

impl ObjectFileBuilder {
    pub fn section(mut self, name: &str, address: u64, contents: &[u8]) -> Self {
        self.data.sections.push(Section {
            name: name.to_owned(),
            address,
            contents: contents.to_vec(),
            relocations: Vec::new(),
        });
        self
    }

    /// Adds a relocation to the most recently added section.
    ///
    /// # Panics
    /// When no section was added yet.
    pub fn relocation(mut self, offset: u64, kind: u32, symbol: Option<usize>) -> Self {
        let Some(section) = self.data.sections.last_mut() else {
            panic!("relocation requires a section");
        };
        section.relocations.push(Relocation {
            offset,
            kind,
            symbol,
        });
        self
    }

    pub fn symbol(mut self, name: &str, address: u64, section: Option<usize>) -> Self {
        self.data.symbols.push(Symbol {
            name: name.to_owned(),
            address,
            section,
        });
        self
    }

    pub fn build(self) -> ObjectFile {
        ObjectFile {
            data: Rc::new(self.data),
        }
    }
}

#[derive(Debug)]
pub struct SectionIter {
    data: Rc<ObjectData>,
    position: usize,
}

impl SectionIter {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn object_file(&self) -> ObjectFile {
        ObjectFile {
            data: Rc::clone(&self.data),
        }
    }

    pub fn current(&self) -> Option<&Section> {
        self.data.sections.get(self.position)
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.sections.len()
    }

    pub fn move_next(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    /// Relocations of the current section.
    pub fn relocations(&self) -> RelocationIter {
        self.relocations_at(0)
    }

    pub fn relocations_at(&self, position: usize) -> RelocationIter {
        RelocationIter {
            data: Rc::clone(&self.data),
            section: self.position,
            position,
        }
    }
}

#[derive(Debug)]
pub struct SymbolIter {
    data: Rc<ObjectData>,
    position: usize,
}

impl SymbolIter {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn object_file(&self) -> ObjectFile {
        ObjectFile {
            data: Rc::clone(&self.data),
        }
    }

    pub fn current(&self) -> Option<&Symbol> {
        self.data.symbols.get(self.position)
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.data.symbols.len()
    }

    pub fn move_next(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }
}

#[derive(Debug)]
pub struct RelocationIter {
    data: Rc<ObjectData>,
    section: usize,
    position: usize,
}

impl RelocationIter {
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn section_index(&self) -> usize {
        self.section
    }

    fn relocations(&self) -> &[Relocation] {
        self.data
            .sections
            .get(self.section)
            .map_or(&[][..], |s| s.relocations.as_slice())
    }

    pub fn current(&self) -> Option<&Relocation> {
        self.relocations().get(self.position)
    }

    /// Name of the symbol the current relocation refers to.
    pub fn symbol_name(&self) -> Option<&str> {
        let index = self.current()?.symbol?;
        self.data.symbols.get(index).map(|s| s.name.as_str())
    }

    pub fn is_at_end(&self) -> bool {
        self.position >= self.relocations().len()
    }

    pub fn move_next(&mut self) {
        if !self.is_at_end() {
            self.position += 1;
        }
    }

    /// A cursor over the same section at the same position.
    pub fn at_same_position(&self) -> RelocationIter {
        RelocationIter {
            data: Rc::clone(&self.data),
            section: self.section,
            position: self.position,
        }
    }
}
