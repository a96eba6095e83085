use crate::symbol::Symbol;
use crate::types::{CompactString, SymbolId};
use crate::unit::TranslationUnit;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Current translation unit of every file plus name and id lookups over
/// their definitions.
#[derive(Debug, Default)]
pub struct ProjectSymbolTable {
    units: BTreeMap<CompactString, Arc<TranslationUnit>>,
    /// Name to (file, index into that unit's symbols).
    by_name: HashMap<CompactString, Vec<(CompactString, usize)>>,
    by_id: HashMap<SymbolId, (CompactString, usize)>,
}

impl ProjectSymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `unit` as the current unit of its file, returning the unit
    /// it replaces.
    pub fn insert(&mut self, unit: Arc<TranslationUnit>) -> Option<Arc<TranslationUnit>> {
        let previous = self.remove(&unit.path);
        for (index, symbol) in unit.symbols.iter().enumerate() {
            self.by_name
                .entry(symbol.name.clone())
                .or_default()
                .push((unit.path.clone(), index));
            self.by_id.insert(symbol.id.clone(), (unit.path.clone(), index));
        }
        self.units.insert(unit.path.clone(), unit);
        previous
    }

    pub fn remove(&mut self, file: &str) -> Option<Arc<TranslationUnit>> {
        let unit = self.units.remove(file)?;
        for symbol in &unit.symbols {
            if let Some(entries) = self.by_name.get_mut(&symbol.name) {
                entries.retain(|(f, _)| &**f != file);
                if entries.is_empty() {
                    self.by_name.remove(&symbol.name);
                }
            }
            self.by_id.remove(&symbol.id);
        }
        Some(unit)
    }

    pub fn unit(&self, file: &str) -> Option<&Arc<TranslationUnit>> {
        self.units.get(file)
    }

    pub fn symbol(&self, id: &SymbolId) -> Option<&Symbol> {
        let (file, index) = self.by_id.get(id)?;
        self.units.get(file)?.symbols.get(*index)
    }

    /// Every definition called `name`, in no particular order.
    pub fn named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|(file, index)| self.units.get(file)?.symbols.get(*index))
    }

    /// Files in path order.
    pub fn files(&self) -> impl Iterator<Item = &CompactString> {
        self.units.keys()
    }

    pub fn units(&self) -> impl Iterator<Item = &Arc<TranslationUnit>> {
        self.units.values()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.by_id.len()
    }
}
