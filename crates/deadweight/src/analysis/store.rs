use super::references::LivenessPolicy;
use crate::model::{Location, Symbol};
use parking_lot::Mutex;
use std::collections::HashMap;

/// Symbols collected per file.
///
/// Every operation takes the single lock for one key mutation or one copy.
#[derive(Debug, Default)]
pub struct SymbolMap {
    inner: Mutex<HashMap<String, Vec<Symbol>>>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the symbols recorded for `file`.
    pub fn store(&self, file: impl Into<String>, symbols: Vec<Symbol>) {
        self.inner.lock().insert(file.into(), symbols);
    }

    /// Appends to the symbols recorded for `file`.
    pub fn add(&self, file: impl Into<String>, symbol: Symbol) {
        self.inner.lock().entry(file.into()).or_default().push(symbol);
    }

    pub fn get(&self, file: &str) -> Option<Vec<Symbol>> {
        self.inner.lock().get(file).cloned()
    }

    /// Copy of the contents, files sorted by path and symbols by position
    /// then name.
    pub fn snapshot(&self) -> Vec<(String, Vec<Symbol>)> {
        let mut entries: Vec<_> = self
            .inner
            .lock()
            .iter()
            .map(|(file, symbols)| (file.clone(), symbols.clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, symbols) in &mut entries {
            symbols.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        }
        entries
    }

    /// Number of files with an entry.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.inner.lock().values().map(Vec::len).sum()
    }
}

/// Reference locations per (file, symbol).
#[derive(Debug, Default)]
pub struct ReferenceMap {
    inner: Mutex<HashMap<String, HashMap<Symbol, Vec<Location>>>>,
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self, file: impl Into<String>, symbol: Symbol, locations: Vec<Location>) {
        self.inner
            .lock()
            .entry(file.into())
            .or_default()
            .insert(symbol, locations);
    }

    pub fn get(&self, file: &str, symbol: &Symbol) -> Option<Vec<Location>> {
        self.inner.lock().get(file).and_then(|symbols| symbols.get(symbol)).cloned()
    }

    /// Number of (file, symbol) entries.
    pub fn len(&self) -> usize {
        self.inner.lock().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scans every entry and groups the symbols classified unused by file.
    ///
    /// The result map is filled after this map's lock is released.
    pub fn unused_symbols(&self, policy: &LivenessPolicy) -> SymbolMap {
        let found: Vec<(String, Symbol)> = {
            let inner = self.inner.lock();
            inner
                .iter()
                .flat_map(|(file, symbols)| {
                    symbols
                        .iter()
                        .filter(|(symbol, locations)| !policy.is_used(symbol, locations))
                        .map(move |(symbol, _)| (file.clone(), symbol.clone()))
                })
                .collect()
        };

        let unused = SymbolMap::new();
        for (file, symbol) in found {
            unused.add(file, symbol);
        }
        unused
    }
}
