use super::store::SymbolMap;
use crate::model::Kind;
use serde::Serialize;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedSymbol {
    pub name: String,
    pub kind: Kind,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnusedFile {
    pub file: String,
    pub symbols: Vec<UnusedSymbol>,
}

/// Unused symbols grouped by file, files sorted by path and symbols by
/// position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnusedReport {
    pub files: Vec<UnusedFile>,
}

impl UnusedReport {
    pub fn from_symbol_map(unused: &SymbolMap) -> Self {
        let files = unused
            .snapshot()
            .into_iter()
            .filter(|(_, symbols)| !symbols.is_empty())
            .map(|(file, symbols)| UnusedFile {
                file,
                symbols: symbols
                    .into_iter()
                    .map(|symbol| {
                        let (line, column) = symbol.position.one_based();
                        UnusedSymbol {
                            name: symbol.name,
                            kind: symbol.kind,
                            line,
                            column,
                        }
                    })
                    .collect(),
            })
            .collect();
        Self { files }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn symbol_count(&self) -> usize {
        self.files.iter().map(|file| file.symbols.len()).sum()
    }

    /// Names of the unused symbols per file.
    pub fn names(&self) -> Vec<(String, Vec<String>)> {
        self.files
            .iter()
            .map(|file| {
                (
                    file.file.clone(),
                    file.symbols.iter().map(|symbol| symbol.name.clone()).collect(),
                )
            })
            .collect()
    }

    /// Logs one line per file and one per symbol.
    pub fn emit(&self) {
        for file in &self.files {
            info!(file = %file.file, count = file.symbols.len(), "unused symbols");
            for symbol in &file.symbols {
                info!(
                    file = %file.file,
                    symbol = %symbol.name,
                    kind = %symbol.kind,
                    line = symbol.line,
                    column = symbol.column,
                    "unused"
                );
            }
        }
        info!(files = self.files.len(), symbols = self.symbol_count(), "analysis complete");
    }
}
