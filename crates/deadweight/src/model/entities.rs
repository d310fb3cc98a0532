use super::types::Kind;
use crate::utils::position::from_lsp_position;
use serde::{Deserialize, Serialize};

/// Zero-based line/character pair in the protocol's coordinate space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// 1-based (line, column) for display.
    pub fn one_based(&self) -> (u32, u32) {
        from_lsp_position((*self).into())
    }
}

impl From<lsp_types::Position> for Position {
    fn from(position: lsp_types::Position) -> Self {
        Self::new(position.line, position.character)
    }
}

impl From<Position> for lsp_types::Position {
    fn from(position: Position) -> Self {
        lsp_types::Position::new(position.line, position.character)
    }
}

/// A declaration collected from a document.
///
/// Equality and hashing cover every field, so two symbols differing only in
/// the embedded flag are distinct map keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    pub position: Position,
    pub name: String,
    pub kind: Kind,
    pub is_embedded_field: bool,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: Kind, position: Position) -> Self {
        Self {
            position,
            name: name.into(),
            kind,
            is_embedded_field: false,
        }
    }

    pub fn embedded(mut self, is_embedded_field: bool) -> Self {
        self.is_embedded_field = is_embedded_field;
        self
    }
}

/// A reference occurrence, reduced to the file containing it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
}

impl Location {
    pub fn new(file: impl Into<String>) -> Self {
        Self { file: file.into() }
    }
}
