use lsp_types::Position;

/// Convert 0-based LSP Position to 1-based line/character
pub fn from_lsp_position(position: Position) -> (u32, u32) {
    (position.line.saturating_add(1), position.character.saturating_add(1))
}
