//! Helpers for file discovery, logging setup and coordinate conversion.

pub mod file;
pub mod logging;
pub mod position;

pub use file::{discover_source_files, relative_file_id};
pub use position::from_lsp_position;
