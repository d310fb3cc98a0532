//! Data models shared by the protocol client and the analysis pipeline.

pub mod entities;
pub mod types;

pub use entities::{Location, Position, Symbol};
pub use types::{Kind, ServerConfig};
