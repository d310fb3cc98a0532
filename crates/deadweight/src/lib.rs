pub mod analysis;
pub mod config;
pub mod lsp;
pub mod model;
pub mod utils;

pub use analysis::{run, UnusedReport};
pub use config::DeadweightConfig;
pub use model::*;
