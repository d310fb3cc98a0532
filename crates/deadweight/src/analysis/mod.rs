pub mod analyzer;
pub mod references;
pub mod report;
pub mod store;
pub mod symbols;

pub use analyzer::{run, run_session, Analyzer};
pub use references::{LivenessPolicy, ReferenceCollector};
pub use report::{UnusedFile, UnusedReport, UnusedSymbol};
pub use store::{ReferenceMap, SymbolMap};
pub use symbols::{DocumentSymbolNode, SymbolCollector};
