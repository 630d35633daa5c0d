pub mod analyzer;
pub mod cli;
pub mod elmore;
pub mod evaluate;
pub mod export;
pub mod name_map;
pub mod netlist;
pub mod parser;
pub mod rctree;

// Re-export commonly used types
pub use analyzer::{Analyzer, AnalyzerConfig, AnalysisResult};
pub use elmore::ElmoreEngine;
pub use name_map::NameMap;
pub use parser::SpefParser;
pub use rctree::{NetRecord, RCTree, RCTreeMatrix, TreeVariant};

// Error types
pub type Result<T> = anyhow::Result<T>;

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
