//! Engine module: naming, classification, the ledger, file primitives and the CLI entry.

pub mod arg_parser;
pub mod classify;
pub mod cli;
pub mod codec;
pub mod ledger;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use classify::classify_path;
pub use cli::handle_run;
pub use codec::{Clock, FixedClock, SystemClock, canonical_name, split_name};
pub use ledger::ProcessedLedger;
pub use tools::path_relative_to;
