//! elcollect: collect JPEG inspection images from production-line shares into a central tree with
//! normalized names, per-line folders and periodic archival.

pub mod engine;
pub mod error;
pub mod pipeline;
pub mod share;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

/// Result alias used by public elcollect API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;
