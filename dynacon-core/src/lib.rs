//! # dynacon-core
//!
//! Shared building blocks for the dynacon crates: the residue and alignment
//! models the numbering resolver works on, the reference numbering records
//! served by the registry, trajectory file discovery and the runtime
//! configuration.
//!
//! # Example
//!
//! ```
//! use dynacon_core::models::{NumberingMap, ResidueKey};
//!
//! let mut map = NumberingMap::new();
//! map.insert(ResidueKey::new("A", "ASP", 79), "2x50".to_string());
//! assert_eq!(map.get(&ResidueKey::new("A", "ASP", 79)), Some("2x50"));
//! ```

pub mod config;
pub mod consts;
pub mod errors;
pub mod files;
pub mod models;
pub mod utils;

// re-exports
pub use config::Config;
pub use errors::CoreError;
