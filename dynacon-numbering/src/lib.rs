//! # dynacon-numbering
//!
//! Generic residue numbering for receptor structures. A chain's sequence is
//! aligned against a database of reference receptors with `blastp`, the
//! reference numbering of the best hit is fetched from the residue registry
//! (and cached), and labels are transferred residue by residue through the
//! alignment.
//!
//! ## Modules
//!
//! - [`sequence`]: per chain sequences from a [`sequence::TrajectoryLoader`]
//! - [`pdb`]: loader for PDB topologies
//! - [`aligner`]: the `blastp` client
//! - [`cache`]: persisted reference numbering cache
//! - [`resolver`]: label transfer and the diagnostics channel
//! - [`numbered_pdb`]: structures annotated by the number assignment service
//! - [`refdb`]: building the reference BLAST database
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use std::sync::Arc;
//!
//! use dynacon_core::Config;
//! use dynacon_core::files::TrajectoryFiles;
//! use dynacon_numbering::aligner::BlastAligner;
//! use dynacon_numbering::cache::ReferenceNumberingCacheBuilder;
//! use dynacon_numbering::pdb::PdbTopologyLoader;
//! use dynacon_numbering::resolver::NumberingResolver;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::default().with_env_overrides();
//! let cache = ReferenceNumberingCacheBuilder::from_config(&config).finish()?;
//! let resolver = NumberingResolver::new(
//!     Arc::new(BlastAligner::from_config(&config)),
//!     Arc::new(cache),
//! );
//!
//! let files = TrajectoryFiles::new(PathBuf::from("top.pdb"), PathBuf::from("top.pdb"));
//! let report = resolver.resolve(&PdbTopologyLoader::new(), &files)?;
//! for (residue, label) in report.map.iter() {
//!     println!("{}\t{}", residue, label);
//! }
//! # Ok(())
//! # }
//! ```

pub mod aligner;
pub mod blast_xml;
pub mod cache;
pub mod errors;
pub mod numbered_pdb;
pub mod pdb;
pub mod refdb;
pub mod resolver;
pub mod sequence;

// re-exports
pub use aligner::{BlastAligner, SequenceAligner};
pub use cache::{ReferenceNumberingCache, ResidueRegistry};
pub use errors::{NumberingError, TrajectoryLoadError};
pub use resolver::{Diagnostic, NumberingReport, NumberingResolver};
pub use sequence::{LoadedTrajectory, TrajectoryLoader};
