//! # dynacon
//!
//! Generic residue numbering and receptor-ligand contact analysis of
//! molecular dynamics trajectories. Each part lives in its own crate and is
//! re-exported here behind a cargo feature:
//!
//! - `core`: residue keys, alignments, reference records and configuration
//! - `numbering`: alignment based generic numbering with its reference cache
//! - `pipeline`: the staged interactions / numbering / analysis pipeline

#[cfg(feature = "core")]
#[doc(inline)]
pub use dynacon_core as core;

#[cfg(feature = "numbering")]
#[doc(inline)]
pub use dynacon_numbering as numbering;

#[cfg(feature = "pipeline")]
#[doc(inline)]
pub use dynacon_pipeline as pipeline;
