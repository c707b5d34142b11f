//! Extracting per chain sequences from a loaded trajectory.
//!
//! Reading topology and trajectory formats is delegated to a
//! [`TrajectoryLoader`]; this module only groups what the loader reports into
//! one [`ChainSequence`] per chain.

use std::collections::BTreeMap;
use std::path::Path;

use dynacon_core::files::{TrajectoryFiles, loader_format};
use dynacon_core::models::{ChainResidue, ChainSequence};
use dynacon_core::utils::three_to_one;

use crate::errors::TrajectoryLoadError;

/// One residue of the "protein" selection of a loaded structure.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ProteinResidue {
    pub chain: String,
    pub residue_name: String,
    pub residue_index: i32,
}

impl ProteinResidue {
    pub fn new(chain: &str, residue_name: &str, residue_index: i32) -> Self {
        ProteinResidue {
            chain: chain.to_string(),
            residue_name: residue_name.to_string(),
            residue_index,
        }
    }
}

/// A topology with its trajectory frames loaded.
pub trait LoadedTrajectory: Send {
    /// Residues of the protein selection, in any order, possibly repeated per atom.
    fn protein_residues(&self) -> Vec<ProteinResidue>;

    /// Number of frames in the trajectory file, `None` when the loader can't tell.
    fn frame_count(&self) -> Option<usize>;

    /// Write every atom of the structure as a PDB file.
    fn write_pdb(&self, out: &Path) -> Result<(), TrajectoryLoadError>;
}

/// Opens topology + trajectory pairs.
pub trait TrajectoryLoader: Send + Sync {
    ///
    /// Load a topology and read its trajectory.
    ///
    /// # Arguments
    /// - files: topology and trajectory paths
    /// - topology_format / trajectory_format: loader formats as returned by [`loader_format`]
    ///
    fn load(
        &self,
        files: &TrajectoryFiles,
        topology_format: &str,
        trajectory_format: &str,
    ) -> Result<Box<dyn LoadedTrajectory>, TrajectoryLoadError>;
}

///
/// Resolve loader formats of both files and load them.
///
pub fn open_trajectory(
    loader: &dyn TrajectoryLoader,
    files: &TrajectoryFiles,
) -> Result<Box<dyn LoadedTrajectory>, TrajectoryLoadError> {
    let topology_format = loader_format(&files.topology)
        .map_err(|_| TrajectoryLoadError::UnsupportedFormat(files.topology.display().to_string()))?;
    let trajectory_format = loader_format(&files.trajectory).map_err(|_| {
        TrajectoryLoadError::UnsupportedFormat(files.trajectory.display().to_string())
    })?;
    loader.load(files, &topology_format, &trajectory_format)
}

///
/// Group the protein residues of a loaded structure by chain.
///
/// Chains come back sorted by chain identifier. Unrecognised residue names
/// get the unknown residue code instead of failing.
///
pub fn chain_sequences(loaded: &dyn LoadedTrajectory) -> Vec<ChainSequence> {
    let mut chains: BTreeMap<String, BTreeMap<i32, ChainResidue>> = BTreeMap::new();
    for residue in loaded.protein_residues() {
        let code = three_to_one(&residue.residue_name);
        chains.entry(residue.chain).or_default().insert(
            residue.residue_index,
            ChainResidue {
                name: residue.residue_name,
                code,
            },
        );
    }

    chains
        .into_iter()
        .map(|(chain, residues)| ChainSequence::new(&chain, residues))
        .collect()
}

///
/// Load a trajectory and return one sequence per protein chain.
///
pub fn extract_chain_sequences(
    loader: &dyn TrajectoryLoader,
    files: &TrajectoryFiles,
) -> Result<Vec<ChainSequence>, TrajectoryLoadError> {
    let loaded = open_trajectory(loader, files)?;
    Ok(chain_sequences(loaded.as_ref()))
}
