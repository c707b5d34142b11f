//! A [`TrajectoryLoader`] for plain PDB topologies.
//!
//! Full trajectory readers live outside this crate. This loader covers the
//! common case of a PDB topology: the protein selection is every `ATOM`
//! record, and frames are only counted when the trajectory is itself a
//! multi-model PDB file.

use std::fs::{self, File};
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};

use dynacon_core::files::TrajectoryFiles;
use dynacon_core::utils::get_dynamic_reader;

use crate::errors::TrajectoryLoadError;
use crate::sequence::{LoadedTrajectory, ProteinResidue, TrajectoryLoader};

#[derive(Debug, Default, Clone, Copy)]
pub struct PdbTopologyLoader;

impl PdbTopologyLoader {
    pub fn new() -> Self {
        PdbTopologyLoader
    }
}

struct LoadedPdb {
    records: Vec<String>,
    frames: Option<usize>,
}

///
/// Parse the residue fields of an `ATOM` / `HETATM` record.
///
/// Returns `(chain, residue_name, residue_index, atom_name)`.
///
pub fn parse_atom_record(line: &str) -> Option<(String, String, i32, String)> {
    if line.len() < 26 || !line.is_char_boundary(26) {
        return None;
    }
    let atom_name = line.get(12..16)?.trim().to_string();
    let residue_name = line.get(17..20)?.trim().to_string();
    let chain = line.get(21..22)?.trim().to_string();
    let residue_index = line.get(22..26)?.trim().parse::<i32>().ok()?;
    Some((chain, residue_name, residue_index, atom_name))
}

fn read_lines(path: &Path) -> Result<Vec<String>, TrajectoryLoadError> {
    let reader = get_dynamic_reader(path).map_err(|e| TrajectoryLoadError::Open {
        path: path.to_path_buf(),
        source: std::io::Error::other(e.to_string()),
    })?;
    reader
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| TrajectoryLoadError::Open {
            path: path.to_path_buf(),
            source,
        })
}

impl TrajectoryLoader for PdbTopologyLoader {
    fn load(
        &self,
        files: &TrajectoryFiles,
        topology_format: &str,
        trajectory_format: &str,
    ) -> Result<Box<dyn LoadedTrajectory>, TrajectoryLoadError> {
        if topology_format != "pdb" {
            return Err(TrajectoryLoadError::UnsupportedFormat(
                files.topology.display().to_string(),
            ));
        }
        if !files.trajectory.exists() {
            return Err(TrajectoryLoadError::Open {
                path: files.trajectory.clone(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "trajectory not found"),
            });
        }

        let records: Vec<String> = read_lines(&files.topology)?
            .into_iter()
            .filter(|l| {
                l.starts_with("ATOM")
                    || l.starts_with("HETATM")
                    || l.starts_with("TER")
                    || l.starts_with("END")
            })
            .collect();

        if !records.iter().any(|l| l.starts_with("ATOM")) {
            return Err(TrajectoryLoadError::Parse {
                path: files.topology.clone(),
                reason: "no ATOM records".to_string(),
            });
        }

        // binary trajectories are not read, so their length is unknown
        let frames = if trajectory_format == "pdb" {
            let models = read_lines(&files.trajectory)?
                .iter()
                .filter(|l| l.starts_with("MODEL"))
                .count();
            Some(models.max(1))
        } else {
            None
        };

        Ok(Box::new(LoadedPdb { records, frames }))
    }
}

impl LoadedTrajectory for LoadedPdb {
    fn protein_residues(&self) -> Vec<ProteinResidue> {
        self.records
            .iter()
            .filter(|l| l.starts_with("ATOM"))
            .filter_map(|l| parse_atom_record(l))
            .map(|(chain, name, index, _)| ProteinResidue {
                chain,
                residue_name: name,
                residue_index: index,
            })
            .collect()
    }

    fn frame_count(&self) -> Option<usize> {
        self.frames
    }

    fn write_pdb(&self, out: &Path) -> Result<(), TrajectoryLoadError> {
        let to_err = |source| TrajectoryLoadError::Open {
            path: PathBuf::from(out),
            source,
        };
        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent).map_err(to_err)?;
        }
        let mut writer = BufWriter::new(File::create(out).map_err(to_err)?);
        for line in &self.records {
            writeln!(writer, "{}", line).map_err(to_err)?;
        }
        writer.flush().map_err(to_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::extract_chain_sequences;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[fixture]
    fn topology() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/data/receptor.pdb")
    }

    #[rstest]
    #[case(
        "ATOM      1  N   MET A   1      11.104   6.134  -6.504  1.00  0.00           N",
        Some(("A".to_string(), "MET".to_string(), 1, "N".to_string()))
    )]
    #[case("ATOM      1  N   MET A", None)]
    #[case(
        "ATOM      1  N   MET A   x      11.104   6.134  -6.504  1.00  0.00           N",
        None
    )]
    fn test_parse_atom_record(
        #[case] line: &str,
        #[case] expected: Option<(String, String, i32, String)>,
    ) {
        assert_eq!(parse_atom_record(line), expected);
    }

    #[rstest]
    fn test_load_pdb_topology(topology: PathBuf) {
        let loader = PdbTopologyLoader::new();
        let files = TrajectoryFiles::new(topology.clone(), topology);

        let chains = extract_chain_sequences(&loader, &files).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].one_letter_sequence(), "MVLLS");
    }

    #[rstest]
    fn test_write_snapshot(topology: PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("results/top1.pdb");
        let loader = PdbTopologyLoader::new();
        let loaded = loader
            .load(&TrajectoryFiles::new(topology.clone(), topology), "pdb", "pdb")
            .unwrap();

        loaded.write_pdb(&out).unwrap();
        let written = fs::read_to_string(&out).unwrap();
        assert!(written.lines().all(|l| !l.starts_with("REMARK")));
        assert_eq!(written.lines().filter(|l| l.starts_with("ATOM")).count(), 10);
        assert_eq!(loaded.frame_count(), Some(1));
    }

    #[rstest]
    fn test_binary_trajectory_has_unknown_frame_count(topology: PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let trajectory = dir.path().join("run.dcd");
        fs::write(&trajectory, b"").unwrap();
        let loaded = PdbTopologyLoader::new()
            .load(&TrajectoryFiles::new(topology, trajectory), "pdb", "dcd")
            .unwrap();
        assert_eq!(loaded.frame_count(), None);
    }

    #[rstest]
    fn test_non_pdb_topology_is_unsupported(topology: PathBuf) {
        let loader = PdbTopologyLoader::new();
        let files = TrajectoryFiles::new(PathBuf::from("system.psf"), topology);
        assert!(matches!(
            loader.load(&files, "psf", "pdb"),
            Err(TrajectoryLoadError::UnsupportedFormat(_))
        ));
    }
}
