//! Locating trajectory inputs inside an uploaded form directory.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

const TOPOLOGY_EXTENSIONS: [&str; 2] = ["pdb", "psf"];
const TRAJECTORY_EXTENSIONS: [&str; 3] = ["dcd", "xtc", "trr"];

/// Formats the structure loader understands, keyed by file extension.
pub const LOADER_FORMATS: [&str; 7] = ["pdb", "psf", "mae", "dcd", "xtc", "trr", "dtr"];

/// Name of the stub file the loader opens inside a Desmond `*_trj` directory.
pub const MAESTRO_TRAJECTORY_STUB: &str = "clickme.dtr";

/// How the files of one form were uploaded.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum FileInput {
    /// A Desmond/Maestro output directory
    #[serde(alias = "M", alias = "MaestroDir")]
    Maestro,
    /// A topology file plus a trajectory file
    #[serde(alias = "T")]
    TopTrjPair,
}

impl FromStr for FileInput {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M" | "maestro" | "MaestroDir" => Ok(FileInput::Maestro),
            "T" | "pair" | "TopTrjPair" => Ok(FileInput::TopTrjPair),
            _ => Err(format!("Invalid file input type: {}", s)),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TrajectoryFiles {
    pub topology: PathBuf,
    pub trajectory: PathBuf,
}

impl TrajectoryFiles {
    pub fn new(topology: PathBuf, trajectory: PathBuf) -> Self {
        TrajectoryFiles {
            topology,
            trajectory,
        }
    }

    ///
    /// Find the topology and trajectory files of a form directory.
    ///
    /// # Arguments
    /// - dir: the form directory
    /// - input: how the form was uploaded
    ///
    pub fn discover(dir: &Path, input: FileInput) -> Result<Self, CoreError> {
        let found = match input {
            FileInput::Maestro => discover_maestro(dir)?,
            FileInput::TopTrjPair => discover_pair(dir)?,
        };
        found.ok_or_else(|| CoreError::TrajectoryFilesNotFound(dir.display().to_string()))
    }

    ///
    /// Create the Desmond trajectory stub if it is missing. The loader needs
    /// the file to exist; its content is irrelevant. Other inputs are left
    /// untouched.
    ///
    pub fn ensure_trajectory_stub(&self) -> Result<(), CoreError> {
        let is_stub = self
            .trajectory
            .file_name()
            .is_some_and(|n| n == MAESTRO_TRAJECTORY_STUB);
        if is_stub && !self.trajectory.exists() {
            File::create(&self.trajectory)?;
        }
        Ok(())
    }
}

///
/// Loader format of a structure file: its extension, except that `cms`
/// files are read as `mae`.
///
pub fn loader_format(path: &Path) -> Result<String, CoreError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    let format = if ext == "cms" { "mae".to_string() } else { ext };

    if LOADER_FORMATS.contains(&format.as_str()) {
        Ok(format)
    } else {
        Err(CoreError::UnsupportedFormat(path.display().to_string()))
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, CoreError> {
    let mut entries = fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|e| e.path())
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.contains(&e))
}

fn discover_pair(dir: &Path) -> Result<Option<TrajectoryFiles>, CoreError> {
    let mut topology = None;
    let mut trajectory = None;
    for path in sorted_entries(dir)? {
        if !path.is_file() {
            continue;
        }
        if topology.is_none() && has_extension(&path, &TOPOLOGY_EXTENSIONS) {
            topology = Some(path);
        } else if trajectory.is_none() && has_extension(&path, &TRAJECTORY_EXTENSIONS) {
            trajectory = Some(path);
        }
        if let (Some(top), Some(trj)) = (&topology, &trajectory) {
            return Ok(Some(TrajectoryFiles::new(top.clone(), trj.clone())));
        }
    }
    Ok(None)
}

fn discover_maestro(dir: &Path) -> Result<Option<TrajectoryFiles>, CoreError> {
    let mut trajectory = None;
    let mut topology = None;

    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for path in sorted_entries(&current)? {
            if path.is_dir() {
                let is_trj = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with("_trj"));
                if is_trj && trajectory.is_none() {
                    trajectory = Some(path.join(MAESTRO_TRAJECTORY_STUB));
                }
                pending.push(path);
            } else if topology.is_none()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with("-out.cms"))
            {
                topology = Some(path);
            }
        }
    }

    Ok(topology
        .zip(trajectory)
        .map(|(top, trj)| TrajectoryFiles::new(top, trj)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    #[case("system-out.cms", "mae")]
    #[case("top.PDB", "pdb")]
    #[case("run.xtc", "xtc")]
    fn test_loader_format(#[case] file: &str, #[case] expected: &str) {
        assert_eq!(loader_format(Path::new(file)).unwrap(), expected);
    }

    #[rstest]
    fn test_loader_format_rejects_unknown() {
        assert!(loader_format(Path::new("notes.txt")).is_err());
        assert!(loader_format(Path::new("no_extension")).is_err());
    }

    #[rstest]
    fn test_discover_pair() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("readme.md")).unwrap();
        File::create(dir.path().join("system.psf")).unwrap();
        File::create(dir.path().join("run.dcd")).unwrap();

        let files = TrajectoryFiles::discover(dir.path(), FileInput::TopTrjPair).unwrap();
        assert_eq!(files.topology, dir.path().join("system.psf"));
        assert_eq!(files.trajectory, dir.path().join("run.dcd"));
    }

    #[rstest]
    fn test_discover_pair_missing_trajectory() {
        let dir = tempfile::tempdir().unwrap();
        File::create(dir.path().join("system.pdb")).unwrap();
        assert!(TrajectoryFiles::discover(dir.path(), FileInput::TopTrjPair).is_err());
    }

    #[rstest]
    fn test_discover_maestro_is_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let run = dir.path().join("md_run");
        fs::create_dir_all(run.join("md_run_trj")).unwrap();
        File::create(run.join("md_run-out.cms")).unwrap();

        let files = TrajectoryFiles::discover(dir.path(), FileInput::Maestro).unwrap();
        assert_eq!(files.topology, run.join("md_run-out.cms"));
        assert_eq!(files.trajectory, run.join("md_run_trj").join(MAESTRO_TRAJECTORY_STUB));
        assert!(!files.trajectory.exists());

        files.ensure_trajectory_stub().unwrap();
        assert!(files.trajectory.exists());
    }

    #[rstest]
    fn test_pair_needs_no_stub() {
        let dir = tempfile::tempdir().unwrap();
        let files = TrajectoryFiles::new(dir.path().join("top.pdb"), dir.path().join("run.dcd"));
        files.ensure_trajectory_stub().unwrap();
        assert!(!files.trajectory.exists());
    }

    #[rstest]
    #[case("M", FileInput::Maestro)]
    #[case("TopTrjPair", FileInput::TopTrjPair)]
    fn test_file_input_from_str(#[case] input: &str, #[case] expected: FileInput) {
        assert_eq!(input.parse::<FileInput>().unwrap(), expected);
    }
}
