//! Submissions and their on-disk layout.
//!
//! ```text
//! <media_root>/<id>/<form_id>/          uploaded inputs of one form
//! <media_root>/<id>/results/            stage outputs
//! <media_root>/<id>/frames/<form_id>/   per frame reports
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dynacon_core::consts::{
    ANALYSIS_FILE, FRAMES_SUBFOLDER, RESULTS_SUBFOLDER, numbered_snapshot_file, raw_contacts_file,
    topology_snapshot_file,
};
use dynacon_core::files::{FileInput, TrajectoryFiles};
use dynacon_core::CoreError;
use serde::{Deserialize, Serialize};

/// One simulation of a submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedForm {
    pub form_id: u32,
    pub file_input: FileInput,
    /// User supplied value attached to the simulation (e.g. an affinity).
    pub value: f64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Submission {
    pub id: String,
    pub root: PathBuf,
    pub forms: Vec<SubmittedForm>,
    pub common_numbering: bool,
}

impl Submission {
    pub fn new(id: &str, media_root: &Path, forms: Vec<SubmittedForm>, common_numbering: bool) -> Self {
        Submission {
            id: id.to_string(),
            root: media_root.join(id),
            forms,
            common_numbering,
        }
    }

    pub fn form_dir(&self, form_id: u32) -> PathBuf {
        self.root.join(form_id.to_string())
    }

    pub fn results_dir(&self) -> PathBuf {
        self.root.join(RESULTS_SUBFOLDER)
    }

    pub fn frames_dir(&self, form_id: u32) -> PathBuf {
        self.root.join(FRAMES_SUBFOLDER).join(form_id.to_string())
    }

    pub fn raw_contacts_path(&self, form_id: u32) -> PathBuf {
        self.results_dir().join(raw_contacts_file(form_id))
    }

    pub fn topology_snapshot_path(&self, form_id: u32) -> PathBuf {
        self.results_dir().join(topology_snapshot_file(form_id))
    }

    pub fn numbered_snapshot_path(&self, form_id: u32) -> PathBuf {
        self.results_dir().join(numbered_snapshot_file(form_id))
    }

    pub fn analysis_path(&self) -> PathBuf {
        self.results_dir().join(ANALYSIS_FILE)
    }

    /// Topology and trajectory of one form. Never writes to the form directory.
    pub fn trajectory_files(&self, form: &SubmittedForm) -> Result<TrajectoryFiles, CoreError> {
        TrajectoryFiles::discover(&self.form_dir(form.form_id), form.file_input)
    }

    /// Like [`Submission::trajectory_files`], ready to be opened by a loader.
    pub fn prepared_trajectory_files(&self, form: &SubmittedForm) -> Result<TrajectoryFiles, CoreError> {
        let files = self.trajectory_files(form)?;
        files.ensure_trajectory_stub()?;
        Ok(files)
    }
}

/// Read the forms of a submission from a JSON list.
pub fn read_forms(path: &Path) -> Result<Vec<SubmittedForm>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read forms file: {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Failed to parse forms file: {}", path.display()))
}
