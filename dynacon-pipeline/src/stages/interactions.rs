//! Interactions stage: one raw contacts file per form.

use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Result, bail};
use dynacon_core::Config;
use dynacon_core::files::TrajectoryFiles;
use log::{info, warn};

use super::{FormNotes, StageContext};
use crate::ligands::write_contacts_frame_reports;
use crate::submission::Submission;

///
/// Computes the contacts of a trajectory into a TSV file.
///
/// Implementations also write one report per processed frame into
/// `frames_dir` (see [`crate::ligands`]); progress polling counts them and
/// the analysis reads ligands from them.
///
pub trait InteractionExtractor: Send + Sync {
    fn extract(&self, files: &TrajectoryFiles, outfile: &Path, frames_dir: &Path) -> Result<()>;
}

/// Runs the GetContacts `get_dynamic_contacts.py` script.
#[derive(Debug, Clone)]
pub struct GetContactsRunner {
    interpreter: PathBuf,
    script: PathBuf,
    cores: u32,
}

impl GetContactsRunner {
    pub fn new(interpreter: &Path, script: &Path, cores: u32) -> Self {
        GetContactsRunner {
            interpreter: interpreter.to_path_buf(),
            script: script.to_path_buf(),
            cores,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.interpreter, &config.contacts_script, config.contacts_cores)
    }
}

impl InteractionExtractor for GetContactsRunner {
    fn extract(&self, files: &TrajectoryFiles, outfile: &Path, frames_dir: &Path) -> Result<()> {
        let mut child = Command::new(&self.interpreter)
            .arg(&self.script)
            .arg("--trajectory")
            .arg(&files.trajectory)
            .arg("--topology")
            .arg(&files.topology)
            .arg("--itypes")
            .arg("all")
            .arg("--output")
            .arg(outfile)
            .arg("--sele2")
            .arg("ligand")
            .arg("--cores")
            .arg(self.cores.to_string())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to run {}", self.script.display()))?;

        let stderr = child.stderr.take().map(|stderr| {
            thread::spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(|l| l.ok()) {
                    warn!("get_contacts: {}", line.trim());
                }
            })
        });
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines().map_while(|l| l.ok()) {
                info!("get_contacts: {}", line.trim());
            }
        }

        let status = child.wait()?;
        if let Some(handle) = stderr {
            let _ = handle.join();
        }
        if !status.success() {
            bail!("{} exited with {}", self.script.display(), status);
        }
        info!("get_contacts: done, wrote {}", outfile.display());

        let frames = write_contacts_frame_reports(outfile, frames_dir)
            .with_context(|| format!("Failed to write frame reports of {}", outfile.display()))?;
        info!("{} frame reports written to {}", frames, frames_dir.display());
        Ok(())
    }
}

pub fn run(context: &StageContext, submission: &Submission, notes: FormNotes<'_>) -> Result<()> {
    let results_dir = submission.results_dir();
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("Failed to create {}", results_dir.display()))?;

    info!("Computing interactions of submission {}", submission.id);
    for form in &submission.forms {
        let files = match submission.prepared_trajectory_files(form) {
            Ok(files) => files,
            Err(e) => {
                warn!("Skipping form {} of {}: {}", form.form_id, submission.id, e);
                notes(form.form_id, &format!("Skipped: {}", e));
                continue;
            }
        };
        notes(form.form_id, "Running");

        let outfile = submission.raw_contacts_path(form.form_id);
        let frames_dir = submission.frames_dir(form.form_id);
        if frames_dir.exists() {
            // the folder only holds reports of this run
            fs::remove_dir_all(&frames_dir)
                .with_context(|| format!("Failed to clear {}", frames_dir.display()))?;
        }
        match context.extractor.extract(&files, &outfile, &frames_dir) {
            Ok(()) => notes(form.form_id, "Done"),
            Err(e) => {
                warn!("Interactions of form {} failed: {:#}", form.form_id, e);
                notes(form.form_id, &format!("Failed: {}", e));
            }
        }
    }
    info!("All interactions of submission {} computed", submission.id);
    Ok(())
}
