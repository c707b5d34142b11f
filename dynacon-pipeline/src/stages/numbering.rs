//! Numbering stage: a topology snapshot per form, annotated by the generic
//! number assignment service.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use dynacon_core::Config;
use dynacon_numbering::sequence::open_trajectory;
use log::{info, warn};

use super::{FormNotes, StageContext};
use crate::submission::{Submission, SubmittedForm};

/// Annotates a PDB file with generic numbers in its B-factor column.
pub trait NumberingService: Send + Sync {
    /// Returns the annotated PDB file.
    fn assign(&self, pdb_file: &Path) -> Result<Vec<u8>>;
}

/// Client of the `assign_generic_numbers` endpoint (multipart upload of `pdb_file`).
pub struct AssignNumbersClient {
    api: String,
    client: reqwest::blocking::Client,
}

impl AssignNumbersClient {
    pub fn new(api: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(AssignNumbersClient {
            api: api.to_string(),
            client,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.assign_numbers_api, config.http_timeout())
    }
}

impl NumberingService for AssignNumbersClient {
    fn assign(&self, pdb_file: &Path) -> Result<Vec<u8>> {
        let form = reqwest::blocking::multipart::Form::new()
            .file("pdb_file", pdb_file)
            .with_context(|| format!("Failed to read {}", pdb_file.display()))?;
        let response = self
            .client
            .post(&self.api)
            .multipart(form)
            .send()
            .with_context(|| format!("Failed to reach {}", self.api))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("Failed to fetch numbering! Error {}: {}", status, body);
        }
        Ok(response.bytes()?.to_vec())
    }
}

fn number_form(context: &StageContext, submission: &Submission, form: &SubmittedForm) -> Result<()> {
    let files = submission.prepared_trajectory_files(form)?;
    let loaded = open_trajectory(context.loader.as_ref(), &files)?;

    let snapshot = submission.topology_snapshot_path(form.form_id);
    loaded.write_pdb(&snapshot)?;

    let numbered = context.numbering_service.assign(&snapshot)?;
    let outfile = submission.numbered_snapshot_path(form.form_id);
    fs::write(&outfile, numbered)
        .with_context(|| format!("Failed to write {}", outfile.display()))?;
    Ok(())
}

pub fn run(context: &StageContext, submission: &Submission, notes: FormNotes<'_>) -> Result<()> {
    let results_dir = submission.results_dir();
    fs::create_dir_all(&results_dir)
        .with_context(|| format!("Failed to create {}", results_dir.display()))?;

    for form in &submission.forms {
        notes(form.form_id, "Running");
        match number_form(context, submission, form) {
            Ok(()) => notes(form.form_id, "Done"),
            Err(e) => {
                warn!("Numbering of form {} failed: {:#}", form.form_id, e);
                notes(form.form_id, &format!("Failed: {}", e));
            }
        }
    }
    info!("Numbering PDB files of submission {} complete", submission.id);
    Ok(())
}
