//! Analysis stage: per form run data and submission wide group data,
//! persisted as `results/analysis.json`.

use std::collections::{BTreeMap, HashMap};
use std::fs;

use anyhow::{Context, Result};
use dynacon_core::models::{NumberingMap, ResidueKey};
use dynacon_numbering::Diagnostic;
use dynacon_numbering::numbered_pdb::{PdbNumbering, read_numbered_pdb};
use dynacon_numbering::sequence::open_trajectory;
use log::{info, warn};
use serde::Serialize;

use super::{FormNotes, StageContext};
use crate::contacts::{Contact, interaction_counts, read_contacts_tsv};
use crate::errors::PipelineError;
use crate::ligands::{LigandDetectionAggregator, LigandSummary, read_frame_reports};
use crate::submission::{Submission, SubmittedForm};

#[derive(Debug, Clone, Serialize)]
pub struct RunData {
    pub form_id: u32,
    pub name: Option<String>,
    pub value: f64,
    pub contact_count: usize,
    /// frame -> interaction type -> count
    pub interaction_counts: BTreeMap<u64, BTreeMap<String, usize>>,
    pub contacts: Vec<Contact>,
    pub ligands: Vec<LigandSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub numbering_diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupData {
    pub submission_id: String,
    pub forms: usize,
    pub total_contacts: usize,
    pub mean_value: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisArtifact {
    pub group: GroupData,
    pub runs: Vec<RunData>,
}

/// Fail fast when a form has no raw contacts to analyse.
pub fn check_dependencies(submission: &Submission) -> Result<(), PipelineError> {
    let missing: Vec<String> = submission
        .forms
        .iter()
        .map(|f| submission.raw_contacts_path(f.form_id))
        .filter(|p| !p.is_file())
        .map(|p| p.display().to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::DependencyNotSatisfied {
            submission: submission.id.clone(),
            reason: format!("interaction results missing: {}", missing.join(", ")),
        })
    }
}

fn first_label<'a, F>(contact: &Contact, lookup: F) -> Option<String>
where
    F: Fn(&ResidueKey) -> Option<&'a str>,
{
    contact
        .residue_keys()
        .iter()
        .find_map(|key| lookup(key).map(String::from))
}

fn add_numbering_columns(
    contacts: &mut [Contact],
    pdb_table: Option<&HashMap<ResidueKey, PdbNumbering>>,
    blast_map: &NumberingMap,
) {
    for contact in contacts.iter_mut() {
        if let Some(table) = pdb_table {
            contact.pdb_numbering = first_label(contact, |key| {
                table.get(key).and_then(|n| n.generic_number.as_deref())
            });
        }
        contact.blast_numbering = first_label(contact, |key| blast_map.get(key));
    }
}

/// Frames to rate ligands against; never fewer than the reports read.
fn frame_total(counted: Option<usize>, reports: usize) -> usize {
    match counted {
        Some(total) if total >= reports => total,
        Some(total) => {
            warn!("Trajectory has {} frames but {} reports, using the reports", total, reports);
            reports
        }
        None => reports,
    }
}

fn analyse_form(
    context: &StageContext,
    submission: &Submission,
    form: &SubmittedForm,
) -> Result<RunData> {
    let mut contacts = read_contacts_tsv(&submission.raw_contacts_path(form.form_id))?;
    let mut numbering_diagnostics = Vec::new();

    if submission.common_numbering {
        let numbered = submission.numbered_snapshot_path(form.form_id);
        let pdb_table = if numbered.is_file() {
            Some(read_numbered_pdb(&numbered)?)
        } else {
            warn!(
                "No numbered structure for form {}, PDB numbering left empty",
                form.form_id
            );
            None
        };

        let files = submission.prepared_trajectory_files(form)?;
        let report = context
            .resolver
            .resolve(context.loader.as_ref(), &files)
            .with_context(|| format!("Numbering resolution of form {} failed", form.form_id))?;
        add_numbering_columns(&mut contacts, pdb_table.as_ref(), &report.map);
        numbering_diagnostics = report.diagnostics;
    }

    let reports = read_frame_reports(&submission.frames_dir(form.form_id))?;
    let ligands = if reports.is_empty() {
        vec![]
    } else {
        let mut aggregator = LigandDetectionAggregator::new();
        for report in &reports {
            aggregator.add_frame(report);
        }
        let counted = submission
            .prepared_trajectory_files(form)
            .map_err(anyhow::Error::from)
            .and_then(|files| Ok(open_trajectory(context.loader.as_ref(), &files)?.frame_count()))
            .unwrap_or_else(|e| {
                warn!("Can't count frames of form {}: {:#}", form.form_id, e);
                None
            });
        let total_frames = frame_total(counted, reports.len());
        aggregator.summarize(total_frames, &context.ligand_tables)
    };

    Ok(RunData {
        form_id: form.form_id,
        name: form.name.clone(),
        value: form.value,
        contact_count: contacts.len(),
        interaction_counts: interaction_counts(&contacts),
        contacts,
        ligands,
        numbering_diagnostics,
    })
}

pub fn run(context: &StageContext, submission: &Submission, notes: FormNotes<'_>) -> Result<()> {
    check_dependencies(submission)?;

    let mut runs = Vec::with_capacity(submission.forms.len());
    for form in &submission.forms {
        notes(form.form_id, "Running");
        runs.push(analyse_form(context, submission, form)?);
        notes(form.form_id, "Done");
    }

    let total_contacts = runs.iter().map(|r| r.contact_count).sum();
    let mean_value = if runs.is_empty() {
        None
    } else {
        Some(runs.iter().map(|r| r.value).sum::<f64>() / runs.len() as f64)
    };
    let artifact = AnalysisArtifact {
        group: GroupData {
            submission_id: submission.id.clone(),
            forms: runs.len(),
            total_contacts,
            mean_value,
        },
        runs,
    };

    let out = submission.analysis_path();
    fs::write(&out, serde_json::to_vec_pretty(&artifact)?)
        .with_context(|| format!("Failed to write {}", out.display()))?;
    info!("Analysis of submission {} written to {}", submission.id, out.display());
    Ok(())
}
