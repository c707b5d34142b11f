//! Bodies of the three pipeline stages.
//!
//! A stage body runs on a worker thread and returns `Err` (or panics) to fail
//! its task. Problems limited to one form are logged, noted on the task and
//! skipped so the other forms still run.

use std::sync::Arc;

use dynacon_numbering::{NumberingResolver, TrajectoryLoader};

use crate::ligands::LigandTables;
use crate::submission::Submission;
use crate::task::TaskType;

pub mod analysis;
pub mod interactions;
pub mod numbering;

pub use analysis::{AnalysisArtifact, GroupData, RunData};
pub use interactions::{GetContactsRunner, InteractionExtractor};
pub use numbering::{AssignNumbersClient, NumberingService};

/// Collaborators shared by every stage.
pub struct StageContext {
    pub loader: Arc<dyn TrajectoryLoader>,
    pub extractor: Arc<dyn InteractionExtractor>,
    pub numbering_service: Arc<dyn NumberingService>,
    pub resolver: NumberingResolver,
    pub ligand_tables: Arc<LigandTables>,
}

/// Receives per form notes from a running stage.
pub type FormNotes<'a> = &'a (dyn Fn(u32, &str) + Sync);

pub fn run_stage(
    task_type: TaskType,
    context: &StageContext,
    submission: &Submission,
    notes: FormNotes<'_>,
) -> anyhow::Result<()> {
    match task_type {
        TaskType::Interactions => interactions::run(context, submission, notes),
        TaskType::Numbering => numbering::run(context, submission, notes),
        TaskType::Analysis => analysis::run(context, submission, notes),
    }
}
