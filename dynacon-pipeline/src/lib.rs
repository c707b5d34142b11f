//! # dynacon-pipeline
//!
//! The staged analysis of submitted molecular dynamics simulations. Each
//! submission holds one or more forms (a topology and a trajectory each) and
//! goes through three stages, each queued as a task on a worker pool:
//!
//! - **Interactions**: raw contacts per form, computed by an external extractor
//! - **Numbering**: a topology snapshot per form, annotated with generic numbers
//! - **Analysis**: contacts, numbering columns and detected ligands, combined
//!   into `results/analysis.json`
//!
//! Task status only moves forward (`Pending`, `Running`, then `Success` or
//! `Failed`) and progress of running tasks is read from the frames folders.
//!
//! See [`Pipeline`] for an example.

pub mod contacts;
pub mod errors;
pub mod ligands;
pub mod pipeline;
pub mod pool;
pub mod progress;
pub mod stages;
pub mod submission;
pub mod task;

// re-exports
pub use errors::PipelineError;
pub use pipeline::{Pipeline, PipelineBuilder, TaskHandle};
pub use progress::{FormProgress, TaskProgress};
pub use submission::{Submission, SubmittedForm};
pub use task::{SubmissionTask, TaskId, TaskStatus, TaskType};
