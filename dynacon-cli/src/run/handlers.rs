use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use clap::ArgMatches;
use dynacon_pipeline::submission::read_forms;
use dynacon_pipeline::{Pipeline, Submission, TaskHandle, TaskStatus, TaskType};
use log::info;

use crate::load_config;

// report progress until the task is terminal
fn follow(pipeline: &Pipeline, handle: &TaskHandle, poll: Duration) -> Result<TaskStatus> {
    loop {
        match handle.wait(poll) {
            Some(status) if status.is_terminal() => return Ok(status),
            Some(_) => {
                let progress = pipeline.progress(handle.id())?;
                for line in progress.summaries() {
                    info!("{} [{}] {}", progress.task_type, progress.status, line);
                }
            }
            None => bail!("Task {} disappeared", handle.id()),
        }
    }
}

pub fn run_submission(matches: &ArgMatches) -> Result<()> {
    let mut config = load_config(matches)?;

    let dir = matches
        .get_one::<String>("submission")
        .map(PathBuf::from)
        .expect("A submission directory is required");
    let forms = matches
        .get_one::<String>("forms")
        .expect("A forms file is required");
    let common_numbering = matches.get_flag("common-numbering");
    let poll = Duration::from_secs(*matches.get_one::<u64>("poll").unwrap_or(&5));

    let dir = dir
        .canonicalize()
        .with_context(|| format!("Submission directory not found: {}", dir.display()))?;
    let id = dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Can't take a submission id from {}", dir.display()))?
        .to_string();
    if let Some(parent) = dir.parent() {
        config.media_root = parent.to_path_buf();
    }

    let forms = read_forms(Path::new(forms))?;
    let pipeline = Pipeline::builder(config).finish()?;
    pipeline.register(Submission::new(
        &id,
        &pipeline.config().media_root,
        forms,
        common_numbering,
    ));

    let interactions = pipeline.enqueue(&id, TaskType::Interactions)?;
    let numbering = pipeline.enqueue(&id, TaskType::Numbering)?;

    let status = follow(&pipeline, &interactions, poll)?;
    info!("{}: {}", TaskType::Interactions, status);
    let status = follow(&pipeline, &numbering, poll)?;
    info!("{}: {}", TaskType::Numbering, status);

    let analysis = pipeline.enqueue(&id, TaskType::Analysis)?;
    match follow(&pipeline, &analysis, poll)? {
        TaskStatus::Success => {
            let submission = pipeline
                .submission(&id)
                .ok_or_else(|| anyhow!("Submission {} vanished", id))?;
            println!("{}", submission.analysis_path().display());
            Ok(())
        }
        status => bail!("Analysis of submission {} ended with {}", id, status),
    }
}
