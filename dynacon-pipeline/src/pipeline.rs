//! The staged analysis pipeline: task records, dispatch and progress.

use std::collections::HashMap;
use std::fs;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use dynacon_core::Config;
use dynacon_numbering::aligner::BlastAligner;
use dynacon_numbering::cache::ReferenceNumberingCacheBuilder;
use dynacon_numbering::pdb::PdbTopologyLoader;
use dynacon_numbering::sequence::open_trajectory;
use dynacon_numbering::{NumberingResolver, TrajectoryLoader};
use log::{debug, error, info, warn};

use crate::errors::{PipelineError, Result};
use crate::ligands::LigandTables;
use crate::pool::WorkerPool;
use crate::progress::{FormProgress, TaskProgress, running_form_progress};
use crate::stages::{
    AssignNumbersClient, GetContactsRunner, InteractionExtractor, NumberingService, StageContext,
    run_stage,
};
use crate::submission::Submission;
use crate::task::{SubmissionTask, TaskId, TaskStatus, TaskType};

/// Task records, shared between the pipeline and its workers.
#[derive(Default)]
struct TaskStore {
    tasks: Mutex<HashMap<TaskId, SubmissionTask>>,
    changed: Condvar,
}

impl TaskStore {
    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, SubmissionTask>> {
        self.tasks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn insert(&self, task: SubmissionTask) {
        self.lock().insert(task.id, task);
    }

    fn get(&self, id: TaskId) -> Option<SubmissionTask> {
        self.lock().get(&id).cloned()
    }

    fn of_submission(&self, submission_id: &str) -> Vec<SubmissionTask> {
        let mut tasks: Vec<SubmissionTask> = self
            .lock()
            .values()
            .filter(|t| t.submission_id == submission_id)
            .cloned()
            .collect();
        tasks.sort_by_key(|t| t.id);
        tasks
    }

    fn transition(&self, id: TaskId, next: TaskStatus) -> Result<()> {
        let mut tasks = self.lock();
        let task = tasks.get_mut(&id).ok_or(PipelineError::UnknownTask(id))?;
        if !task.status.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                id,
                from: task.status,
                to: next,
            });
        }
        task.status = next;
        task.updated_at = Utc::now();
        drop(tasks);
        self.changed.notify_all();
        Ok(())
    }

    fn note(&self, id: TaskId, form_id: u32, note: &str) {
        if let Some(task) = self.lock().get_mut(&id) {
            task.progress_info.insert(form_id, note.to_string());
            task.updated_at = Utc::now();
        }
    }

    fn remove_submission(&self, submission_id: &str) -> usize {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|_, t| t.submission_id != submission_id);
        let removed = before - tasks.len();
        drop(tasks);
        self.changed.notify_all();
        removed
    }

    fn wait_terminal(&self, id: TaskId, timeout: Duration) -> Option<TaskStatus> {
        let deadline = Instant::now() + timeout;
        let mut tasks = self.lock();
        loop {
            let status = tasks.get(&id)?.status;
            let now = Instant::now();
            if status.is_terminal() || now >= deadline {
                return Some(status);
            }
            tasks = self
                .changed
                .wait_timeout(tasks, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
    }
}

/// Returned by [`Pipeline::enqueue`]; lets the caller follow its task.
#[derive(Clone)]
pub struct TaskHandle {
    id: TaskId,
    store: Arc<TaskStore>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current status; `None` once the submission was deleted.
    pub fn status(&self) -> Option<TaskStatus> {
        self.store.get(self.id).map(|t| t.status)
    }

    /// Block until the task is terminal or `timeout` passes.
    pub fn wait(&self, timeout: Duration) -> Option<TaskStatus> {
        self.store.wait_terminal(self.id, timeout)
    }
}

/// Use this builder to swap the external collaborators of a [`Pipeline`].
/// Anything not set is built from the [`Config`].
pub struct PipelineBuilder {
    config: Config,
    loader: Option<Arc<dyn TrajectoryLoader>>,
    extractor: Option<Arc<dyn InteractionExtractor>>,
    numbering_service: Option<Arc<dyn NumberingService>>,
    resolver: Option<NumberingResolver>,
    ligand_tables: Option<LigandTables>,
}

impl PipelineBuilder {
    pub fn new(config: Config) -> Self {
        PipelineBuilder {
            config,
            loader: None,
            extractor: None,
            numbering_service: None,
            resolver: None,
            ligand_tables: None,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn TrajectoryLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn InteractionExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    pub fn with_numbering_service(mut self, service: Arc<dyn NumberingService>) -> Self {
        self.numbering_service = Some(service);
        self
    }

    pub fn with_resolver(mut self, resolver: NumberingResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn with_ligand_tables(mut self, tables: LigandTables) -> Self {
        self.ligand_tables = Some(tables);
        self
    }

    pub fn finish(self) -> anyhow::Result<Pipeline> {
        let config = self.config;

        let loader: Arc<dyn TrajectoryLoader> = self
            .loader
            .unwrap_or_else(|| Arc::new(PdbTopologyLoader::new()));
        let extractor: Arc<dyn InteractionExtractor> = self
            .extractor
            .unwrap_or_else(|| Arc::new(GetContactsRunner::from_config(&config)));
        let numbering_service: Arc<dyn NumberingService> = match self.numbering_service {
            Some(service) => service,
            None => Arc::new(AssignNumbersClient::from_config(&config)?),
        };
        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => {
                let cache = ReferenceNumberingCacheBuilder::from_config(&config).finish()?;
                NumberingResolver::new(
                    Arc::new(BlastAligner::from_config(&config)),
                    Arc::new(cache),
                )
            }
        };
        let ligand_tables = self
            .ligand_tables
            .unwrap_or_else(|| LigandTables::load(&config.chebi_folder));

        let pool = WorkerPool::new(config.workers);
        info!("Pipeline started with {} worker(s)", pool.size());

        Ok(Pipeline {
            context: Arc::new(StageContext {
                loader,
                extractor,
                numbering_service,
                resolver,
                ligand_tables: Arc::new(ligand_tables),
            }),
            config,
            submissions: RwLock::new(HashMap::new()),
            tasks: Arc::new(TaskStore::default()),
            next_id: AtomicU64::new(1),
            pool,
        })
    }
}

///
/// Runs the Interactions, Numbering and Analysis stages of submissions on a
/// worker pool.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// use dynacon_core::Config;
/// use dynacon_core::files::FileInput;
/// use dynacon_pipeline::{Pipeline, Submission, SubmittedForm, TaskType};
///
/// # fn main() -> anyhow::Result<()> {
/// let config = Config::default().with_env_overrides();
/// let pipeline = Pipeline::builder(config.clone()).finish()?;
///
/// let forms = vec![SubmittedForm { form_id: 1, file_input: FileInput::Maestro, value: 7.5, name: None }];
/// pipeline.register(Submission::new("17a1ed8c", &config.media_root, forms, true));
///
/// let interactions = pipeline.enqueue("17a1ed8c", TaskType::Interactions)?;
/// pipeline.enqueue("17a1ed8c", TaskType::Numbering)?;
/// interactions.wait(Duration::from_secs(3600));
/// pipeline.enqueue("17a1ed8c", TaskType::Analysis)?;
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    config: Config,
    context: Arc<StageContext>,
    submissions: RwLock<HashMap<String, Arc<Submission>>>,
    tasks: Arc<TaskStore>,
    next_id: AtomicU64,
    pool: WorkerPool,
}

impl Pipeline {
    pub fn builder(config: Config) -> PipelineBuilder {
        PipelineBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Make a submission known to the pipeline, replacing one with the same id.
    pub fn register(&self, submission: Submission) {
        let mut submissions = self.submissions.write().unwrap_or_else(|e| e.into_inner());
        submissions.insert(submission.id.clone(), Arc::new(submission));
    }

    pub fn submission(&self, id: &str) -> Option<Arc<Submission>> {
        self.submissions
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    ///
    /// Queue one stage of a submission and return without waiting for it.
    ///
    /// Analysis is refused unless Interactions has been queued for the same
    /// submission before.
    ///
    pub fn enqueue(&self, submission_id: &str, task_type: TaskType) -> Result<TaskHandle> {
        let submission = self
            .submission(submission_id)
            .ok_or_else(|| PipelineError::UnknownSubmission(submission_id.to_string()))?;

        if task_type == TaskType::Analysis
            && !self
                .tasks
                .of_submission(submission_id)
                .iter()
                .any(|t| t.task_type == TaskType::Interactions)
        {
            return Err(PipelineError::DependencyNotSatisfied {
                submission: submission_id.to_string(),
                reason: "Analysis queued before Interactions".to_string(),
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.tasks
            .insert(SubmissionTask::new(id, submission_id, task_type));
        debug!("Queued {} task {} for {}", task_type, id, submission_id);

        let store = Arc::clone(&self.tasks);
        let context = Arc::clone(&self.context);
        self.pool.execute(move || run_task(id, task_type, &store, &context, &submission))?;

        Ok(TaskHandle {
            id,
            store: Arc::clone(&self.tasks),
        })
    }

    pub fn task(&self, id: TaskId) -> Option<SubmissionTask> {
        self.tasks.get(id)
    }

    pub fn tasks_of(&self, submission_id: &str) -> Vec<SubmissionTask> {
        self.tasks.of_submission(submission_id)
    }

    ///
    /// Progress of a task. Running Interactions tasks report frames done per
    /// form, read from the frames folders; other tasks report their status
    /// or the last note their worker left.
    ///
    pub fn progress(&self, id: TaskId) -> Result<TaskProgress> {
        let task = self.tasks.get(id).ok_or(PipelineError::UnknownTask(id))?;
        let submission = self
            .submission(&task.submission_id)
            .ok_or_else(|| PipelineError::UnknownSubmission(task.submission_id.clone()))?;

        let forms = submission
            .forms
            .iter()
            .map(|form| {
                if task.status == TaskStatus::Running && task.task_type == TaskType::Interactions {
                    let loader = self.context.loader.as_ref();
                    return running_form_progress(
                        form.form_id,
                        &submission.frames_dir(form.form_id),
                        || {
                            let files = submission.trajectory_files(form).ok()?;
                            open_trajectory(loader, &files).ok()?.frame_count()
                        },
                    );
                }
                let summary = match (task.status, task.progress_info.get(&form.form_id)) {
                    (TaskStatus::Pending, _) => "Queued".to_string(),
                    (_, Some(note)) => note.clone(),
                    (TaskStatus::Running, None) => "Queued".to_string(),
                    (TaskStatus::Success, None) => "Finished".to_string(),
                    (TaskStatus::Failed, None) => "Failure".to_string(),
                };
                FormProgress {
                    form_id: form.form_id,
                    frames_done: 0,
                    total_frames: None,
                    summary,
                }
            })
            .collect();

        Ok(TaskProgress {
            task_id: id,
            task_type: task.task_type,
            status: task.status,
            forms,
        })
    }

    ///
    /// Forget a submission and its tasks and remove its directory.
    ///
    /// Running workers are not waited for; removal errors are ignored.
    ///
    pub fn delete_submission(&self, submission_id: &str) -> Result<()> {
        let removed = self
            .submissions
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(submission_id)
            .ok_or_else(|| PipelineError::UnknownSubmission(submission_id.to_string()))?;

        let tasks = self.tasks.remove_submission(submission_id);
        if let Err(e) = fs::remove_dir_all(&removed.root) {
            debug!("Ignoring removal error for {}: {}", removed.root.display(), e);
        }
        info!("Deleted submission {} and {} task(s)", submission_id, tasks);
        Ok(())
    }
}

fn run_task(
    id: TaskId,
    task_type: TaskType,
    store: &TaskStore,
    context: &StageContext,
    submission: &Submission,
) {
    if let Err(e) = store.transition(id, TaskStatus::Running) {
        warn!("Not running task {}: {}", id, e);
        return;
    }
    info!("{} task {} for {} started", task_type, id, submission.id);

    let notes = |form_id: u32, note: &str| store.note(id, form_id, note);
    let outcome = catch_unwind(AssertUnwindSafe(|| {
        run_stage(task_type, context, submission, &notes)
    }));

    let status = match outcome {
        Ok(Ok(())) => {
            info!("{} task {} for {} succeeded", task_type, id, submission.id);
            TaskStatus::Success
        }
        Ok(Err(e)) => {
            error!("{} task {} for {} failed: {:#}", task_type, id, submission.id, e);
            TaskStatus::Failed
        }
        Err(_) => {
            error!("{} task {} for {} panicked", task_type, id, submission.id);
            TaskStatus::Failed
        }
    };

    // the record is gone if the submission was deleted meanwhile
    if let Err(e) = store.transition(id, status) {
        debug!("Dropping final status of task {}: {}", id, e);
    }
}
