//! Progress of running tasks, derived from what is already on disk.
//!
//! Polling only reads the frames folder of each form; it never talks to the
//! worker. A folder that does not exist yet means no frame is done.

use std::fs;
use std::path::Path;

use serde::Serialize;

use crate::task::{TaskId, TaskStatus, TaskType};

/// Progress of one form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormProgress {
    pub form_id: u32,
    pub frames_done: usize,
    pub total_frames: Option<usize>,
    pub summary: String,
}

/// Snapshot of one task as shown to the surrounding application.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskProgress {
    pub task_id: TaskId,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub forms: Vec<FormProgress>,
}

impl TaskProgress {
    /// Per form lines, e.g. `1: Running 12 / 100 frames`.
    pub fn summaries(&self) -> Vec<String> {
        self.forms
            .iter()
            .map(|f| format!("{}: {}", f.form_id, f.summary))
            .collect()
    }
}

/// Number of per frame reports written so far; zero when the folder is missing.
pub fn count_frames_done(frames_dir: &Path) -> usize {
    if !frames_dir.is_dir() {
        return 0;
    }
    match fs::read_dir(frames_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .count(),
        Err(_) => 0,
    }
}

///
/// Progress line of one form of a running task.
///
/// `total_frames` is only asked for once some frame is done, since reading
/// the trajectory to count frames is expensive.
///
pub fn running_form_progress<F>(form_id: u32, frames_dir: &Path, total_frames: F) -> FormProgress
where
    F: FnOnce() -> Option<usize>,
{
    let frames_done = count_frames_done(frames_dir);
    if frames_done == 0 {
        return FormProgress {
            form_id,
            frames_done,
            total_frames: None,
            summary: "Queued".to_string(),
        };
    }
    let total = total_frames();
    let summary = match total {
        Some(total) => format!("Running {} / {} frames", frames_done, total),
        None => format!("Running {} frames", frames_done),
    };
    FormProgress {
        form_id,
        frames_done,
        total_frames: total,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_missing_folder_is_zero_progress() {
        let dir = tempfile::tempdir().unwrap();
        let progress = running_form_progress(1, &dir.path().join("frames/1"), || {
            panic!("frame count must not be read without progress")
        });
        assert_eq!(progress.frames_done, 0);
        assert_eq!(progress.summary, "Queued");
    }

    #[rstest]
    fn test_running_progress() {
        let dir = tempfile::tempdir().unwrap();
        for n in 0..3 {
            fs::write(dir.path().join(format!("frame_{}.json", n)), "{}").unwrap();
        }
        let progress = running_form_progress(2, dir.path(), || Some(10));
        assert_eq!(progress.frames_done, 3);
        assert_eq!(progress.summary, "Running 3 / 10 frames");

        let unknown_total = running_form_progress(2, dir.path(), || None);
        assert_eq!(unknown_total.summary, "Running 3 frames");
    }
}
