//! Fixed size pool of worker threads fed through a channel.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};
use log::{debug, error};

use crate::errors::{PipelineError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let workers = (0..size.max(1))
            .map(|n| {
                let receiver = receiver.clone();
                thread::Builder::new()
                    .name(format!("dynacon-worker-{}", n))
                    .spawn(move || {
                        for job in receiver.iter() {
                            // a panicking job must not take the worker down with it
                            if catch_unwind(AssertUnwindSafe(job)).is_err() {
                                error!("Job panicked on worker {}", n);
                            }
                        }
                        debug!("Worker {} stopped", n);
                    })
            })
            .filter_map(|spawned| match spawned {
                Ok(handle) => Some(handle),
                Err(e) => {
                    error!("Failed to spawn worker thread: {}", e);
                    None
                }
            })
            .collect();

        WorkerPool {
            sender: Some(sender),
            workers,
        }
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Queue a job; returns immediately.
    pub fn execute<F>(&self, job: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        match &self.sender {
            Some(sender) => sender.send(Box::new(job)).map_err(|_| PipelineError::PoolClosed),
            None => Err(PipelineError::PoolClosed),
        }
    }
}

impl Drop for WorkerPool {
    // queued jobs still run before the workers exit
    fn drop(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[rstest]
    fn test_jobs_run_and_pool_drains_on_drop() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(3);
            assert_eq!(pool.size(), 3);
            for _ in 0..10 {
                let done = Arc::clone(&done);
                pool.execute(move || {
                    done.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
            }
        }
        assert_eq!(done.load(Ordering::SeqCst), 10);
    }

    #[rstest]
    fn test_worker_survives_panic() {
        let done = Arc::new(AtomicUsize::new(0));
        {
            let pool = WorkerPool::new(1);
            pool.execute(|| panic!("boom")).unwrap();
            let done = Arc::clone(&done);
            pool.execute(move || {
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
