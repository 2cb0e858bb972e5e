//! Fixed-size pool of [`PredictWorker`]s fed by a job queue.
//!
//! One thread per device pulls [`WorkerJob`]s from a shared
//! `crossbeam-channel` queue and sends a [`JobOutcome`] back for each. Jobs
//! complete in no particular order.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::{Device, JobOutcome, PredictWorker, WorkerJob};
use crate::config::ScanConfig;
use crate::model::store::ModelLoader;
use crate::types::ScanError;

/// Worker threads plus the queues connecting them to the orchestrator.
///
/// - [`close`](Self::close) waits for queued and in-flight jobs.
/// - [`terminate`](Self::terminate) raises the cancellation flag so running
///   jobs stop at their next batch and queued jobs are skipped.
///
/// Dropping a pool terminates it.
pub struct WorkerPool {
    jobs: Option<Sender<WorkerJob>>,
    outcomes: Receiver<JobOutcome>,
    handles: Vec<JoinHandle<()>>,
    cancel: Arc<AtomicBool>,
    pending: usize,
}

impl WorkerPool {
    /// Starts one worker per device.
    ///
    /// Each worker gets its explicit index, its device and a handle to the
    /// shared configuration.
    ///
    /// # Errors
    ///
    /// - [`ScanError::Configuration`] when `devices` is empty or a device's
    ///   thread pool cannot be built
    /// - [`ScanError::Io`] when a worker thread cannot be spawned
    pub fn new(
        devices: &[Device],
        config: Arc<ScanConfig>,
        loader: Arc<dyn ModelLoader>,
    ) -> Result<Self, ScanError> {
        if devices.is_empty() {
            return Err(ScanError::Configuration(
                "worker pool needs at least one device".to_string(),
            ));
        }

        let (job_sender, job_receiver) = unbounded::<WorkerJob>();
        let (outcome_sender, outcomes) = unbounded::<JobOutcome>();
        let cancel = Arc::new(AtomicBool::new(false));

        let mut pool = Self {
            jobs: Some(job_sender),
            outcomes,
            handles: Vec::with_capacity(devices.len()),
            cancel: Arc::clone(&cancel),
            pending: 0,
        };

        for (index, device) in devices.iter().enumerate() {
            let worker = PredictWorker::new(
                index,
                *device,
                Arc::clone(&config),
                Arc::clone(&loader),
                Arc::clone(&cancel),
            )?;
            let jobs = job_receiver.clone();
            let outcomes = outcome_sender.clone();
            let handle = thread::Builder::new()
                .name(format!("bindscan-worker-{}", index))
                .spawn(move || worker_loop(worker, jobs, outcomes))?;
            pool.handles.push(handle);
        }
        log::debug!("Started worker pool with {} workers", pool.handles.len());
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Jobs submitted whose outcome has not been received yet
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Queues a job for the next free worker.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] once the queue is closed.
    pub fn submit(&mut self, job: WorkerJob) -> Result<(), ScanError> {
        let sender = self.jobs.as_ref().ok_or_else(|| {
            ScanError::Configuration("cannot submit to a closed worker pool".to_string())
        })?;
        sender.send(job).map_err(|e| {
            ScanError::Configuration(format!(
                "no worker left to run model {}",
                e.into_inner().model_id
            ))
        })?;
        self.pending += 1;
        Ok(())
    }

    /// Blocks for the next finished job.
    ///
    /// Returns `None` once every submitted job has reported, or if every
    /// worker has exited.
    pub fn recv(&mut self) -> Option<JobOutcome> {
        if self.pending == 0 {
            return None;
        }
        let outcome = self.outcomes.recv().ok()?;
        self.pending -= 1;
        Some(outcome)
    }

    /// Stops accepting jobs, lets queued and running jobs finish, then
    /// joins every worker.
    pub fn close(mut self) {
        self.shutdown(false);
    }

    /// Cancels running jobs, skips queued ones and joins every worker.
    pub fn terminate(mut self) {
        self.shutdown(true);
    }

    fn shutdown(&mut self, cancel: bool) {
        if cancel {
            self.cancel.store(true, Ordering::Relaxed);
        }
        self.jobs = None;
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::warn!("worker thread exited abnormally");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        if !self.handles.is_empty() {
            self.shutdown(true);
        }
    }
}

fn worker_loop(mut worker: PredictWorker, jobs: Receiver<WorkerJob>, outcomes: Sender<JobOutcome>) {
    for job in jobs.iter() {
        if worker.is_cancelled() {
            log::debug!("worker {} skipping {} after cancellation", worker.index(), job.model_id);
            break;
        }
        let outcome = worker.run_isolated(&job);
        if outcomes.send(outcome).is_err() {
            break;
        }
    }
}
