//! Per-model scoring jobs and the workers that run them.
//!
//! A [`WorkerJob`] carries everything one model needs: its locator, scan
//! parameters and data. A [`PredictWorker`] binds one [`device::Device`],
//! loads the model lazily when a job arrives and turns every failure,
//! including panics, into a [`FailureRecord`].
//!
//! Worker lifecycle:
//!
//! ```text
//! Uninitialized -> Ready -> Busy -> Ready -> ... -> Destroyed
//! ```

pub mod device;
pub mod pool;

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::{AttributionMode, ScanConfig, ScanWindow};
use crate::dataset::Dataset;
use crate::engine::Scanner;
use crate::model::Model;
use crate::model::store::{ModelLoader, ModelLocator};
use crate::results::ModelResult;
use crate::types::ScanError;

pub use device::{CpuDevices, Device, DeviceProvider};
pub use pool::WorkerPool;

/// One model's scoring job.
#[derive(Debug, Clone)]
pub struct WorkerJob {
    pub model_id: String,
    pub locator: ModelLocator,
    /// Scan parameters; `None` scores whole sequences
    pub scan: Option<ScanWindow>,
    pub data: Arc<Dataset>,
    /// Created before the job runs when set
    pub outdir: Option<PathBuf>,
    pub verbose: bool,
    pub want_prediction_maps: bool,
    pub attribution: Option<AttributionMode>,
}

/// A failure captured at the worker boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    pub model_id: String,
    pub message: String,
    /// Error chain followed by the captured backtrace
    pub trace: String,
}

impl FailureRecord {
    fn from_error(model_id: &str, error: &ScanError) -> Self {
        let mut trace = String::new();
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push_str(&format!("Caused by: {}\n", cause));
            source = cause.source();
        }
        trace.push_str(&Backtrace::capture().to_string());
        Self {
            model_id: model_id.to_string(),
            message: error.to_string(),
            trace,
        }
    }

    fn from_panic(model_id: &str, payload: Box<dyn Any + Send>) -> Self {
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        Self {
            model_id: model_id.to_string(),
            message: format!("worker panicked: {}", reason),
            trace: Backtrace::capture().to_string(),
        }
    }

    /// The aggregate error the orchestrator raises for this failure
    pub fn into_error(self) -> ScanError {
        ScanError::WorkerFailure {
            model_id: self.model_id,
            message: self.message,
            trace: self.trace,
        }
    }
}

/// What a pool worker returns for each job.
pub type JobOutcome = Result<ModelResult, FailureRecord>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Uninitialized,
    Ready,
    Busy,
    Destroyed,
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Busy => "busy",
            Self::Destroyed => "destroyed",
        };
        write!(f, "{}", name)
    }
}

/// A worker bound to one device.
///
/// The worker owns its device's thread pool and a copy of the shared
/// configuration handed over at construction. Models are loaded per job and
/// dropped when the job ends.
pub struct PredictWorker {
    index: usize,
    device: Device,
    threads: rayon::ThreadPool,
    config: Arc<ScanConfig>,
    loader: Arc<dyn ModelLoader>,
    cancel: Arc<AtomicBool>,
    state: WorkerState,
}

impl PredictWorker {
    /// Binds worker `index` to `device`.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] if the device's thread pool
    /// cannot be built.
    pub fn new(
        index: usize,
        device: Device,
        config: Arc<ScanConfig>,
        loader: Arc<dyn ModelLoader>,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self, ScanError> {
        let mut worker = Self {
            index,
            device,
            threads: device.build_pool()?,
            config,
            loader,
            cancel,
            state: WorkerState::Uninitialized,
        };
        worker.transition(WorkerState::Ready);
        Ok(worker)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn transition(&mut self, next: WorkerState) {
        log::debug!(
            "worker {} (device {}): {} -> {}",
            self.index,
            self.device.index,
            self.state,
            next
        );
        self.state = next;
    }

    /// Runs `job` on this worker's device, propagating failures.
    ///
    /// # Errors
    ///
    /// Any error raised while loading the model or scoring the data.
    pub fn execute(&mut self, job: &WorkerJob) -> Result<ModelResult, ScanError> {
        self.transition(WorkerState::Busy);
        if job.verbose {
            log::info!("{}:{}", self.index, job.model_id);
        }
        let config = self.config.as_ref();
        let loader = self.loader.as_ref();
        let cancel = self.cancel.as_ref();
        let result = self
            .threads
            .install(|| run_job(job, config, loader, Some(cancel)));
        self.transition(WorkerState::Ready);
        result
    }

    /// Runs `job` and captures any error or panic as a [`FailureRecord`].
    pub fn run_isolated(&mut self, job: &WorkerJob) -> JobOutcome {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.execute(job)));
        let record = match outcome {
            Ok(Ok(result)) => return Ok(result),
            Ok(Err(error)) => FailureRecord::from_error(&job.model_id, &error),
            Err(payload) => {
                self.transition(WorkerState::Ready);
                FailureRecord::from_panic(&job.model_id, payload)
            }
        };
        log::warn!(
            "worker {} failed on {}: {}\n{}",
            self.index,
            record.model_id,
            record.message,
            record.trace
        );
        Err(record)
    }
}

impl Drop for PredictWorker {
    fn drop(&mut self) {
        self.transition(WorkerState::Destroyed);
    }
}

/// Loads the job's model and scores its data.
///
/// Evaluable models without scan parameters produce a direct result.
/// Scanning, and every static-weight model, produce a scanned result with
/// per-sequence summaries of the prediction maps; static-weight models
/// always scan at their own width.
///
/// # Errors
///
/// Propagates loader, scanner and I/O errors.
pub fn run_job(
    job: &WorkerJob,
    config: &ScanConfig,
    loader: &dyn ModelLoader,
    cancel: Option<&AtomicBool>,
) -> Result<ModelResult, ScanError> {
    if let Some(outdir) = &job.outdir {
        fs::create_dir_all(outdir)?;
    }
    let model = loader.load(&job.locator)?;
    let scanner = match cancel {
        Some(flag) => Scanner::new(config).with_cancellation(flag),
        None => Scanner::new(config),
    };
    let data = job.data.as_ref();

    let scan = match (&model, job.scan) {
        (Model::Evaluable(_), None) => {
            let direct = scanner.predict_direct(&model, data, job.attribution)?;
            return Ok(ModelResult::direct(
                job.model_id.as_str(),
                direct.predictions,
                direct.attributions,
            ));
        }
        (_, scan) => scan.unwrap_or_default(),
    };

    let direct = scanner.predict_direct(&model, data, None)?;
    let maps = scanner.predict_maps(&model, data, scan, job.attribution)?;
    Ok(ModelResult::scanned(
        job.model_id.as_str(),
        direct.predictions,
        maps.maps,
        job.want_prediction_maps,
        maps.attributions,
    ))
}
