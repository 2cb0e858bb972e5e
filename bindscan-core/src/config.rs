use std::path::PathBuf;

use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_SCAN_WINDOW};
use crate::model::store::IncludeList;
use crate::types::ScanError;

/// How forward and reverse-complement strands are scored.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::config::{ScanConfig, StrandMode};
///
/// let config = ScanConfig {
///     strand_mode: StrandMode::Both,
///     ..Default::default()
/// };
/// assert!(config.strand_mode.is_double_stranded());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrandMode {
    /// Score the forward strand only.
    #[default]
    Single,

    /// Score both strands and keep, per position, whichever scores higher.
    ///
    /// Exact ties keep the forward strand.
    Both,

    /// Score both strands but always keep the reverse strand.
    ///
    /// Diagnostic mode for visualizing reverse-strand binding on the same
    /// scale as forward-strand binding.
    ForceReverse,
}

impl StrandMode {
    /// Whether every input is evaluated as a (forward, reverse) pair
    #[must_use]
    pub const fn is_double_stranded(self) -> bool {
        !matches!(self, Self::Single)
    }

    /// Number of model inputs generated per logical item
    #[must_use]
    pub const fn strands(self) -> usize {
        if self.is_double_stranded() { 2 } else { 1 }
    }
}

/// Engine-wide settings shared read-only by every worker.
///
/// A copy is handed to each worker when the pool is built; workers never
/// observe later changes made by the caller.
///
/// # Examples
///
/// ## Default configuration
///
/// ```rust
/// use bindscan_core::config::ScanConfig;
///
/// let config = ScanConfig::default();
/// assert_eq!(config.batch_size, 2048);
/// assert!(config.isolate_workers);
/// ```
///
/// ## Sequential debugging run
///
/// ```rust
/// use bindscan_core::config::ScanConfig;
///
/// let config = ScanConfig {
///     isolate_workers: false,
///     batch_size: 256,
///     ..Default::default()
/// };
/// config.validate()?;
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Strand handling for every evaluation.
    ///
    /// **Default**: [`StrandMode::Single`]
    pub strand_mode: StrandMode,

    /// Maximum number of model inputs per evaluation call.
    ///
    /// Bounds memory while amortizing evaluation overhead. In double-stranded
    /// mode each logical item occupies two inputs.
    ///
    /// **Default**: 2048
    pub batch_size: usize,

    /// Run jobs on pool workers and capture their failures.
    ///
    /// When `false`, every job runs sequentially on the calling thread and
    /// failures propagate directly, which keeps backtraces intact while
    /// debugging.
    ///
    /// **Default**: `true`
    pub isolate_workers: bool,

    /// Threads in the compute pool each worker binds to its device.
    ///
    /// **Default**: `None` (let the device provider decide)
    pub threads_per_device: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            strand_mode: StrandMode::Single,
            batch_size: DEFAULT_BATCH_SIZE,
            isolate_workers: true,
            threads_per_device: None,
        }
    }
}

impl ScanConfig {
    /// Rejects settings no run could use.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] for a batch size too small to
    /// hold one item on every strand, or a zero thread count.
    pub fn validate(&self) -> Result<(), ScanError> {
        let strands = self.strand_mode.strands();
        if self.batch_size < strands {
            return Err(ScanError::Configuration(format!(
                "batch size must be at least {} in {:?} strand mode",
                strands, self.strand_mode
            )));
        }
        if self.threads_per_device == Some(0) {
            return Err(ScanError::Configuration(
                "threads per device must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of logical items per batch once strands are accounted for
    #[must_use]
    pub fn items_per_batch(&self) -> usize {
        (self.batch_size / self.strand_mode.strands()).max(1)
    }
}

/// Sliding-window parameters for scan mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    /// Width of each window in symbols
    pub size: usize,
    /// Distance between consecutive window starts
    pub stride: usize,
}

impl Default for ScanWindow {
    fn default() -> Self {
        Self {
            size: DEFAULT_SCAN_WINDOW,
            stride: 1,
        }
    }
}

impl ScanWindow {
    pub const fn new(size: usize, stride: usize) -> Self {
        Self { size, stride }
    }

    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] if the size or stride is zero.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.size == 0 {
            return Err(ScanError::Configuration(
                "scan window size must be at least 1".to_string(),
            ));
        }
        if self.stride == 0 {
            return Err(ScanError::Configuration(
                "scan stride must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Output format for prediction results.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::config::OutputFormat;
///
/// assert_eq!(OutputFormat::default(), OutputFormat::Tsv);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One row per sequence, one column per per-sequence scalar key.
    ///
    /// Prediction and attribution maps have no tabular form and are left
    /// out.
    #[default]
    Tsv,

    /// Every result key, including maps, as a single JSON object.
    Json,
}

/// Strategy used to compute attribution maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributionMode {
    /// Use the input gradient returned by the model.
    #[default]
    Analytic,

    /// Substitute every symbol at every position and measure the score change.
    ///
    /// Requires one extra evaluation per (position, symbol) pair.
    FiniteDifference,
}

/// Parameters of a single prediction run.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::config::{AttributionMode, PredictRequest, ScanWindow};
///
/// let request = PredictRequest {
///     scan: Some(ScanWindow::new(24, 1)),
///     want_prediction_maps: true,
///     attribution: Some(AttributionMode::Analytic),
///     ..PredictRequest::new("models/")
/// };
/// assert!(request.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct PredictRequest {
    /// Directory enumerated by the model store
    pub model_dir: PathBuf,

    /// Restricts the enumerated models to these identifiers
    pub include: Option<IncludeList>,

    /// Scan parameters; `None` scores whole sequences directly
    pub scan: Option<ScanWindow>,

    /// Directory where callers write per-run artifacts
    pub outdir: Option<PathBuf>,

    /// Log which worker picks up which model
    pub verbose: bool,

    /// Return the per-sequence prediction maps (scan mode only)
    pub want_prediction_maps: bool,

    /// Return attribution maps computed with this strategy
    pub attribution: Option<AttributionMode>,
}

impl PredictRequest {
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            include: None,
            scan: None,
            outdir: None,
            verbose: false,
            want_prediction_maps: false,
            attribution: None,
        }
    }

    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] for invalid scan parameters.
    pub fn validate(&self) -> Result<(), ScanError> {
        if let Some(window) = &self.scan {
            window.validate()?;
        }
        Ok(())
    }
}
