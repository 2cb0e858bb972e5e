use std::fmt;
use std::path::PathBuf;

pub use bio::bio_types::strand::Strand;
use thiserror::Error;

/// Ordinal code of a single sequence symbol (`A`=0, `C`=1, `G`=2, `T`=3, `N`=4).
pub type Ordinal = u8;

/// Loss shape handed to the evaluation collaborator together with a
/// gradient request.
///
/// The loss only influences which quantity the input gradient is taken of;
/// forward scores are identical for both kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossKind {
    /// Log-likelihood of the positive class, for classification outputs
    NegLogLikelihood,
    /// Raw output value, for continuous outputs
    SquaredError,
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NegLogLikelihood => write!(f, "nll"),
            Self::SquaredError => write!(f, "mse"),
        }
    }
}

/// Error types that can occur while loading models or scoring sequences.
///
/// Every fallible operation in the crate returns [`Result<T, ScanError>`].
/// Failures inside pool workers are captured and re-raised by the
/// orchestrator as a single [`ScanError::WorkerFailure`].
#[derive(Error, Debug)]
pub enum ScanError {
    /// Invalid run configuration (no models found, bad include list,
    /// zero-sized windows or batches, inconsistent request flags)
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// Sequence contains a symbol outside the nucleotide alphabet
    #[error("Invalid symbol {symbol:?} at position {position}")]
    Encoding { symbol: char, position: usize },
    /// Scan or static-weight scoring requested for multi-attribute data
    #[error("Scan not supported: {0}")]
    ScanNotSupported(String),
    /// Attribution maps requested from a model that cannot provide them
    #[error("Unsupported attribution: {0}")]
    UnsupportedAttribution(String),
    /// Model artifact is missing or malformed
    #[error("Failed to load model from {}: {reason}", path.display())]
    ModelLoad { path: PathBuf, reason: String },
    /// Evaluation collaborator rejected a batch
    #[error("Model evaluation failed: {0}")]
    Model(String),
    /// A job failed inside a pool worker
    #[error("Worker failed on model {model_id}: {message}\n{trace}")]
    WorkerFailure {
        model_id: String,
        message: String,
        trace: String,
    },
    /// A job stopped because the pool was terminated
    #[error("Job cancelled")]
    Cancelled,
    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Error parsing input data
    #[error("Parse error: {0}")]
    Parse(String),
}

impl ScanError {
    pub(crate) fn model_load(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        Self::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}
