//! # Bindscan - Sequence Scanning and Attribution Engine
//!
//! Scores DNA sequences against binding models and explains the scores
//! position by position.
//!
//! ## Overview
//!
//! A run scores a set of sequences against every model in a model directory.
//! Models are either static-weight matrices (`.pfm` files) or evaluable
//! models behind the [`model::EvaluableModel`] trait. For each model the
//! engine produces:
//!
//! - **Direct predictions**: one score per sequence
//! - **Prediction maps**: one score per window start when scanning
//! - **Attribution maps**: per-position, per-symbol contributions, averaged
//!   over every window covering a position
//!
//! ## Quick Start
//!
//! ```rust
//! use bindscan_core::config::{ScanConfig, ScanWindow};
//! use bindscan_core::dataset::Dataset;
//! use bindscan_core::engine::Scanner;
//! use bindscan_core::model::{Model, StaticWeightModel};
//!
//! // A one-position matrix that only accepts G
//! let model = Model::Static(StaticWeightModel::from_rows(&[[0.0, 0.0, 1.0, 0.0]])?);
//! let data = Dataset::from_pairs(&[("s1", "AGGA")])?;
//!
//! let config = ScanConfig::default();
//! let scan = Scanner::new(&config).predict_maps(&model, &data, ScanWindow::default(), None)?;
//! assert_eq!(scan.maps[0], vec![0.0, 1.0, 1.0, 0.0]);
//! # Ok::<(), bindscan_core::types::ScanError>(())
//! ```
//!
//! ## Architecture
//!
//! Data flows through the engine in this order:
//!
//! ```text
//! sequences -> encode -> slice windows -> batch dispatch -> model evaluation
//!           -> strand resolution -> map aggregation (+ attribution)
//!           -> per-model result -> merged result set
//! ```
//!
//! Whole runs go through [`predict::Predictor`], which enumerates the model
//! directory, builds one [`worker::WorkerJob`] per model and runs the jobs on
//! a [`worker::WorkerPool`] with one worker per device.
//!
//! ## Module Organization
//!
//! - [`config`]: Run and engine configuration
//! - [`sequence`]: Sequence encoding, reverse complements and FASTA input
//! - [`dataset`]: Rows of sequences handed to a job
//! - [`scan`]: Window slicing and window bookkeeping
//! - [`dispatch`]: Bounded-size batches sent to the model
//! - [`strand`]: Forward / reverse-complement selection
//! - [`maps`]: Prediction and attribution map assembly
//! - [`attribution`]: Analytic and finite-difference attribution
//! - [`model`]: Model variants, the model store and loaders
//! - [`engine`]: Per-model scoring
//! - [`worker`]: Jobs, workers, devices and the worker pool
//! - [`predict`]: Run orchestration
//! - [`results`]: Per-model results and their keyed form
//! - [`output`]: TSV and JSON writers
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, ScanError>`](types::ScanError),
//! covering:
//!
//! - Invalid configuration and missing models
//! - Invalid sequence symbols
//! - Unsupported scan or attribution requests
//! - Model loading and evaluation failures
//! - Failures captured inside pool workers

pub mod attribution;
pub mod config;
pub mod constants;
pub mod dataset;
pub mod dispatch;
pub mod engine;
pub mod maps;
pub mod model;
pub mod output;
pub mod predict;
pub mod results;
pub mod scan;
pub mod sequence;
pub mod strand;
pub mod types;
pub mod worker;

pub use engine::Scanner;
pub use predict::{PredictInput, Predictor};
pub use types::ScanError;
