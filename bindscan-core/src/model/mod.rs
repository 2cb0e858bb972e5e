//! Scoring models and the evaluation boundary.
//!
//! The engine knows two kinds of model:
//!
//! - [`StaticWeightModel`]: a position-specific probability matrix read from
//!   a `.pfm` file, scored directly by the engine.
//! - [`EvaluableModel`]: anything that can evaluate a [`Batch`] and report its
//!   input requirements. [`ConvMotifModel`] is the implementation shipped
//!   with the crate; other evaluators plug in through the trait and a custom
//!   [`store::ModelLoader`].
//!
//! Models are loaded once per job by the worker that runs it and are never
//! shared between workers.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::types::{LossKind, Ordinal, ScanError};

pub mod conv;
pub mod pfm;
pub mod store;

pub use conv::ConvMotifModel;
pub use pfm::StaticWeightModel;

/// Kind of output node a model ends in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Normalized class probability
    #[default]
    Softmax,
    /// Unbounded continuous value
    Regression,
}

impl OutputKind {
    /// Loss the input gradient is taken of for this output
    #[must_use]
    pub const fn loss_kind(self) -> LossKind {
        match self {
            Self::Softmax => LossKind::NegLogLikelihood,
            Self::Regression => LossKind::SquaredError,
        }
    }
}

/// Input preparation a model expects from the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DataRequirements {
    /// Unknown symbols added on each side of every sequence input
    pub padding: usize,
    /// Append the dinucleotide frequency vector of the first sequence input
    /// to each row's features
    pub dinucleotide_features: bool,
}

/// One model input: a padded sequence per attribute plus a feature vector.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchRow {
    pub sequences: Vec<Vec<Ordinal>>,
    pub features: Vec<f32>,
}

/// Ordered model inputs evaluated in one call.
#[derive(Debug, Clone, Default)]
pub struct Batch {
    rows: Vec<BatchRow>,
}

impl Batch {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, row: BatchRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[BatchRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl FromIterator<BatchRow> for Batch {
    fn from_iter<I: IntoIterator<Item = BatchRow>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

/// Output of one evaluation call.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Evaluation {
    /// One score per batch row
    pub scores: Vec<f32>,
    /// Per row, the gradient with respect to its first sequence input,
    /// shaped `(padded_length, 4)`
    pub input_gradients: Option<Vec<Array2<f32>>>,
}

/// A model the engine can run on batches of sequences.
///
/// Implementations must be `Send` so a worker thread can own them.
pub trait EvaluableModel: Send {
    /// Scores every row of `batch`.
    ///
    /// When `want_input_gradients` is set, the evaluation also returns the
    /// gradient of `loss` with respect to each row's first sequence input.
    fn evaluate(
        &self,
        batch: &Batch,
        want_input_gradients: bool,
        loss: LossKind,
    ) -> Result<Evaluation, ScanError>;

    fn data_requirements(&self) -> DataRequirements;

    fn output_kind(&self) -> OutputKind;

    /// Whether [`EvaluableModel::evaluate`] can return input gradients
    fn provides_input_gradients(&self) -> bool;
}

/// A loaded model of either kind.
pub enum Model {
    Static(StaticWeightModel),
    Evaluable(Box<dyn EvaluableModel>),
}

impl Model {
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(pfm) => f.debug_tuple("Static").field(pfm).finish(),
            Self::Evaluable(model) => f
                .debug_struct("Evaluable")
                .field("output_kind", &model.output_kind())
                .field("requirements", &model.data_requirements())
                .finish(),
        }
    }
}
