use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::constants::ALPHABET_SIZE;
use crate::model::{Batch, BatchRow, DataRequirements, EvaluableModel, Evaluation, OutputKind};
use crate::types::{LossKind, Ordinal, ScanError};

/// A single convolutional motif detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifFilter {
    /// Per-position `A C G T` weights
    pub weights: Vec<[f32; ALPHABET_SIZE]>,
    #[serde(default)]
    pub bias: f32,
}

impl MotifFilter {
    fn width(&self) -> usize {
        self.weights.len()
    }

    fn weight(&self, position: usize, symbol: Ordinal) -> f32 {
        let row = &self.weights[position];
        match row.get(symbol as usize) {
            Some(&w) => w,
            // Unknown symbols score as the mean of the row
            None => row.iter().sum::<f32>() / ALPHABET_SIZE as f32,
        }
    }

    /// Highest pre-activation over all placements, with its offset
    fn best_placement(&self, sequence: &[Ordinal]) -> Option<(usize, f32)> {
        if sequence.len() < self.width() {
            return None;
        }
        (0..=sequence.len() - self.width())
            .map(|offset| {
                let activation = self.bias
                    + (0..self.width())
                        .map(|t| self.weight(t, sequence[offset + t]))
                        .sum::<f32>();
                (offset, activation)
            })
            .fold(None, |best: Option<(usize, f32)>, candidate| match best {
                Some(b) if b.1 >= candidate.1 => Some(b),
                _ => Some(candidate),
            })
    }
}

/// Single-layer convolutional binding model.
///
/// Each filter slides over the padded input, its best placement goes through
/// a ReLU, and the pooled activations are combined linearly with optional
/// per-row feature weights. [`OutputKind::Softmax`] models pass the result
/// through a logistic function.
///
/// Stored as `model.json` inside a model directory:
///
/// ```json
/// {
///   "filters": [{ "weights": [[1, 0, 0, 0], [0, 0, 0, 1]], "bias": -1.0 }],
///   "readout": [2.0],
///   "bias": 0.0,
///   "output": "regression",
///   "padding": 1
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvMotifModel {
    pub filters: Vec<MotifFilter>,

    /// One weight per filter
    pub readout: Vec<f32>,

    #[serde(default)]
    pub bias: f32,

    #[serde(default)]
    pub output: OutputKind,

    /// Weights applied to each row's feature vector; empty ignores features
    #[serde(default)]
    pub feature_weights: Vec<f32>,

    #[serde(default)]
    pub dinucleotide_features: bool,

    #[serde(default)]
    pub padding: usize,
}

/// Forward pass of one row, kept for the backward pass.
struct RowActivation {
    score: f32,
    /// Per filter: best offset when the filter fired
    fired: Vec<Option<usize>>,
}

impl ConvMotifModel {
    /// Checks the filter and readout shapes.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] describing the first mismatch.
    pub fn validate(&self) -> Result<(), ScanError> {
        if self.filters.is_empty() {
            return Err(ScanError::Configuration("model has no filters".to_string()));
        }
        if self.readout.len() != self.filters.len() {
            return Err(ScanError::Configuration(format!(
                "{} readout weights for {} filters",
                self.readout.len(),
                self.filters.len()
            )));
        }
        if self.filters.iter().any(|f| f.weights.is_empty()) {
            return Err(ScanError::Configuration(
                "filters must have at least one position".to_string(),
            ));
        }
        Ok(())
    }

    /// Loads and validates a `model.json` file.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ModelLoad`] naming the file on any failure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| ScanError::model_load(path, e))?;
        let model: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|e| ScanError::model_load(path, e))?;
        model.validate().map_err(|e| ScanError::model_load(path, e))?;
        Ok(model)
    }

    fn forward(&self, row: &BatchRow) -> Result<RowActivation, ScanError> {
        if row.sequences.is_empty() {
            return Err(ScanError::Model("batch row has no sequence input".to_string()));
        }
        if !self.feature_weights.is_empty() && row.features.len() != self.feature_weights.len() {
            return Err(ScanError::Model(format!(
                "expected {} features per row, got {}",
                self.feature_weights.len(),
                row.features.len()
            )));
        }

        let mut fired = Vec::with_capacity(self.filters.len());
        let mut z = self.bias;
        for (filter, &readout) in self.filters.iter().zip(&self.readout) {
            // Pool over every sequence input; only the first is differentiated
            let mut best: Option<(usize, usize, f32)> = None;
            for (input, sequence) in row.sequences.iter().enumerate() {
                if let Some((offset, activation)) = filter.best_placement(sequence) {
                    if best.is_none_or(|b| activation > b.2) {
                        best = Some((input, offset, activation));
                    }
                }
            }
            match best {
                Some((input, offset, activation)) if activation > 0.0 => {
                    z += readout * activation;
                    fired.push((input == 0).then_some(offset));
                }
                _ => fired.push(None),
            }
        }
        z += self
            .feature_weights
            .iter()
            .zip(&row.features)
            .map(|(w, x)| w * x)
            .sum::<f32>();

        let score = match self.output {
            OutputKind::Softmax => 1.0 / (1.0 + (-z).exp()),
            OutputKind::Regression => z,
        };
        Ok(RowActivation { score, fired })
    }

    /// Gradient of the loss-shaped output with respect to the one-hot input
    fn backward(&self, row: &BatchRow, activation: &RowActivation, loss: LossKind) -> Array2<f32> {
        let length = row.sequences[0].len();
        let mut gradient = Array2::zeros((length, ALPHABET_SIZE));

        let p = activation.score;
        let dz = match (self.output, loss) {
            (OutputKind::Softmax, LossKind::NegLogLikelihood) => 1.0 - p,
            (OutputKind::Softmax, LossKind::SquaredError) => p * (1.0 - p),
            (OutputKind::Regression, _) => 1.0,
        };

        for ((filter, &readout), fired) in self.filters.iter().zip(&self.readout).zip(&activation.fired) {
            if let Some(offset) = *fired {
                for (t, weights) in filter.weights.iter().enumerate() {
                    for (symbol, &w) in weights.iter().enumerate() {
                        gradient[[offset + t, symbol]] += dz * readout * w;
                    }
                }
            }
        }
        gradient
    }
}

impl EvaluableModel for ConvMotifModel {
    fn evaluate(
        &self,
        batch: &Batch,
        want_input_gradients: bool,
        loss: LossKind,
    ) -> Result<Evaluation, ScanError> {
        let results: Vec<(f32, Option<Array2<f32>>)> = batch
            .rows()
            .par_iter()
            .map(|row| -> Result<(f32, Option<Array2<f32>>), ScanError> {
                let activation = self.forward(row)?;
                let gradient = want_input_gradients.then(|| self.backward(row, &activation, loss));
                Ok((activation.score, gradient))
            })
            .collect::<Result<_, _>>()?;

        let (scores, gradients): (Vec<f32>, Vec<Option<Array2<f32>>>) = results.into_iter().unzip();
        let input_gradients = if want_input_gradients {
            Some(gradients.into_iter().flatten().collect())
        } else {
            None
        };
        Ok(Evaluation {
            scores,
            input_gradients,
        })
    }

    fn data_requirements(&self) -> DataRequirements {
        DataRequirements {
            padding: self.padding,
            dinucleotide_features: self.dinucleotide_features,
        }
    }

    fn output_kind(&self) -> OutputKind {
        self.output
    }

    fn provides_input_gradients(&self) -> bool {
        true
    }
}
