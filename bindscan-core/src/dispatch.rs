//! Bounded-size batching of model inputs.
//!
//! The dispatcher turns logical scoring items (a whole sequence in direct
//! mode, one window in scan mode) into model inputs, evaluates them in
//! batches no larger than the configured batch size and concatenates the
//! results back in submission order.
//!
//! In double-stranded modes each item produces two consecutive inputs, its
//! forward form and its reverse complement, and a batch always holds whole
//! pairs so strands can be resolved batch by batch.

use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::Array2;

use crate::config::ScanConfig;
use crate::model::{Batch, BatchRow, DataRequirements, EvaluableModel};
use crate::sequence::features::dinucleotide_frequencies;
use crate::sequence::{pad_ordinals, reverse_complement_ordinals};
use crate::strand::resolve;
use crate::types::{Ordinal, ScanError};

/// One logical input: a sequence per attribute plus its static features.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ScoringItem {
    pub sequences: Vec<Vec<Ordinal>>,
    pub features: Vec<f32>,
}

impl ScoringItem {
    pub fn new(sequences: Vec<Vec<Ordinal>>, features: Vec<f32>) -> Self {
        Self { sequences, features }
    }

    /// Length of the first sequence attribute
    pub fn len(&self) -> usize {
        self.sequences.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy with position `position` of the first sequence set to `symbol`.
    ///
    /// Positions past the end leave the copy unchanged.
    #[must_use]
    pub fn with_substitution(&self, position: usize, symbol: Ordinal) -> Self {
        let mut mutated = self.clone();
        if let Some(slot) = mutated
            .sequences
            .first_mut()
            .and_then(|sequence| sequence.get_mut(position))
        {
            *slot = symbol;
        }
        mutated
    }
}

/// Concatenated results of a dispatch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DispatchOutput {
    /// One score per item, after strand resolution
    pub scores: Vec<f32>,
    /// Which model input was kept, two entries per item; `None` when single-stranded
    pub strand_mask: Option<Vec<bool>>,
    /// Per model input, the gradient with respect to its padded first sequence
    pub input_gradients: Option<Vec<Array2<f32>>>,
}

impl DispatchOutput {
    /// Index of the model input selected for item `item`
    pub fn selected_input(&self, item: usize) -> usize {
        match &self.strand_mask {
            Some(mask) if mask.get(2 * item + 1).copied().unwrap_or(false) => 2 * item + 1,
            Some(_) => 2 * item,
            None => item,
        }
    }

    /// Whether item `item` kept its reverse-complement input
    pub fn selected_reverse(&self, item: usize) -> bool {
        self.strand_mask.is_some() && self.selected_input(item) % 2 == 1
    }
}

/// Evaluates scoring items against one model.
pub struct BatchDispatcher<'a> {
    model: &'a dyn EvaluableModel,
    config: &'a ScanConfig,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> BatchDispatcher<'a> {
    pub fn new(model: &'a dyn EvaluableModel, config: &'a ScanConfig) -> Self {
        Self {
            model,
            config,
            cancel: None,
        }
    }

    /// Stops between batches once `flag` is raised
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn model(&self) -> &'a dyn EvaluableModel {
        self.model
    }

    pub fn config(&self) -> &'a ScanConfig {
        self.config
    }

    pub fn requirements(&self) -> DataRequirements {
        self.model.data_requirements()
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ScanError::Cancelled),
            _ => Ok(()),
        }
    }

    fn model_input(&self, sequences: Vec<Vec<Ordinal>>, static_features: &[f32]) -> BatchRow {
        let requirements = self.requirements();
        let mut features = static_features.to_vec();
        if requirements.dinucleotide_features {
            let first = sequences.first().map_or(&[][..], Vec::as_slice);
            features.extend_from_slice(&dinucleotide_frequencies(first));
        }
        BatchRow {
            sequences: sequences
                .iter()
                .map(|sequence| pad_ordinals(sequence, requirements.padding))
                .collect(),
            features,
        }
    }

    /// Model inputs for one item: forward, then reverse complement when
    /// double-stranded.
    pub fn model_inputs(&self, item: &ScoringItem) -> Vec<BatchRow> {
        let mut rows = vec![self.model_input(item.sequences.clone(), &item.features)];
        if self.config.strand_mode.is_double_stranded() {
            let reverse = item
                .sequences
                .iter()
                .map(|sequence| reverse_complement_ordinals(sequence))
                .collect();
            rows.push(self.model_input(reverse, &item.features));
        }
        rows
    }

    /// Evaluates every item in order.
    ///
    /// # Errors
    ///
    /// - [`ScanError::Configuration`] when the batch size cannot hold one
    ///   item on every strand
    /// - [`ScanError::UnsupportedAttribution`] when gradients are requested
    ///   from a model that cannot provide them
    /// - [`ScanError::Model`] when the model returns the wrong number of
    ///   outputs
    /// - [`ScanError::Cancelled`] when the cancellation flag is raised
    pub fn dispatch(&self, items: &[ScoringItem], want_input_gradients: bool) -> Result<DispatchOutput, ScanError> {
        self.config.validate()?;
        if want_input_gradients && !self.model.provides_input_gradients() {
            return Err(ScanError::UnsupportedAttribution(
                "model does not provide input gradients; use finite-difference attribution".to_string(),
            ));
        }

        let loss = self.model.output_kind().loss_kind();
        let double_stranded = self.config.strand_mode.is_double_stranded();
        let mut output = DispatchOutput {
            scores: Vec::with_capacity(items.len()),
            strand_mask: double_stranded.then(|| Vec::with_capacity(items.len() * 2)),
            input_gradients: want_input_gradients.then(Vec::new),
        };

        for (index, chunk) in items.chunks(self.config.items_per_batch()).enumerate() {
            self.check_cancelled()?;

            let batch: Batch = chunk.iter().flat_map(|item| self.model_inputs(item)).collect();
            log::trace!("Evaluating batch {} with {} inputs ({})", index, batch.len(), loss);
            let evaluation = self.model.evaluate(&batch, want_input_gradients, loss)?;

            if evaluation.scores.len() != batch.len() {
                return Err(ScanError::Model(format!(
                    "model returned {} scores for {} inputs",
                    evaluation.scores.len(),
                    batch.len()
                )));
            }

            let resolved = resolve(&evaluation.scores, self.config.strand_mode)?;
            output.scores.extend(resolved.scores);
            if let (Some(all), Some(mask)) = (output.strand_mask.as_mut(), resolved.mask) {
                all.extend(mask);
            }

            if let Some(all) = output.input_gradients.as_mut() {
                let gradients = evaluation.input_gradients.ok_or_else(|| {
                    ScanError::Model("model returned no input gradients".to_string())
                })?;
                if gradients.len() != batch.len() {
                    return Err(ScanError::Model(format!(
                        "model returned {} gradients for {} inputs",
                        gradients.len(),
                        batch.len()
                    )));
                }
                all.extend(gradients);
            }
        }

        Ok(output)
    }
}
