//! Per-position attribution of a model's score.
//!
//! Two strategies produce a `(length, 4)` array per scoring item, aligned to
//! the item's forward-strand, unpadded sequence:
//!
//! - [`analytic_attributions`] reads the input gradient returned by the model.
//! - [`finite_difference_attributions`] substitutes every symbol at every
//!   position, re-evaluates, and records the score change.

use ndarray::{Array2, Axis, s};

use crate::constants::ALPHABET_SIZE;
use crate::dispatch::{BatchDispatcher, DispatchOutput, ScoringItem};
use crate::model::OutputKind;
use crate::types::{Ordinal, ScanError};

/// Extracts attribution arrays from the gradients of a dispatch.
///
/// For every item, the gradient of the strand kept by strand resolution is
/// cropped to the unpadded sequence. A reverse-strand gradient is reoriented
/// to forward coordinates: rows reversed, symbol columns complemented.
///
/// Regression outputs keep the gradient only where the item's score is
/// positive; probability outputs use it unscaled.
///
/// # Errors
///
/// Returns [`ScanError::Model`] when the dispatch carries no gradients or a
/// gradient is too short for its input.
pub fn analytic_attributions(
    items: &[ScoringItem],
    output: &DispatchOutput,
    padding: usize,
    output_kind: OutputKind,
) -> Result<Vec<Array2<f32>>, ScanError> {
    let gradients = output
        .input_gradients
        .as_ref()
        .ok_or_else(|| ScanError::Model("dispatch carried no input gradients".to_string()))?;

    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let input = output.selected_input(index);
            let gradient = gradients.get(input).ok_or_else(|| {
                ScanError::Model(format!("missing gradient for model input {}", input))
            })?;
            let length = item.len();
            if gradient.nrows() < padding + length || gradient.ncols() != ALPHABET_SIZE {
                return Err(ScanError::Model(format!(
                    "gradient of shape {:?} does not cover {} symbols with padding {}",
                    gradient.dim(),
                    length,
                    padding
                )));
            }

            let mut attribution = gradient.slice(s![padding..padding + length, ..]).to_owned();
            if output.selected_reverse(index) {
                attribution = to_forward_orientation(attribution);
            }

            if output_kind == OutputKind::Regression {
                let score = output.scores.get(index).copied().unwrap_or(0.0);
                if score <= 0.0 {
                    attribution.fill(0.0);
                }
            }
            Ok(attribution)
        })
        .collect()
}

/// Reverses rows and complements symbol columns.
fn to_forward_orientation(reverse: Array2<f32>) -> Array2<f32> {
    let mut forward = reverse;
    forward.invert_axis(Axis(0));
    forward.invert_axis(Axis(1));
    forward.as_standard_layout().to_owned()
}

/// Attribution by exhaustive single-symbol substitution.
///
/// `baseline` holds the unmutated score of every item, as returned by a
/// plain dispatch of `items`. Items are processed in batch-sized groups. For
/// each position `i` of the longest item in the group and each symbol `j`,
/// every item of the group is copied with position `i` set to `j`, the
/// copies are scored, and `attribution[i, j]` becomes `mutated - original`,
/// kept only where the larger of the two scores is positive. Substituting
/// the observed symbol yields exactly zero.
///
/// Mutations are applied to fresh copies; the caller's items are never
/// touched. Auxiliary features are recomputed from each copy by the
/// dispatcher.
///
/// # Errors
///
/// - [`ScanError::Model`] when `baseline` and `items` differ in length
/// - evaluation failures and cancellation from the dispatcher
pub fn finite_difference_attributions(
    dispatcher: &BatchDispatcher<'_>,
    items: &[ScoringItem],
    baseline: &[f32],
) -> Result<Vec<Array2<f32>>, ScanError> {
    if baseline.len() != items.len() {
        return Err(ScanError::Model(format!(
            "{} baseline scores for {} items",
            baseline.len(),
            items.len()
        )));
    }
    let mut attributions = Vec::with_capacity(items.len());
    let group_size = dispatcher.config().items_per_batch();

    for (group, original) in items.chunks(group_size).zip(baseline.chunks(group_size)) {
        let mut group_maps: Vec<Array2<f32>> = group
            .iter()
            .map(|item| Array2::zeros((item.len(), ALPHABET_SIZE)))
            .collect();

        let longest = group.iter().map(ScoringItem::len).max().unwrap_or(0);
        for position in 0..longest {
            for symbol in 0..ALPHABET_SIZE as Ordinal {
                let mutated: Vec<ScoringItem> = group
                    .iter()
                    .map(|item| item.with_substitution(position, symbol))
                    .collect();
                let scores = dispatcher.dispatch(&mutated, false)?.scores;

                for (k, map) in group_maps.iter_mut().enumerate() {
                    if position >= map.nrows() {
                        continue;
                    }
                    map[[position, symbol as usize]] = gated_delta(original[k], scores[k]);
                }
            }
        }
        attributions.extend(group_maps);
    }

    Ok(attributions)
}

/// `mutated - original`, zeroed unless `max(original, mutated) > 0`
fn gated_delta(original: f32, mutated: f32) -> f32 {
    if original.max(mutated) > 0.0 {
        mutated - original
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScanConfig, StrandMode};
    use crate::model::{Batch, DataRequirements, EvaluableModel, Evaluation};
    use crate::types::LossKind;
    use ndarray::array;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scores 1 for every `A` in the first input; gradient marks each row's
    /// symbol with its position.
    struct CountA {
        padding: usize,
        output: OutputKind,
        calls: AtomicUsize,
    }

    impl CountA {
        fn new(padding: usize, output: OutputKind) -> Self {
            Self {
                padding,
                output,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl EvaluableModel for CountA {
        fn evaluate(&self, batch: &Batch, want: bool, _loss: LossKind) -> Result<Evaluation, ScanError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let scores = batch
                .rows()
                .iter()
                .map(|row| row.sequences[0].iter().filter(|&&o| o == 0).count() as f32)
                .collect();
            let input_gradients = want.then(|| {
                batch
                    .rows()
                    .iter()
                    .map(|row| {
                        let mut g = Array2::zeros((row.sequences[0].len(), 4));
                        for (i, &o) in row.sequences[0].iter().enumerate() {
                            if (o as usize) < 4 {
                                g[[i, o as usize]] = i as f32 + 1.0;
                            }
                        }
                        g
                    })
                    .collect()
            });
            Ok(Evaluation {
                scores,
                input_gradients,
            })
        }

        fn data_requirements(&self) -> DataRequirements {
            DataRequirements {
                padding: self.padding,
                dinucleotide_features: false,
            }
        }

        fn output_kind(&self) -> OutputKind {
            self.output
        }

        fn provides_input_gradients(&self) -> bool {
            true
        }
    }

    fn item(ordinals: &[Ordinal]) -> ScoringItem {
        ScoringItem::new(vec![ordinals.to_vec()], Vec::new())
    }

    #[test]
    fn test_analytic_crops_padding() {
        let model = CountA::new(2, OutputKind::Softmax);
        let config = ScanConfig::default();
        let dispatcher = BatchDispatcher::new(&model, &config);
        let items = vec![item(&[0, 2])];
        let output = dispatcher.dispatch(&items, true).unwrap();
        let maps = analytic_attributions(&items, &output, 2, OutputKind::Softmax).unwrap();
        assert_eq!(maps[0], array![[3.0f32, 0.0, 0.0, 0.0], [0.0, 0.0, 4.0, 0.0]]);
    }

    #[test]
    fn test_analytic_reverse_strand_reoriented() {
        let model = CountA::new(0, OutputKind::Softmax);
        let config = ScanConfig {
            strand_mode: StrandMode::Both,
            ..Default::default()
        };
        let dispatcher = BatchDispatcher::new(&model, &config);
        // TTC: forward has no A, reverse GAA has two, so reverse wins
        let items = vec![item(&[3, 3, 1])];
        let output = dispatcher.dispatch(&items, true).unwrap();
        assert!(output.selected_reverse(0));

        let maps = analytic_attributions(&items, &output, 0, OutputKind::Softmax).unwrap();
        // Reverse gradient rows: G@1, A@2, A@3. In forward coordinates the
        // rows flip and A becomes T, G becomes C
        assert_eq!(
            maps[0],
            array![[0.0f32, 0.0, 0.0, 3.0], [0.0, 0.0, 0.0, 2.0], [0.0, 1.0, 0.0, 0.0]]
        );
    }

    #[test]
    fn test_analytic_regression_gated_by_score() {
        let model = CountA::new(0, OutputKind::Regression);
        let config = ScanConfig::default();
        let dispatcher = BatchDispatcher::new(&model, &config);
        let items = vec![item(&[0, 1]), item(&[2, 1])];
        let output = dispatcher.dispatch(&items, true).unwrap();
        let maps = analytic_attributions(&items, &output, 0, OutputKind::Regression).unwrap();
        assert_eq!(maps[0][[0, 0]], 1.0);
        // Score 0: everything cleared
        assert!(maps[1].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_analytic_without_gradients_fails() {
        let output = DispatchOutput {
            scores: vec![1.0],
            ..Default::default()
        };
        assert!(analytic_attributions(&[item(&[0])], &output, 0, OutputKind::Softmax).is_err());
    }

    #[test]
    fn test_finite_difference_deltas() {
        let model = CountA::new(0, OutputKind::Regression);
        let config = ScanConfig {
            batch_size: 1,
            ..Default::default()
        };
        let dispatcher = BatchDispatcher::new(&model, &config);
        let items = vec![item(&[0, 2]), item(&[1])];
        let baseline = dispatcher.dispatch(&items, false).unwrap().scores;
        let maps = finite_difference_attributions(&dispatcher, &items, &baseline).unwrap();

        assert_eq!(maps.len(), 2);
        assert_eq!(maps[0].dim(), (2, 4));
        assert_eq!(maps[1].dim(), (1, 4));
        // "AG" scores 1. Replacing A drops to 0, replacing G with A raises to 2
        assert_eq!(maps[0].row(0).to_vec(), vec![0.0, -1.0, -1.0, -1.0]);
        assert_eq!(maps[0].row(1).to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
        // "C" scores 0; only the A substitution has a positive score
        assert_eq!(maps[1].row(0).to_vec(), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_finite_difference_observed_symbol_is_zero() {
        let model = CountA::new(1, OutputKind::Softmax);
        let config = ScanConfig {
            strand_mode: StrandMode::Both,
            ..Default::default()
        };
        let dispatcher = BatchDispatcher::new(&model, &config);
        let sequence = [0u8, 3, 2, 1, 0];
        let items = vec![item(&sequence)];
        let baseline = dispatcher.dispatch(&items, false).unwrap().scores;
        let maps = finite_difference_attributions(&dispatcher, &items, &baseline).unwrap();
        for (position, &observed) in sequence.iter().enumerate() {
            assert_eq!(maps[0][[position, observed as usize]], 0.0);
        }
        // The caller's item is untouched
        assert_eq!(items[0].sequences[0], sequence.to_vec());
    }

    #[test]
    fn test_finite_difference_reuses_baseline() {
        let model = CountA::new(0, OutputKind::Regression);
        let config = ScanConfig {
            batch_size: 1,
            ..Default::default()
        };
        let dispatcher = BatchDispatcher::new(&model, &config);
        let items = vec![item(&[0, 2]), item(&[1])];
        let baseline = dispatcher.dispatch(&items, false).unwrap().scores;
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);

        finite_difference_attributions(&dispatcher, &items, &baseline).unwrap();
        // One evaluation per position and symbol: 2 * 4 for "AG", 1 * 4 for "C"
        assert_eq!(model.calls.load(Ordering::SeqCst), 2 + 12);

        assert!(matches!(
            finite_difference_attributions(&dispatcher, &items, &baseline[..1]),
            Err(ScanError::Model(_))
        ));
    }

    #[test]
    fn test_gated_delta() {
        assert_eq!(gated_delta(1.0, 0.5), -0.5);
        assert_eq!(gated_delta(-1.0, -0.5), 0.0);
        assert_eq!(gated_delta(0.0, 0.0), 0.0);
        assert_eq!(gated_delta(-1.0, 2.0), 3.0);
    }
}
