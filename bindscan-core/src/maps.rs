//! Reassembly of per-window outputs into per-sequence maps.
//!
//! Scan mode flattens the windows of many sequences into one stream of model
//! inputs. This module turns the resulting flat outputs back into:
//!
//! - a [prediction map](split_prediction_maps) per sequence, one score per
//!   window, and
//! - an [`AttributionMap`] per sequence, one row per original position,
//!   averaged over every window that covered the position.

use ndarray::{Array1, Array2, ArrayView2, s};

use crate::config::ScanWindow;
use crate::constants::ALPHABET_SIZE;
use crate::scan::WindowPlan;
use crate::types::ScanError;

/// Per-position attribution for one sequence, paired with the sequence it
/// explains.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributionMap {
    /// Decoded sequence the rows refer to
    pub sequence: String,
    /// `(length, 4)` attribution values, one column per symbol
    pub values: Array2<f32>,
}

impl AttributionMap {
    pub fn new(sequence: String, values: Array2<f32>) -> Self {
        Self { sequence, values }
    }

    pub fn len(&self) -> usize {
        self.values.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.values.nrows() == 0
    }
}

/// Splits a flat score array into one prediction map per record.
///
/// # Errors
///
/// Returns [`ScanError::Model`] when the number of scores does not match
/// the plan.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::maps::split_prediction_maps;
/// use bindscan_core::scan::WindowPlan;
///
/// let plan = WindowPlan::from_counts(vec![3, 1]);
/// let maps = split_prediction_maps(&[0.1, 0.2, 0.3, 0.9], &plan)?;
/// assert_eq!(maps, vec![vec![0.1, 0.2, 0.3], vec![0.9]]);
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
pub fn split_prediction_maps(scores: &[f32], plan: &WindowPlan) -> Result<Vec<Vec<f32>>, ScanError> {
    if scores.len() != plan.total() {
        return Err(ScanError::Model(format!(
            "expected {} window scores, got {}",
            plan.total(),
            scores.len()
        )));
    }
    Ok((0..plan.len())
        .map(|record| scores[plan.range(record)].to_vec())
        .collect())
}

/// Max, mean and sum of a prediction map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSummary {
    pub max: f32,
    pub mean: f32,
    pub sum: f32,
}

impl MapSummary {
    /// Summary of `map`; every field is NaN for an empty map
    pub fn of(map: &[f32]) -> Self {
        if map.is_empty() {
            return Self {
                max: f32::NAN,
                mean: f32::NAN,
                sum: f32::NAN,
            };
        }
        let sum: f32 = map.iter().sum();
        let max = map.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        Self {
            max,
            mean: sum / map.len() as f32,
            sum,
        }
    }
}

/// Overlap-averaging accumulator for one sequence's attribution map.
///
/// Rows are indexed in padded coordinates: window `j` lands at row
/// `j * stride`. The accumulator spans `length + size - 1` rows, which covers
/// the left padding and every real position.
#[derive(Debug, Clone)]
pub struct AttributionAccumulator {
    /// Summed contributions: (length + size - 1, 4)
    sum: Array2<f32>,

    /// Number of contributions per row
    count: Array1<u32>,

    window: ScanWindow,

    sequence_length: usize,
}

impl AttributionAccumulator {
    pub fn new(sequence_length: usize, window: ScanWindow) -> Self {
        let rows = sequence_length + window.size.max(1) - 1;
        Self {
            sum: Array2::zeros((rows, ALPHABET_SIZE)),
            count: Array1::zeros(rows),
            window,
            sequence_length,
        }
    }

    /// Folds in the contribution of window `index`.
    ///
    /// Only the first `min(size, rows - index * stride)` rows of
    /// `contribution` are used, so windows never overrun the accumulator.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Model`] if `contribution` does not have one
    /// column per alphabet symbol.
    pub fn add(&mut self, index: usize, contribution: ArrayView2<'_, f32>) -> Result<(), ScanError> {
        if contribution.ncols() != ALPHABET_SIZE {
            return Err(ScanError::Model(format!(
                "attribution rows must have {} columns, got {}",
                ALPHABET_SIZE,
                contribution.ncols()
            )));
        }

        let rows = self.sum.nrows();
        let start = index * self.window.stride;
        if start >= rows {
            return Ok(());
        }
        let span = self
            .window
            .size
            .min(rows - start)
            .min(contribution.nrows());

        let mut target = self.sum.slice_mut(s![start..start + span, ..]);
        target += &contribution.slice(s![..span, ..]);
        self.count
            .slice_mut(s![start..start + span])
            .mapv_inplace(|c| c + 1);
        Ok(())
    }

    /// Contribution count per accumulator row
    pub fn denominators(&self) -> &Array1<u32> {
        &self.count
    }

    /// Averages every row and returns the padded `(length + size - 1, 4)`
    /// map. Rows no window touched are zero.
    pub fn averaged(&self) -> Array2<f32> {
        let mut averaged = self.sum.clone();
        for (mut row, &count) in averaged.rows_mut().into_iter().zip(self.count.iter()) {
            if count == 0 {
                row.fill(0.0);
            } else {
                row.mapv_inplace(|v| v / count as f32);
            }
        }
        averaged
    }

    /// Averaged map cropped to the unpadded `(length, 4)` positions.
    pub fn finish(self) -> Array2<f32> {
        let offset = self.window.size.max(1) - 1;
        let length = self.sequence_length;
        self.averaged()
            .slice(s![offset..offset + length, ..])
            .to_owned()
    }
}
