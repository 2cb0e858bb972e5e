use std::sync::atomic::{AtomicBool, Ordering};

use ndarray::Array2;
use rayon::prelude::*;

use crate::attribution::{analytic_attributions, finite_difference_attributions};
use crate::config::{AttributionMode, ScanConfig, ScanWindow};
use crate::constants::SCAN_CHUNK_SIZE;
use crate::dataset::Dataset;
use crate::dispatch::{BatchDispatcher, ScoringItem};
use crate::maps::{AttributionAccumulator, AttributionMap, split_prediction_maps};
use crate::model::{EvaluableModel, Model, StaticWeightModel};
use crate::scan::{WindowPlan, slice_windows};
use crate::sequence::decode;
use crate::types::ScanError;

/// Whole-sequence predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectPrediction {
    /// `(sequences, 1)` scores; NaN for static-weight models
    pub predictions: Array2<f32>,
    pub attributions: Option<Vec<AttributionMap>>,
}

/// Scan-mode predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct ScanPrediction {
    /// One prediction map per sequence
    pub maps: Vec<Vec<f32>>,
    pub attributions: Option<Vec<AttributionMap>>,
}

/// Scores datasets against a single loaded model.
///
/// A scanner is cheap to build and borrows the worker's configuration and
/// cancellation flag. Everything it computes for one call is sequential in
/// input order; rayon is only used inside a step where order is restored
/// (per-record static-weight scoring, per-row model evaluation).
///
/// # Examples
///
/// ```rust
/// use bindscan_core::config::{ScanConfig, ScanWindow};
/// use bindscan_core::dataset::Dataset;
/// use bindscan_core::engine::Scanner;
/// use bindscan_core::model::{Model, StaticWeightModel};
///
/// let pfm = StaticWeightModel::from_rows(&[[0.0, 0.0, 1.0, 0.0]])?;
/// let data = Dataset::from_pairs(&[("s1", "AGGA")])?;
///
/// let config = ScanConfig::default();
/// let scanner = Scanner::new(&config);
/// let scan = scanner.predict_maps(&Model::Static(pfm), &data, ScanWindow::default(), None)?;
/// assert_eq!(scan.maps, vec![vec![0.0, 1.0, 1.0, 0.0]]);
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
pub struct Scanner<'a> {
    config: &'a ScanConfig,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> Scanner<'a> {
    pub fn new(config: &'a ScanConfig) -> Self {
        Self {
            config,
            cancel: None,
        }
    }

    /// Aborts long-running calls with [`ScanError::Cancelled`] once `flag`
    /// is raised
    pub fn with_cancellation(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn dispatcher<'m>(&self, model: &'m dyn EvaluableModel) -> BatchDispatcher<'m>
    where
        'a: 'm,
    {
        let dispatcher = BatchDispatcher::new(model, self.config);
        match self.cancel {
            Some(flag) => dispatcher.with_cancellation(flag),
            None => dispatcher,
        }
    }

    fn check_cancelled(&self) -> Result<(), ScanError> {
        match self.cancel {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(ScanError::Cancelled),
            _ => Ok(()),
        }
    }

    /// Scores every row of `data` as a whole.
    ///
    /// Static-weight models have no direct prediction; every row is NaN.
    ///
    /// # Errors
    ///
    /// - [`ScanError::UnsupportedAttribution`] when attribution is requested
    ///   from a static-weight model or on multi-attribute data
    /// - evaluation errors from the model
    pub fn predict_direct(
        &self,
        model: &Model,
        data: &Dataset,
        attribution: Option<AttributionMode>,
    ) -> Result<DirectPrediction, ScanError> {
        let model = match model {
            Model::Static(_) => {
                if attribution.is_some() {
                    return Err(static_attribution_error());
                }
                return Ok(DirectPrediction {
                    predictions: Array2::from_elem((data.len(), 1), f32::NAN),
                    attributions: None,
                });
            }
            Model::Evaluable(model) => model.as_ref(),
        };

        if attribution.is_some() && data.is_multi_attribute() {
            return Err(ScanError::UnsupportedAttribution(
                "attribution maps need single-attribute data".to_string(),
            ));
        }

        let items: Vec<ScoringItem> = (0..data.len())
            .map(|row| {
                ScoringItem::new(
                    data.row(row).iter().map(|s| s.ordinals().to_vec()).collect(),
                    data.row_features(row).to_vec(),
                )
            })
            .collect();

        let (scores, attributions) = self.score_items(model, &items, attribution)?;
        let predictions = Array2::from_shape_vec((items.len(), 1), scores)
            .map_err(|e| ScanError::Model(e.to_string()))?;

        let attributions: Option<Vec<AttributionMap>> = attributions.map(|arrays| {
            data.sequences()
                .iter()
                .zip(arrays)
                .map(|(sequence, values)| AttributionMap::new(sequence.to_sequence_string(), values))
                .collect()
        });

        Ok(DirectPrediction {
            predictions,
            attributions,
        })
    }

    /// Slides `window` along every sequence and returns one prediction map
    /// per sequence, plus overlap-averaged attribution maps on request.
    ///
    /// Records are sliced [`SCAN_CHUNK_SIZE`] at a time so memory stays
    /// bounded by the chunk, not the dataset.
    ///
    /// # Errors
    ///
    /// - [`ScanError::ScanNotSupported`] on multi-attribute data
    /// - [`ScanError::UnsupportedAttribution`] when attribution is requested
    ///   from a static-weight model
    /// - [`ScanError::Configuration`] for an invalid window
    pub fn predict_maps(
        &self,
        model: &Model,
        data: &Dataset,
        window: ScanWindow,
        attribution: Option<AttributionMode>,
    ) -> Result<ScanPrediction, ScanError> {
        if data.is_multi_attribute() {
            return Err(ScanError::ScanNotSupported(
                "cannot scan multi-sequence data".to_string(),
            ));
        }

        let model = match model {
            Model::Static(pfm) => {
                if attribution.is_some() {
                    return Err(static_attribution_error());
                }
                return Ok(ScanPrediction {
                    maps: self.pfm_prediction_maps(pfm, data)?,
                    attributions: None,
                });
            }
            Model::Evaluable(model) => model.as_ref(),
        };
        window.validate()?;

        let mut maps = Vec::with_capacity(data.len());
        let mut attribution_maps = attribution.map(|_| Vec::with_capacity(data.len()));

        for chunk_start in (0..data.len()).step_by(SCAN_CHUNK_SIZE) {
            let chunk = data.slice(chunk_start..chunk_start + SCAN_CHUNK_SIZE);
            let sequences = chunk.sequences();

            let mut items = Vec::new();
            for (record, sequence) in sequences.iter().enumerate() {
                let features = chunk.row_features(record);
                items.extend(
                    slice_windows(record, sequence.ordinals(), window)
                        .into_iter()
                        .map(|w| ScoringItem::new(vec![w.ordinals], features.to_vec())),
                );
            }
            let plan = WindowPlan::for_lengths(sequences.iter().map(|s| s.len()), window);
            log::debug!(
                "Scanning records {}..{} as {} windows",
                chunk_start,
                chunk_start + sequences.len(),
                plan.total()
            );

            let (scores, window_attributions) = self.score_items(model, &items, attribution)?;
            maps.extend(split_prediction_maps(&scores, &plan)?);

            if let (Some(all), Some(arrays)) = (attribution_maps.as_mut(), window_attributions) {
                for (record, sequence) in sequences.iter().enumerate() {
                    let mut accumulator = AttributionAccumulator::new(sequence.len(), window);
                    for (j, index) in plan.range(record).enumerate() {
                        accumulator.add(j, arrays[index].view())?;
                    }
                    all.push(AttributionMap::new(
                        decode(sequence.ordinals()),
                        accumulator.finish(),
                    ));
                }
            }
        }

        Ok(ScanPrediction {
            maps,
            attributions: attribution_maps,
        })
    }

    /// Prediction maps of a static-weight model.
    ///
    /// Every sequence is padded with `width - 1` unknown symbols per side
    /// and scored at each offset; see [`StaticWeightModel::prediction_map`].
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ScanNotSupported`] on multi-attribute data.
    pub fn pfm_prediction_maps(
        &self,
        pfm: &StaticWeightModel,
        data: &Dataset,
    ) -> Result<Vec<Vec<f32>>, ScanError> {
        if data.is_multi_attribute() {
            return Err(ScanError::ScanNotSupported(
                "cannot apply static-weight models to multi-sequence data".to_string(),
            ));
        }
        self.check_cancelled()?;

        let strand_mode = self.config.strand_mode;
        Ok(data
            .sequences()
            .par_iter()
            .map(|sequence| pfm.prediction_map(sequence.ordinals(), strand_mode))
            .collect())
    }

    /// Dispatches `items` and computes their attributions on request.
    fn score_items(
        &self,
        model: &dyn EvaluableModel,
        items: &[ScoringItem],
        attribution: Option<AttributionMode>,
    ) -> Result<(Vec<f32>, Option<Vec<Array2<f32>>>), ScanError> {
        let dispatcher = self.dispatcher(model);
        match attribution {
            None => Ok((dispatcher.dispatch(items, false)?.scores, None)),
            Some(AttributionMode::Analytic) => {
                let output = dispatcher.dispatch(items, true)?;
                let arrays = analytic_attributions(
                    items,
                    &output,
                    dispatcher.requirements().padding,
                    model.output_kind(),
                )?;
                Ok((output.scores, Some(arrays)))
            }
            Some(AttributionMode::FiniteDifference) => {
                let scores = dispatcher.dispatch(items, false)?.scores;
                let arrays = finite_difference_attributions(&dispatcher, items, &scores)?;
                Ok((scores, Some(arrays)))
            }
        }
    }
}

fn static_attribution_error() -> ScanError {
    ScanError::UnsupportedAttribution(
        "static-weight models do not provide attribution maps".to_string(),
    )
}
