//! Per-model results and their keyed external form.
//!
//! Inside the crate every job produces a [`ModelResult`] with named optional
//! fields. String keys such as `"CTCF.max"` only appear when a
//! [`ResultSet`] is flattened with [`ResultSet::keyed`] for output.

use std::collections::BTreeMap;

use ndarray::{Array1, Array2};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;

use crate::maps::{AttributionMap, MapSummary};

/// How a job scored its data, which decides the result keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultLayout {
    /// Whole-sequence scoring: the direct prediction is keyed `"<id>"`
    #[default]
    Direct,
    /// Scan or static-weight scoring: every value is keyed `"<id>.<suffix>"`
    Scanned,
}

/// Everything one job computed for one model.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelResult {
    pub model_id: String,
    pub layout: ResultLayout,
    /// `(sequences, 1)` direct predictions
    pub direct: Option<Array2<f32>>,
    /// Per-sequence maximum of the prediction map
    pub max: Option<Array1<f32>>,
    /// Per-sequence mean of the prediction map
    pub avg: Option<Array1<f32>>,
    /// Per-sequence sum of the prediction map
    pub sum: Option<Array1<f32>>,
    pub prediction_maps: Option<Vec<Vec<f32>>>,
    pub attribution_maps: Option<Vec<AttributionMap>>,
}

impl ModelResult {
    /// Direct-mode result
    pub fn direct(
        model_id: impl Into<String>,
        direct: Array2<f32>,
        attribution_maps: Option<Vec<AttributionMap>>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            layout: ResultLayout::Direct,
            direct: Some(direct),
            attribution_maps,
            ..Default::default()
        }
    }

    /// Scan-mode result with summaries computed from `maps`.
    ///
    /// The maps themselves are kept only when `keep_maps` is set.
    pub fn scanned(
        model_id: impl Into<String>,
        direct: Array2<f32>,
        maps: Vec<Vec<f32>>,
        keep_maps: bool,
        attribution_maps: Option<Vec<AttributionMap>>,
    ) -> Self {
        let summaries: Vec<MapSummary> = maps.iter().map(|map| MapSummary::of(map)).collect();
        Self {
            model_id: model_id.into(),
            layout: ResultLayout::Scanned,
            direct: Some(direct),
            max: Some(summaries.iter().map(|s| s.max).collect()),
            avg: Some(summaries.iter().map(|s| s.mean).collect()),
            sum: Some(summaries.iter().map(|s| s.sum).collect()),
            prediction_maps: keep_maps.then_some(maps),
            attribution_maps,
        }
    }

    /// Keyed values of this result, in a stable order.
    pub fn keyed(&self) -> Vec<(String, ResultValue)> {
        let id = &self.model_id;
        let mut entries = Vec::new();
        match self.layout {
            ResultLayout::Direct => {
                if let Some(direct) = &self.direct {
                    entries.push((id.clone(), ResultValue::Matrix(direct.clone())));
                }
            }
            ResultLayout::Scanned => {
                let vectors = [
                    ("direct", self.direct.clone().map(ResultValue::Matrix)),
                    ("max", self.max.clone().map(ResultValue::Vector)),
                    ("avg", self.avg.clone().map(ResultValue::Vector)),
                    ("sum", self.sum.clone().map(ResultValue::Vector)),
                    ("pmaps", self.prediction_maps.clone().map(ResultValue::Maps)),
                ];
                for (suffix, value) in vectors {
                    if let Some(value) = value {
                        entries.push((format!("{}.{}", id, suffix), value));
                    }
                }
            }
        }
        if let Some(maps) = &self.attribution_maps {
            entries.push((format!("{}.gmaps", id), ResultValue::Attributions(maps.clone())));
        }
        entries
    }
}

/// A value at the external result boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    /// Direct predictions, one row per sequence
    Matrix(Array2<f32>),
    /// One scalar per sequence
    Vector(Array1<f32>),
    /// Variable-length prediction maps
    Maps(Vec<Vec<f32>>),
    /// Per-sequence attribution maps with their sequences
    Attributions(Vec<AttributionMap>),
}

impl ResultValue {
    /// Per-sequence scalar at `row`, if this value has one
    pub fn scalar(&self, row: usize) -> Option<f32> {
        match self {
            Self::Matrix(m) if m.ncols() == 1 => m.get([row, 0]).copied(),
            Self::Vector(v) => v.get(row).copied(),
            _ => None,
        }
    }
}

impl Serialize for ResultValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Matrix(m) => serializer.collect_seq(m.rows().into_iter().map(|row| row.to_vec())),
            Self::Vector(v) => serializer.collect_seq(v.iter()),
            Self::Maps(maps) => maps.serialize(serializer),
            Self::Attributions(maps) => serializer.collect_seq(maps.iter().map(AttributionRows)),
        }
    }
}

/// Serializes an attribution map as its sequence plus one `[a, c, g, t]`
/// row per position.
struct AttributionRows<'a>(&'a AttributionMap);

impl Serialize for AttributionRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let rows: Vec<Vec<f32>> = self.0.values.rows().into_iter().map(|r| r.to_vec()).collect();
        let mut state = serializer.serialize_struct("AttributionMap", 2)?;
        state.serialize_field("sequence", &self.0.sequence)?;
        state.serialize_field("values", &rows)?;
        state.end()
    }
}

/// Results of every model in a run, keyed by model identifier.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ResultSet {
    results: BTreeMap<String, ModelResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a model's result, replacing any earlier result for the same id
    pub fn insert(&mut self, result: ModelResult) {
        self.results.insert(result.model_id.clone(), result);
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelResult> {
        self.results.get(model_id)
    }

    pub fn model_ids(&self) -> impl Iterator<Item = &str> {
        self.results.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelResult> {
        self.results.values()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Flattens every result into `"<id>"` / `"<id>.<suffix>"` keys.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bindscan_core::results::{ModelResult, ResultSet};
    /// use ndarray::Array2;
    ///
    /// let mut set = ResultSet::new();
    /// set.insert(ModelResult::direct("M1", Array2::zeros((2, 1)), None));
    /// set.insert(ModelResult::scanned("M2", Array2::zeros((2, 1)), vec![vec![1.0], vec![2.0]], false, None));
    ///
    /// let keys: Vec<String> = set.keyed().into_keys().collect();
    /// assert_eq!(keys, ["M1", "M2.avg", "M2.direct", "M2.max", "M2.sum"]);
    /// ```
    pub fn keyed(&self) -> BTreeMap<String, ResultValue> {
        self.results.values().flat_map(ModelResult::keyed).collect()
    }
}

impl FromIterator<ModelResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = ModelResult>>(iter: I) -> Self {
        let mut set = Self::new();
        for result in iter {
            set.insert(result);
        }
        set
    }
}
