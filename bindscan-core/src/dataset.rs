//! Row-oriented collections of sequences handed to a scoring job.

use std::ops::Range;

use crate::constants::DEFAULT_SEQUENCE_ATTRIBUTE;
use crate::sequence::EncodedSequence;
use crate::types::ScanError;

/// Sequences to score, one row per record.
///
/// Each row holds one sequence per named attribute (most datasets have a
/// single attribute), an optional static feature vector, and the dataset
/// carries the names of the targets it was prepared for.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::dataset::Dataset;
///
/// let data = Dataset::from_pairs(&[("s1", "ACGTACGT"), ("s2", "GGGCCC")])?;
/// assert_eq!(data.len(), 2);
/// assert_eq!(data.ids(), &["s1".to_string(), "s2".to_string()]);
/// assert!(!data.is_multi_attribute());
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    ids: Vec<String>,
    attributes: Vec<String>,
    columns: Vec<Vec<EncodedSequence>>,
    features: Option<Vec<Vec<f32>>>,
    targets: Vec<String>,
}

impl Dataset {
    /// Single-attribute dataset whose row ids are the sequence names.
    pub fn single(attribute: impl Into<String>, sequences: Vec<EncodedSequence>) -> Self {
        Self {
            ids: sequences.iter().map(|s| s.name().to_string()).collect(),
            attributes: vec![attribute.into()],
            columns: vec![sequences],
            features: None,
            targets: Vec::new(),
        }
    }

    /// Encodes `(id, sequence)` pairs into a single-attribute dataset.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Encoding`] for the first invalid sequence.
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Result<Self, ScanError> {
        let sequences = pairs
            .iter()
            .map(|(id, seq)| EncodedSequence::new(*id, seq))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::single(DEFAULT_SEQUENCE_ATTRIBUTE, sequences))
    }

    /// Adds another sequence attribute.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] when the column length differs
    /// from the number of rows.
    pub fn with_attribute(
        mut self,
        attribute: impl Into<String>,
        sequences: Vec<EncodedSequence>,
    ) -> Result<Self, ScanError> {
        let attribute = attribute.into();
        if sequences.len() != self.len() {
            return Err(ScanError::Configuration(format!(
                "attribute {} has {} rows, dataset has {}",
                attribute,
                sequences.len(),
                self.len()
            )));
        }
        self.attributes.push(attribute);
        self.columns.push(sequences);
        Ok(self)
    }

    /// Attaches one static feature vector per row.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] when the row count differs or the
    /// vectors have unequal lengths.
    pub fn with_features(mut self, features: Vec<Vec<f32>>) -> Result<Self, ScanError> {
        if features.len() != self.len() {
            return Err(ScanError::Configuration(format!(
                "{} feature rows for {} sequences",
                features.len(),
                self.len()
            )));
        }
        let width = features.first().map_or(0, Vec::len);
        if features.iter().any(|f| f.len() != width) {
            return Err(ScanError::Configuration(
                "feature vectors must all have the same length".to_string(),
            ));
        }
        self.features = Some(features);
        Ok(self)
    }

    pub fn with_targets(mut self, targets: Vec<String>) -> Self {
        self.targets = targets;
        self
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    /// More than one sequence attribute per row
    pub fn is_multi_attribute(&self) -> bool {
        self.attributes.len() > 1
    }

    /// Sequences of attribute `index`, one per row
    pub fn column(&self, index: usize) -> &[EncodedSequence] {
        self.columns.get(index).map_or(&[], Vec::as_slice)
    }

    /// Sequences of the first attribute
    pub fn sequences(&self) -> &[EncodedSequence] {
        self.column(0)
    }

    /// Every attribute's sequence for `row`
    pub fn row(&self, row: usize) -> Vec<&EncodedSequence> {
        self.columns.iter().map(|column| &column[row]).collect()
    }

    /// Static features of `row`; empty when the dataset has none
    pub fn row_features(&self, row: usize) -> &[f32] {
        self.features
            .as_ref()
            .and_then(|f| f.get(row))
            .map_or(&[], Vec::as_slice)
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Rows in `range`, keeping attributes and targets
    pub fn slice(&self, range: Range<usize>) -> Self {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        Self {
            ids: self.ids[start..end].to_vec(),
            attributes: self.attributes.clone(),
            columns: self
                .columns
                .iter()
                .map(|column| column[start..end].to_vec())
                .collect(),
            features: self.features.as_ref().map(|f| f[start..end].to_vec()),
            targets: self.targets.clone(),
        }
    }
}
