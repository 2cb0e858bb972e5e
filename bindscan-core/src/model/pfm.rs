use std::fs;
use std::path::Path;

use ndarray::Array2;

use crate::config::{ScanWindow, StrandMode};
use crate::constants::{ALPHABET_SIZE, UNKNOWN_PROBABILITY};
use crate::scan::slice_strand_windows;
use crate::sequence::reverse_complement_ordinals;
use crate::types::{Ordinal, ScanError, Strand};

/// Position-specific probability matrix.
///
/// Stored as `(width, 5)`: one row per motif position, one column per symbol
/// with the unknown symbol appended as a uniform `0.25` column.
///
/// # File format
///
/// The first line is a header and is ignored. Each following line holds one
/// position: a label followed by the four `A C G T` probabilities, separated
/// by tabs.
///
/// ```text
/// ID CTCF
/// 0	0.1	0.2	0.3	0.4
/// 1	0.7	0.1	0.1	0.1
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StaticWeightModel {
    weights: Array2<f64>,
}

impl StaticWeightModel {
    /// Builds a model from per-position `A C G T` probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Configuration`] for an empty matrix.
    pub fn from_rows(rows: &[[f64; ALPHABET_SIZE]]) -> Result<Self, ScanError> {
        if rows.is_empty() {
            return Err(ScanError::Configuration(
                "static-weight model has no positions".to_string(),
            ));
        }
        let mut weights = Array2::from_elem((rows.len(), ALPHABET_SIZE + 1), UNKNOWN_PROBABILITY);
        for (position, row) in rows.iter().enumerate() {
            for (symbol, &p) in row.iter().enumerate() {
                weights[[position, symbol]] = p;
            }
        }
        Ok(Self { weights })
    }

    /// Parses the tab-separated matrix format.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::Parse`] for malformed lines and
    /// [`ScanError::Configuration`] when no position rows follow the header.
    pub fn parse(content: &str) -> Result<Self, ScanError> {
        let mut rows = Vec::new();
        for (index, line) in content.lines().enumerate().skip(1) {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let values = line
                .split('\t')
                .skip(1)
                .map(|field| {
                    field.trim().parse::<f64>().map_err(|e| {
                        ScanError::Parse(format!("line {}: invalid probability {:?}: {}", index + 1, field, e))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let row: [f64; ALPHABET_SIZE] = values.as_slice().try_into().map_err(|_| {
                ScanError::Parse(format!(
                    "line {}: expected {} probabilities, found {}",
                    index + 1,
                    ALPHABET_SIZE,
                    values.len()
                ))
            })?;
            rows.push(row);
        }
        Self::from_rows(&rows)
    }

    /// Reads and parses a `.pfm` file.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::ModelLoad`] naming the file on any failure.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ScanError::model_load(path, e))?;
        Self::parse(&content).map_err(|e| ScanError::model_load(path, e))
    }

    /// Number of motif positions
    pub fn width(&self) -> usize {
        self.weights.nrows()
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    /// Product of per-position probabilities over a window of [`width`](Self::width) symbols.
    pub fn score_window(&self, window: &[Ordinal]) -> f64 {
        window
            .iter()
            .enumerate()
            .map(|(position, &symbol)| {
                let column = (symbol as usize).min(ALPHABET_SIZE);
                self.weights[[position, column]]
            })
            .product()
    }

    /// Scores every width-sized window of one strand.
    ///
    /// The sequence is padded with `width - 1` unknown symbols on each side,
    /// so the map has `len + width - 1` entries.
    pub fn strand_map(&self, ordinals: &[Ordinal], strand: Strand) -> Vec<f32> {
        slice_strand_windows(0, ordinals, ScanWindow::new(self.width(), 1), strand)
            .iter()
            .map(|window| self.score_window(&window.ordinals) as f32)
            .collect()
    }

    /// Prediction map of a forward-strand sequence.
    ///
    /// In double-stranded modes the reverse-complement map is reversed back
    /// into forward order and added position by position. Forced-reverse
    /// mode sums both strands as well.
    pub fn prediction_map(&self, ordinals: &[Ordinal], strand_mode: StrandMode) -> Vec<f32> {
        let mut map = self.strand_map(ordinals, Strand::Forward);
        if strand_mode.is_double_stranded() {
            let reverse = self.strand_map(&reverse_complement_ordinals(ordinals), Strand::Reverse);
            for (value, rev) in map.iter_mut().zip(reverse.iter().rev()) {
                *value += rev;
            }
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::encode;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = "ID\tsample\n0\t0.1\t0.2\t0.3\t0.4\n1\t0.7\t0.1\t0.1\t0.1\n";

    fn degenerate(sequence: &str) -> StaticWeightModel {
        let rows: Vec<[f64; 4]> = encode(sequence)
            .unwrap()
            .iter()
            .map(|&o| {
                let mut row = [0.0; 4];
                row[o as usize] = 1.0;
                row
            })
            .collect();
        StaticWeightModel::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_parse_sample() {
        let pfm = StaticWeightModel::parse(SAMPLE).unwrap();
        assert_eq!(pfm.width(), 2);
        assert_eq!(pfm.weights()[[0, 3]], 0.4);
        assert_eq!(pfm.weights()[[1, 0]], 0.7);
        assert_eq!(pfm.weights()[[1, 4]], UNKNOWN_PROBABILITY);
    }

    #[test]
    fn test_parse_rejects_bad_rows() {
        assert!(matches!(
            StaticWeightModel::parse("header\n0\t0.1\t0.2\n"),
            Err(ScanError::Parse(_))
        ));
        assert!(matches!(
            StaticWeightModel::parse("header\n0\tx\t0.2\t0.3\t0.4\n"),
            Err(ScanError::Parse(_))
        ));
        assert!(matches!(
            StaticWeightModel::parse("header only\n"),
            Err(ScanError::Configuration(_))
        ));
    }

    #[test]
    fn test_from_file_reports_path() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "header\n").unwrap();
        match StaticWeightModel::from_file(file.path()) {
            Err(ScanError::ModelLoad { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("Expected ModelLoad error, got {:?}", other),
        }
    }

    #[test]
    fn test_score_window_uses_uniform_unknown() {
        let pfm = StaticWeightModel::parse(SAMPLE).unwrap();
        // T then A: 0.4 * 0.7
        assert!((pfm.score_window(&[3, 0]) - 0.28).abs() < 1e-12);
        // N then A: 0.25 * 0.7
        assert!((pfm.score_window(&[4, 0]) - 0.175).abs() < 1e-12);
    }

    #[test]
    fn test_strand_map_length() {
        let pfm = StaticWeightModel::parse(SAMPLE).unwrap();
        let map = pfm.strand_map(&encode("ACGTAC").unwrap(), Strand::Forward);
        assert_eq!(map.len(), 6 + 2 - 1);
    }

    #[test]
    fn test_degenerate_width_one_gives_single_entry() {
        let pfm = degenerate("G");
        let map = pfm.prediction_map(&encode("G").unwrap(), StrandMode::Single);
        assert_eq!(map, vec![1.0]);
    }

    #[test]
    fn test_degenerate_full_match_peaks_once() {
        let pfm = degenerate("GATC");
        let map = pfm.prediction_map(&encode("GATC").unwrap(), StrandMode::Single);
        assert_eq!(map.len(), 2 * 4 - 1);
        // Only the fully aligned window scores 1; every other window touches
        // padding or a mismatch
        assert_eq!(map[3], 1.0);
        assert_eq!(map.iter().filter(|&&v| v == 1.0).count(), 1);
    }

    #[test]
    fn test_double_stranded_sums_reversed_map() {
        let pfm = degenerate("AAC");
        let forward = encode("GTTAAC").unwrap();
        let single = pfm.prediction_map(&forward, StrandMode::Single);
        let both = pfm.prediction_map(&forward, StrandMode::Both);
        assert_eq!(single.len(), both.len());
        // GTT reverse-complements to AAC, so the reverse strand adds a hit
        assert!(both.iter().sum::<f32>() > single.iter().sum::<f32>());
        assert_eq!(both.iter().filter(|&&v| v == 1.0).count(), 2);
        assert_eq!(
            pfm.prediction_map(&forward, StrandMode::ForceReverse),
            both
        );
    }
}
