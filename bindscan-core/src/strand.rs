//! Merging forward and reverse-complement scores.
//!
//! In double-stranded mode every logical item is evaluated twice, and the
//! raw score array is interleaved as `[fwd_0, rev_0, fwd_1, rev_1, ...]`.
//! Resolution keeps exactly one value per pair and reports which strand it
//! came from, so attribution data of the other strand can be discarded.

use crate::config::StrandMode;
use crate::types::ScanError;

/// Scores after strand resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScores {
    /// One score per logical item
    pub scores: Vec<f32>,
    /// Per raw input, whether it was selected; `None` in single-strand mode
    pub mask: Option<Vec<bool>>,
}

impl ResolvedScores {
    /// Strand kept for logical item `index`; `false` means forward
    pub fn picked_reverse(&self, index: usize) -> bool {
        self.mask
            .as_ref()
            .is_some_and(|mask| mask.get(2 * index + 1).copied().unwrap_or(false))
    }
}

/// Resolves raw per-input scores into one score per logical item.
///
/// - [`StrandMode::Single`]: identity, no mask.
/// - [`StrandMode::Both`]: per pair, keep the higher score; ties keep forward.
/// - [`StrandMode::ForceReverse`]: always keep the reverse score.
///
/// # Errors
///
/// Returns [`ScanError::Model`] when a double-stranded score array has odd
/// length.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::config::StrandMode;
/// use bindscan_core::strand::resolve;
///
/// let resolved = resolve(&[1.0, 2.0, 3.0, 3.0], StrandMode::Both)?;
/// assert_eq!(resolved.scores, vec![2.0, 3.0]);
/// assert_eq!(resolved.mask, Some(vec![false, true, true, false]));
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
pub fn resolve(scores: &[f32], mode: StrandMode) -> Result<ResolvedScores, ScanError> {
    if !mode.is_double_stranded() {
        return Ok(ResolvedScores {
            scores: scores.to_vec(),
            mask: None,
        });
    }

    if scores.len() % 2 != 0 {
        return Err(ScanError::Model(format!(
            "expected interleaved strand pairs, got {} scores",
            scores.len()
        )));
    }

    let mut resolved = Vec::with_capacity(scores.len() / 2);
    let mut mask = Vec::with_capacity(scores.len());
    for pair in scores.chunks_exact(2) {
        let (forward, reverse) = (pair[0], pair[1]);
        let keep_forward = match mode {
            StrandMode::ForceReverse => false,
            _ => forward >= reverse,
        };
        mask.push(keep_forward);
        mask.push(!keep_forward);
        resolved.push(if keep_forward { forward } else { reverse });
    }

    Ok(ResolvedScores {
        scores: resolved,
        mask: Some(mask),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_strand_is_identity() {
        let resolved = resolve(&[0.5, -1.0, 2.0], StrandMode::Single).unwrap();
        assert_eq!(resolved.scores, vec![0.5, -1.0, 2.0]);
        assert!(resolved.mask.is_none());
        assert!(!resolved.picked_reverse(1));
    }

    #[test]
    fn test_both_picks_higher() {
        let resolved = resolve(&[0.1, 0.9, 0.8, 0.2], StrandMode::Both).unwrap();
        assert_eq!(resolved.scores, vec![0.9, 0.8]);
        assert_eq!(resolved.mask, Some(vec![false, true, true, false]));
        assert!(resolved.picked_reverse(0));
        assert!(!resolved.picked_reverse(1));
    }

    #[test]
    fn test_ties_keep_forward() {
        let resolved = resolve(&[0.5, 0.5], StrandMode::Both).unwrap();
        assert_eq!(resolved.mask, Some(vec![true, false]));
    }

    #[test]
    fn test_force_reverse_mask_pattern() {
        let scores = vec![1.0f32, -3.0, 4.0, 2.0, -0.5, 8.0, 0.0, 0.0];
        let resolved = resolve(&scores, StrandMode::ForceReverse).unwrap();
        let mask = resolved.mask.unwrap();
        for pair in mask.chunks_exact(2) {
            assert_eq!(pair, &[false, true]);
        }
        let expected: Vec<f32> = scores.iter().skip(1).step_by(2).copied().collect();
        assert_eq!(resolved.scores, expected);
    }

    #[test]
    fn test_resolution_never_fabricates() {
        let scores = [3.0, -2.0, 0.0, 7.5, -1.0, -1.5];
        let resolved = resolve(&scores, StrandMode::Both).unwrap();
        assert!(resolved.scores.iter().all(|s| scores.contains(s)));
    }

    #[test]
    fn test_odd_length_rejected() {
        assert!(matches!(
            resolve(&[1.0, 2.0, 3.0], StrandMode::Both),
            Err(ScanError::Model(_))
        ));
    }
}
