//! Auxiliary feature vectors derived from sequence content.
//!
//! Some models take, next to the ordinal input, a small feature vector
//! computed from the same sequence. Because the vector depends on the
//! sequence, it has to be recomputed for every mutated copy evaluated during
//! finite-difference attribution.

use crate::constants::{ALPHABET_SIZE, DINUCLEOTIDE_FEATURES, UNKNOWN_ORDINAL};
use crate::types::Ordinal;

/// Relative frequency of each of the 16 dinucleotides in `ordinals`.
///
/// Entry `4 * a + b` counts the pair `(a, b)`. Pairs touching an unknown
/// symbol are skipped. A sequence without any valid pair yields all zeros.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::sequence::{encode, features::dinucleotide_frequencies};
///
/// let freqs = dinucleotide_frequencies(&encode("AAC")?);
/// assert_eq!(freqs[0], 0.5); // AA
/// assert_eq!(freqs[1], 0.5); // AC
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
#[must_use]
pub fn dinucleotide_frequencies(ordinals: &[Ordinal]) -> [f32; DINUCLEOTIDE_FEATURES] {
    let mut counts = [0u32; DINUCLEOTIDE_FEATURES];
    let mut total = 0u32;
    for pair in ordinals.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if a >= UNKNOWN_ORDINAL || b >= UNKNOWN_ORDINAL {
            continue;
        }
        counts[a as usize * ALPHABET_SIZE + b as usize] += 1;
        total += 1;
    }

    let mut freqs = [0.0f32; DINUCLEOTIDE_FEATURES];
    if total > 0 {
        for (freq, &count) in freqs.iter_mut().zip(counts.iter()) {
            *freq = count as f32 / total as f32;
        }
    }
    freqs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::encode;

    #[test]
    fn test_frequencies_sum_to_one() {
        let freqs = dinucleotide_frequencies(&encode("ACGTTGCAAC").unwrap());
        let total: f32 = freqs.iter().sum();
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_unknown_pairs_skipped() {
        let freqs = dinucleotide_frequencies(&encode("ANCG").unwrap());
        // Only CG survives
        assert_eq!(freqs[ALPHABET_SIZE + 2], 1.0);
        assert_eq!(freqs.iter().filter(|&&f| f > 0.0).count(), 1);
    }

    #[test]
    fn test_short_sequences_are_zero() {
        assert!(dinucleotide_frequencies(&[]).iter().all(|&f| f == 0.0));
        assert!(dinucleotide_frequencies(&[2]).iter().all(|&f| f == 0.0));
        assert!(
            dinucleotide_frequencies(&encode("NNNN").unwrap())
                .iter()
                .all(|&f| f == 0.0)
        );
    }
}
