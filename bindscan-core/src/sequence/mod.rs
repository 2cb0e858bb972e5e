//! Sequence encoding and manipulation utilities.
//!
//! Sequences are converted to ordinal arrays before they reach a model:
//!
//! - A (adenine): 0
//! - C (cytosine): 1
//! - G (guanine): 2
//! - T (thymine): 3
//! - N (unknown / padding): 4
//!
//! The unknown ordinal sits outside the four-letter alphabet so models can
//! treat it specially; static-weight models score it as uniform.
//!
//! ## Modules
//!
//! - [`encoded`]: Immutable encoded sequence records
//! - [`io`]: FASTA file reading
//! - [`features`]: Auxiliary per-sequence feature vectors
//!
//! ## Examples
//!
//! ```rust
//! use bindscan_core::sequence::{decode, encode, reverse_complement};
//!
//! let ordinals = encode("ACGTN")?;
//! assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
//! assert_eq!(decode(&ordinals), "ACGTN");
//! assert_eq!(reverse_complement("AACGN")?, "NCGTT");
//! # Ok::<(), bindscan_core::types::ScanError>(())
//! ```

use crate::constants::UNKNOWN_ORDINAL;
use crate::types::{Ordinal, ScanError};

pub mod encoded;
pub mod features;
pub mod io;

pub use encoded::EncodedSequence;
pub use io::*;

const ORDINAL_SYMBOLS: [char; 5] = ['A', 'C', 'G', 'T', 'N'];

/// Converts a nucleotide character to its ordinal.
///
/// Returns `None` for characters outside `ACGTN` (case-insensitive).
///
/// # Examples
///
/// ```rust
/// use bindscan_core::sequence::char_to_ordinal;
///
/// assert_eq!(char_to_ordinal('A'), Some(0));
/// assert_eq!(char_to_ordinal('g'), Some(2));
/// assert_eq!(char_to_ordinal('N'), Some(4));
/// assert_eq!(char_to_ordinal('X'), None);
/// ```
#[must_use]
pub const fn char_to_ordinal(c: char) -> Option<Ordinal> {
    match c.to_ascii_uppercase() {
        'A' => Some(0),
        'C' => Some(1),
        'G' => Some(2),
        'T' => Some(3),
        'N' => Some(UNKNOWN_ORDINAL),
        _ => None,
    }
}

/// Converts an ordinal back to its uppercase symbol.
///
/// Any value at or above the unknown ordinal decodes as `N`.
#[must_use]
pub const fn ordinal_to_char(ordinal: Ordinal) -> char {
    if ordinal >= UNKNOWN_ORDINAL {
        'N'
    } else {
        ORDINAL_SYMBOLS[ordinal as usize]
    }
}

/// Complement of a single ordinal; the unknown symbol is its own complement
#[must_use]
pub const fn complement_ordinal(ordinal: Ordinal) -> Ordinal {
    if ordinal >= UNKNOWN_ORDINAL {
        UNKNOWN_ORDINAL
    } else {
        3 - ordinal
    }
}

/// Encodes a sequence into ordinals.
///
/// # Errors
///
/// Returns [`ScanError::Encoding`] with the offending symbol and its
/// position for anything outside `ACGTN`.
pub fn encode(sequence: &str) -> Result<Vec<Ordinal>, ScanError> {
    sequence
        .chars()
        .enumerate()
        .map(|(position, symbol)| {
            char_to_ordinal(symbol).ok_or(ScanError::Encoding { symbol, position })
        })
        .collect()
}

/// Decodes ordinals into an uppercase sequence string.
#[must_use]
pub fn decode(ordinals: &[Ordinal]) -> String {
    ordinals.iter().map(|&o| ordinal_to_char(o)).collect()
}

/// Reverse complement of an ordinal array.
#[must_use]
pub fn reverse_complement_ordinals(ordinals: &[Ordinal]) -> Vec<Ordinal> {
    ordinals.iter().rev().map(|&o| complement_ordinal(o)).collect()
}

/// Reverse complement of a sequence string.
///
/// # Errors
///
/// Returns [`ScanError::Encoding`] if the sequence contains invalid symbols.
pub fn reverse_complement(sequence: &str) -> Result<String, ScanError> {
    let ordinals = encode(sequence)?;
    Ok(decode(&reverse_complement_ordinals(&ordinals)))
}

/// Surrounds `ordinals` with `padding` unknown symbols on each side.
#[must_use]
pub fn pad_ordinals(ordinals: &[Ordinal], padding: usize) -> Vec<Ordinal> {
    let mut padded = Vec::with_capacity(ordinals.len() + 2 * padding);
    padded.resize(padding, UNKNOWN_ORDINAL);
    padded.extend_from_slice(ordinals);
    padded.resize(ordinals.len() + 2 * padding, UNKNOWN_ORDINAL);
    padded
}
