//! Sliding-window slicing of variable-length sequences.
//!
//! A sequence of length `L` scanned with window size `w` and stride `s` is
//! first padded with `w - 1` unknown symbols on each side, then cut into
//! windows `[i, i + w)` for `i = 0, s, 2s, ...` while `i <= L + w - 2`.
//! Every window therefore overlaps at least one real symbol, and a sequence
//! always yields at least one window.
//!
//! ```text
//! ACGT, w = 2, s = 1
//!
//! padded:  N A C G T N
//! windows: NA AC CG GT TN
//! ```

use std::ops::Range;

use crate::config::ScanWindow;
use crate::constants::UNKNOWN_ORDINAL;
use crate::sequence::pad_ordinals;
use crate::types::{Ordinal, Strand};

/// A fixed-width slice of a padded sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    /// Row of the source sequence in its dataset
    pub record: usize,
    /// Start of the window in padded coordinates
    pub offset: usize,
    /// Strand the window was cut from
    pub strand: Strand,
    /// Window content, always exactly the window size long
    pub ordinals: Vec<Ordinal>,
}

impl Window {
    /// Unpadded source positions covered by this window, clamped to
    /// `[0, sequence_length)`.
    #[must_use]
    pub fn source_span(&self, sequence_length: usize) -> Range<usize> {
        let pad = self.ordinals.len().saturating_sub(1);
        let start = self.offset.saturating_sub(pad).min(sequence_length);
        let end = (self.offset + self.ordinals.len())
            .saturating_sub(pad)
            .min(sequence_length);
        start..end
    }
}

/// Number of windows produced for a sequence of `length` symbols.
///
/// Equals `ceil((length + size - 1) / stride)`, and never less than one.
#[must_use]
pub fn window_count(length: usize, size: usize, stride: usize) -> usize {
    let positions = (length + size).saturating_sub(1).max(1);
    positions.div_ceil(stride.max(1))
}

/// Cuts forward-strand windows from `ordinals`.
///
/// The input is not modified; windows own copies of their content.
///
/// # Examples
///
/// ```rust
/// use bindscan_core::config::ScanWindow;
/// use bindscan_core::scan::slice_windows;
/// use bindscan_core::sequence::{decode, encode};
///
/// let windows = slice_windows(0, &encode("ACGT")?, ScanWindow::new(2, 1));
/// let content: Vec<String> = windows.iter().map(|w| decode(&w.ordinals)).collect();
/// assert_eq!(content, ["NA", "AC", "CG", "GT", "TN"]);
/// # Ok::<(), bindscan_core::types::ScanError>(())
/// ```
#[must_use]
pub fn slice_windows(record: usize, ordinals: &[Ordinal], window: ScanWindow) -> Vec<Window> {
    slice_strand_windows(record, ordinals, window, Strand::Forward)
}

/// Cuts windows from `ordinals` and tags them with `strand`.
///
/// Callers pass already reverse-complemented content for the reverse strand.
#[must_use]
pub fn slice_strand_windows(
    record: usize,
    ordinals: &[Ordinal],
    window: ScanWindow,
    strand: Strand,
) -> Vec<Window> {
    let size = window.size.max(1);
    let padded = pad_ordinals(ordinals, size - 1);
    let count = window_count(ordinals.len(), size, window.stride);

    (0..count)
        .map(|j| {
            let offset = j * window.stride.max(1);
            let end = (offset + size).min(padded.len());
            let mut content = padded[offset.min(end)..end].to_vec();
            content.resize(size, UNKNOWN_ORDINAL);
            Window {
                record,
                offset,
                strand,
                ordinals: content,
            }
        })
        .collect()
}

/// Window counts per record and their prefix sums.
///
/// Lets a flat, concatenated array of per-window outputs be split back into
/// one slice per record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WindowPlan {
    counts: Vec<usize>,
    boundaries: Vec<usize>,
}

impl WindowPlan {
    pub fn from_counts(counts: Vec<usize>) -> Self {
        let mut boundaries = Vec::with_capacity(counts.len() + 1);
        boundaries.push(0);
        let mut total = 0;
        for &count in &counts {
            total += count;
            boundaries.push(total);
        }
        Self { counts, boundaries }
    }

    /// Plan for scanning sequences of the given lengths
    pub fn for_lengths<I>(lengths: I, window: ScanWindow) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        Self::from_counts(
            lengths
                .into_iter()
                .map(|len| window_count(len, window.size, window.stride))
                .collect(),
        )
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Prefix sums, starting at zero, one entry longer than `counts`
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    pub fn total(&self) -> usize {
        self.boundaries.last().copied().unwrap_or(0)
    }

    /// Flat index range of record `record`'s windows
    pub fn range(&self, record: usize) -> Range<usize> {
        self.boundaries[record]..self.boundaries[record + 1]
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
