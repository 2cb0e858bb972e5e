use crate::sequence::{decode, encode, reverse_complement_ordinals};
use crate::types::{Ordinal, ScanError};

/// An immutable named sequence stored as ordinals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedSequence {
    name: String,
    ordinals: Vec<Ordinal>,
}

impl EncodedSequence {
    /// Encodes `sequence`, failing on the first symbol outside `ACGTN`.
    pub fn new(name: impl Into<String>, sequence: &str) -> Result<Self, ScanError> {
        Ok(Self {
            name: name.into(),
            ordinals: encode(sequence)?,
        })
    }

    /// Same as [`EncodedSequence::new`] for raw FASTA bytes.
    pub fn from_bytes(name: impl Into<String>, sequence: &[u8]) -> Result<Self, ScanError> {
        let text = std::str::from_utf8(sequence)
            .map_err(|e| ScanError::Parse(format!("sequence is not valid UTF-8: {}", e)))?;
        Self::new(name, text)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordinals(&self) -> &[Ordinal] {
        &self.ordinals
    }

    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }

    /// Decoded uppercase sequence
    pub fn to_sequence_string(&self) -> String {
        decode(&self.ordinals)
    }

    /// Reverse-complemented copy carrying the same name
    pub fn reverse_complement(&self) -> Self {
        Self {
            name: self.name.clone(),
            ordinals: reverse_complement_ordinals(&self.ordinals),
        }
    }
}
