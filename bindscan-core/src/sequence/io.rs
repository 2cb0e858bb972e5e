use std::fs::File;
use std::io::Read;
use std::path::Path;

use bio::io::fasta;

use crate::constants::DEFAULT_SEQUENCE_ATTRIBUTE;
use crate::dataset::Dataset;
use crate::sequence::EncodedSequence;
use crate::types::ScanError;

/// Reads every FASTA record from `reader` and encodes it.
///
/// Record ids become sequence names; descriptions are dropped.
pub fn read_fasta_records<R: Read>(reader: R) -> Result<Vec<EncodedSequence>, ScanError> {
    let reader = fasta::Reader::new(reader);
    let mut sequences = Vec::new();

    for result in reader.records() {
        let record = result.map_err(|e| ScanError::Parse(e.to_string()))?;
        sequences.push(EncodedSequence::from_bytes(record.id(), record.seq())?);
    }

    Ok(sequences)
}

/// Loads a FASTA file as a single-attribute [`Dataset`].
pub fn read_fasta_dataset<P: AsRef<Path>>(path: P) -> Result<Dataset, ScanError> {
    let file = File::open(path)?;
    let sequences = read_fasta_records(file)?;
    Ok(Dataset::single(DEFAULT_SEQUENCE_ATTRIBUTE, sequences))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_fasta_records_basic() {
        let content = ">test_sequence\nACGT\nGCTA\n";
        let records = read_fasta_records(Cursor::new(content)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "test_sequence");
        assert_eq!(records[0].to_sequence_string(), "ACGTGCTA");
    }

    #[test]
    fn test_read_fasta_records_multiple_with_description() {
        let content = ">seq1 a description\nACGT\n>seq2\nGCTA\n>seq3\nnnaa\n";
        let records = read_fasta_records(Cursor::new(content)).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].name(), "seq1");
        assert_eq!(records[2].to_sequence_string(), "NNAA");
    }

    #[test]
    fn test_read_fasta_records_empty() {
        let records = read_fasta_records(Cursor::new("")).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_read_fasta_records_invalid_symbol() {
        let content = ">bad\nACGTXX\n";
        let result = read_fasta_records(Cursor::new(content));
        assert!(matches!(result, Err(ScanError::Encoding { .. })));
    }

    #[test]
    fn test_read_fasta_dataset() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), ">a\nACGT\n>b\nTT\n").unwrap();

        let data = read_fasta_dataset(file.path()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.ids(), &["a".to_string(), "b".to_string()]);
        assert_eq!(data.attributes(), &[DEFAULT_SEQUENCE_ATTRIBUTE.to_string()]);
    }

    #[test]
    fn test_read_fasta_dataset_file_not_found() {
        let result = read_fasta_dataset("nonexistent_file.fa");
        match result {
            Err(ScanError::Io(_)) => {}
            _ => panic!("Expected Io error for missing file"),
        }
    }
}
