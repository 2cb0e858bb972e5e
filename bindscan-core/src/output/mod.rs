//! Output formatting for prediction results.
//!
//! Writers turn a [`ResultSet`] into text at the external boundary, using the
//! keyed form produced by [`ResultSet::keyed`].
//!
//! ## Supported Formats
//!
//! - **TSV**: one row per sequence, one column per per-sequence scalar key
//! - **JSON**: every key, including prediction and attribution maps
//!
//! ## Examples
//!
//! ```rust
//! use bindscan_core::config::OutputFormat;
//! use bindscan_core::output::write_results;
//! use bindscan_core::results::{ModelResult, ResultSet};
//! use ndarray::array;
//!
//! let results: ResultSet = vec![ModelResult::direct("M1", array![[0.5f32]], None)]
//!     .into_iter()
//!     .collect();
//!
//! let mut out = Vec::new();
//! write_results(&mut out, &results, &["seq1".to_string()], OutputFormat::Tsv)?;
//! assert_eq!(String::from_utf8(out).unwrap(), "id\tM1\nseq1\t0.5\n");
//! # Ok::<(), bindscan_core::types::ScanError>(())
//! ```

use std::io::Write;

use crate::{config::OutputFormat, results::ResultSet, types::ScanError};

mod formats {
    pub mod json;
    pub mod tsv;
}

use formats::{json::write_json_format, tsv::write_tsv_format};

/// Writes prediction results in the specified format.
///
/// `row_ids` labels the sequences in row order; values with fewer rows than
/// `row_ids` leave the remaining cells empty.
///
/// # Errors
///
/// Returns [`ScanError`] if writing or serialization fails.
pub fn write_results<W: Write>(
    writer: &mut W,
    results: &ResultSet,
    row_ids: &[String],
    format: OutputFormat,
) -> Result<(), ScanError> {
    match format {
        OutputFormat::Tsv => write_tsv_format(writer, results, row_ids),
        OutputFormat::Json => write_json_format(writer, results, row_ids),
    }
}
