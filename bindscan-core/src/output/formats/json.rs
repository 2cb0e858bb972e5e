use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::{
    results::{ResultSet, ResultValue},
    types::ScanError,
};

#[derive(Serialize)]
struct JsonReport<'a> {
    ids: &'a [String],
    results: BTreeMap<String, ResultValue>,
}

/// Write every result key as one JSON object.
///
/// NaN predictions of static-weight models serialize as `null`.
pub fn write_json_format<W: Write>(
    writer: &mut W,
    results: &ResultSet,
    row_ids: &[String],
) -> Result<(), ScanError> {
    let report = JsonReport {
        ids: row_ids,
        results: results.keyed(),
    };
    serde_json::to_writer_pretty(&mut *writer, &report)
        .map_err(|e| ScanError::Parse(format!("failed to serialize results: {}", e)))?;
    writeln!(writer)?;
    Ok(())
}
