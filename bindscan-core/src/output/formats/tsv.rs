use std::io::Write;

use crate::{
    results::{ResultSet, ResultValue},
    types::ScanError,
};

/// Write per-sequence scalars as a tab-separated table
pub fn write_tsv_format<W: Write>(
    writer: &mut W,
    results: &ResultSet,
    row_ids: &[String],
) -> Result<(), ScanError> {
    let columns: Vec<(String, ResultValue)> = results
        .keyed()
        .into_iter()
        .filter(|(_, value)| is_tabular(value))
        .collect();

    write!(writer, "id")?;
    for (key, _) in &columns {
        write!(writer, "\t{}", key)?;
    }
    writeln!(writer)?;

    for (row, id) in row_ids.iter().enumerate() {
        write!(writer, "{}", id)?;
        for (_, value) in &columns {
            match value.scalar(row) {
                Some(v) => write!(writer, "\t{}", v)?,
                None => write!(writer, "\t")?,
            }
        }
        writeln!(writer)?;
    }
    Ok(())
}

fn is_tabular(value: &ResultValue) -> bool {
    match value {
        ResultValue::Matrix(m) => m.ncols() == 1,
        ResultValue::Vector(_) => true,
        ResultValue::Maps(_) | ResultValue::Attributions(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maps::AttributionMap;
    use crate::results::ModelResult;
    use ndarray::{Array2, array};

    #[test]
    fn test_write_tsv_scan_columns() {
        let results: ResultSet = vec![ModelResult::scanned(
            "P",
            array![[f32::NAN]],
            vec![vec![0.5, 1.5]],
            true,
            None,
        )]
        .into_iter()
        .collect();
        let mut buffer = Vec::new();
        write_tsv_format(&mut buffer, &results, &["s1".to_string()]).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(
            output,
            "id\tP.avg\tP.direct\tP.max\tP.sum\ns1\t1\tNaN\t1.5\t2\n"
        );
    }

    #[test]
    fn test_write_tsv_skips_attribution_maps() {
        let map = AttributionMap::new("A".to_string(), Array2::zeros((1, 4)));
        let results: ResultSet = vec![ModelResult::direct("M", array![[3.0f32]], Some(vec![map]))]
            .into_iter()
            .collect();
        let mut buffer = Vec::new();
        write_tsv_format(&mut buffer, &results, &["x".to_string()]).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "id\tM\nx\t3\n");
    }

    #[test]
    fn test_write_tsv_short_columns_leave_blank() {
        let results: ResultSet = vec![ModelResult::direct("M", array![[3.0f32]], None)]
            .into_iter()
            .collect();
        let mut buffer = Vec::new();
        write_tsv_format(&mut buffer, &results, &["a".to_string(), "b".to_string()]).unwrap();
        let output = String::from_utf8(buffer).unwrap();
        assert_eq!(output, "id\tM\na\t3\nb\t\n");
    }
}
