use std::collections::BTreeMap;

use super::model::{FieldValue, LoanDataset, Record, EXPECTED_COLUMNS};
use super::DataError;

// ---------------------------------------------------------------------------
// CSV parsing
// ---------------------------------------------------------------------------

/// Parse the extracted CSV bytes into a [`LoanDataset`].
///
/// Every field is coerced: trimmed, a decimal comma rewritten to a dot, then
/// parsed as `f64`; on failure the trimmed text is kept as-is.  Columns with
/// an empty header name are skipped entirely.
///
/// The header must contain every name in [`EXPECTED_COLUMNS`]; a missing
/// column fails the whole parse up front.  A malformed row also fails the
/// whole parse (no skip-and-continue), with the row number in the error.
pub fn parse_csv(bytes: &[u8]) -> Result<LoanDataset, DataError> {
    let mut reader = csv::Reader::from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(DataError::Parse)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    for expected in EXPECTED_COLUMNS {
        if !headers.iter().any(|h| h == expected) {
            return Err(DataError::MissingColumn(expected.to_string()));
        }
    }

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let row = result.map_err(|source| DataError::ParseRow { row: row_no, source })?;

        let mut fields = BTreeMap::new();
        for (col_idx, raw) in row.iter().enumerate() {
            let Some(name) = headers.get(col_idx) else {
                continue;
            };
            if name.is_empty() {
                continue;
            }
            fields.insert(name.clone(), coerce_field(raw));
        }
        records.push(Record::new(fields));
    }

    let columns: Vec<String> = headers.into_iter().filter(|h| !h.is_empty()).collect();
    Ok(LoanDataset { records, columns })
}

/// Numeric coercion for a single cell.  A comma is treated as a decimal
/// separator before parsing; empty cells stay empty text.
fn coerce_field(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldValue::Text(String::new());
    }
    match trimmed.replace(',', ".").parse::<f64>() {
        Ok(n) => FieldValue::Number(n),
        Err(_) => FieldValue::Text(trimmed.to_string()),
    }
}
