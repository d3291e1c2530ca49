use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use csv::ReaderBuilder;
use tracing::debug;

use crate::error::Error;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// A CSV file as parsed by the `csv` reader: header plus string records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl CsvTable {
    /// Values of the first column.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.rows
            .iter()
            .map(|r| r.first().map(|k| k.as_str()).unwrap_or(""))
    }
}

pub fn read_csv_table(path: &Path) -> Result<CsvTable, Error> {
    if !path.is_file() {
        return Err(Error::CsvFileMissing {
            path: path.to_path_buf(),
        });
    }
    let bytes = fs::read(path)?;
    let data = bytes.strip_prefix(BOM).unwrap_or(&bytes[..]);
    if data.iter().all(|b| b.is_ascii_whitespace()) {
        return Err(Error::CsvEmptyFile {
            path: path.to_path_buf(),
        });
    }

    let csv_error = |source: csv::Error| Error::CsvRead {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(data);
    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(str::to_string)
        .collect();
    let mut rows: Vec<Vec<String>> = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(CsvTable { headers, rows })
}

/// The pair of tables that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedPair {
    pub original: CsvTable,
    pub export: CsvTable,
}

/// Check that an export can be restored against its original.
///
/// Both files must parse, have the same columns in the same order, and hold the
/// same set of key-name values (first column).
pub fn validate_csv_structure(original: &Path, export: &Path) -> Result<ValidatedPair, Error> {
    let original_table = read_csv_table(original)?;
    let export_table = read_csv_table(export)?;

    if original_table.headers.len() != export_table.headers.len() {
        return Err(Error::CsvColumnCount {
            original: original_table.headers.len(),
            export: export_table.headers.len(),
        });
    }

    if original_table.headers != export_table.headers {
        let ours: BTreeSet<&String> = original_table.headers.iter().collect();
        let theirs: BTreeSet<&String> = export_table.headers.iter().collect();
        return Err(Error::CsvHeaderMismatch {
            only_original: ours.difference(&theirs).map(|h| h.to_string()).collect(),
            only_export: theirs.difference(&ours).map(|h| h.to_string()).collect(),
        });
    }

    if original_table.headers.is_empty() {
        return Err(Error::CsvNoColumns);
    }

    let original_keys: BTreeSet<&str> = original_table.keys().collect();
    let export_keys: BTreeSet<&str> = export_table.keys().collect();

    let only_export: Vec<String> = export_keys
        .difference(&original_keys)
        .map(|k| k.to_string())
        .collect();
    if !only_export.is_empty() {
        return Err(Error::CsvKeysOnlyInExport { keys: only_export });
    }

    let only_original: Vec<String> = original_keys
        .difference(&export_keys)
        .map(|k| k.to_string())
        .collect();
    if !only_original.is_empty() {
        return Err(Error::CsvKeysOnlyInOriginal {
            keys: only_original,
        });
    }

    debug!(
        "CSV structure valid: {} columns, {} original rows, {} export rows",
        original_table.headers.len(),
        original_table.rows.len(),
        export_table.rows.len()
    );
    Ok(ValidatedPair {
        original: original_table,
        export: export_table,
    })
}
