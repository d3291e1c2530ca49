use std::fs;
use std::path::{Path, PathBuf};

use ahash::AHashMap;
use tracing::{debug, info};

use super::parser::{analyze_csv_pattern, QuotePattern, RawField};
use super::validator::validate_csv_structure;
use crate::error::Error;
use crate::progress::ProgressReporter;
use crate::xlsx::{Cell, CellStyle, SheetLayout, Workbook, Worksheet};

/// A field whose written text differs from what the export had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredField {
    pub key: String,
    pub column: String,
    pub original_raw: String,
    pub export_raw: String,
    pub restored_raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreWarning {
    pub kind: String,
    pub key: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub output_path: PathBuf,
    pub report_path: PathBuf,
    pub total_rows: usize,
    pub total_fields: usize,
    pub restored: Vec<RestoredField>,
    pub warnings: Vec<RestoreWarning>,
}

impl RestoreOutcome {
    pub fn restored_count(&self) -> usize {
        self.restored.len()
    }
}

/// `{stem}_diff_report.xlsx` next to the restored file.
pub fn report_path_for(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{}_diff_report.xlsx", stem))
}

/// Re-apply the original file's quoting to an externally re-exported CSV.
///
/// Records are written in export order. A field whose value is unchanged gets
/// the original raw text byte for byte; a changed field keeps the export's raw
/// text. Header line, BOM and line ending come from the original.
pub fn restore_csv_quotes(
    original: &Path,
    export: &Path,
    output: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<RestoreOutcome, Error> {
    reporter.on_progress(10, "Validating CSV files...");
    let tables = validate_csv_structure(original, export)?;

    reporter.on_progress(20, "Analyzing original quote pattern...");
    let original_pattern = analyze_csv_pattern(original)?;
    check_record_count(original, &original_pattern, tables.original.rows.len())?;

    reporter.on_progress(25, "Analyzing export quote pattern...");
    let export_pattern = analyze_csv_pattern(export)?;
    check_record_count(export, &export_pattern, tables.export.rows.len())?;

    reporter.on_progress(30, "Matching rows by key-name...");
    // later duplicates win
    let original_index: AHashMap<&str, usize> = (0..original_pattern.records.len())
        .filter_map(|idx| original_pattern.key_of(idx).map(|k| (k, idx)))
        .collect();

    let mut warnings = collect_warnings(&original_pattern, "original");
    warnings.extend(collect_warnings(&export_pattern, "export"));

    reporter.on_progress(40, "Restoring quotes...");
    let total = export_pattern.records.len().max(1);
    let mut last_percent = 40;
    let mut restored = Vec::new();
    let mut lines = Vec::with_capacity(export_pattern.records.len());

    for (row, export_record) in export_pattern.records.iter().enumerate() {
        if reporter.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let key = export_record.first().map(|f| f.value.as_str()).unwrap_or("");
        let original_record = original_index
            .get(key)
            .and_then(|idx| original_pattern.records.get(*idx));

        let mut parts = Vec::with_capacity(export_record.len());
        for (col, export_field) in export_record.iter().enumerate() {
            let original_field = original_record.and_then(|r| r.get(col));
            let text = restore_field(original_field, export_field);
            if text != export_field.raw {
                restored.push(RestoredField {
                    key: key.to_string(),
                    column: original_pattern.headers.get(col).cloned().unwrap_or_default(),
                    original_raw: original_field.map(|f| f.raw.clone()).unwrap_or_default(),
                    export_raw: export_field.raw.clone(),
                    restored_raw: text.to_string(),
                });
            }
            parts.push(text);
        }
        lines.push(parts.join(","));

        let percent = 40 + ((row + 1) * 30 / total) as u8;
        if percent != last_percent {
            reporter.on_progress(percent, "Restoring quotes...");
            last_percent = percent;
        }
    }

    reporter.on_progress(75, "Saving restored file...");
    write_restored(output, &original_pattern, &lines)?;

    reporter.on_progress(85, "Writing diff report...");
    let outcome = RestoreOutcome {
        output_path: output.to_path_buf(),
        report_path: report_path_for(output),
        total_rows: tables.original.rows.len(),
        total_fields: tables.original.rows.len() * tables.original.headers.len(),
        restored,
        warnings,
    };
    write_diff_report(&outcome)?;

    reporter.on_progress(100, "Done");
    info!(
        "Restored {} field(s) into {}, report {}",
        outcome.restored_count(),
        outcome.output_path.display(),
        outcome.report_path.display()
    );
    Ok(outcome)
}

fn restore_field<'a>(original: Option<&'a RawField>, export: &'a RawField) -> &'a str {
    match original {
        Some(orig) if orig.value == export.value => &orig.raw,
        _ => &export.raw,
    }
}

fn check_record_count(path: &Path, pattern: &QuotePattern, parsed: usize) -> Result<(), Error> {
    if pattern.records.len() != parsed {
        return Err(Error::CsvPatternMismatch {
            path: path.to_path_buf(),
            raw: pattern.records.len(),
            parsed,
        });
    }
    Ok(())
}

fn collect_warnings(pattern: &QuotePattern, side: &str) -> Vec<RestoreWarning> {
    let mut warnings = Vec::new();
    for (idx, record) in pattern.records.iter().enumerate() {
        let key = pattern.key_of(idx).unwrap_or("").to_string();
        for (col, field) in record.iter().enumerate() {
            if field.violates_rfc4180() {
                warnings.push(RestoreWarning {
                    kind: "RFC 4180".to_string(),
                    key: key.clone(),
                    message: format!(
                        "{} column {} has irregular quoting: {}",
                        side,
                        pattern.headers.get(col).map(String::as_str).unwrap_or("?"),
                        field.raw
                    ),
                });
            }
        }
    }
    warnings
}

fn write_restored(output: &Path, pattern: &QuotePattern, lines: &[String]) -> Result<(), Error> {
    let ending = pattern.line_ending.as_str();
    let mut text = String::new();
    if pattern.has_bom {
        text.push('\u{feff}');
    }
    text.push_str(&pattern.header_raw);
    for line in lines {
        text.push_str(ending);
        text.push_str(line);
    }
    if pattern.ends_with_newline {
        text.push_str(ending);
    }
    fs::write(output, text)?;
    debug!("Wrote {} record(s) to {}", lines.len(), output.display());
    Ok(())
}

fn write_diff_report(outcome: &RestoreOutcome) -> Result<(), Error> {
    let mut summary = Worksheet::new("Summary").with_layout(SheetLayout::report(vec![28.0, 16.0]));
    summary.push_text_row(&["Item", "Value"]);
    for (label, value) in [
        ("Total rows", outcome.total_rows),
        ("Total fields", outcome.total_fields),
        ("Restored fields", outcome.restored_count()),
        ("Warnings", outcome.warnings.len()),
        ("Errors", 0),
    ] {
        summary.push_row(vec![Cell::text(label), Cell::number(value as f64)]);
    }

    let mut fields = Worksheet::new("Restored Fields")
        .with_layout(SheetLayout::report(vec![30.0, 16.0, 40.0, 40.0, 40.0, 18.0]));
    fields.push_text_row(&["key-name", "Column", "Original", "Export", "Restored", "Status"]);
    for field in &outcome.restored {
        fields.push_row(vec![
            Cell::text(field.key.as_str()),
            Cell::text(field.column.as_str()),
            Cell::text(field.original_raw.as_str()),
            Cell::text(field.export_raw.as_str()),
            Cell::text(field.restored_raw.as_str()),
            Cell::text("Quotes restored").styled(CellStyle::Restored),
        ]);
    }

    let mut warnings =
        Worksheet::new("Warnings").with_layout(SheetLayout::report(vec![14.0, 30.0, 60.0]));
    warnings.push_text_row(&["Type", "key-name", "Message"]);
    if outcome.warnings.is_empty() {
        warnings.push_text_row(&["-", "-", "Validation passed (no warnings)"]);
    }
    for warning in &outcome.warnings {
        warnings.push_text_row(&[&warning.kind, &warning.key, &warning.message]);
    }

    let mut workbook = Workbook::new();
    workbook.add_sheet(summary);
    workbook.add_sheet(fields);
    workbook.add_sheet(warnings);
    workbook
        .save(&outcome.report_path)
        .map_err(|source| Error::ReportWrite {
            path: outcome.report_path.clone(),
            source,
        })
}
