use std::path::PathBuf;

use thiserror::Error;

use crate::batch::BatchName;
use crate::language::Language;
use crate::xlsx::XlsxError;

/// Every fatal condition the pipelines can raise, plus the user-cancellation signal.
///
/// Variants carry typed payloads only; turning them into user-facing text is the
/// caller's job. `code()` gives the stable machine-readable identifier.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("root folder not found: {}", path.display())]
    RootFolderMissing { path: PathBuf },

    #[error("no REGULAR batch folder found")]
    RegularBatchMissing,

    #[error("no base batch designated")]
    BaseBatchUnset,

    #[error("base batch {base} is not among the selected batches")]
    BaseBatchNotSelected { base: BatchName },

    #[error("at least 2 batches must be selected, got {count}")]
    SelectionTooFew { count: usize },

    #[error("batch {batch} was not found by the scan")]
    UnknownBatch { batch: BatchName },

    #[error("batch {batch} is incomplete, missing {missing:?}")]
    BatchIncomplete {
        batch: BatchName,
        missing: Vec<Language>,
    },

    #[error("batch {batch} has more than one {language} file: {files:?}")]
    BatchDuplicateLanguage {
        batch: BatchName,
        language: Language,
        files: Vec<String>,
    },

    #[error("cannot read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    #[error("unexpected header in {file}: expected {expected:?}, found {actual:?}")]
    InvalidHeader {
        file: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("batch {batch} contains duplicate KEYs {keys:?} ({total} in total)")]
    IntraBatchDuplicate {
        batch: BatchName,
        keys: Vec<String>,
        total: usize,
    },

    #[error("duplicate KEY {key} has no Date (row {row})")]
    DateEmpty { key: String, row: usize },

    #[error("duplicate KEY {key} has an unparsable Date {value:?} (row {row})")]
    DateFormatInvalid {
        key: String,
        row: usize,
        value: String,
    },

    #[error("duplicate KEY {key} has identical Date {date} on both rows")]
    DuplicateDate { key: String, date: String },

    #[error("{language} has {actual} rows after deduplication, EN has {expected}")]
    RowCountMismatch {
        language: Language,
        expected: usize,
        actual: usize,
    },

    #[error("cannot create output folder {}: {source}", path.display())]
    OutputDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write {language} output {} (already written: {written:?}): {source}", path.display())]
    OutputWrite {
        language: Language,
        path: PathBuf,
        written: Vec<Language>,
        #[source]
        source: XlsxError,
    },

    #[error("cannot write report {}: {source}", path.display())]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    #[error("CSV file not found: {}", path.display())]
    CsvFileMissing { path: PathBuf },

    #[error("CSV file is empty: {}", path.display())]
    CsvEmptyFile { path: PathBuf },

    #[error("cannot parse CSV {}: {source}", path.display())]
    CsvRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("quoted field is not closed (line {line})")]
    CsvUnterminatedQuote { line: usize },

    #[error("column count differs: original {original}, export {export}")]
    CsvColumnCount { original: usize, export: usize },

    #[error("headers differ: only in original {only_original:?}, only in export {only_export:?}")]
    CsvHeaderMismatch {
        only_original: Vec<String>,
        only_export: Vec<String>,
    },

    #[error("CSV has no columns")]
    CsvNoColumns,

    #[error("key-name values only in export: {keys:?}")]
    CsvKeysOnlyInExport { keys: Vec<String> },

    #[error("key-name values only in original: {keys:?}")]
    CsvKeysOnlyInOriginal { keys: Vec<String> },

    #[error("raw parse of {} found {raw} records, CSV reader found {parsed}", path.display())]
    CsvPatternMismatch {
        path: PathBuf,
        raw: usize,
        parsed: usize,
    },

    #[error("folder {} is missing languages {missing:?} ({found} found)", folder.display())]
    DiffFolderIncomplete {
        folder: PathBuf,
        found: usize,
        missing: Vec<Language>,
    },

    #[error("no translation changes between the two snapshots")]
    DiffNoChanges,

    #[error("merge worker thread panicked")]
    WorkerPanicked,

    #[error("operation cancelled by user")]
    Cancelled,
}

impl Error {
    /// Stable identifier used by front ends to look up their own message text.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::Config(_) => "CONFIG_ERROR",
            Error::RootFolderMissing { .. } => "FILE_NOT_FOUND",
            Error::RegularBatchMissing => "BATCH_REGULAR_MISSING",
            Error::BaseBatchUnset => "BASE_BATCH_UNSET",
            Error::BaseBatchNotSelected { .. } => "BASE_BATCH_NOT_SELECTED",
            Error::SelectionTooFew { .. } => "SELECTION_TOO_FEW",
            Error::UnknownBatch { .. } => "BATCH_UNKNOWN",
            Error::BatchIncomplete { .. } => "BATCH_INCOMPLETE",
            Error::BatchDuplicateLanguage { .. } => "BATCH_FILE_DUPLICATE",
            Error::FileRead { .. } => "FILE_READ_ERROR",
            Error::InvalidHeader { .. } => "INVALID_HEADERS",
            Error::IntraBatchDuplicate { .. } => "BATCH_INTERNAL_DUPLICATE",
            Error::DateEmpty { .. } => "DATE_EMPTY_IN_DUPLICATE",
            Error::DateFormatInvalid { .. } => "DATE_FORMAT_INVALID",
            Error::DuplicateDate { .. } => "DUPLICATE_DATE_SAME",
            Error::RowCountMismatch { .. } => "LANGUAGE_ROW_COUNT_MISMATCH",
            Error::OutputDirCreate { .. } => "DIR_CREATE_ERROR",
            Error::OutputWrite { .. } => "FILE_WRITE_ERROR",
            Error::ReportWrite { .. } => "REPORT_WRITE_ERROR",
            Error::CsvFileMissing { .. } => "CSV_FILE_NOT_FOUND",
            Error::CsvEmptyFile { .. } => "CSV_EMPTY_FILE",
            Error::CsvRead { .. } => "CSV_PARSE_ERROR",
            Error::CsvUnterminatedQuote { .. } => "CSV_UNTERMINATED_QUOTE",
            Error::CsvColumnCount { .. } => "CSV_COLUMN_COUNT_MISMATCH",
            Error::CsvHeaderMismatch { .. } => "CSV_HEADER_MISMATCH",
            Error::CsvNoColumns => "CSV_NO_COLUMNS",
            Error::CsvKeysOnlyInExport { .. } => "CSV_KEYS_ONLY_IN_EXPORT",
            Error::CsvKeysOnlyInOriginal { .. } => "CSV_KEYS_ONLY_IN_ORIGINAL",
            Error::CsvPatternMismatch { .. } => "CSV_PATTERN_MISMATCH",
            Error::DiffFolderIncomplete { .. } => "LEGACY_DIFF_VALIDATION_ERROR",
            Error::DiffNoChanges => "LEGACY_DIFF_NO_CHANGES",
            Error::WorkerPanicked => "UNKNOWN_ERROR",
            Error::Cancelled => "USER_CANCELLED",
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_distinct() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::RegularBatchMissing.is_cancelled());
        assert_eq!(Error::RegularBatchMissing.code(), "BATCH_REGULAR_MISSING");
    }
}
