//! Quote restoration for CSV files round-tripped through an external editor:
//! a raw-text parser that keeps each field's exact quoting, a structural
//! validator, and the engine that puts the original quoting back.

pub mod parser;
pub mod restore;
pub mod validator;

pub use parser::{analyze_csv_pattern, parse_csv_line_raw, QuotePattern, RawField};
pub use restore::{restore_csv_quotes, RestoreOutcome, RestoreWarning, RestoredField};
pub use validator::{read_csv_table, validate_csv_structure, CsvTable, ValidatedPair};
