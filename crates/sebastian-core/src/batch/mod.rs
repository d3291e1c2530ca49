pub mod scanner;
pub mod selection;
pub mod sequence;

pub use scanner::scan_batch_folders;
pub use selection::validate_batch_selection;
pub use sequence::{sort_batches, sort_batches_with_base};

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::language::Language;

/// Highest accepted `EXTRA` suffix.
pub const MAX_EXTRA: u8 = 20;

/// One delivery round: `REGULAR` or `EXTRA0`..`EXTRA20`.
///
/// Ordering is the canonical load order: REGULAR first, then EXTRA by number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BatchName {
    Regular,
    Extra(u8),
}

impl fmt::Display for BatchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchName::Regular => f.write_str("REGULAR"),
            BatchName::Extra(n) => write!(f, "EXTRA{}", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidBatchName(pub String);

impl fmt::Display for InvalidBatchName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not REGULAR or EXTRA0..EXTRA{}", self.0, MAX_EXTRA)
    }
}

impl std::error::Error for InvalidBatchName {}

impl FromStr for BatchName {
    type Err = InvalidBatchName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "REGULAR" {
            return Ok(BatchName::Regular);
        }
        let invalid = || InvalidBatchName(s.to_string());
        let digits = s.strip_prefix("EXTRA").ok_or_else(invalid)?;
        if digits.is_empty() || digits.len() > 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let n: u8 = digits.parse().map_err(|_| invalid())?;
        if n > MAX_EXTRA {
            return Err(invalid());
        }
        Ok(BatchName::Extra(n))
    }
}

/// A scanned batch folder. Immutable once the scan returns.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub name: BatchName,
    /// `YYMMDD` prefix of the folder name.
    pub date: String,
    pub folder: PathBuf,
    /// Languages with exactly one matching file.
    pub files: BTreeMap<Language, PathBuf>,
    pub missing_languages: Vec<Language>,
    /// Languages with more than one matching file, with every candidate file name.
    pub duplicate_languages: BTreeMap<Language, Vec<String>>,
}

impl Batch {
    pub fn is_valid(&self) -> bool {
        self.files.len() == Language::ALL.len() && self.duplicate_languages.is_empty()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn folder_name(&self) -> String {
        self.folder
            .file_name()
            .map(|f| f.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub type BatchMap = BTreeMap<BatchName, Batch>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_name_parse() {
        assert_eq!("REGULAR".parse::<BatchName>().unwrap(), BatchName::Regular);
        assert_eq!("EXTRA0".parse::<BatchName>().unwrap(), BatchName::Extra(0));
        assert_eq!("EXTRA20".parse::<BatchName>().unwrap(), BatchName::Extra(20));
        assert_eq!("EXTRA07".parse::<BatchName>().unwrap(), BatchName::Extra(7));
        assert!("EXTRA21".parse::<BatchName>().is_err());
        assert!("EXTRA".parse::<BatchName>().is_err());
        assert!("EXTRA100".parse::<BatchName>().is_err());
        assert!("regular".parse::<BatchName>().is_err());
    }

    #[test]
    fn test_batch_name_order() {
        let mut names = vec![BatchName::Extra(10), BatchName::Extra(2), BatchName::Regular];
        names.sort();
        assert_eq!(
            names,
            vec![BatchName::Regular, BatchName::Extra(2), BatchName::Extra(10)]
        );
        assert_eq!(BatchName::Extra(3).to_string(), "EXTRA3");
    }
}
