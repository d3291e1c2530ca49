//! Snapshot diff: compare two folders of per-language workbooks and list the
//! KEYs whose Target changed on rows already marked as existing.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use ahash::AHashMap;
use chrono::{DateTime, Local};
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::language::Language;
use crate::merge::Row;
use crate::progress::ProgressReporter;
use crate::xlsx::{read_active_sheet, Cell, CellStyle, SheetLayout, Workbook, Worksheet};

/// Only rows with this Status take part in the comparison.
pub const STATUS_EXISTING: &str = "기존";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    pub key: String,
    pub source: String,
    pub target_old: String,
    pub target_new: String,
}

#[derive(Debug, Clone)]
pub struct DiffOutcome {
    pub output_path: PathBuf,
    pub changes: BTreeMap<Language, usize>,
}

impl DiffOutcome {
    pub fn total_changes(&self) -> usize {
        self.changes.values().sum()
    }
}

/// `{YYYYMMDDHHMMSS}_DIFF.xlsx`
pub fn diff_file_name(now: &DateTime<Local>) -> String {
    format!("{}_DIFF.xlsx", now.format("%Y%m%d%H%M%S"))
}

fn modified(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Per language, the `.xlsx` file in `folder` whose name contains `_{LANG}`.
/// When several match, the most recently modified one is used.
pub fn scan_language_files(folder: &Path) -> Result<BTreeMap<Language, PathBuf>, Error> {
    let mut workbooks = Vec::new();
    for entry in fs::read_dir(folder)? {
        let path = entry?.path();
        let is_xlsx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx"));
        if path.is_file() && is_xlsx {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            workbooks.push((name, path));
        }
    }

    let mut files = BTreeMap::new();
    for lang in Language::ALL {
        let needle = format!("_{}", lang);
        let latest = workbooks
            .iter()
            .filter(|(name, _)| name.contains(&needle))
            .max_by_key(|(_, path)| modified(path));
        if let Some((name, path)) = latest {
            debug!("{} in {}: {}", lang, folder.display(), name);
            files.insert(lang, path.clone());
        }
    }
    Ok(files)
}

/// Both folders must hold a file for every language. Returns the file pairs.
pub fn validate_diff_folders(
    old: &Path,
    new: &Path,
) -> Result<BTreeMap<Language, (PathBuf, PathBuf)>, Error> {
    let old_files = complete_language_files(old)?;
    let mut new_files = complete_language_files(new)?;

    Ok(old_files
        .into_iter()
        .filter_map(|(lang, old_path)| new_files.remove(&lang).map(|p| (lang, (old_path, p))))
        .collect())
}

fn complete_language_files(folder: &Path) -> Result<BTreeMap<Language, PathBuf>, Error> {
    let files = scan_language_files(folder)?;
    if files.len() != Language::ALL.len() {
        return Err(Error::DiffFolderIncomplete {
            folder: folder.to_path_buf(),
            found: files.len(),
            missing: Language::ALL
                .into_iter()
                .filter(|l| !files.contains_key(l))
                .collect(),
        });
    }
    Ok(files)
}

fn existing_rows(path: &Path) -> Result<AHashMap<String, Row>, Error> {
    let sheet = read_active_sheet(path).map_err(|source| Error::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(sheet
        .data_rows()
        .map(Row::from_cells)
        .filter(|row| row.has_key() && row.status == STATUS_EXISTING)
        .map(|row| (row.key.clone(), row))
        .collect())
}

/// Targets that changed between two versions of one language file, sorted by KEY.
/// KEYs present on one side only are logged and skipped.
pub fn compare_language_files(old: &Path, new: &Path) -> Result<Vec<DiffEntry>, Error> {
    let old_rows = existing_rows(old)?;
    let new_rows = existing_rows(new)?;

    let only_old = old_rows.keys().filter(|k| !new_rows.contains_key(*k)).count();
    let only_new = new_rows.keys().filter(|k| !old_rows.contains_key(*k)).count();
    if only_old > 0 || only_new > 0 {
        debug!(
            "{} KEY(s) only in {}, {} only in {}",
            only_old,
            old.display(),
            only_new,
            new.display()
        );
    }

    let mut entries: Vec<DiffEntry> = old_rows
        .iter()
        .filter_map(|(key, before)| {
            let after = new_rows.get(key)?;
            (before.target != after.target).then(|| DiffEntry {
                key: key.clone(),
                source: before.source.clone(),
                target_old: before.target.clone(),
                target_new: after.target.clone(),
            })
        })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    Ok(entries)
}

/// Compare every language of two snapshot folders and write the diff workbook.
pub fn legacy_diff(
    old: &Path,
    new: &Path,
    output: &Path,
    reporter: &dyn ProgressReporter,
) -> Result<DiffOutcome, Error> {
    reporter.on_progress(0, "Validating folders...");
    let pairs = validate_diff_folders(old, new)?;

    reporter.on_progress(10, "Comparing files...");
    let mut all_diffs: BTreeMap<Language, Vec<DiffEntry>> = BTreeMap::new();
    let total = pairs.len().max(1);
    for (idx, (lang, (old_path, new_path))) in pairs.iter().enumerate() {
        if reporter.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let diffs = compare_language_files(old_path, new_path)?;
        debug!("{}: {} changed Target(s)", lang, diffs.len());
        all_diffs.insert(*lang, diffs);
        let percent = 10 + ((idx + 1) * 60 / total) as u8;
        reporter.on_progress(percent, &format!("Compared {}", lang));
    }

    let changes: BTreeMap<Language, usize> =
        all_diffs.iter().map(|(l, d)| (*l, d.len())).collect();
    if changes.values().all(|n| *n == 0) {
        warn!("No Target changes between {} and {}", old.display(), new.display());
        return Err(Error::DiffNoChanges);
    }

    reporter.on_progress(75, "Building overview sheet...");
    let (overview, index) = overview_sheet(&all_diffs);
    let mut workbook = Workbook::new();
    workbook.add_sheet(overview);

    reporter.on_progress(85, "Building language sheets...");
    for (lang, diffs) in &all_diffs {
        if !diffs.is_empty() {
            workbook.add_sheet(language_sheet(*lang, diffs, &index));
        }
    }

    reporter.on_progress(95, "Saving file...");
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| Error::OutputDirCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    workbook.save(output).map_err(|source| Error::ReportWrite {
        path: output.to_path_buf(),
        source,
    })?;

    reporter.on_progress(100, "Done");
    let outcome = DiffOutcome {
        output_path: output.to_path_buf(),
        changes,
    };
    info!(
        "Diff written to {} ({} change(s))",
        output.display(),
        outcome.total_changes()
    );
    Ok(outcome)
}

fn overview_sheet(all_diffs: &BTreeMap<Language, Vec<DiffEntry>>) -> (Worksheet, AHashMap<String, usize>) {
    let keys: BTreeSet<&str> = all_diffs
        .values()
        .flatten()
        .map(|d| d.key.as_str())
        .collect();
    let changed: BTreeMap<Language, BTreeSet<&str>> = all_diffs
        .iter()
        .map(|(lang, diffs)| (*lang, diffs.iter().map(|d| d.key.as_str()).collect()))
        .collect();

    let mut widths = vec![8.0, 50.0];
    widths.extend([10.0; 7]);
    let mut sheet = Worksheet::new("Overview").with_layout(SheetLayout {
        data_style: CellStyle::Plain,
        ..SheetLayout::diff_table(widths)
    });

    let mut header = vec!["#".to_string(), "KEY".to_string()];
    header.extend(Language::ALL.iter().map(|l| l.to_string()));
    sheet.push_text_row(&header);

    let mut index = AHashMap::new();
    for (pos, key) in keys.into_iter().enumerate() {
        let number = pos + 1;
        index.insert(key.to_string(), number);
        let mut cells = vec![
            Cell::number(number as f64).styled(CellStyle::Centered),
            Cell::text(key),
        ];
        for lang in Language::ALL {
            let hit = changed.get(&lang).is_some_and(|set| set.contains(key));
            cells.push(if hit {
                Cell::text("O").styled(CellStyle::Marked)
            } else {
                Cell::text("X").styled(CellStyle::Unmarked)
            });
        }
        sheet.push_row(cells);
    }
    (sheet, index)
}

fn language_sheet(lang: Language, diffs: &[DiffEntry], index: &AHashMap<String, usize>) -> Worksheet {
    let mut sheet = Worksheet::new(lang.code()).with_layout(SheetLayout {
        header_style: CellStyle::Header,
        data_row_height: Some(30.0),
        ..SheetLayout::diff_table(vec![16.0, 50.0, 40.0, 40.0, 40.0])
    });
    sheet.push_text_row(&["Overview Index", "KEY", "Source", "Previous Target", "Current Target"]);

    let mut ordered: Vec<&DiffEntry> = diffs.iter().collect();
    ordered.sort_by_key(|d| index.get(&d.key).copied().unwrap_or(0));
    for diff in ordered {
        sheet.push_row(vec![
            Cell::number(index.get(&diff.key).copied().unwrap_or(0) as f64),
            Cell::text(diff.key.as_str()),
            Cell::text(diff.source.as_str()),
            Cell::text(diff.target_old.as_str()),
            Cell::text(diff.target_new.as_str()),
        ]);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_diff_file_name() {
        let now = Local.with_ymd_and_hms(2025, 12, 1, 14, 5, 9).unwrap();
        assert_eq!(diff_file_name(&now), "20251201140509_DIFF.xlsx");
    }

    #[test]
    fn test_scan_language_files_by_code() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "251201_EN.xlsx",
            "251201_PT-BR_REGULAR.xlsx",
            "251201_JA.csv",
            "notes.xlsx",
        ] {
            fs::write(dir.path().join(name), b"").unwrap();
        }
        let files = scan_language_files(dir.path()).unwrap();
        assert_eq!(
            files.keys().copied().collect::<Vec<_>>(),
            vec![Language::En, Language::PtBr]
        );
        assert!(matches!(
            validate_diff_folders(dir.path(), dir.path()),
            Err(Error::DiffFolderIncomplete { found: 2, .. })
        ));
    }
}
