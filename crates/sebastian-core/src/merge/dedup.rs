use std::collections::BTreeSet;

use ahash::AHashMap;
use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::loader::LoadedStreams;
use super::{enter, LanguageRows, MergeStage, Row};
use crate::batch::BatchName;
use crate::error::Error;
use crate::language::Language;

pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// How many offending KEYs an intra-batch duplicate error lists.
pub const MAX_REPORTED_KEYS: usize = 10;

/// One KEY that occurred more than once across batches.
///
/// Indices are zero-based positions in the concatenated EN stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionEntry {
    pub key: String,
    pub kept_index: usize,
    pub kept_date: String,
    pub removed: Vec<(usize, String)>,
}

#[derive(Debug, Clone)]
pub struct DedupResult {
    pub final_rows: LanguageRows,
    pub resolutions: Vec<ResolutionEntry>,
    pub removed_indices: BTreeSet<usize>,
    pub misaligned_rows: usize,
}

/// Sheet row number of a stream index, counting the header as row 1.
pub fn display_row(index: usize) -> usize {
    index + 2
}

/// Parse a `YYYY-MM-DD HH:MM` cell after trimming.
pub fn parse_and_validate_date(value: &str, key: &str, index: usize) -> Result<NaiveDateTime, Error> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::DateEmpty {
            key: key.to_string(),
            row: display_row(index),
        });
    }
    NaiveDateTime::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| Error::DateFormatInvalid {
        key: key.to_string(),
        row: display_row(index),
        value: value.to_string(),
    })
}

/// KEYs that occur more than once inside a single batch slice, in first-seen order.
pub fn find_duplicates_within_batch(rows: &[Row]) -> Vec<String> {
    let mut counts: AHashMap<&str, usize> = AHashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for row in rows {
        let count = counts.entry(row.key.as_str()).or_insert(0);
        if *count == 0 {
            order.push(row.key.as_str());
        }
        *count += 1;
    }
    order
        .into_iter()
        .filter(|k| counts.get(k).copied().unwrap_or(0) > 1)
        .map(str::to_string)
        .collect()
}

/// Phase A: abort on the first batch (in load order) whose own EN rows repeat a KEY.
fn check_intra_batch(en_rows: &[Row], loaded: &LoadedStreams) -> Result<(), Error> {
    let mut start = 0;
    for load in &loaded.batch_loads {
        let count = load.count(Language::MASTER);
        let end = (start + count).min(en_rows.len());
        let duplicates = find_duplicates_within_batch(&en_rows[start..end]);
        if !duplicates.is_empty() {
            return Err(intra_batch_error(load.batch, duplicates));
        }
        start = end;
    }
    Ok(())
}

fn intra_batch_error(batch: BatchName, mut keys: Vec<String>) -> Error {
    let total = keys.len();
    keys.truncate(MAX_REPORTED_KEYS);
    Error::IntraBatchDuplicate { batch, keys, total }
}

/// Phase B: walk the EN stream and pick a winner for every repeated KEY by Date.
fn resolve_cross_batch(
    en_rows: &[Row],
) -> Result<(BTreeSet<usize>, Vec<ResolutionEntry>), Error> {
    // key -> (index, date) of the current winner
    let mut seen: AHashMap<&str, (usize, &str)> = AHashMap::new();
    // key -> position in `resolutions`
    let mut log_index: AHashMap<&str, usize> = AHashMap::new();
    let mut resolutions: Vec<ResolutionEntry> = Vec::new();
    let mut removed = BTreeSet::new();

    for (idx, row) in en_rows.iter().enumerate() {
        let key = row.key.as_str();
        let Some(&(prev_idx, prev_date)) = seen.get(key) else {
            seen.insert(key, (idx, row.date.as_str()));
            continue;
        };

        let prev_parsed = parse_and_validate_date(prev_date, key, prev_idx)?;
        let curr_parsed = parse_and_validate_date(&row.date, key, idx)?;
        if prev_parsed == curr_parsed {
            return Err(Error::DuplicateDate {
                key: key.to_string(),
                date: prev_date.trim().to_string(),
            });
        }

        let (kept_idx, kept_date, lost_idx, lost_date) = if curr_parsed > prev_parsed {
            (idx, row.date.as_str(), prev_idx, prev_date)
        } else {
            (prev_idx, prev_date, idx, row.date.as_str())
        };
        removed.insert(lost_idx);
        seen.insert(key, (kept_idx, kept_date));

        match log_index.get(key) {
            Some(&pos) => {
                let entry = &mut resolutions[pos];
                entry.removed.push((lost_idx, lost_date.to_string()));
                entry.kept_index = kept_idx;
                entry.kept_date = kept_date.to_string();
            }
            None => {
                log_index.insert(key, resolutions.len());
                resolutions.push(ResolutionEntry {
                    key: key.to_string(),
                    kept_index: kept_idx,
                    kept_date: kept_date.to_string(),
                    removed: vec![(lost_idx, lost_date.to_string())],
                });
            }
        }
    }

    Ok((removed, resolutions))
}

fn without_indices(rows: &[Row], removed: &BTreeSet<usize>) -> Vec<Row> {
    rows.iter()
        .enumerate()
        .filter(|(idx, _)| !removed.contains(idx))
        .map(|(_, row)| row.clone())
        .collect()
}

/// Run phases A to C on loaded streams.
///
/// EN decides what goes; every other language drops rows at the same positions
/// and must end with EN's row count.
pub fn remove_duplicate_keys(loaded: &LoadedStreams) -> Result<DedupResult, Error> {
    let en_rows = loaded.rows_for(Language::MASTER);

    enter(MergeStage::DedupIntraBatch);
    check_intra_batch(en_rows, loaded)?;

    enter(MergeStage::DedupCrossBatch);
    let (removed_indices, resolutions) = resolve_cross_batch(en_rows)?;
    debug!(
        "{} duplicate KEY(s), {} row(s) to remove",
        resolutions.len(),
        removed_indices.len()
    );

    enter(MergeStage::DedupMirror);
    let final_en = without_indices(en_rows, &removed_indices);
    let mut final_rows = LanguageRows::new();
    let mut misaligned_rows = 0;

    for lang in Language::ALL.into_iter().filter(|l| !l.is_master()) {
        let mirrored = without_indices(loaded.rows_for(lang), &removed_indices);
        if mirrored.len() != final_en.len() {
            return Err(Error::RowCountMismatch {
                language: lang,
                expected: final_en.len(),
                actual: mirrored.len(),
            });
        }
        let misaligned = mirrored
            .iter()
            .zip(&final_en)
            .filter(|(row, en)| row.key != en.key)
            .count();
        if misaligned > 0 {
            warn!(
                "{}: {} row(s) carry a different KEY than EN at the same position",
                lang, misaligned
            );
            misaligned_rows += misaligned;
        }
        final_rows.insert(lang, mirrored);
    }
    final_rows.insert(Language::MASTER, final_en);

    Ok(DedupResult {
        final_rows,
        resolutions,
        removed_indices,
        misaligned_rows,
    })
}
