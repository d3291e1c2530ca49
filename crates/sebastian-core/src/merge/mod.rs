//! Batch reconciliation: load the selected batches in sequence, resolve duplicate
//! KEYs against the EN stream, mirror the result onto every language and persist it.

pub mod audit;
pub mod dedup;
pub mod loader;
pub mod persist;
pub mod status;

pub use dedup::{remove_duplicate_keys, DedupResult, ResolutionEntry};
pub use loader::{load_batches, BatchLoad, LoadedStreams};
pub use status::apply_status_completion;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Local};
use tracing::{debug, info};

use crate::batch::{self, BatchMap, BatchName};
use crate::error::Error;
use crate::language::Language;
use crate::progress::ProgressReporter;
use crate::xlsx::Cell;

/// Exact header row every per-language workbook must carry.
pub const HEADER: [&str; 7] = ["Table", "KEY", "Source", "Target", "Status", "NOTE", "Date"];

pub const DEFAULT_OUTPUT_FOLDER: &str = "Output";

/// One data row of a per-language workbook.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    pub table: String,
    pub key: String,
    pub source: String,
    pub target: String,
    pub status: String,
    pub note: String,
    pub date: String,
}

impl Row {
    /// Build from sheet cells. Missing trailing cells read as empty.
    pub fn from_cells(cells: &[Option<String>]) -> Self {
        let get = |idx: usize| cells.get(idx).cloned().flatten().unwrap_or_default();
        Self {
            table: get(0),
            key: get(1),
            source: get(2),
            target: get(3),
            status: get(4),
            note: get(5),
            date: get(6),
        }
    }

    pub fn to_cells(&self) -> Vec<Cell> {
        [
            &self.table,
            &self.key,
            &self.source,
            &self.target,
            &self.status,
            &self.note,
            &self.date,
        ]
        .into_iter()
        .map(Cell::text)
        .collect()
    }

    /// Rows with a blank KEY are filler and never loaded.
    pub fn has_key(&self) -> bool {
        !self.key.trim().is_empty()
    }
}

/// Row streams keyed by language.
pub type LanguageRows = BTreeMap<Language, Vec<Row>>;

/// What the user picked: the batches to merge and the one loaded first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeSelection {
    pub batches: Vec<BatchName>,
    pub base: Option<BatchName>,
}

impl MergeSelection {
    pub fn new(batches: Vec<BatchName>, base: BatchName) -> Self {
        Self {
            batches,
            base: Some(base),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStage {
    Scan,
    Validate,
    Load,
    DedupIntraBatch,
    DedupCrossBatch,
    DedupMirror,
    StatusComplete,
    Persist,
    AuditLog,
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MergeStage::Scan => "scan",
            MergeStage::Validate => "validate selection",
            MergeStage::Load => "load",
            MergeStage::DedupIntraBatch => "intra-batch duplicate check",
            MergeStage::DedupCrossBatch => "cross-batch duplicate resolution",
            MergeStage::DedupMirror => "mirrored removal",
            MergeStage::StatusComplete => "status completion",
            MergeStage::Persist => "persist",
            MergeStage::AuditLog => "audit log",
        };
        f.write_str(name)
    }
}

/// Everything a finished merge produced.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub batch_order: Vec<BatchName>,
    pub batch_loads: Vec<BatchLoad>,
    pub resolutions: Vec<ResolutionEntry>,
    pub final_counts: BTreeMap<Language, usize>,
    pub output_files: BTreeMap<Language, PathBuf>,
    pub log_path: PathBuf,
    /// Positions where a language's KEY differs from EN's after mirrored removal.
    pub misaligned_rows: usize,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl MergeOutcome {
    pub fn removed_rows(&self) -> usize {
        self.resolutions.iter().map(|r| r.removed.len()).sum()
    }
}

pub struct BatchMerger {
    root: PathBuf,
    output_dir: PathBuf,
}

impl BatchMerger {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let output_dir = root.join(DEFAULT_OUTPUT_FOLDER);
        Self { root, output_dir }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scan(&self) -> Result<BatchMap, Error> {
        enter(MergeStage::Scan);
        batch::scan_batch_folders(&self.root)
    }

    /// Scan the root, then merge.
    pub fn run(
        &self,
        selection: &MergeSelection,
        reporter: &dyn ProgressReporter,
    ) -> Result<MergeOutcome, Error> {
        let batches = self.scan()?;
        self.merge(&batches, selection, reporter)
    }

    /// Run every stage after the scan. The first fatal error aborts the rest.
    pub fn merge(
        &self,
        batches: &BatchMap,
        selection: &MergeSelection,
        reporter: &dyn ProgressReporter,
    ) -> Result<MergeOutcome, Error> {
        let started_at = Local::now();
        let timer = Instant::now();

        enter(MergeStage::Validate);
        batch::validate_batch_selection(&selection.batches, selection.base, batches)?;
        let base = selection.base.ok_or(Error::BaseBatchUnset)?;
        let order = batch::sort_batches_with_base(&selection.batches, base);
        info!(
            "Merging {} batch(es) in order {}",
            order.len(),
            order
                .iter()
                .map(|b| b.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        reporter.on_progress(5, "Batch scan complete");

        enter(MergeStage::Load);
        let loaded = loader::load_batches(&order, batches, reporter)?;
        reporter.on_progress(45, "All batches loaded");

        reporter.on_progress(50, "Removing duplicate KEYs...");
        let dedup = dedup::remove_duplicate_keys(&loaded)?;
        reporter.on_progress(75, "Duplicate removal complete");

        enter(MergeStage::StatusComplete);
        reporter.on_progress(78, "Completing statuses...");
        let mut final_rows = dedup.final_rows;
        let recoded = status::apply_status_completion(&mut final_rows);
        debug!("Recoded {} status cell(s)", recoded);
        reporter.on_progress(80, "Status completion done");

        enter(MergeStage::Persist);
        reporter.on_progress(85, "Saving files...");
        let date_prefix = Local::now().format("%y%m%d").to_string();
        let output_files =
            persist::save_merged_batches(&final_rows, &self.output_dir, &date_prefix, reporter)?;

        enter(MergeStage::AuditLog);
        reporter.on_progress(95, "Writing log file...");
        let final_counts: BTreeMap<Language, usize> = final_rows
            .iter()
            .map(|(lang, rows)| (*lang, rows.len()))
            .collect();
        let finished_at = Local::now();
        let report = audit::AuditReport {
            started_at,
            finished_at,
            elapsed: timer.elapsed(),
            root: &self.root,
            batch_order: &order,
            batch_loads: &loaded.batch_loads,
            resolutions: &dedup.resolutions,
            total_rows: loaded.rows_for(Language::MASTER).len(),
            final_counts: &final_counts,
            output_files: &output_files,
        };
        let log_path = audit::write_merge_log(&report, &self.output_dir)?;

        reporter.on_progress(100, "Done");
        info!(
            "Merge finished: {} rows per language, {} duplicate KEY(s) resolved",
            final_counts.get(&Language::MASTER).copied().unwrap_or(0),
            dedup.resolutions.len()
        );

        Ok(MergeOutcome {
            batch_order: order,
            batch_loads: loaded.batch_loads,
            resolutions: dedup.resolutions,
            final_counts,
            output_files,
            log_path,
            misaligned_rows: dedup.misaligned_rows,
            started_at,
            finished_at,
        })
    }
}

pub(crate) fn enter(stage: MergeStage) {
    info!("Stage: {}", stage);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_from_short_cells() {
        let cells = vec![Some("T".to_string()), Some("K1".to_string()), None];
        let row = Row::from_cells(&cells);
        assert_eq!(row.table, "T");
        assert_eq!(row.key, "K1");
        assert_eq!(row.date, "");
        assert!(row.has_key());
        assert_eq!(row.to_cells().len(), 7);
    }

    #[test]
    fn test_blank_key_is_filler() {
        let row = Row::from_cells(&[None, Some("   ".to_string())]);
        assert!(!row.has_key());
    }
}
