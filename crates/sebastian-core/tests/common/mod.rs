#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use sebastian_core::merge::HEADER;
use sebastian_core::xlsx::{Cell, SheetLayout, Workbook, Worksheet};
use sebastian_core::{Language, ProgressReporter};

pub const BATCH_DATE: &str = "251126";

/// One test row: KEY, Status, Date. Table/Source/Target/NOTE are derived.
#[derive(Debug, Clone)]
pub struct Entry {
    pub key: &'static str,
    pub status: &'static str,
    pub date: &'static str,
}

pub fn entry(key: &'static str, date: &'static str) -> Entry {
    Entry {
        key,
        status: "번역필요",
        date,
    }
}

pub fn target_for(lang: Language, key: &str, batch: &str) -> String {
    format!("{}:{}:{}", lang, key, batch)
}

pub fn write_sheet(path: &Path, header: &[&str], rows: &[Vec<String>]) {
    let mut sheet = Worksheet::new("Sheet1").with_layout(SheetLayout::language_table());
    sheet.push_text_row(header);
    for row in rows {
        sheet.push_row(row.iter().map(|v| Cell::text(v.as_str())).collect());
    }
    let mut workbook = Workbook::new();
    workbook.add_sheet(sheet);
    workbook.save(path).unwrap();
}

pub fn rows_for(lang: Language, label: &str, entries: &[Entry]) -> Vec<Vec<String>> {
    entries
        .iter()
        .map(|s| {
            vec![
                "UI".to_string(),
                s.key.to_string(),
                format!("source {}", s.key),
                target_for(lang, s.key, label),
                s.status.to_string(),
                String::new(),
                s.date.to_string(),
            ]
        })
        .collect()
}

/// `{root}/{date}_{label}/{date}_{LANG}_{label}.xlsx` for every language.
pub fn make_batch(root: &Path, date: &str, label: &str, entries: &[Entry]) -> PathBuf {
    let folder = root.join(format!("{}_{}", date, label));
    fs::create_dir_all(&folder).unwrap();
    for lang in Language::ALL {
        write_language(&folder, date, label, lang, &rows_for(lang, label, entries));
    }
    folder
}

pub fn write_language(folder: &Path, date: &str, label: &str, lang: Language, rows: &[Vec<String>]) {
    let path = folder.join(format!("{}_{}_{}.xlsx", date, lang, label));
    write_sheet(&path, &HEADER, rows);
}

/// Reporter that records progress and answers overwrite questions with a fixed reply.
pub struct RecordingReporter {
    pub percents: Mutex<Vec<u8>>,
    pub asked: Mutex<Vec<Vec<String>>>,
    pub allow_overwrite: bool,
    pub cancelled: AtomicBool,
    /// Report cancellation once `is_cancelled` has been asked more than this many times.
    pub cancel_after_checks: Option<usize>,
    checks: AtomicUsize,
}

impl RecordingReporter {
    pub fn new(allow_overwrite: bool) -> Self {
        Self {
            percents: Mutex::new(Vec::new()),
            asked: Mutex::new(Vec::new()),
            allow_overwrite,
            cancelled: AtomicBool::new(false),
            cancel_after_checks: None,
            checks: AtomicUsize::new(0),
        }
    }

    pub fn cancelling_after(checks: usize) -> Self {
        Self {
            cancel_after_checks: Some(checks),
            ..Self::new(true)
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl ProgressReporter for RecordingReporter {
    fn on_progress(&self, percent: u8, _message: &str) {
        self.percents.lock().unwrap().push(percent);
    }

    fn is_cancelled(&self) -> bool {
        let seen = self.checks.fetch_add(1, Ordering::SeqCst) + 1;
        self.cancelled.load(Ordering::SeqCst)
            || self.cancel_after_checks.is_some_and(|limit| seen > limit)
    }

    fn confirm_overwrite(&self, existing_files: &[String]) -> bool {
        self.asked.lock().unwrap().push(existing_files.to_vec());
        self.allow_overwrite
    }
}
