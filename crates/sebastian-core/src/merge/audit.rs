use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use tracing::info;

use super::dedup::{display_row, ResolutionEntry};
use super::loader::BatchLoad;
use crate::batch::BatchName;
use crate::error::Error;
use crate::language::Language;

const TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Inputs for the plain-text merge log.
pub struct AuditReport<'a> {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub elapsed: Duration,
    pub root: &'a Path,
    pub batch_order: &'a [BatchName],
    pub batch_loads: &'a [BatchLoad],
    pub resolutions: &'a [ResolutionEntry],
    /// EN rows loaded before deduplication.
    pub total_rows: usize,
    pub final_counts: &'a BTreeMap<Language, usize>,
    pub output_files: &'a BTreeMap<Language, PathBuf>,
}

pub fn log_file_name(started_at: &DateTime<Local>) -> String {
    format!("merge_batches_log_{}.txt", started_at.format("%y%m%d%H%M%S"))
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `Nm Ss` when a minute or more has passed, `Ss` otherwise.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (minutes, seconds) = (secs / 60, secs % 60);
    if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}

pub fn render_merge_log(report: &AuditReport<'_>) -> String {
    let mut out = String::new();
    let total_batches = report.batch_order.len();

    let _ = writeln!(out, "=== Merge Batches Execution Log ===");
    let _ = writeln!(out, "Started: {}", report.started_at.format(TIMESTAMP));
    let _ = writeln!(out, "Root folder: {}", report.root.display());
    let _ = writeln!(
        out,
        "Batch order: {}",
        report
            .batch_order
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    let _ = writeln!(out);

    for (idx, load) in report.batch_loads.iter().enumerate() {
        let _ = writeln!(out, "[{}/{}] {} batch", idx + 1, total_batches, load.batch);
        let verb = if idx == 0 { "read" } else { "appended" };
        for (lang, count) in &load.counts {
            let _ = writeln!(out, "  - {}: {} rows {}", lang, group_thousands(*count), verb);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(out, "[Duplicate KEY removal]");
    if report.resolutions.is_empty() {
        let _ = writeln!(out, "No duplicate KEYs found");
        let _ = writeln!(out);
    } else {
        let _ = writeln!(out, "Duplicate KEYs found: {}", report.resolutions.len());
        let _ = writeln!(out);
        for (idx, entry) in report.resolutions.iter().enumerate() {
            let _ = writeln!(out, "  {}. KEY: {}", idx + 1, entry.key);
            for (row, date) in &entry.removed {
                let _ = writeln!(out, "     - removed: {} (row {})", date, display_row(*row));
            }
            let _ = writeln!(
                out,
                "     - kept: {} (row {})",
                entry.kept_date,
                display_row(entry.kept_index)
            );
            let _ = writeln!(out);
        }
    }

    let removed: usize = report.resolutions.iter().map(|r| r.removed.len()).sum();
    let _ = writeln!(out, "[Final statistics]");
    let _ = writeln!(out, "  Rows loaded: {}", group_thousands(report.total_rows));
    let _ = writeln!(out, "  Rows removed: {}", group_thousands(removed));
    let _ = writeln!(out, "  Duplicate KEYs: {}", report.resolutions.len());
    for (lang, count) in report.final_counts {
        let _ = writeln!(
            out,
            "  Final rows {}: {} (header excluded)",
            lang,
            group_thousands(*count)
        );
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "[Output files]");
    for (lang, path) in report.output_files {
        let count = report.final_counts.get(lang).copied().unwrap_or(0);
        let _ = writeln!(out, "  - {} ({} rows)", path.display(), group_thousands(count));
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Finished: {}", report.finished_at.format(TIMESTAMP));
    let _ = writeln!(out, "Elapsed: {}", format_elapsed(report.elapsed));
    let _ = writeln!(out);
    out.push_str(&"=".repeat(50));
    out
}

/// Write the log into `dir`, named after the run's start time.
pub fn write_merge_log(report: &AuditReport<'_>, dir: &Path) -> Result<PathBuf, Error> {
    let path = dir.join(log_file_name(&report.started_at));
    fs::write(&path, render_merge_log(report))?;
    info!("Merge log written to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(Duration::from_secs(42)), "42s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_sections_in_order() {
        let started = Local.with_ymd_and_hms(2025, 11, 26, 9, 30, 5).unwrap();
        let order = [BatchName::Regular, BatchName::Extra(0)];
        let loads = vec![
            BatchLoad {
                batch: BatchName::Regular,
                counts: [(Language::En, 1200)].into_iter().collect(),
            },
            BatchLoad {
                batch: BatchName::Extra(0),
                counts: [(Language::En, 3)].into_iter().collect(),
            },
        ];
        let resolutions = vec![ResolutionEntry {
            key: "K1".to_string(),
            kept_index: 1200,
            kept_date: "2025-01-02 09:00".to_string(),
            removed: vec![(0, "2025-01-01 10:00".to_string())],
        }];
        let finals: BTreeMap<Language, usize> = [(Language::En, 1202)].into_iter().collect();
        let outputs: BTreeMap<Language, PathBuf> =
            [(Language::En, PathBuf::from("Output/251126_EN.xlsx"))]
                .into_iter()
                .collect();
        let report = AuditReport {
            started_at: started,
            finished_at: started,
            elapsed: Duration::from_secs(61),
            root: Path::new("/data"),
            batch_order: &order,
            batch_loads: &loads,
            resolutions: &resolutions,
            total_rows: 1203,
            final_counts: &finals,
            output_files: &outputs,
        };

        let text = render_merge_log(&report);
        let positions: Vec<usize> = [
            "=== Merge Batches Execution Log ===",
            "Batch order: REGULAR, EXTRA0",
            "[1/2] REGULAR batch",
            "[2/2] EXTRA0 batch",
            "[Duplicate KEY removal]",
            "[Final statistics]",
            "[Output files]",
            "Elapsed: 1m 1s",
        ]
        .iter()
        .map(|needle| text.find(needle).unwrap_or_else(|| panic!("missing {}", needle)))
        .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("  - EN: 1,200 rows read"));
        assert!(text.contains("     - removed: 2025-01-01 10:00 (row 2)"));
        assert!(text.contains("     - kept: 2025-01-02 09:00 (row 1202)"));
        assert!(text.ends_with(&"=".repeat(50)));
        assert_eq!(log_file_name(&started), "merge_batches_log_251126093005.txt");
    }
}
