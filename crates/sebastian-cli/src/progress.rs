use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use sebastian_core::ProgressReporter;
use tracing::warn;

use crate::prompt_confirm;

/// Terminal reporter: one percentage bar per command and an interactive
/// overwrite question unless `assume_yes` is set.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    assume_yes: bool,
}

impl CliReporter {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            assume_yes,
        }
    }

    pub fn start(&self, label: &str) {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} {prefix} [{bar:30.cyan/dim}] {pos:>3}% {msg}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("━╸─")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_prefix(label.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));

        let mut guard = self.bar.lock().unwrap();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    pub fn finish(&self, summary: &str) {
        self.clear();
        eprintln!("  \x1b[32m✓\x1b[0m {}", summary);
    }

    pub fn clear(&self) {
        let mut guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.take() {
            pb.finish_and_clear();
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_progress(&self, percent: u8, message: &str) {
        let guard = self.bar.lock().unwrap();
        if let Some(pb) = guard.as_ref() {
            pb.set_position(u64::from(percent.min(100)));
            pb.set_message(message.to_string());
        }
    }

    fn confirm_overwrite(&self, existing_files: &[String]) -> bool {
        if self.assume_yes {
            return true;
        }
        let guard = self.bar.lock().unwrap();
        let ask = || {
            eprintln!("  These output files already exist:");
            for name in existing_files {
                eprintln!("    {}", name);
            }
            prompt_confirm("Overwrite them?", Some(false))
        };
        let answer = match guard.as_ref() {
            Some(pb) => pb.suspend(ask),
            None => ask(),
        };
        answer.unwrap_or_else(|err| {
            warn!("Could not read the answer: {}", err);
            false
        })
    }
}
