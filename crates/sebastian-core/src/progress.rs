/// Two-way boundary between a running pipeline and whoever started it.
///
/// CLI implements with indicatif and a terminal prompt, the background worker
/// implements it over a channel. All methods have default implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_progress(&self, _percent: u8, _message: &str) {}

    /// Polled at batch granularity; a `true` aborts with `Error::Cancelled`.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Asked once when output files already exist. Declining cancels the run.
    fn confirm_overwrite(&self, _existing_files: &[String]) -> bool {
        true
    }
}

/// No-op progress reporter for silent operation. Never cancels, always overwrites.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
