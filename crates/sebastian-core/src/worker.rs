//! Runs a merge on a background thread and turns the reporter callbacks into
//! channel events the starting thread can drain at its own pace.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::debug;

use crate::error::Error;
use crate::merge::{BatchMerger, MergeOutcome, MergeSelection};
use crate::progress::ProgressReporter;

#[derive(Debug)]
pub enum WorkerEvent {
    Progress { percent: u8, message: String },
    /// The worker blocks until `reply` receives an answer. Dropping `reply` declines.
    ConfirmOverwrite {
        files: Vec<String>,
        reply: Sender<bool>,
    },
}

struct ChannelReporter {
    events: Sender<WorkerEvent>,
    cancelled: Arc<AtomicBool>,
}

impl ProgressReporter for ChannelReporter {
    fn on_progress(&self, percent: u8, message: &str) {
        // nobody listening is fine
        let _ = self.events.send(WorkerEvent::Progress {
            percent,
            message: message.to_string(),
        });
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn confirm_overwrite(&self, existing_files: &[String]) -> bool {
        let (reply, answer) = bounded(1);
        let asked = self.events.send(WorkerEvent::ConfirmOverwrite {
            files: existing_files.to_vec(),
            reply,
        });
        if asked.is_err() {
            return false;
        }
        answer.recv().unwrap_or(false)
    }
}

pub struct MergeHandle {
    events: Receiver<WorkerEvent>,
    cancelled: Arc<AtomicBool>,
    thread: JoinHandle<Result<MergeOutcome, Error>>,
}

impl MergeHandle {
    pub fn events(&self) -> &Receiver<WorkerEvent> {
        &self.events
    }

    /// Request cancellation. Takes effect at the next batch boundary.
    pub fn cancel(&self) {
        debug!("Cancellation requested");
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the merge to end. Undrained events are discarded, so a pending
    /// overwrite question counts as declined.
    pub fn join(self) -> Result<MergeOutcome, Error> {
        drop(self.events);
        self.thread.join().map_err(|_| Error::WorkerPanicked)?
    }
}

/// Scan and merge on a dedicated thread.
pub fn spawn_merge(merger: BatchMerger, selection: MergeSelection) -> MergeHandle {
    let (tx, rx) = unbounded();
    let cancelled = Arc::new(AtomicBool::new(false));
    let reporter = ChannelReporter {
        events: tx,
        cancelled: Arc::clone(&cancelled),
    };

    let thread = thread::spawn(move || merger.run(&selection, &reporter));

    MergeHandle {
        events: rx,
        cancelled,
        thread,
    }
}
