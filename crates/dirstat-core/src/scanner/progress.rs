/// Scan progress reporting — lightweight messages sent from the scan
/// pipeline to whoever is watching, via a crossbeam channel.
///
/// The pipeline never blocks on the channel: updates are sent with
/// `try_send`, so a full or abandoned receiver simply misses messages. The
/// authoritative result is always the value returned by the scan itself.
use crate::error::EntryError;
use crate::model::ScanSummary;
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared cancellation flag. Set it to `true` to stop a running scan.
pub type CancelFlag = Arc<AtomicBool>;

/// Pipeline stage a progress message refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Enumerating,
    Resolving,
    Aggregating,
}

/// Progress updates emitted during a scan.
#[derive(Debug, Clone)]
pub enum ScanProgress {
    /// A new phase has started.
    Phase(ScanPhase),
    /// Periodic enumeration update with running totals.
    Enumerated {
        entries: u64,
        dirs: u64,
        files: u64,
        current_path: String,
    },
    /// Periodic size-resolution update.
    Resolved { done: u64, total: u64 },
    /// Every directory at `depth` now has its final size.
    LevelAggregated { depth: u32, directories: usize },
    /// A non-fatal, per-entry failure.
    EntryError {
        path: String,
        error: EntryError,
        message: String,
    },
    /// Scan finished with all phases run.
    Complete {
        duration: Duration,
        summary: ScanSummary,
    },
    /// Scan stopped early at the given phase.
    Cancelled { phase: ScanPhase },
}

/// Handed to every phase: the optional progress sink plus the cancel flag.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Option<Sender<ScanProgress>>,
    cancel: CancelFlag,
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::silent()
    }
}

impl ProgressReporter {
    pub fn new(tx: Option<Sender<ScanProgress>>, cancel: CancelFlag) -> Self {
        Self { tx, cancel }
    }

    /// A reporter with no sink and a fresh, unset cancel flag.
    pub fn silent() -> Self {
        Self::new(None, Arc::new(AtomicBool::new(false)))
    }

    /// Send a message if a sink is attached. Never blocks.
    #[inline]
    pub fn send(&self, message: ScanProgress) {
        if let Some(tx) = &self.tx {
            let _ = tx.try_send(message);
        }
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub(crate) fn set_sink(&mut self, tx: Sender<ScanProgress>) {
        self.tx = Some(tx);
    }

    pub(crate) fn set_cancel_flag(&mut self, cancel: CancelFlag) {
        self.cancel = cancel;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_never_blocks_when_full() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let reporter = ProgressReporter::new(Some(tx), Arc::new(AtomicBool::new(false)));
        reporter.send(ScanProgress::Phase(ScanPhase::Enumerating));
        reporter.send(ScanProgress::Phase(ScanPhase::Resolving));
        assert!(matches!(
            rx.try_recv(),
            Ok(ScanProgress::Phase(ScanPhase::Enumerating))
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_cancel_flag_is_shared() {
        let reporter = ProgressReporter::silent();
        let flag = reporter.cancel_flag();
        assert!(!reporter.is_cancelled());
        flag.store(true, Ordering::Relaxed);
        assert!(reporter.is_cancelled());
    }
}
