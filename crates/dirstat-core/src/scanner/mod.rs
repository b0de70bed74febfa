/// Scanner module — orchestrates a scan.
///
/// A scan runs four strictly ordered phases over one flat [`EntryTable`]:
///
/// 1. [`enumerate`] — parallel directory walk, no sizes.
/// 2. [`resolve`] — concurrent per-file metadata lookups on a bounded pool.
/// 3. [`aggregate`] — level-by-level roll-up, deepest directories first.
/// 4. Optionally, [`FileTree::from_table`](crate::model::FileTree::from_table)
///    for callers that want a navigable hierarchy.
///
/// Each phase finishes completely before the next starts, which is what
/// lets every entry's `size` be written by exactly one party without locks.
pub mod aggregate;
pub mod enumerate;
pub mod progress;
pub mod resolve;

use crate::config::ScanOptions;
use crate::error::ScanError;
use crate::model::size::format_size;
use crate::model::EntryTable;
use progress::{CancelFlag, ProgressReporter, ScanPhase, ScanProgress};

use crossbeam_channel::{Receiver, Sender};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Instant;
use tracing::{debug, info};

/// Maximum number of progress messages that may queue up in the channel
/// created by [`start_scan`]. Updates beyond this are dropped, never waited on.
pub const PROGRESS_CHANNEL_CAPACITY: usize = 4_096;

/// How a scan ended.
#[derive(Debug, Clone)]
pub enum ScanOutcome {
    /// All phases ran; every directory size is final.
    Complete(EntryTable),
    /// The scan was cancelled. Files keep whatever state they reached and
    /// directories are left unaggregated, so totals must not be trusted.
    Cancelled(EntryTable),
}

impl ScanOutcome {
    #[inline]
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete(_))
    }

    pub fn table(&self) -> &EntryTable {
        match self {
            Self::Complete(table) | Self::Cancelled(table) => table,
        }
    }

    pub fn into_table(self) -> EntryTable {
        match self {
            Self::Complete(table) | Self::Cancelled(table) => table,
        }
    }
}

/// Runs scans with a fixed set of options, progress sink and cancel flag.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    options: ScanOptions,
    reporter: ProgressReporter,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            reporter: ProgressReporter::silent(),
        }
    }

    /// Send progress messages to `tx` while scanning.
    pub fn with_progress(mut self, tx: Sender<ScanProgress>) -> Self {
        self.reporter.set_sink(tx);
        self
    }

    /// Share an existing cancel flag instead of the scanner's own.
    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.reporter.set_cancel_flag(cancel);
        self
    }

    /// The flag that stops this scanner's scans when set.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.reporter.cancel_flag()
    }

    #[inline]
    pub fn options(&self) -> &ScanOptions {
        &self.options
    }

    /// Scan `root` on the calling thread, using worker pools for the I/O.
    ///
    /// Returns `Err` only when the root is missing/unlistable or a pool
    /// cannot be built. Per-entry failures are recorded in the table.
    pub fn scan(&self, root: &Path) -> Result<ScanOutcome, ScanError> {
        let start = Instant::now();
        let workers = self.options.effective_workers();
        info!("Starting scan of {} with {workers} workers", root.display());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("dirstat-io-{i}"))
            .build()?;

        self.reporter.send(ScanProgress::Phase(ScanPhase::Enumerating));
        let mut table = enumerate::enumerate(root, &self.options, &self.reporter)?;
        if self.reporter.is_cancelled() {
            return Ok(self.cancelled(table, ScanPhase::Enumerating));
        }

        self.reporter.send(ScanProgress::Phase(ScanPhase::Resolving));
        resolve::resolve_sizes(&mut table, &pool, &self.options, &self.reporter);
        if self.reporter.is_cancelled() {
            return Ok(self.cancelled(table, ScanPhase::Resolving));
        }

        self.reporter.send(ScanProgress::Phase(ScanPhase::Aggregating));
        aggregate::aggregate(&mut table, &pool, &self.reporter);

        let duration = start.elapsed();
        let summary = table.summary();
        info!(
            "Scan of {} complete: {} files, {} dirs, {}, {} unresolved in {:?}",
            table.root_path().display(),
            summary.files,
            summary.dirs,
            format_size(summary.total_size),
            summary.unresolved,
            duration
        );
        self.reporter
            .send(ScanProgress::Complete { duration, summary });

        Ok(ScanOutcome::Complete(table))
    }

    fn cancelled(&self, table: EntryTable, phase: ScanPhase) -> ScanOutcome {
        info!("Scan cancelled during {phase:?} with {} entries", table.len());
        self.reporter.send(ScanProgress::Cancelled { phase });
        ScanOutcome::Cancelled(table)
    }
}

/// Handle to a scan running on a background thread.
pub struct ScanHandle {
    /// Receiver for progress updates. Disconnects when the scan thread ends.
    pub progress_rx: Receiver<ScanProgress>,
    cancel_flag: CancelFlag,
    thread: thread::JoinHandle<Result<ScanOutcome, ScanError>>,
}

impl ScanHandle {
    /// Request the scan to stop as soon as possible.
    pub fn cancel(&self) {
        self.cancel_flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    /// `true` once the scan thread has returned.
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the scan and take its result.
    pub fn join(self) -> Result<ScanOutcome, ScanError> {
        self.thread
            .join()
            .map_err(|_| ScanError::ScanThreadPanicked)?
    }
}

/// Start a scan of `root_path` on a named background thread.
pub fn start_scan(root_path: PathBuf, options: ScanOptions) -> Result<ScanHandle, ScanError> {
    let (progress_tx, progress_rx) =
        crossbeam_channel::bounded::<ScanProgress>(PROGRESS_CHANNEL_CAPACITY);
    let scanner = Scanner::new(options).with_progress(progress_tx);
    let cancel_flag = scanner.cancel_flag();

    let thread = thread::Builder::new()
        .name("dirstat-scanner".into())
        .spawn(move || {
            debug!("Scanner thread started for {}", root_path.display());
            scanner.scan(&root_path)
        })
        .map_err(ScanError::Spawn)?;

    Ok(ScanHandle {
        progress_rx,
        cancel_flag,
        thread,
    })
}
