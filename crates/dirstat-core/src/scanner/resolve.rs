/// Size resolution — the second phase of a scan.
///
/// Every file entry still `Pending` after enumeration gets one metadata
/// call. The calls are independent and latency-bound, so they run on a
/// bounded rayon pool via `par_iter_mut`: each entry is handed to exactly
/// one worker, which is the only writer of its `size` and `state`.
use crate::config::ScanOptions;
use crate::error::EntryError;
use crate::model::{EntryTable, SizeState};
use crate::scanner::progress::{ProgressReporter, ScanProgress};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::debug;

/// Counters from one resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolveStats {
    /// Files that now carry a real size.
    pub resolved: u64,
    /// Files that could not be stat'ed.
    pub unresolved: u64,
    /// Files left `Pending` because the scan was cancelled.
    pub skipped: u64,
}

/// Resolve the size of every pending file entry in `table`.
///
/// Directories and entries already marked unresolved are left untouched.
/// A failed stat marks that one entry and the pass carries on.
pub fn resolve_sizes(
    table: &mut EntryTable,
    pool: &ThreadPool,
    options: &ScanOptions,
    reporter: &ProgressReporter,
) -> ResolveStats {
    let start = Instant::now();
    let total = table
        .entries()
        .iter()
        .filter(|e| needs_size(e.is_dir, e.state))
        .count() as u64;

    let done = AtomicU64::new(0);
    let failed = AtomicU64::new(0);
    let skipped = AtomicU64::new(0);
    let interval = options.effective_progress_interval();
    let follow_links = options.follow_links;

    pool.install(|| {
        table
            .entries_mut()
            .par_iter_mut()
            .filter(|e| needs_size(e.is_dir, e.state))
            .for_each(|entry| {
                if reporter.is_cancelled() {
                    skipped.fetch_add(1, Ordering::Relaxed);
                    return;
                }

                match probe_size(&entry.fs_path, follow_links) {
                    Ok(size) => {
                        entry.size = size;
                        entry.state = SizeState::Resolved;
                    }
                    Err(err) => {
                        let error = EntryError::from_io(&err);
                        entry.mark_unresolved(error);
                        failed.fetch_add(1, Ordering::Relaxed);
                        reporter.send(ScanProgress::EntryError {
                            path: entry.path.clone(),
                            error,
                            message: err.to_string(),
                        });
                    }
                }

                let n = done.fetch_add(1, Ordering::Relaxed) + 1;
                if n.is_multiple_of(interval) {
                    reporter.send(ScanProgress::Resolved { done: n, total });
                }
            });
    });

    let stats = ResolveStats {
        resolved: done.load(Ordering::Relaxed) - failed.load(Ordering::Relaxed),
        unresolved: failed.load(Ordering::Relaxed),
        skipped: skipped.load(Ordering::Relaxed),
    };
    reporter.send(ScanProgress::Resolved {
        done: stats.resolved + stats.unresolved,
        total,
    });
    debug!(
        "Resolved {} of {} files ({} unresolved, {} skipped) in {:?}",
        stats.resolved,
        total,
        stats.unresolved,
        stats.skipped,
        start.elapsed()
    );
    stats
}

#[inline]
fn needs_size(is_dir: bool, state: SizeState) -> bool {
    !is_dir && state == SizeState::Pending
}

/// On-disk byte size of one entry.
///
/// Without link following a symlink is sized as the link itself. With it,
/// the target is sized, falling back to the link for dangling targets.
fn probe_size(path: &Path, follow_links: bool) -> io::Result<u64> {
    if follow_links {
        if let Ok(meta) = fs::metadata(path) {
            return Ok(meta.len());
        }
    }
    Ok(fs::symlink_metadata(path)?.len())
}
