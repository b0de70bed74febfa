/// Path enumeration — the first phase of a scan.
///
/// Walks the tree with `jwalk`'s rayon-backed parallel traversal and records
/// every file and directory below the root. Nothing is sized here.
///
/// # Order independence
///
/// `jwalk` streams entries from several reader threads, so the walk's yield
/// order is not something to lean on. Raw records are buffered while the
/// walk runs and linked afterwards: they are sorted by depth, so every
/// parent is in the table before its children, and any parent that is
/// somehow missing has its ancestor chain synthesised on demand.
use crate::config::ScanOptions;
use crate::error::{EntryError, ScanError};
use crate::model::{normalize_path, Entry, EntryId, EntryTable};
use crate::scanner::progress::{ProgressReporter, ScanProgress};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// One walked path, buffered until the walk completes.
struct WalkRecord {
    path: PathBuf,
    is_dir: bool,
    /// Set when the entry is a directory that could not be listed.
    error: Option<(EntryError, String)>,
}

/// A walk error not attached to any yielded entry.
struct WalkFailure {
    path: Option<PathBuf>,
    error: EntryError,
    message: String,
}

/// Enumerate everything under `root`.
///
/// Fails only if the root itself is missing or cannot be listed. If the
/// scan is cancelled the table holds whatever was walked so far, still
/// fully linked.
pub fn enumerate(
    root: &Path,
    options: &ScanOptions,
    reporter: &ProgressReporter,
) -> Result<EntryTable, ScanError> {
    let start = Instant::now();

    let root_path = dunce::canonicalize(root).map_err(|source| ScanError::RootNotFound {
        path: root.to_path_buf(),
        source,
    })?;
    let meta = fs::metadata(&root_path).map_err(|source| ScanError::RootNotFound {
        path: root_path.clone(),
        source,
    })?;

    if !meta.is_dir() {
        // A single file: the table is just the root.
        let entry = Entry::on_disk(root_path.clone(), 0, false);
        let mut table = EntryTable::new(root_path, entry, 1);
        table.index_children();
        return Ok(table);
    }

    fs::read_dir(&root_path).map_err(|source| ScanError::RootUnreadable {
        path: root_path.clone(),
        source,
    })?;

    let workers = options.effective_workers();
    let parallelism = if workers == 1 {
        jwalk::Parallelism::Serial
    } else {
        jwalk::Parallelism::RayonNewPool(workers)
    };

    let walker = jwalk::WalkDir::new(&root_path)
        .skip_hidden(false)
        .follow_links(options.follow_links)
        .parallelism(parallelism);

    let interval = options.effective_progress_interval();
    let mut records: Vec<WalkRecord> = Vec::with_capacity(4_096);
    let mut failures: Vec<WalkFailure> = Vec::new();
    let mut seen: u64 = 0;
    let mut dirs: u64 = 0;
    let mut files: u64 = 0;

    for entry_result in walker {
        if reporter.is_cancelled() {
            debug!("Enumeration cancelled after {seen} entries");
            break;
        }

        match entry_result {
            Ok(entry) => {
                // The root is created separately.
                if entry.depth == 0 {
                    continue;
                }
                let is_dir = entry.file_type().is_dir();
                let error = entry
                    .read_children_error
                    .as_ref()
                    .map(|err| (classify_walk_error(err), err.to_string()));
                if is_dir {
                    dirs += 1;
                } else {
                    files += 1;
                }
                records.push(WalkRecord {
                    path: entry.path(),
                    is_dir,
                    error,
                });
            }
            Err(err) => {
                failures.push(WalkFailure {
                    path: err.path().map(Path::to_path_buf),
                    error: classify_walk_error(&err),
                    message: err.to_string(),
                });
            }
        }

        seen += 1;
        if seen.is_multiple_of(interval) {
            let current_path = records
                .last()
                .map(|r| normalize_path(&r.path))
                .unwrap_or_default();
            reporter.send(ScanProgress::Enumerated {
                entries: seen,
                dirs,
                files,
                current_path,
            });
        }
    }

    let table = link_records(root_path, records, failures, reporter);

    debug!(
        "Enumeration complete: {} entries ({} walk errors) in {:?}",
        table.len(),
        table.unresolved_count(),
        start.elapsed()
    );
    reporter.send(ScanProgress::Enumerated {
        entries: seen,
        dirs,
        files,
        current_path: String::new(),
    });

    Ok(table)
}

/// Map a walk error onto the per-entry taxonomy.
fn classify_walk_error(err: &jwalk::Error) -> EntryError {
    if err.loop_ancestor().is_some() {
        EntryError::SymlinkLoop
    } else {
        err.io_error()
            .map(EntryError::from_io)
            .unwrap_or(EntryError::Io)
    }
}

/// Turn buffered walk output into a linked table.
fn link_records(
    root_path: PathBuf,
    mut records: Vec<WalkRecord>,
    failures: Vec<WalkFailure>,
    reporter: &ProgressReporter,
) -> EntryTable {
    let root = Entry::on_disk(root_path.clone(), 0, true);
    let mut table = EntryTable::new(root_path.clone(), root, records.len() + 1);

    // Path -> id for everything placed so far. Scan-lifetime only.
    let mut ids: HashMap<PathBuf, EntryId> = HashMap::with_capacity(records.len() + 1);
    ids.insert(root_path.clone(), table.root());

    // Parents before children.
    records.sort_by_key(|r| r.path.components().count());

    for record in records {
        let Some(parent) = parent_id(&mut table, &mut ids, &record.path, &root_path) else {
            warn!("Walked path {} is outside the scan root", record.path.display());
            continue;
        };
        let (parent_path, depth) = {
            let p = table.entry(parent);
            (p.path.clone(), p.depth + 1)
        };

        let mut entry = Entry::on_disk(record.path.clone(), depth, record.is_dir);
        if let Some((error, message)) = record.error {
            reporter.send(ScanProgress::EntryError {
                path: entry.path.clone(),
                error,
                message,
            });
            entry.mark_unresolved(error);
        }
        let id = table.push(entry.with_parent(parent, parent_path));
        ids.insert(record.path, id);
    }

    for failure in failures {
        apply_failure(&mut table, &mut ids, &root_path, failure, reporter);
    }

    table.index_children();
    table
}

/// Record a walk error against the entry it belongs to, adding an error
/// placeholder if the walk never yielded that path at all.
fn apply_failure(
    table: &mut EntryTable,
    ids: &mut HashMap<PathBuf, EntryId>,
    root_path: &Path,
    failure: WalkFailure,
    reporter: &ProgressReporter,
) {
    let Some(path) = failure.path else {
        warn!("Walk error without a path: {}", failure.message);
        return;
    };

    if let Some(&id) = ids.get(&path) {
        if id == table.root() || table.entry(id).is_unresolved() {
            return;
        }
        table.entry_mut(id).mark_unresolved(failure.error);
    } else {
        let Some(parent) = parent_id(table, ids, &path, root_path) else {
            warn!(
                "Walk error outside the scan root at {}: {}",
                path.display(),
                failure.message
            );
            return;
        };
        let (parent_path, depth) = {
            let p = table.entry(parent);
            (p.path.clone(), p.depth + 1)
        };
        // Walk errors are almost always failed directory reads.
        let mut entry = Entry::on_disk(path.clone(), depth, true);
        entry.mark_unresolved(failure.error);
        let id = table.push(entry.with_parent(parent, parent_path));
        ids.insert(path.clone(), id);
    }

    reporter.send(ScanProgress::EntryError {
        path: normalize_path(&path),
        error: failure.error,
        message: failure.message,
    });
}

/// Find the parent of `path`, creating any missing ancestor directories
/// between it and the root. Returns `None` for paths not under the root.
fn parent_id(
    table: &mut EntryTable,
    ids: &mut HashMap<PathBuf, EntryId>,
    path: &Path,
    root_path: &Path,
) -> Option<EntryId> {
    let parent_path = path.parent()?;
    if let Some(&id) = ids.get(parent_path) {
        return Some(id);
    }
    if !parent_path.starts_with(root_path) {
        return None;
    }

    let mut missing: Vec<&Path> = Vec::new();
    let mut current = parent_path;
    while !ids.contains_key(current) {
        missing.push(current);
        current = current.parent()?;
    }

    let mut parent = ids[current];
    for ancestor in missing.into_iter().rev() {
        let (parent_key, depth) = {
            let p = table.entry(parent);
            (p.path.clone(), p.depth + 1)
        };
        let dir =
            Entry::on_disk(ancestor.to_path_buf(), depth, true).with_parent(parent, parent_key);
        let id = table.push(dir);
        ids.insert(ancestor.to_path_buf(), id);
        parent = id;
    }
    Some(parent)
}
