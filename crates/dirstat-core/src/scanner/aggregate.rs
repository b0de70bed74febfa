/// Level aggregation — the third phase of a scan.
///
/// Directories are grouped by depth once, then processed from the deepest
/// level to the root. By the time a level is reached, every child of every
/// directory on it already has a final size: files were resolved in the
/// previous phase and subdirectories sit one level deeper. No recursion, so
/// tree depth never turns into stack depth.
///
/// Directories on the same level share nothing, so each level is summed in
/// parallel and written back once the whole level is done.
use crate::model::{EntryId, EntryTable, SizeState};
use crate::scanner::progress::{ProgressReporter, ScanProgress};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::time::Instant;
use tracing::debug;

/// Subtree totals for one directory, computed from its immediate children.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Rollup {
    size: u64,
    files: u64,
    unresolved: u64,
}

/// Fill in `size`, `file_count` and `unresolved_below` for every directory.
///
/// `Pending` directories become `Resolved`; directories already marked
/// unresolved (e.g. unlistable) keep that state but still get the partial
/// sum of whatever children they have.
pub fn aggregate(table: &mut EntryTable, pool: &ThreadPool, reporter: &ProgressReporter) {
    let start = Instant::now();

    if !table.is_indexed() {
        table.index_children();
    }

    let levels = directories_by_depth(table);

    for (depth, dirs) in levels.iter().enumerate().rev() {
        if dirs.is_empty() {
            continue;
        }

        let rollups: Vec<(EntryId, Rollup)> = {
            let table = &*table;
            pool.install(|| dirs.par_iter().map(|&id| (id, rollup(table, id))).collect())
        };

        for (id, totals) in rollups {
            let dir = table.entry_mut(id);
            dir.size = totals.size;
            dir.file_count = totals.files;
            dir.unresolved_below = totals.unresolved;
            if dir.state == SizeState::Pending {
                dir.state = SizeState::Resolved;
            }
        }

        reporter.send(ScanProgress::LevelAggregated {
            depth: depth as u32,
            directories: dirs.len(),
        });
    }

    debug!(
        "Aggregated {} levels in {:?}; root size {}",
        levels.len(),
        start.elapsed(),
        table.entry(table.root()).size
    );
}

/// Directory ids bucketed by depth, index = depth.
fn directories_by_depth(table: &EntryTable) -> Vec<Vec<EntryId>> {
    let mut levels: Vec<Vec<EntryId>> = vec![Vec::new(); table.max_depth() as usize + 1];
    for (id, entry) in table.iter() {
        if entry.is_dir {
            levels[entry.depth as usize].push(id);
        }
    }
    levels
}

fn rollup(table: &EntryTable, dir: EntryId) -> Rollup {
    table
        .children_of(dir)
        .iter()
        .map(|&c| table.entry(c))
        .fold(Rollup::default(), |acc, child| Rollup {
            size: acc.size + child.size,
            files: acc.files + child.file_count,
            unresolved: acc.unresolved + child.unresolved_below + child.is_unresolved() as u64,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntryError;
    use crate::model::Entry;
    use std::path::PathBuf;

    fn pool() -> ThreadPool {
        rayon::ThreadPoolBuilder::new()
            .num_threads(2)
            .build()
            .unwrap()
    }

    struct Builder {
        table: EntryTable,
    }

    impl Builder {
        fn new() -> Self {
            let root = Entry::new_dir("/r".into(), "r".into(), 0);
            Self {
                table: EntryTable::new(PathBuf::from("/r"), root, 16),
            }
        }

        fn dir(&mut self, parent: EntryId, name: &str) -> EntryId {
            let (path, depth) = self.child_of(parent, name);
            let parent_path = self.table.entry(parent).path.clone();
            self.table
                .push(Entry::new_dir(path, name.into(), depth).with_parent(parent, parent_path))
        }

        fn file(&mut self, parent: EntryId, name: &str, size: u64) -> EntryId {
            let (path, depth) = self.child_of(parent, name);
            let parent_path = self.table.entry(parent).path.clone();
            let mut entry =
                Entry::new_file(path, name.into(), depth).with_parent(parent, parent_path);
            entry.size = size;
            entry.state = SizeState::Resolved;
            self.table.push(entry)
        }

        fn child_of(&self, parent: EntryId, name: &str) -> (String, u32) {
            let p = self.table.entry(parent);
            (format!("{}/{}", p.path, name), p.depth + 1)
        }

        fn finish(mut self) -> EntryTable {
            self.table.index_children();
            self.table
        }
    }

    #[test]
    fn test_sizes_roll_up_level_by_level() {
        let mut b = Builder::new();
        let root = b.table.root();
        b.file(root, "1.txt", 10);
        b.file(root, "2.txt", 20);
        let three = b.dir(root, "3");
        b.file(three, "4.txt", 5);
        let five = b.dir(three, "5");
        b.file(five, "6.txt", 7);
        let mut table = b.finish();

        aggregate(&mut table, &pool(), &ProgressReporter::silent());

        assert_eq!(table.entry(five).size, 7);
        assert_eq!(table.entry(three).size, 12);
        assert_eq!(table.entry(root).size, 42);
        assert_eq!(table.entry(root).file_count, 4);
        assert_eq!(table.entry(three).state, SizeState::Resolved);
    }

    #[test]
    fn test_empty_directory_is_zero() {
        let mut b = Builder::new();
        let root = b.table.root();
        let empty = b.dir(root, "empty");
        let mut table = b.finish();

        aggregate(&mut table, &pool(), &ProgressReporter::silent());

        assert_eq!(table.entry(empty).size, 0);
        assert_eq!(table.entry(empty).state, SizeState::Resolved);
        assert_eq!(table.entry(root).size, 0);
    }

    #[test]
    fn test_unresolved_entries_are_counted_not_fatal() {
        let mut b = Builder::new();
        let root = b.table.root();
        let a = b.dir(root, "a");
        b.file(a, "ok", 100);
        let bad = b.file(a, "bad", 0);
        let sibling = b.dir(root, "sibling");
        b.file(sibling, "x", 9);
        let mut table = b.finish();
        table.entry_mut(bad).mark_unresolved(EntryError::AccessDenied);

        aggregate(&mut table, &pool(), &ProgressReporter::silent());

        assert_eq!(table.entry(a).size, 100);
        assert_eq!(table.entry(a).unresolved_below, 1);
        assert_eq!(table.entry(sibling).size, 9);
        assert_eq!(table.entry(sibling).unresolved_below, 0);
        assert_eq!(table.entry(root).unresolved_below, 1);
        assert_eq!(table.entry(root).size, 109);
    }

    #[test]
    fn test_unlistable_directory_keeps_its_state() {
        let mut b = Builder::new();
        let root = b.table.root();
        let locked = b.dir(root, "locked");
        let mut table = b.finish();
        table.entry_mut(locked).mark_unresolved(EntryError::AccessDenied);

        aggregate(&mut table, &pool(), &ProgressReporter::silent());

        assert_eq!(
            table.entry(locked).state,
            SizeState::Unresolved(EntryError::AccessDenied)
        );
        assert_eq!(table.entry(root).unresolved_below, 1);
    }

    #[test]
    fn test_reports_each_level_deepest_first() {
        let mut b = Builder::new();
        let root = b.table.root();
        let one = b.dir(root, "one");
        let two = b.dir(one, "two");
        b.file(two, "f", 1);
        let mut table = b.finish();

        let (tx, rx) = crossbeam_channel::unbounded();
        let reporter = ProgressReporter::new(Some(tx), ProgressReporter::silent().cancel_flag());
        aggregate(&mut table, &pool(), &reporter);

        let depths: Vec<u32> = rx
            .try_iter()
            .filter_map(|m| match m {
                ScanProgress::LevelAggregated { depth, .. } => Some(depth),
                _ => None,
            })
            .collect();
        assert_eq!(depths, [2, 1, 0]);
    }
}
