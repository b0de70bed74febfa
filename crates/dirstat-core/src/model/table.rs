/// Flat, arena-backed entry table — the scanner's primary output.
///
/// Entries are appended during enumeration in whatever order the walk yields
/// them. Once the walk is finished, [`EntryTable::index_children`] groups the
/// entries by parent in a single pass; the aggregator and the tree builder
/// both work from that index rather than re-filtering the table per
/// directory.
use super::entry::{Entry, EntryId, SizeState};
use std::path::{Path, PathBuf};

/// The complete set of entries produced by a scan.
#[derive(Debug, Clone)]
pub struct EntryTable {
    root_path: PathBuf,
    root: EntryId,
    entries: Vec<Entry>,
    /// Immediate children per entry, indexed by `EntryId`.
    children: Vec<Vec<EntryId>>,
    max_depth: u32,
}

/// Totals for a scanned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanSummary {
    /// Size of the root entry, i.e. of the whole scanned tree.
    pub total_size: u64,
    pub files: u64,
    /// Directories, including the root when it is one.
    pub dirs: u64,
    /// Entries whose size could not be determined.
    pub unresolved: u64,
    pub max_depth: u32,
}

impl ScanSummary {
    /// `true` when every entry resolved, so `total_size` is exact.
    #[inline]
    pub fn is_exact(&self) -> bool {
        self.unresolved == 0
    }
}

impl EntryTable {
    /// Create a table holding only the root entry.
    ///
    /// `estimated_entries` pre-sizes the arena; it grows if needed.
    pub fn new(root_path: PathBuf, root: Entry, estimated_entries: usize) -> Self {
        let mut entries = Vec::with_capacity(estimated_entries.max(1));
        let max_depth = root.depth;
        entries.push(root);
        Self {
            root_path,
            root: EntryId(0),
            entries,
            children: Vec::new(),
            max_depth,
        }
    }

    /// Append an entry and return its index.
    pub fn push(&mut self, entry: Entry) -> EntryId {
        let id = EntryId::new(self.entries.len());
        self.max_depth = self.max_depth.max(entry.depth);
        self.entries.push(entry);
        id
    }

    /// Group every entry under its parent. Children of each directory are
    /// kept in arena order. Safe to call again after further pushes.
    pub fn index_children(&mut self) {
        let mut children: Vec<Vec<EntryId>> = vec![Vec::new(); self.entries.len()];
        for (i, entry) in self.entries.iter().enumerate() {
            if let Some(parent) = entry.parent {
                children[parent.idx()].push(EntryId::new(i));
            }
        }
        self.children = children;
    }

    /// `true` once the child index covers every entry.
    #[inline]
    pub fn is_indexed(&self) -> bool {
        self.children.len() == self.entries.len()
    }

    /// Immediate children of `id`. Empty until [`index_children`] has run.
    ///
    /// [`index_children`]: EntryTable::index_children
    pub fn children_of(&self, id: EntryId) -> &[EntryId] {
        self.children.get(id.idx()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The scanned path as given (canonicalised).
    #[inline]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    #[inline]
    pub fn root(&self) -> EntryId {
        self.root
    }

    #[inline]
    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.entries[id.idx()]
    }

    #[inline]
    pub fn entry_mut(&mut self, id: EntryId) -> &mut Entry {
        &mut self.entries[id.idx()]
    }

    /// All entries, root first, otherwise in no particular order.
    #[inline]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    #[inline]
    pub(crate) fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    /// Iterate entries with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (EntryId, &Entry)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (EntryId::new(i), e))
    }

    /// Find an entry by its normalised path. Linear scan.
    pub fn find(&self, path: &str) -> Option<EntryId> {
        self.entries
            .iter()
            .position(|e| e.path == path)
            .map(EntryId::new)
    }

    #[inline]
    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    /// Total number of entries, root included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false` — the root entry is present from construction.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries currently marked unresolved.
    pub fn unresolved_count(&self) -> u64 {
        self.entries.iter().filter(|e| e.is_unresolved()).count() as u64
    }

    /// Number of entries still waiting for a size.
    pub fn pending_count(&self) -> u64 {
        self.entries
            .iter()
            .filter(|e| e.state == SizeState::Pending)
            .count() as u64
    }

    pub fn summary(&self) -> ScanSummary {
        let mut summary = ScanSummary {
            total_size: self.entry(self.root).size,
            max_depth: self.max_depth,
            ..ScanSummary::default()
        };
        for entry in &self.entries {
            if entry.is_dir {
                summary.dirs += 1;
            } else {
                summary.files += 1;
            }
            if entry.is_unresolved() {
                summary.unresolved += 1;
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> EntryTable {
        let root = Entry::new_dir("/r".into(), "r".into(), 0);
        let mut table = EntryTable::new(PathBuf::from("/r"), root, 4);
        let dir = table.push(
            Entry::new_dir("/r/d".into(), "d".into(), 1).with_parent(EntryId(0), "/r".into()),
        );
        table.push(
            Entry::new_file("/r/d/a".into(), "a".into(), 2).with_parent(dir, "/r/d".into()),
        );
        table.push(
            Entry::new_file("/r/b".into(), "b".into(), 1).with_parent(EntryId(0), "/r".into()),
        );
        table
    }

    #[test]
    fn test_index_children_groups_by_parent() {
        let mut table = small_table();
        assert!(!table.is_indexed());
        assert!(table.children_of(EntryId(0)).is_empty());

        table.index_children();
        assert!(table.is_indexed());
        assert_eq!(table.children_of(EntryId(0)), &[EntryId(1), EntryId(3)]);
        assert_eq!(table.children_of(EntryId(1)), &[EntryId(2)]);
        assert!(table.children_of(EntryId(2)).is_empty());
    }

    #[test]
    fn test_max_depth_tracks_pushes() {
        let table = small_table();
        assert_eq!(table.max_depth(), 2);
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_find_by_path() {
        let table = small_table();
        assert_eq!(table.find("/r/d/a"), Some(EntryId(2)));
        assert_eq!(table.find("/r/nope"), None);
    }

    #[test]
    fn test_summary_counts() {
        let mut table = small_table();
        table
            .entry_mut(EntryId(3))
            .mark_unresolved(crate::error::EntryError::AccessDenied);
        let summary = table.summary();
        assert_eq!(summary.files, 2);
        assert_eq!(summary.dirs, 2);
        assert_eq!(summary.unresolved, 1);
        assert!(!summary.is_exact());
    }
}
