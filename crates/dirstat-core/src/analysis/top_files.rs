/// Top-N largest files.
///
/// Works directly on the flat table, so it needs no tree and runs in
/// O(n) average plus O(k log k) for the k results.
use crate::model::{EntryId, EntryTable};

/// A single entry in the "largest files" results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LargestFile {
    pub id: EntryId,
    pub path: String,
    pub size: u64,
}

/// The `n` largest resolved files, largest first. Ties break on path so
/// the result is stable across runs.
pub fn top_files(table: &EntryTable, n: usize) -> Vec<LargestFile> {
    if n == 0 {
        return Vec::new();
    }

    let mut ids: Vec<EntryId> = table
        .iter()
        .filter(|(_, e)| !e.is_dir && !e.is_unresolved())
        .map(|(id, _)| id)
        .collect();

    let by_size_desc = |a: &EntryId, b: &EntryId| {
        let a = table.entry(*a);
        let b = table.entry(*b);
        b.size.cmp(&a.size).then_with(|| a.path.cmp(&b.path))
    };

    if ids.len() > n {
        // Bring the top n to the front, then sort only those.
        ids.select_nth_unstable_by(n - 1, by_size_desc);
        ids.truncate(n);
    }
    ids.sort_unstable_by(by_size_desc);

    ids.into_iter()
        .map(|id| {
            let entry = table.entry(id);
            LargestFile {
                id,
                path: entry.path.clone(),
                size: entry.size,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EntryError;
    use crate::model::Entry;
    use std::path::PathBuf;

    fn table(sizes: &[u64]) -> EntryTable {
        let root = Entry::new_dir("/r".into(), "r".into(), 0);
        let mut table = EntryTable::new(PathBuf::from("/r"), root, sizes.len() + 1);
        for (i, &size) in sizes.iter().enumerate() {
            let mut file = Entry::new_file(format!("/r/f{i}"), format!("f{i}").into(), 1)
                .with_parent(EntryId(0), "/r".into());
            file.size = size;
            table.push(file);
        }
        table
    }

    #[test]
    fn test_top_files_descending() {
        let t = table(&[10, 500, 30, 200, 1]);
        let top = top_files(&t, 3);
        let sizes: Vec<u64> = top.iter().map(|f| f.size).collect();
        assert_eq!(sizes, [500, 200, 30]);
        assert_eq!(top[0].path, "/r/f1");
    }

    #[test]
    fn test_top_files_fewer_than_n() {
        let t = table(&[3, 7]);
        assert_eq!(top_files(&t, 10).len(), 2);
        assert!(top_files(&t, 0).is_empty());
    }

    #[test]
    fn test_unresolved_files_excluded() {
        let mut t = table(&[3, 7]);
        t.entry_mut(EntryId(2)).mark_unresolved(EntryError::Vanished);
        let top = top_files(&t, 5);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].size, 3);
    }
}
