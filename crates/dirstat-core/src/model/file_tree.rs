/// Navigable tree view over a scanned [`EntryTable`].
///
/// All nodes live in a single `Vec<TreeNode>`. Relationships use
/// `NodeIndex` (a thin `u32` wrapper) rather than heap pointers: a parent
/// owns its ordered child list, and each child keeps a plain index back to
/// its parent for upward traversal.
///
/// The tree is built from the flat table in one grouping pass, so
/// construction never recurses and never re-scans the table per directory.
use super::entry::SizeState;
use super::table::EntryTable;
use compact_str::CompactString;

/// Lightweight index into the tree arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeIndex(pub u32);

impl NodeIndex {
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "NodeIndex overflow");
        Self(index as u32)
    }

    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// A single file or directory in the tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: CompactString,
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    pub state: SizeState,
    pub depth: u32,

    /// Files in this subtree (1 for a file).
    pub file_count: u64,

    /// Parent node. `None` only for the root.
    pub parent: Option<NodeIndex>,

    /// Children ordered by name.
    pub children: Vec<NodeIndex>,
}

/// Hierarchy built from a scanned table.
#[derive(Debug, Clone)]
pub struct FileTree {
    nodes: Vec<TreeNode>,
    root: NodeIndex,
}

impl FileTree {
    /// Build the tree from a sized table.
    ///
    /// Node indices match entry ids one to one. Children are attached by a
    /// single pass over all entries grouped by parent, then each child list
    /// is sorted by name so that [`NodeRef::lookup`] can binary search.
    pub fn from_table(table: &EntryTable) -> Self {
        let mut nodes: Vec<TreeNode> = table
            .entries()
            .iter()
            .map(|entry| TreeNode {
                name: entry.name.clone(),
                path: entry.path.clone(),
                size: entry.size,
                is_dir: entry.is_dir,
                state: entry.state,
                depth: entry.depth,
                file_count: entry.file_count,
                parent: entry.parent.map(|p| NodeIndex(p.0)),
                children: Vec::new(),
            })
            .collect();

        for i in 0..nodes.len() {
            if let Some(parent) = nodes[i].parent {
                nodes[parent.idx()].children.push(NodeIndex::new(i));
            }
        }

        for i in 0..nodes.len() {
            if nodes[i].children.len() < 2 {
                continue;
            }
            let mut children = std::mem::take(&mut nodes[i].children);
            children.sort_unstable_by(|a, b| nodes[a.idx()].name.cmp(&nodes[b.idx()].name));
            nodes[i].children = children;
        }

        Self {
            nodes,
            root: NodeIndex::new(table.root().idx()),
        }
    }

    /// The node representing the scanned path itself.
    #[inline]
    pub fn root(&self) -> NodeRef<'_> {
        self.get(self.root)
    }

    #[inline]
    pub fn get(&self, index: NodeIndex) -> NodeRef<'_> {
        NodeRef { tree: self, index }
    }

    #[inline]
    pub fn node(&self, index: NodeIndex) -> &TreeNode {
        &self.nodes[index.idx()]
    }

    /// Depth-first traversal of the whole tree.
    pub fn traverse(&self) -> Traverse<'_> {
        self.root().traverse()
    }

    /// Resolve a `/`-separated path, either relative to the root or absolute
    /// and under the root path. Empty and `.` components are ignored.
    pub fn lookup_path(&self, path: &str) -> Option<NodeRef<'_>> {
        let root = self.root();
        let relative = match path.strip_prefix(root.path()) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') || root.path().ends_with('/') => {
                rest
            }
            _ => path,
        };
        root.lookup(
            relative
                .split('/')
                .filter(|component| !component.is_empty() && *component != "."),
        )
    }

    /// Direct children of a node, directories first, then by size descending.
    pub fn children_sorted_by_size(&self, parent: NodeIndex) -> Vec<NodeIndex> {
        let mut children = self.nodes[parent.idx()].children.clone();
        children.sort_unstable_by(|a, b| {
            let a_node = &self.nodes[a.idx()];
            let b_node = &self.nodes[b.idx()];
            b_node
                .is_dir
                .cmp(&a_node.is_dir)
                .then(b_node.size.cmp(&a_node.size))
        });
        children
    }

    /// Total number of nodes in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Borrowed handle to one node, carrying the tree so it can navigate.
#[derive(Debug, Clone, Copy)]
pub struct NodeRef<'a> {
    tree: &'a FileTree,
    index: NodeIndex,
}

impl<'a> NodeRef<'a> {
    #[inline]
    pub fn index(self) -> NodeIndex {
        self.index
    }

    #[inline]
    pub fn node(self) -> &'a TreeNode {
        self.tree.node(self.index)
    }

    #[inline]
    pub fn name(self) -> &'a str {
        self.node().name.as_str()
    }

    #[inline]
    pub fn path(self) -> &'a str {
        &self.node().path
    }

    #[inline]
    pub fn size(self) -> u64 {
        self.node().size
    }

    #[inline]
    pub fn is_dir(self) -> bool {
        self.node().is_dir
    }

    #[inline]
    pub fn state(self) -> SizeState {
        self.node().state
    }

    pub fn parent(self) -> Option<NodeRef<'a>> {
        self.node().parent.map(|p| self.tree.get(p))
    }

    /// Immediate children in name order.
    pub fn children(self) -> impl ExactSizeIterator<Item = NodeRef<'a>> + 'a {
        let tree = self.tree;
        self.node().children.iter().map(move |&c| tree.get(c))
    }

    /// Lazy depth-first pre-order walk starting at (and including) this node.
    ///
    /// Each call starts a fresh walk; the tree itself is never modified.
    pub fn traverse(self) -> Traverse<'a> {
        Traverse {
            tree: self.tree,
            stack: vec![self.index],
        }
    }

    /// Follow `components` down from this node, one name per level.
    ///
    /// Returns `None` as soon as a component has no matching child.
    pub fn lookup<I, S>(self, components: I) -> Option<NodeRef<'a>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut current = self;
        for component in components {
            let wanted = component.as_ref();
            let children = &current.node().children;
            let pos = children
                .binary_search_by(|c| self.tree.node(*c).name.as_str().cmp(wanted))
                .ok()?;
            current = self.tree.get(children[pos]);
        }
        Some(current)
    }
}

/// Depth-first iterator returned by [`NodeRef::traverse`].
///
/// Uses an explicit stack so very deep trees cannot overflow the call stack.
#[derive(Debug, Clone)]
pub struct Traverse<'a> {
    tree: &'a FileTree,
    stack: Vec<NodeIndex>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = NodeRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        // Reverse so the first child is popped next.
        self.stack
            .extend(self.tree.node(index).children.iter().rev().copied());
        Some(self.tree.get(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Entry, EntryId};
    use std::path::PathBuf;

    /// ```text
    /// /r
    ///   zeta/
    ///     inner.bin (5)
    ///   alpha.txt   (10)
    ///   mid.txt     (40)
    /// ```
    fn sample_table() -> EntryTable {
        let mut root = Entry::new_dir("/r".into(), "r".into(), 0);
        root.size = 55;
        let mut table = EntryTable::new(PathBuf::from("/r"), root, 8);

        let mut zeta = Entry::new_dir("/r/zeta".into(), "zeta".into(), 1)
            .with_parent(EntryId(0), "/r".into());
        zeta.size = 5;
        let zeta = table.push(zeta);

        let mut inner = Entry::new_file("/r/zeta/inner.bin".into(), "inner.bin".into(), 2)
            .with_parent(zeta, "/r/zeta".into());
        inner.size = 5;
        table.push(inner);

        let mut alpha = Entry::new_file("/r/alpha.txt".into(), "alpha.txt".into(), 1)
            .with_parent(EntryId(0), "/r".into());
        alpha.size = 10;
        table.push(alpha);

        let mut mid = Entry::new_file("/r/mid.txt".into(), "mid.txt".into(), 1)
            .with_parent(EntryId(0), "/r".into());
        mid.size = 40;
        table.push(mid);

        table
    }

    #[test]
    fn test_children_are_name_ordered() {
        let tree = FileTree::from_table(&sample_table());
        let names: Vec<&str> = tree.root().children().map(|c| c.name()).collect();
        assert_eq!(names, ["alpha.txt", "mid.txt", "zeta"]);
    }

    #[test]
    fn test_parent_back_reference() {
        let tree = FileTree::from_table(&sample_table());
        let inner = tree.lookup_path("zeta/inner.bin").unwrap();
        assert_eq!(inner.parent().unwrap().name(), "zeta");
        assert_eq!(inner.parent().unwrap().parent().unwrap().path(), "/r");
        assert!(tree.root().parent().is_none());
    }

    #[test]
    fn test_traverse_is_preorder_and_restartable() {
        let tree = FileTree::from_table(&sample_table());
        let first: Vec<&str> = tree.traverse().map(|n| n.name()).collect();
        assert_eq!(first, ["r", "alpha.txt", "mid.txt", "zeta", "inner.bin"]);

        let second: Vec<&str> = tree.traverse().map(|n| n.name()).collect();
        assert_eq!(first, second);

        let zeta = tree.lookup_path("zeta").unwrap();
        let sub: Vec<&str> = zeta.traverse().map(|n| n.name()).collect();
        assert_eq!(sub, ["zeta", "inner.bin"]);
    }

    #[test]
    fn test_lookup_components() {
        let tree = FileTree::from_table(&sample_table());
        let found = tree.root().lookup(["zeta", "inner.bin"]).unwrap();
        assert_eq!(found.size(), 5);
        assert!(tree.root().lookup(["zeta", "missing"]).is_none());
        assert!(tree.root().lookup(["alpha.txt", "below-a-file"]).is_none());
        assert_eq!(tree.root().lookup(Vec::<&str>::new()).unwrap().path(), "/r");
    }

    #[test]
    fn test_lookup_path_absolute_and_relative() {
        let tree = FileTree::from_table(&sample_table());
        assert_eq!(tree.lookup_path("/r/mid.txt").unwrap().size(), 40);
        assert_eq!(tree.lookup_path("./mid.txt").unwrap().size(), 40);
        assert_eq!(tree.lookup_path("/r").unwrap().size(), 55);
        // A sibling whose name merely starts with the root path is not under it.
        assert!(tree.lookup_path("/rx/mid.txt").is_none());
    }

    #[test]
    fn test_children_sorted_by_size() {
        let tree = FileTree::from_table(&sample_table());
        let sorted = tree.children_sorted_by_size(tree.root().index());
        let names: Vec<&str> = sorted.iter().map(|&i| tree.get(i).name()).collect();
        // Directory first, then the bigger file.
        assert_eq!(names, ["zeta", "mid.txt", "alpha.txt"]);
    }
}
