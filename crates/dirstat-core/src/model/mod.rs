/// Data model for dirstat.
///
/// Re-exports the flat entry table produced by the scanner, the tree view
/// built on top of it, and size formatting helpers.
pub mod entry;
pub mod file_tree;
pub mod size;
pub mod table;

pub use entry::{normalize_path, Entry, EntryId, SizeState};
pub use file_tree::{FileTree, NodeIndex, NodeRef, Traverse, TreeNode};
pub use table::{EntryTable, ScanSummary};
