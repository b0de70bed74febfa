/// A single record in the flat entry table.
///
/// Entries are stored in a flat `Vec<Entry>` arena. The parent relation is
/// held twice: as the normalised `parent_path` string (the stable key used by
/// exporters) and as an `EntryId` index for cheap grouping.
use crate::error::EntryError;
use compact_str::CompactString;
use serde::Serialize;
use std::ffi::OsStr;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Lightweight index into the entry arena.
///
/// Uses `u32` to keep entries small — up to ~4 billion entries per scan.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub u32);

impl EntryId {
    /// Create a new `EntryId` from a `usize`, panicking in debug builds if it
    /// exceeds `u32::MAX`.
    #[inline]
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u32::MAX as usize, "EntryId overflow");
        Self(index as u32)
    }

    /// Return the index as a `usize` for Vec indexing.
    #[inline]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

/// Resolution state of an entry's `size`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "state", content = "reason")]
pub enum SizeState {
    /// Not yet written by the resolver (files) or aggregator (directories).
    #[default]
    Pending,
    /// Final size is known.
    Resolved,
    /// Size could not be determined; `size` is 0.
    Unresolved(EntryError),
}

impl SizeState {
    #[inline]
    pub fn is_unresolved(self) -> bool {
        matches!(self, Self::Unresolved(_))
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::Unresolved(err) => err.label(),
        }
    }
}

/// One file or directory under the scanned root, or the root itself.
#[derive(Debug, Clone)]
pub struct Entry {
    /// Absolute path rendered by [`normalize_path`]: separators are `/` and
    /// bytes that are not valid UTF-8 are escaped. Unique within a table.
    pub path: String,

    /// The path as the operating system knows it. This, not `path`, is what
    /// gets stat'ed.
    pub fs_path: PathBuf,

    /// Path of the containing directory. `None` only for the scan root.
    pub parent_path: Option<String>,

    /// Arena index of the containing directory, mirroring `parent_path`.
    pub parent: Option<EntryId>,

    /// Base name component of `path`.
    pub name: CompactString,

    /// Distance from the scan root (root = 0).
    pub depth: u32,

    pub is_dir: bool,

    /// Byte count. Written once: by the resolver for files, by the
    /// aggregator for directories.
    pub size: u64,

    pub state: SizeState,

    /// Files in this subtree (1 for a file). Filled in by aggregation.
    pub file_count: u64,

    /// Unresolved entries strictly below this one. Filled in by aggregation.
    pub unresolved_below: u64,
}

impl Entry {
    fn new(path: String, name: CompactString, depth: u32, is_dir: bool) -> Self {
        Self {
            fs_path: PathBuf::from(&path),
            path,
            parent_path: None,
            parent: None,
            name,
            depth,
            is_dir,
            size: 0,
            state: SizeState::Pending,
            file_count: if is_dir { 0 } else { 1 },
            unresolved_below: 0,
        }
    }

    /// A file entry awaiting size resolution.
    pub fn new_file(path: String, name: CompactString, depth: u32) -> Self {
        Self::new(path, name, depth, false)
    }

    /// A directory entry awaiting aggregation.
    pub fn new_dir(path: String, name: CompactString, depth: u32) -> Self {
        Self::new(path, name, depth, true)
    }

    /// An entry for a real on-disk path. The table key and name are
    /// rendered from `fs_path`, which is kept verbatim for resolution.
    pub fn on_disk(fs_path: PathBuf, depth: u32, is_dir: bool) -> Self {
        let mut entry = Self::new(normalize_path(&fs_path), entry_name(&fs_path), depth, is_dir);
        entry.fs_path = fs_path;
        entry
    }

    /// Attach this entry to its parent.
    pub fn with_parent(mut self, parent: EntryId, parent_path: String) -> Self {
        self.parent = Some(parent);
        self.parent_path = Some(parent_path);
        self
    }

    #[inline]
    pub fn is_unresolved(&self) -> bool {
        self.state.is_unresolved()
    }

    /// Mark this entry as unresolved, discarding any size it held.
    pub fn mark_unresolved(&mut self, error: EntryError) {
        self.size = 0;
        self.state = SizeState::Unresolved(error);
    }

    /// Size in MiB, the unit the tabular exports carry alongside bytes.
    #[inline]
    pub fn size_mb(&self) -> f64 {
        self.size as f64 / (1024.0 * 1024.0)
    }
}

/// Render a path as the table's key.
///
/// Separators become `/`. The rendering is injective: on Unix a literal
/// backslash is written `\\` and each byte that is not valid UTF-8 is written
/// `\xNN`; on Windows an unpaired surrogate is written `\u{NNNN}` (a literal
/// backslash cannot occur there, it is the separator).
pub fn normalize_path(path: &Path) -> String {
    render_os_str(path.as_os_str())
}

/// Base name used for an entry; falls back to the whole path for roots
/// such as `/` or `C:\` that have no final component.
pub fn entry_name(path: &Path) -> CompactString {
    match path.file_name() {
        Some(name) => CompactString::new(render_os_str(name)),
        None => CompactString::new(normalize_path(path)),
    }
}

#[cfg(unix)]
fn render_os_str(s: &OsStr) -> String {
    use std::os::unix::ffi::OsStrExt;

    let bytes = s.as_bytes();
    let mut out = String::with_capacity(bytes.len());
    for chunk in bytes.utf8_chunks() {
        for ch in chunk.valid().chars() {
            if ch == '\\' {
                out.push_str("\\\\");
            } else {
                out.push(ch);
            }
        }
        for byte in chunk.invalid() {
            let _ = write!(out, "\\x{byte:02X}");
        }
    }
    out
}

#[cfg(windows)]
fn render_os_str(s: &OsStr) -> String {
    use std::os::windows::ffi::OsStrExt;

    let mut out = String::with_capacity(s.len());
    for unit in char::decode_utf16(s.encode_wide()) {
        match unit {
            Ok('\\') => out.push('/'),
            Ok(ch) => out.push(ch),
            Err(err) => {
                let _ = write!(out, "\\u{{{:04X}}}", err.unpaired_surrogate());
            }
        }
    }
    out
}

#[cfg(not(any(unix, windows)))]
fn render_os_str(s: &OsStr) -> String {
    s.to_string_lossy().into_owned()
}
