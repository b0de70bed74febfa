/// Flat export of a scanned table.
///
/// One row per entry, root included, with the same columns for CSV and
/// JSON. Row order follows the table and carries no meaning.
use crate::error::ScanError;
use crate::model::{Entry, EntryTable};
use serde::Serialize;
use std::io::Write;

/// Serialised form of one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRow<'a> {
    pub path: &'a str,
    pub parent_path: Option<&'a str>,
    pub name: &'a str,
    pub depth: u32,
    pub is_dir: bool,
    pub size: u64,
    pub size_mb: f64,
    pub file_count: u64,
    pub state: &'static str,
}

impl<'a> From<&'a Entry> for FlatRow<'a> {
    fn from(entry: &'a Entry) -> Self {
        Self {
            path: &entry.path,
            parent_path: entry.parent_path.as_deref(),
            name: entry.name.as_str(),
            depth: entry.depth,
            is_dir: entry.is_dir,
            size: entry.size,
            size_mb: entry.size_mb(),
            file_count: entry.file_count,
            state: entry.state.label(),
        }
    }
}

/// Write the table as CSV with a header row.
pub fn write_csv<W: Write>(table: &EntryTable, writer: W) -> Result<(), ScanError> {
    let mut csv = csv::Writer::from_writer(writer);
    for entry in table.entries() {
        csv.serialize(FlatRow::from(entry))?;
    }
    csv.flush()?;
    Ok(())
}

/// Write the table as a pretty-printed JSON array of rows.
pub fn write_json<W: Write>(table: &EntryTable, writer: W) -> Result<(), ScanError> {
    let rows: Vec<FlatRow<'_>> = table.entries().iter().map(FlatRow::from).collect();
    serde_json::to_writer_pretty(writer, &rows).map_err(ScanError::JsonExport)
}
