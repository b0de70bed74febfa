/// dirstat core — enumeration, size resolution, aggregation and tree model.
///
/// This crate contains all scanning logic with zero terminal dependencies.
/// Frontends (the `dirstat` CLI, exporters) consume the flat
/// [`model::EntryTable`] or the navigable [`model::FileTree`].
///
/// # Modules
///
/// - [`model`] — Arena-allocated entry table, tree view and size formatting.
/// - [`scanner`] — The four-phase scan pipeline with progress and cancellation.
/// - [`analysis`] — Post-scan helpers (largest files).
/// - [`export`] — Flat CSV / JSON export of a scanned table.
/// - [`config`] — Scan options, loadable from JSON.
/// - [`error`] — Scan-level and per-entry error types.
pub mod analysis;
pub mod config;
pub mod error;
pub mod export;
pub mod model;
pub mod scanner;

pub use config::ScanOptions;
pub use error::{EntryError, ScanError};
pub use model::{Entry, EntryId, EntryTable, FileTree, SizeState};
pub use scanner::{start_scan, ScanHandle, ScanOutcome, Scanner};
