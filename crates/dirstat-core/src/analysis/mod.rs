/// Analysis modules — post-scan helpers over a sized table.
pub mod top_files;

pub use top_files::{top_files, LargestFile};
