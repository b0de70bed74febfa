/// Scan configuration.
///
/// Every field has a default, so a JSON options file only needs to name the
/// values it overrides.
use crate::error::ScanError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Smallest worker pool chosen by [`default_workers`].
pub const MIN_DEFAULT_WORKERS: usize = 4;

/// Largest worker pool chosen by [`default_workers`].
pub const MAX_DEFAULT_WORKERS: usize = 64;

/// Options controlling a single scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanOptions {
    /// Size of the I/O worker pool used for listing and stat calls.
    pub workers: usize,

    /// Traverse symlinked directories. Off by default: symlinks are then
    /// recorded as leaves sized by the link itself.
    pub follow_links: bool,

    /// Emit a progress message every this many entries.
    pub progress_interval: u64,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            follow_links: false,
            progress_interval: 1_000,
        }
    }
}

impl ScanOptions {
    /// Load options from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ScanError> {
        let text = std::fs::read_to_string(path).map_err(|source| ScanError::Config {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ScanError> {
        serde_json::from_str(text).map_err(ScanError::InvalidOptions)
    }

    /// Worker count with zero coerced to one.
    #[inline]
    pub fn effective_workers(&self) -> usize {
        self.workers.max(1)
    }

    /// Progress interval with zero coerced to one.
    #[inline]
    pub fn effective_progress_interval(&self) -> u64 {
        self.progress_interval.max(1)
    }
}

/// Default pool size: stat/listing latency is dominated by filesystem round
/// trips, so the pool is sized as a multiple of the core count.
pub fn default_workers() -> usize {
    (num_cpus::get() * 4).clamp(MIN_DEFAULT_WORKERS, MAX_DEFAULT_WORKERS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = ScanOptions::default();
        assert!(opts.workers >= MIN_DEFAULT_WORKERS);
        assert!(opts.workers <= MAX_DEFAULT_WORKERS);
        assert!(!opts.follow_links);
        assert_eq!(opts.progress_interval, 1_000);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let opts = ScanOptions::from_json_str(r#"{ "workers": 2 }"#).unwrap();
        assert_eq!(opts.workers, 2);
        assert!(!opts.follow_links);
        assert_eq!(opts.progress_interval, 1_000);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = ScanOptions::from_json_str(r#"{ "wokers": 2 }"#);
        assert!(matches!(result, Err(ScanError::InvalidOptions(_))));
    }

    #[test]
    fn test_zero_values_are_coerced() {
        let opts = ScanOptions {
            workers: 0,
            follow_links: false,
            progress_interval: 0,
        };
        assert_eq!(opts.effective_workers(), 1);
        assert_eq!(opts.effective_progress_interval(), 1);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = ScanOptions::from_json_file(Path::new("/definitely/not/here.json"));
        assert!(matches!(result, Err(ScanError::Config { .. })));
    }
}
