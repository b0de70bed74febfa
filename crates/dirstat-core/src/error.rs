/// Error types for the scan engine.
///
/// Two tiers: [`ScanError`] is fatal and surfaced to the caller with no
/// partial result; [`EntryError`] is recorded on a single entry and the scan
/// carries on.
use serde::Serialize;
use std::io;
use std::path::PathBuf;

/// Fatal, scan-level failures.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("scan root {} does not exist or cannot be accessed: {source}", path.display())]
    RootNotFound {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scan root {} cannot be listed: {source}", path.display())]
    RootUnreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("failed to spawn scanner thread: {0}")]
    Spawn(#[source] io::Error),

    #[error("scanner thread panicked")]
    ScanThreadPanicked,

    #[error("failed to read options file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid options: {0}")]
    InvalidOptions(#[source] serde_json::Error),

    #[error("json export failed: {0}")]
    JsonExport(#[source] serde_json::Error),

    #[error("csv export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Why a single entry's size could not be determined.
///
/// The entry stays in the table with size 0 and this reason attached, so a
/// genuine zero-byte file is never confused with a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryError {
    /// Permission denied on stat or directory listing.
    AccessDenied,
    /// The entry existed at enumeration time but was gone when resolved.
    Vanished,
    /// A followed symlink points back at one of its own ancestors.
    SymlinkLoop,
    /// Any other I/O failure.
    Io,
}

impl EntryError {
    /// Classify an I/O error.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::Vanished,
            io::ErrorKind::PermissionDenied => Self::AccessDenied,
            _ => Self::Io,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::AccessDenied => "access denied",
            Self::Vanished => "vanished",
            Self::SymlinkLoop => "symlink loop",
            Self::Io => "i/o error",
        }
    }
}

impl std::fmt::Display for EntryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_io_errors() {
        let nf = io::Error::from(io::ErrorKind::NotFound);
        let pd = io::Error::from(io::ErrorKind::PermissionDenied);
        let other = io::Error::other("disk on fire");
        assert_eq!(EntryError::from_io(&nf), EntryError::Vanished);
        assert_eq!(EntryError::from_io(&pd), EntryError::AccessDenied);
        assert_eq!(EntryError::from_io(&other), EntryError::Io);
    }

    #[test]
    fn test_root_not_found_message_names_path() {
        let err = ScanError::RootNotFound {
            path: PathBuf::from("/no/such/dir"),
            source: io::Error::from(io::ErrorKind::NotFound),
        };
        assert!(err.to_string().contains("/no/such/dir"));
    }

    #[test]
    fn test_json_failures_name_their_origin() {
        let bad = || serde_json::from_str::<u32>("nope").unwrap_err();
        assert!(ScanError::InvalidOptions(bad())
            .to_string()
            .starts_with("invalid options"));
        assert!(ScanError::JsonExport(bad())
            .to_string()
            .starts_with("json export failed"));
    }
}
