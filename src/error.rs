//! Error types for the atomicfile crate.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// Errors produced by [`AtomicWriter`](crate::AtomicWriter).
///
/// I/O sources are held behind an [`Arc`] so a recorded terminal error can be
/// returned again from every later call on the same writer.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AtomicFileError {
    /// Destination path has no file name component.
    #[error("invalid destination path {path:?}: no file name")]
    InvalidPath { path: PathBuf },

    /// The temporary sibling file could not be created.
    #[error("failed to create temp file in {dir}: {source}")]
    Create {
        dir: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Writing to the temporary file failed.
    #[error("failed to write temp file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Flushing the temporary file to durable storage failed.
    #[error("failed to sync temp file {path}: {source}")]
    Flush {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Closing the temporary file handle failed.
    #[error("failed to close temp file {path}: {source}")]
    Close {
        path: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// Renaming the temporary file onto the destination failed.
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: Arc<io::Error>,
    },

    /// The writer was cancelled before it was published.
    #[error("atomic write to {path} cancelled")]
    Cancelled { path: PathBuf },

    /// A write was attempted after the writer was successfully closed.
    #[error("atomic write to {path} already closed")]
    Finished { path: PathBuf },
}

impl AtomicFileError {
    /// Whether this is the error recorded by `cancel()` or guarded abandonment.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::InvalidPath { .. } => io::ErrorKind::InvalidInput,
            Self::Cancelled { .. } => io::ErrorKind::Other,
            Self::Finished { .. } => io::ErrorKind::BrokenPipe,
            Self::Create { source, .. }
            | Self::Write { source, .. }
            | Self::Flush { source, .. }
            | Self::Close { source, .. }
            | Self::Rename { source, .. } => match source.kind() {
                // A recorded error is final; `Interrupted` would make
                // `write_all` and `io::copy` retry it forever.
                io::ErrorKind::Interrupted => io::ErrorKind::Other,
                kind => kind,
            },
        }
    }
}

impl From<AtomicFileError> for io::Error {
    fn from(err: AtomicFileError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}

/// Convenience result type for atomicfile operations.
pub type AtomicFileResult<T> = Result<T, AtomicFileError>;
