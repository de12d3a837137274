//! Write-then-rename atomic writer.
//!
//! An [`AtomicWriter`] stages bytes in a uniquely named sibling of the
//! destination and publishes them with a single rename on [`close`]. On any
//! failure, on [`cancel`], or when dropped unfinished, the temp file is removed
//! and the destination is left exactly as it was.
//!
//! ```text
//! ACTIVE --write ok--> ACTIVE
//! ACTIVE --write err--> FINISHED(err)          temp removed
//! ACTIVE --close, rename ok--> FINISHED(ok)    destination replaced
//! ACTIVE --close, sync/close/rename err--> FINISHED(err)
//! ACTIVE --cancel | drop--> FINISHED(cancelled)
//! FINISHED(r) --close | cancel--> FINISHED(r)
//! ```
//!
//! A writer is not synchronized. Two writers racing on one destination are not
//! coordinated: the later rename wins.
//!
//! [`close`]: AtomicWriter::close
//! [`cancel`]: AtomicWriter::cancel

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{AtomicFileError, AtomicFileResult};
use crate::fs::{Filesystem, OsFs};

/// Tunables for temp file naming and durability.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Appended to every temp file name.
    pub temp_suffix: String,
    /// Length of the random part of the temp file name.
    pub rand_bytes: usize,
    /// Fsync the destination directory after a successful rename (Unix only).
    pub sync_dir: bool,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            temp_suffix: ".tmp".to_owned(),
            rand_bytes: 6,
            sync_dir: false,
        }
    }
}

/// Atomically replaces the contents of one destination file.
pub struct AtomicWriter<F: Filesystem = OsFs> {
    fs: F,
    config: WriterConfig,
    dst_path: PathBuf,
    tmp_path: PathBuf,
    /// `None` once the writer has finished.
    tmp_file: Option<F::File>,
    /// Sticky terminal error.
    err: Option<AtomicFileError>,
}

impl AtomicWriter<OsFs> {
    /// Start an atomic write to `path` on the host filesystem.
    ///
    /// # Errors
    ///
    /// [`AtomicFileError::InvalidPath`] if `path` has no file name, or
    /// [`AtomicFileError::Create`] if the temp file cannot be created.
    pub fn new(path: impl AsRef<Path>) -> AtomicFileResult<Self> {
        Self::with_config(path, WriterConfig::default())
    }

    /// Like [`new`](Self::new) with a custom [`WriterConfig`].
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    pub fn with_config(path: impl AsRef<Path>, config: WriterConfig) -> AtomicFileResult<Self> {
        Self::with_fs(OsFs, path, config)
    }
}

impl<F: Filesystem> AtomicWriter<F> {
    /// Start an atomic write to `path` through `fs`.
    ///
    /// The temp file is created in the destination's directory, or in the
    /// current directory when `path` has no directory component.
    ///
    /// # Errors
    ///
    /// See [`AtomicWriter::new`]. Nothing is left on disk when this fails.
    pub fn with_fs(fs: F, path: impl AsRef<Path>, config: WriterConfig) -> AtomicFileResult<Self> {
        let dst_path = path.as_ref().to_path_buf();
        let (dir, name) = split_path(&dst_path)?;

        let mut prefix = OsString::from(".");
        prefix.push(&name);
        prefix.push(".");

        let (tmp_file, tmp_path) = fs
            .create_temp(
                &dir,
                &prefix,
                OsStr::new(&config.temp_suffix),
                config.rand_bytes,
            )
            .map_err(|e| AtomicFileError::Create {
                dir: dir.clone(),
                source: Arc::new(e),
            })?;

        debug!(dst = %dst_path.display(), tmp = %tmp_path.display(), "created temp file");

        Ok(Self {
            fs,
            config,
            dst_path,
            tmp_path,
            tmp_file: Some(tmp_file),
            err: None,
        })
    }

    /// Destination path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dst_path
    }

    /// Path of the staging temp file.
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        &self.tmp_path
    }

    /// Whether a terminating operation has already run.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.tmp_file.is_none()
    }

    /// The filesystem this writer stages and publishes through.
    #[must_use]
    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Append `buf` to the temp file and return its length.
    ///
    /// A failed write terminates the writer: the temp file is removed and the
    /// error becomes the writer's final outcome.
    ///
    /// # Errors
    ///
    /// The sticky terminal error if one is recorded, [`AtomicFileError::Finished`]
    /// after a successful close, or [`AtomicFileError::Write`].
    pub fn write(&mut self, buf: &[u8]) -> AtomicFileResult<usize> {
        if let Some(err) = &self.err {
            return Err(err.clone());
        }
        let Some(file) = self.tmp_file.as_mut() else {
            return Err(AtomicFileError::Finished {
                path: self.dst_path.clone(),
            });
        };

        if let Err(e) = self.fs.write_all(file, buf) {
            let err = AtomicFileError::Write {
                path: self.tmp_path.clone(),
                source: Arc::new(e),
            };
            self.err = Some(err.clone());
            // The outcome is already decided; this only cleans up.
            let _ = self.finish();
            return Err(err);
        }
        Ok(buf.len())
    }

    /// Sync, close and publish the temp file over the destination.
    ///
    /// Idempotent: later calls return the first call's result without touching
    /// the filesystem.
    ///
    /// # Errors
    ///
    /// Any previously recorded error, or the [`Flush`], [`Close`] or [`Rename`]
    /// failure of this call. The destination is untouched in every error case.
    ///
    /// [`Flush`]: AtomicFileError::Flush
    /// [`Close`]: AtomicFileError::Close
    /// [`Rename`]: AtomicFileError::Rename
    pub fn close(&mut self) -> AtomicFileResult<()> {
        self.finish()
    }

    /// Abort the write and remove the temp file.
    ///
    /// Returns [`AtomicFileError::Cancelled`] when this call aborted the writer.
    /// On an already finished writer this is a no-op returning the stored result.
    ///
    /// # Errors
    ///
    /// See above.
    pub fn cancel(&mut self) -> AtomicFileResult<()> {
        if !self.is_finished() && self.err.is_none() {
            debug!(dst = %self.dst_path.display(), "cancelling atomic write");
            self.err = Some(self.cancelled());
        }
        self.finish()
    }

    /// Remove the temp file unless the writer has already finished.
    ///
    /// Never touches a file that was renamed into place or already cleaned up.
    /// Also runs on drop.
    pub fn remove_if_not_closed(&mut self) {
        if self.is_finished() {
            return;
        }
        if self.err.is_none() {
            self.err = Some(self.cancelled());
        }
        let _ = self.finish();
    }

    fn cancelled(&self) -> AtomicFileError {
        AtomicFileError::Cancelled {
            path: self.dst_path.clone(),
        }
    }

    fn outcome(&self) -> AtomicFileResult<()> {
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Termination. Runs its body at most once per writer.
    fn finish(&mut self) -> AtomicFileResult<()> {
        let Some(mut file) = self.tmp_file.take() else {
            return self.outcome();
        };

        // An already decided failure skips durability work on a doomed file.
        let synced = if self.err.is_none() {
            self.fs.sync(&mut file)
        } else {
            Ok(())
        };
        let closed = self.fs.close(file);

        let result = if let Some(err) = &self.err {
            Err(err.clone())
        } else if let Err(e) = synced {
            Err(AtomicFileError::Flush {
                path: self.tmp_path.clone(),
                source: Arc::new(e),
            })
        } else if let Err(e) = closed {
            Err(AtomicFileError::Close {
                path: self.tmp_path.clone(),
                source: Arc::new(e),
            })
        } else {
            self.publish()
        };

        if let Err(err) = &result {
            self.remove_temp();
            self.err = Some(err.clone());
        }
        result
    }

    /// Rename the closed temp file onto the destination.
    fn publish(&self) -> AtomicFileResult<()> {
        // Replaces any existing destination.
        self.fs
            .rename(&self.tmp_path, &self.dst_path)
            .map_err(|e| AtomicFileError::Rename {
                from: self.tmp_path.clone(),
                to: self.dst_path.clone(),
                source: Arc::new(e),
            })?;

        debug!(dst = %self.dst_path.display(), "published atomic write");

        if self.config.sync_dir {
            let dir = parent_dir(&self.dst_path);
            if let Err(e) = self.fs.sync_dir(&dir) {
                warn!(dir = %dir.display(), error = %e, "failed to sync directory after rename");
            }
        }
        Ok(())
    }

    fn remove_temp(&self) {
        match self.fs.remove(&self.tmp_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(tmp = %self.tmp_path.display(), error = %e, "failed to remove temp file");
            }
        }
    }
}

impl<F: Filesystem> io::Write for AtomicWriter<F> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(AtomicWriter::<F>::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.outcome()?)
    }
}

impl<F: Filesystem> Drop for AtomicWriter<F> {
    fn drop(&mut self) {
        if !self.is_finished() {
            warn!(dst = %self.dst_path.display(), "atomic writer dropped without close, discarding");
            self.remove_if_not_closed();
        }
    }
}

impl<F: Filesystem> std::fmt::Debug for AtomicWriter<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtomicWriter")
            .field("dst_path", &self.dst_path)
            .field("tmp_path", &self.tmp_path)
            .field("finished", &self.is_finished())
            .field("err", &self.err)
            .finish_non_exhaustive()
    }
}

/// Split `path` into (directory, file name).
///
/// An empty directory means the current directory. A path whose last
/// segment is empty, `.` or `..` is rejected.
fn split_path(path: &Path) -> AtomicFileResult<(PathBuf, OsString)> {
    let invalid = || AtomicFileError::InvalidPath {
        path: path.to_path_buf(),
    };

    // `Path` normalizes a trailing separator or `.` away, so check the raw text.
    let raw = path.as_os_str().to_string_lossy();
    let last = raw.rsplit(std::path::is_separator).next().unwrap_or_default();
    if matches!(last, "" | "." | "..") {
        return Err(invalid());
    }
    let name = path.file_name().ok_or_else(invalid)?;

    Ok((parent_dir(path), name.to_os_string()))
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
