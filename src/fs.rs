//! Filesystem capability consumed by the atomic writer.
//!
//! The writer never touches `std::fs` directly. Every primitive it needs goes
//! through [`Filesystem`], so tests can substitute a fault-injecting
//! implementation. [`OsFs`] is the host implementation.

use std::ffi::OsStr;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Primitive filesystem operations used by [`AtomicWriter`](crate::AtomicWriter).
pub trait Filesystem {
    /// Open, writable handle to a temporary file.
    type File;

    /// Create a new file in `dir` whose name did not previously exist.
    ///
    /// The name is `prefix`, then `rand_bytes` random characters, then `suffix`.
    fn create_temp(
        &self,
        dir: &Path,
        prefix: &OsStr,
        suffix: &OsStr,
        rand_bytes: usize,
    ) -> io::Result<(Self::File, PathBuf)>;

    /// Write all of `buf` to `file`.
    fn write_all(&self, file: &mut Self::File, buf: &[u8]) -> io::Result<()>;

    /// Flush `file` contents to durable storage.
    fn sync(&self, file: &mut Self::File) -> io::Result<()>;

    /// Close the handle.
    fn close(&self, file: Self::File) -> io::Result<()>;

    /// Rename `from` to `to`, replacing `to` if it exists.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove the file at `path`.
    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Make a completed rename inside `dir` durable.
    fn sync_dir(&self, _dir: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// The host filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl Filesystem for OsFs {
    type File = std::fs::File;

    fn create_temp(
        &self,
        dir: &Path,
        prefix: &OsStr,
        suffix: &OsStr,
        rand_bytes: usize,
    ) -> io::Result<(Self::File, PathBuf)> {
        let tmp = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .rand_bytes(rand_bytes)
            .tempfile_in(dir)?;

        // The writer owns cleanup from here on.
        tmp.keep().map_err(|e| e.error)
    }

    fn write_all(&self, file: &mut Self::File, buf: &[u8]) -> io::Result<()> {
        file.write_all(buf)
    }

    fn sync(&self, file: &mut Self::File) -> io::Result<()> {
        file.flush()?;
        file.sync_all()
    }

    fn close(&self, file: Self::File) -> io::Result<()> {
        // std reports no error from close(2); sync() has already surfaced
        // anything the kernel would.
        drop(file);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        std::fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    #[cfg(unix)]
    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        std::fs::File::open(dir)?.sync_all()
    }
}
