//! One-shot atomic writes built on [`AtomicWriter`].
//!
//! For callers that have the whole payload at hand, or can produce it inside a
//! closure. The temp file is always gone by the time these return.

use std::path::Path;

use crate::error::{AtomicFileError, AtomicFileResult};
use crate::writer::{AtomicWriter, WriterConfig};

/// Atomically replace `path` with `content`.
///
/// # Errors
///
/// Any [`AtomicFileError`] from creating, writing or publishing the temp file.
/// The destination is untouched on error.
pub fn write_atomic(path: impl AsRef<Path>, content: &[u8]) -> AtomicFileResult<()> {
    write_atomic_with(path, WriterConfig::default(), |w| w.write(content).map(|_| ()))
}

/// Atomically replace `path` with whatever `fill` writes.
///
/// The writer is published if `fill` returns `Ok` and cancelled otherwise. If
/// `fill` panics, dropping the writer removes the temp file.
///
/// # Errors
///
/// The error returned by `fill`, or any [`AtomicFileError`] from the writer.
pub fn write_atomic_with<P, E>(
    path: P,
    config: WriterConfig,
    fill: impl FnOnce(&mut AtomicWriter) -> Result<(), E>,
) -> Result<(), E>
where
    P: AsRef<Path>,
    E: From<AtomicFileError>,
{
    let mut writer = AtomicWriter::with_config(path, config)?;
    match fill(&mut writer) {
        Ok(()) => Ok(writer.close()?),
        Err(e) => {
            let _ = writer.cancel();
            Err(e)
        }
    }
}
