//! `atomicfile` — atomic replacement of a file's contents.
//!
//! Bytes are staged in a uniquely named temp file beside the destination and
//! published with one rename. Readers of the destination see either the old
//! contents or the complete new contents, never a mixture. Any failure, an
//! explicit cancel, or dropping the writer unfinished removes the temp file.
//!
//! # Usage
//!
//! ```no_run
//! use std::io::Write as _;
//!
//! let mut w = atomicfile::AtomicWriter::new("out.txt")?;
//! w.write_all(b"hello\n")?;
//! w.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! AtomicWriter ──create_temp/write_all/sync/close/rename/remove──▶ Filesystem
//!                                                                  └─ OsFs (tempfile + std::fs)
//! ```
//!
//! The temp file and the destination must live on the same filesystem for the
//! rename to be atomic.

pub mod error;
pub mod fs;
pub mod util;
pub mod writer;

pub use error::{AtomicFileError, AtomicFileResult};
pub use fs::{Filesystem, OsFs};
pub use util::atomic::{write_atomic, write_atomic_with};
pub use writer::{AtomicWriter, WriterConfig};
