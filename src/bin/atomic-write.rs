//! atomic-write -- copy stdin into a file atomically.
//!
//! Usage: atomic-write [--sync-dir] <destination>

use std::io;

use anyhow::{Context, bail};

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout is left alone.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut config = atomicfile::WriterConfig::default();
    let mut destination = None;
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--sync-dir" => config.sync_dir = true,
            _ if destination.is_none() => destination = Some(arg),
            _ => bail!("unexpected argument: {arg}"),
        }
    }
    let Some(destination) = destination else {
        bail!("usage: atomic-write [--sync-dir] <destination>");
    };

    atomicfile::write_atomic_with(&destination, config, |w| {
        io::copy(&mut io::stdin().lock(), w).map(|_| ())
    })
    .with_context(|| format!("failed to write {destination}"))?;

    Ok(())
}
