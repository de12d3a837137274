//! Convenience helpers over the core writer.

pub mod atomic;
