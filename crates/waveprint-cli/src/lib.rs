//! Shared helpers for the waveprint command-line tools.

pub mod output;
