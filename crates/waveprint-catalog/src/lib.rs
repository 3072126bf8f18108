//! Waveprint catalog persistence
//!
//! Binary catalog files (header + checksummed, zstd-compressed bincode
//! payload) and the JSON embedding sidecar import.

pub mod format;
pub mod json_format;
pub mod reader;
pub mod writer;

pub use format::{CatalogEntry, CatalogFile, CatalogHeader, HEADER_SIZE, MAGIC, VERSION};
pub use json_format::{EmbeddingEntry, EmbeddingFile};
pub use reader::CatalogReader;
pub use writer::CatalogWriter;
