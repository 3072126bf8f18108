//! Catalog file writer

use crate::format::{CatalogEntry, CatalogHeader};
use anyhow::{Context, Result};
use crc::{Crc, CRC_64_ECMA_182};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

/// Compression level for the zstd payload.
const ZSTD_LEVEL: i32 = 3;

pub struct CatalogWriter {
    compress: bool,
}

impl CatalogWriter {
    pub fn new() -> Self {
        Self { compress: true }
    }

    pub fn uncompressed() -> Self {
        Self { compress: false }
    }

    /// Write a catalog file.
    pub fn write(&self, path: &Path, entries: &[CatalogEntry], sample_rate: u32) -> Result<()> {
        let payload = bincode::serialize(entries).context("failed to serialize catalog payload")?;

        let stored = if self.compress {
            zstd::encode_all(&payload[..], ZSTD_LEVEL)
                .context("failed to compress catalog payload")?
        } else {
            payload.clone()
        };

        let mut header = CatalogHeader::new(
            payload.len() as u64,
            entries.len() as u32,
            sample_rate,
            chrono::Utc::now().timestamp(),
        );
        if self.compress {
            header.set_compressed(true);
            header.payload_size_compressed = stored.len() as u64;
        }
        header.checksum = CRC64.checksum(&stored);

        let file = File::create(path)
            .with_context(|| format!("failed to create catalog file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);

        self.write_header(&mut writer, &header)?;
        writer.write_all(&stored)?;
        writer.flush()?;

        log::info!(
            "wrote catalog {} ({} entries, {} bytes payload)",
            path.display(),
            entries.len(),
            stored.len()
        );
        Ok(())
    }

    fn write_header(&self, writer: &mut BufWriter<File>, header: &CatalogHeader) -> Result<()> {
        writer.write_all(&header.magic)?;
        writer.write_all(&header.version.to_le_bytes())?;
        writer.write_all(&header.flags.to_le_bytes())?;
        writer.write_all(&header.payload_size.to_le_bytes())?;
        writer.write_all(&header.payload_size_compressed.to_le_bytes())?;
        writer.write_all(&header.num_entries.to_le_bytes())?;
        writer.write_all(&header.sample_rate.to_le_bytes())?;
        writer.write_all(&header.created_at.to_le_bytes())?;
        writer.write_all(&header.checksum.to_le_bytes())?;
        writer.write_all(&header.reserved.to_le_bytes())?;

        Ok(())
    }
}

impl Default for CatalogWriter {
    fn default() -> Self {
        Self::new()
    }
}
