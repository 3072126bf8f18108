//! Catalog file reader
//!
//! Memory-maps the file, validates the header and checksum, then
//! decompresses and deserializes the entry payload.

use crate::format::{CatalogEntry, CatalogFile, CatalogHeader, HEADER_SIZE, MAGIC, VERSION};
use anyhow::{Context, Result};
use crc::{Crc, CRC_64_ECMA_182};
use memmap2::Mmap;
use std::fs::File;
use std::path::Path;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_ECMA_182);

pub struct CatalogReader;

impl CatalogReader {
    /// Read a catalog file.
    pub fn read(path: &Path) -> Result<CatalogFile> {
        let file = File::open(path)
            .with_context(|| format!("failed to open catalog file: {}", path.display()))?;
        // Read-only map; the file is not mutated while loaded.
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("failed to map catalog file: {}", path.display()))?;

        if mmap.len() < HEADER_SIZE {
            anyhow::bail!("catalog file truncated: {} bytes", mmap.len());
        }

        let header = Self::parse_header(&mmap[..HEADER_SIZE]);
        if header.magic != MAGIC {
            anyhow::bail!("not a catalog file: magic bytes mismatch");
        }
        if header.version != VERSION {
            anyhow::bail!(
                "unsupported catalog version {} (expected {})",
                header.version,
                VERSION
            );
        }

        let stored_len = if header.is_compressed() {
            header.payload_size_compressed as usize
        } else {
            header.payload_size as usize
        };
        if mmap.len() < HEADER_SIZE + stored_len {
            anyhow::bail!(
                "catalog payload truncated: header claims {} bytes, file has {}",
                stored_len,
                mmap.len() - HEADER_SIZE
            );
        }
        let stored = &mmap[HEADER_SIZE..HEADER_SIZE + stored_len];

        let checksum = CRC64.checksum(stored);
        if checksum != header.checksum {
            anyhow::bail!(
                "catalog checksum mismatch: computed {:#018x}, header has {:#018x}",
                checksum,
                header.checksum
            );
        }

        let payload = if header.is_compressed() {
            zstd::decode_all(stored).context("failed to decompress catalog payload")?
        } else {
            stored.to_vec()
        };
        if payload.len() != header.payload_size as usize {
            anyhow::bail!(
                "decompressed payload size {} does not match header {}",
                payload.len(),
                header.payload_size
            );
        }

        let entries: Vec<CatalogEntry> =
            bincode::deserialize(&payload).context("failed to deserialize catalog payload")?;
        if entries.len() != header.num_entries as usize {
            anyhow::bail!(
                "entry count mismatch: payload has {}, header claims {}",
                entries.len(),
                header.num_entries
            );
        }

        Ok(CatalogFile { header, entries })
    }

    fn parse_header(buf: &[u8]) -> CatalogHeader {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&buf[0..4]);

        CatalogHeader {
            magic,
            version: u16_at(buf, 4),
            flags: u16_at(buf, 6),
            payload_size: u64_at(buf, 8),
            payload_size_compressed: u64_at(buf, 16),
            num_entries: u32_at(buf, 24),
            sample_rate: u32_at(buf, 28),
            created_at: i64_at(buf, 32),
            checksum: u64_at(buf, 40),
            reserved: u64_at(buf, 48),
        }
    }
}

fn u16_at(buf: &[u8], off: usize) -> u16 {
    u16::from_le_bytes([buf[off], buf[off + 1]])
}

fn u32_at(buf: &[u8], off: usize) -> u32 {
    let mut b = [0u8; 4];
    b.copy_from_slice(&buf[off..off + 4]);
    u32::from_le_bytes(b)
}

fn u64_at(buf: &[u8], off: usize) -> u64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[off..off + 8]);
    u64::from_le_bytes(b)
}

fn i64_at(buf: &[u8], off: usize) -> i64 {
    let mut b = [0u8; 8];
    b.copy_from_slice(&buf[off..off + 8]);
    i64::from_le_bytes(b)
}
