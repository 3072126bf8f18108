//! Catalog file format structures

use serde::{Deserialize, Serialize};
use waveprint_core::matching::FingerprintIndex;
use waveprint_core::{Catalog, DescriptorRecord, FingerprintHash};

/// Magic bytes for catalog files: "WPCT"
pub const MAGIC: [u8; 4] = [0x57, 0x50, 0x43, 0x54];

/// Current format version
pub const VERSION: u16 = 1;

/// Fixed header size in bytes
pub const HEADER_SIZE: usize = 56;

/// File header (56 bytes fixed size, little-endian)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogHeader {
    /// Magic bytes: "WPCT"
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Flags (bit 0: payload is zstd-compressed)
    pub flags: u16,
    /// Payload size (uncompressed)
    pub payload_size: u64,
    /// Compressed payload size (0 if uncompressed)
    pub payload_size_compressed: u64,
    /// Number of track entries
    pub num_entries: u32,
    /// Analysis sample rate (Hz)
    pub sample_rate: u32,
    /// Creation time, Unix seconds
    pub created_at: i64,
    /// CRC64 checksum of the payload bytes as stored on disk
    pub checksum: u64,
    /// Reserved
    pub reserved: u64,
}

impl CatalogHeader {
    pub fn new(payload_size: u64, num_entries: u32, sample_rate: u32, created_at: i64) -> Self {
        Self {
            magic: MAGIC,
            version: VERSION,
            flags: 0,
            payload_size,
            payload_size_compressed: 0,
            num_entries,
            sample_rate,
            created_at,
            checksum: 0,
            reserved: 0,
        }
    }

    pub fn is_compressed(&self) -> bool {
        (self.flags & 0x1) != 0
    }

    pub fn set_compressed(&mut self, compressed: bool) {
        if compressed {
            self.flags |= 0x1;
        } else {
            self.flags &= !0x1;
        }
    }
}

/// One catalog track: identity, descriptor, and optional stored fingerprints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub track_id: String,
    pub title: Option<String>,
    pub artist: Option<String>,
    pub descriptor: DescriptorRecord,
    /// Constellation hashes for exact identification. Empty when the catalog
    /// was built without fingerprinting.
    #[serde(default)]
    pub hashes: Vec<FingerprintHash>,
}

/// Complete catalog file structure
#[derive(Debug, Clone)]
pub struct CatalogFile {
    pub header: CatalogHeader,
    pub entries: Vec<CatalogEntry>,
}

impl CatalogFile {
    /// Build the in-memory descriptor catalog used for similarity ranking.
    pub fn descriptor_catalog(&self) -> Catalog {
        self.entries
            .iter()
            .map(|e| (e.track_id.clone(), e.descriptor.clone()))
            .collect()
    }

    /// Build the inverted fingerprint index from stored hashes.
    pub fn fingerprint_index(&self) -> FingerprintIndex {
        let mut index = FingerprintIndex::new();
        for entry in &self.entries {
            if !entry.hashes.is_empty() {
                index.add_track(entry.track_id.clone(), &entry.hashes);
            }
        }
        index
    }
}
