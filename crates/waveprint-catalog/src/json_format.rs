//! JSON embedding sidecar format
//!
//! Learned embeddings come from an external model run and arrive as a JSON
//! map of track id to vector plus optional descriptor fields and display
//! metadata. The sidecar can be merged into analyzed catalog entries or
//! converted to entries outright when no audio is available locally.

use crate::format::CatalogEntry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use waveprint_core::{DescriptorRecord, Mode, PitchClass};

/// Top-level sidecar file: one entry per track id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingFile {
    pub version: String,
    pub created_at: String,
    pub tracks: BTreeMap<String, EmbeddingEntry>,
}

/// Per-track sidecar entry. Everything but the embedding is optional.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tempo_bpm: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<PitchClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_rms: Option<f64>,
    pub embedding: Vec<f32>,
}

impl EmbeddingEntry {
    pub fn with_embedding(embedding: Vec<f32>) -> Self {
        Self {
            title: None,
            artist: None,
            tempo_bpm: None,
            key: None,
            mode: None,
            energy_rms: None,
            embedding,
        }
    }
}

impl EmbeddingFile {
    pub fn new() -> Self {
        Self {
            version: "1.0".to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            tracks: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, track_id: impl Into<String>, entry: EmbeddingEntry) {
        self.tracks.insert(track_id.into(), entry);
    }

    /// Save to a JSON file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json_str = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json_str)?;
        Ok(())
    }

    /// Load from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let json_str = std::fs::read_to_string(path)?;
        let file: EmbeddingFile = serde_json::from_str(&json_str)?;
        Ok(file)
    }

    /// Merge sidecar records into matching catalog entries.
    ///
    /// The embedding always wins; descriptor fields and display metadata
    /// only fill gaps the analysis left unset. Entries without a sidecar
    /// record are left untouched; sidecar records without a matching entry
    /// are ignored. Returns the number of entries that received an
    /// embedding.
    pub fn apply_to(&self, entries: &mut [CatalogEntry]) -> usize {
        let mut applied = 0;
        for entry in entries.iter_mut() {
            let Some(sidecar) = self.tracks.get(&entry.track_id) else {
                continue;
            };
            entry.descriptor.embedding = Some(sidecar.embedding.clone());
            fill_gaps(&mut entry.descriptor, sidecar);
            if entry.title.is_none() {
                entry.title = sidecar.title.clone();
            }
            if entry.artist.is_none() {
                entry.artist = sidecar.artist.clone();
            }
            applied += 1;
        }
        if applied < self.tracks.len() {
            log::debug!(
                "{} sidecar records had no matching catalog entry",
                self.tracks.len() - applied
            );
        }
        applied
    }

    /// Convert the sidecar into standalone catalog entries, for catalogs
    /// built entirely from an embedding database with no local audio.
    pub fn to_entries(&self) -> Vec<CatalogEntry> {
        self.tracks
            .iter()
            .map(|(track_id, sidecar)| {
                let mut descriptor = DescriptorRecord {
                    embedding: Some(sidecar.embedding.clone()),
                    ..Default::default()
                };
                fill_gaps(&mut descriptor, sidecar);
                CatalogEntry {
                    track_id: track_id.clone(),
                    title: sidecar.title.clone(),
                    artist: sidecar.artist.clone(),
                    descriptor,
                    hashes: Vec::new(),
                }
            })
            .collect()
    }
}

fn fill_gaps(descriptor: &mut DescriptorRecord, sidecar: &EmbeddingEntry) {
    if descriptor.tempo_bpm.is_none() {
        descriptor.tempo_bpm = sidecar.tempo_bpm;
    }
    if descriptor.key.is_none() {
        descriptor.key = sidecar.key;
    }
    if descriptor.mode.is_none() {
        descriptor.mode = sidecar.mode;
    }
    if descriptor.energy_rms.is_none() {
        descriptor.energy_rms = sidecar.energy_rms;
    }
}

impl Default for EmbeddingFile {
    fn default() -> Self {
        Self::new()
    }
}
