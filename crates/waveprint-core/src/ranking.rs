//! Multi-signal similarity ranking
//!
//! Blends a learned-embedding cosine score with an interpretable descriptor
//! score. The descriptor blend is a fold over (weight, optional score) pairs:
//! a field missing on either side drops out of the weighted sum and the
//! weight total alike, so the remaining fields renormalize automatically.

use crate::config::RankingWeights;
use crate::descriptor::DescriptorRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// Read-only catalog of descriptor records keyed by track id.
///
/// Built once, never mutated; reloads go through [`CatalogHandle::swap`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    entries: BTreeMap<String, DescriptorRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, track_id: impl Into<String>, record: DescriptorRecord) {
        self.entries.insert(track_id.into(), record);
    }

    pub fn get(&self, track_id: &str) -> Option<&DescriptorRecord> {
        self.entries.get(track_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DescriptorRecord)> {
        self.entries.iter()
    }
}

impl FromIterator<(String, DescriptorRecord)> for Catalog {
    fn from_iter<T: IntoIterator<Item = (String, DescriptorRecord)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Swappable immutable catalog snapshot.
///
/// Queries take a cheap `Arc` clone and keep using it even if a reload swaps
/// the catalog underneath them; the lock is held only for the clone/replace.
#[derive(Debug)]
pub struct CatalogHandle {
    inner: RwLock<Arc<Catalog>>,
}

impl CatalogHandle {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: RwLock::new(Arc::new(catalog)),
        }
    }

    /// Current snapshot. Never blocks on queries using older snapshots.
    pub fn snapshot(&self) -> Arc<Catalog> {
        match self.inner.read() {
            Ok(guard) => Arc::clone(&guard),
            // A poisoned lock still holds a valid Arc.
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Replace the catalog wholesale.
    pub fn swap(&self, catalog: Catalog) {
        let next = Arc::new(catalog);
        match self.inner.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

/// Which signals produced a match's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// Embedding cosine and descriptor blend, 0.70 / 0.30 by default.
    EmbeddingAndDescriptor,
    /// No embedding on one side; descriptor blend alone.
    DescriptorOnly,
    /// No embedding and no shared descriptor field: score pinned to 0.
    NoComparableSignal,
}

/// Per-component score breakdown attached to each ranked match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_score: Option<f64>,
    pub descriptor_score: f64,
    pub blend: BlendMode,
}

/// One ranked catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    pub track_id: String,
    pub similarity: f64,
    pub components: ComponentScores,
}

/// Cosine similarity, defined only for two non-empty vectors of equal length
/// with non-zero norms. Range [-1, 1].
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x as f64 * y as f64;
        norm_a += x as f64 * x as f64;
        norm_b += y as f64 * y as f64;
    }
    if norm_a <= 0.0 || norm_b <= 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}

/// Tempo similarity: within 100 BPM maps linearly onto [0, 1].
fn tempo_similarity(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs() / 100.0).max(0.0)
}

/// Key/mode similarity: exact match on both or nothing.
fn key_mode_similarity(query: &DescriptorRecord, entry: &DescriptorRecord) -> Option<f64> {
    match (query.key, query.mode, entry.key, entry.mode) {
        (Some(qk), Some(qm), Some(ek), Some(em)) => {
            Some(if qk == ek && qm == em { 1.0 } else { 0.0 })
        }
        _ => None,
    }
}

fn energy_similarity(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs()).max(0.0)
}

fn brightness_similarity(a: f64, b: f64) -> f64 {
    (1.0 - (a - b).abs() / 2000.0).max(0.0)
}

fn both<T: Copy>(a: Option<T>, b: Option<T>) -> Option<(T, T)> {
    Some((a?, b?))
}

/// Weighted descriptor blend over the shared fields.
///
/// Returns the score in [0, 1] and whether any field was comparable. With no
/// shared fields the score is defined as 0.
pub fn descriptor_score(
    query: &DescriptorRecord,
    entry: &DescriptorRecord,
    weights: &RankingWeights,
) -> (f64, bool) {
    let components: [(f64, Option<f64>); 4] = [
        (
            weights.tempo,
            both(query.tempo_bpm, entry.tempo_bpm).map(|(a, b)| tempo_similarity(a, b)),
        ),
        (weights.key_mode, key_mode_similarity(query, entry)),
        (
            weights.energy,
            both(query.energy_rms, entry.energy_rms).map(|(a, b)| energy_similarity(a, b)),
        ),
        (
            weights.brightness,
            both(query.brightness_hz, entry.brightness_hz)
                .map(|(a, b)| brightness_similarity(a, b)),
        ),
    ];

    let mut weighted_sum = 0.0f64;
    let mut weight_total = 0.0f64;
    for (weight, score) in components {
        if let Some(score) = score {
            weighted_sum += weight * score;
            weight_total += weight;
        }
    }

    if weight_total <= 0.0 {
        (0.0, false)
    } else {
        (weighted_sum / weight_total, true)
    }
}

/// Score one catalog entry against the query.
pub fn score_pair(
    query: &DescriptorRecord,
    entry: &DescriptorRecord,
    weights: &RankingWeights,
) -> ComponentScores {
    let embedding_score = match (&query.embedding, &entry.embedding) {
        (Some(a), Some(b)) => cosine_similarity(a, b),
        _ => None,
    };
    let (desc_score, has_descriptor_signal) = descriptor_score(query, entry, weights);

    let blend = match (embedding_score.is_some(), has_descriptor_signal) {
        (true, _) => BlendMode::EmbeddingAndDescriptor,
        (false, true) => BlendMode::DescriptorOnly,
        (false, false) => BlendMode::NoComparableSignal,
    };

    ComponentScores {
        embedding_score,
        descriptor_score: desc_score,
        blend,
    }
}

fn final_score(components: &ComponentScores, weights: &RankingWeights) -> f64 {
    match components.blend {
        BlendMode::EmbeddingAndDescriptor => {
            let e = weights.embedding_blend;
            // embedding_score is always present in this mode
            let embedding = components.embedding_score.unwrap_or(0.0);
            e * embedding + (1.0 - e) * components.descriptor_score
        }
        BlendMode::DescriptorOnly => components.descriptor_score,
        BlendMode::NoComparableSignal => 0.0,
    }
}

/// Rank the catalog against a query descriptor and return the top `k`.
///
/// Ordering: similarity descending, ties broken by ascending track id.
/// An empty catalog yields an empty list; entries with no comparable signal
/// stay in the ranking with a score of 0 so totals remain explainable.
pub fn rank(
    query: &DescriptorRecord,
    catalog: &Catalog,
    top_k: usize,
    weights: &RankingWeights,
) -> Vec<RankedMatch> {
    let mut matches: Vec<RankedMatch> = catalog
        .iter()
        .map(|(track_id, entry)| {
            let components = score_pair(query, entry, weights);
            RankedMatch {
                track_id: track_id.clone(),
                similarity: final_score(&components, weights),
                components,
            }
        })
        .collect();

    matches.sort_by(|a, b| {
        b.similarity
            .total_cmp(&a.similarity)
            .then_with(|| a.track_id.cmp(&b.track_id))
    });
    matches.truncate(top_k);
    matches
}

#[cfg(test)]
mod tests;
