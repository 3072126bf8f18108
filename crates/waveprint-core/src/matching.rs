//! Exact fingerprint matching
//!
//! An inverted index from packed hash keys to (track, anchor time). A query
//! is matched by histogramming the anchor-time offsets per track: a genuine
//! match piles many hash hits onto one offset, noise scatters them.

use crate::fingerprint::FingerprintHash;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Minimum raw hash hits before a track is considered at all.
const MIN_RAW_HITS: usize = 5;
/// Minimum hits aligned to the best offset for a reported match.
const MIN_ALIGNED_HITS: usize = 5;
/// Tolerance around the best offset, in frames.
const OFFSET_TOLERANCE: i32 = 2;

/// A fingerprint match against one indexed track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintMatch {
    pub track_id: String,
    /// Hash hits aligned to the winning offset.
    pub aligned_hits: usize,
    /// Total raw hash hits for this track.
    pub raw_hits: usize,
    /// Frame offset of the query into the reference (reference minus query).
    pub offset_frames: i32,
}

/// Inverted fingerprint index over a set of reference tracks.
#[derive(Debug, Default)]
pub struct FingerprintIndex {
    /// hash key -> (track id, anchor frame)
    index: HashMap<u64, Vec<(String, i32)>>,
}

impl FingerprintIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a reference track's hashes to the index.
    pub fn add_track(&mut self, track_id: impl Into<String>, hashes: &[FingerprintHash]) {
        let track_id = track_id.into();
        for hash in hashes {
            self.index
                .entry(hash.key())
                .or_default()
                .push((track_id.clone(), hash.anchor_time));
        }
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Match query hashes against the index.
    ///
    /// Results are sorted by aligned hit count descending, track id ascending.
    /// An empty index or query yields an empty list.
    pub fn query(&self, query_hashes: &[FingerprintHash]) -> Vec<FingerprintMatch> {
        // offset histograms per track: track -> (offset -> count)
        let mut offsets: HashMap<&str, Vec<i32>> = HashMap::new();

        for hash in query_hashes {
            if let Some(candidates) = self.index.get(&hash.key()) {
                for (track_id, ref_time) in candidates {
                    offsets
                        .entry(track_id.as_str())
                        .or_default()
                        .push(ref_time - hash.anchor_time);
                }
            }
        }

        let mut matches = Vec::new();
        for (track_id, track_offsets) in offsets {
            let raw_hits = track_offsets.len();
            if raw_hits < MIN_RAW_HITS {
                log::trace!("skipping {track_id}: only {raw_hits} raw hits");
                continue;
            }

            let mut histogram: HashMap<i32, usize> = HashMap::new();
            for &offset in &track_offsets {
                *histogram.entry(offset).or_insert(0) += 1;
            }
            let best_offset = histogram
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then_with(|| b.0.cmp(a.0)))
                .map(|(&offset, _)| offset)
                .unwrap_or(0);

            let aligned_hits = track_offsets
                .iter()
                .filter(|&&o| (o - best_offset).abs() <= OFFSET_TOLERANCE)
                .count();
            if aligned_hits < MIN_ALIGNED_HITS {
                log::trace!(
                    "skipping {track_id}: best offset holds only {aligned_hits} hits"
                );
                continue;
            }

            log::debug!(
                "{track_id}: {raw_hits} raw hits, {aligned_hits} aligned at offset {best_offset}"
            );
            matches.push(FingerprintMatch {
                track_id: track_id.to_string(),
                aligned_hits,
                raw_hits,
                offset_frames: best_offset,
            });
        }

        matches.sort_by(|a, b| {
            b.aligned_hits
                .cmp(&a.aligned_hits)
                .then_with(|| a.track_id.cmp(&b.track_id))
        });
        matches
    }
}
