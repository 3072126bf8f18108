//! Fingerprint hashing over the constellation map
//!
//! Pairs each anchor peak with up to `fan_out` later peaks inside the allowed
//! time-delta window; the (freq1, freq2, delta) triplet packs into a 64-bit
//! key used for exact-match indexing. Anchor time stays outside the key so
//! time-shifted copies of the same audio still collide.

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::peaks::Peak;
use serde::{Deserialize, Serialize};

/// One combinatorial hash: an anchor peak paired with a later target peak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintHash {
    /// Frequency bin of the anchor peak
    pub freq1: i16,
    /// Frequency bin of the target peak
    pub freq2: i16,
    /// Frames between anchor and target, within [min_delta, max_delta]
    pub time_delta: i32,
    /// Frame index of the anchor peak
    pub anchor_time: i32,
}

impl FingerprintHash {
    /// Pack (freq1, freq2, delta) into a stable 64-bit index key.
    pub fn key(&self) -> u64 {
        ((self.freq1 as u16 as u64) << 48)
            | ((self.freq2 as u16 as u64) << 32)
            | (self.time_delta as u32 as u64)
    }
}

/// Fingerprint hash generator.
pub struct HashGenerator {
    fan_out: usize,
    min_delta: i32,
    max_delta: i32,
}

impl HashGenerator {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            fan_out: config.fan_out,
            min_delta: config.min_time_delta,
            max_delta: config.max_time_delta,
        }
    }

    pub fn with_params(fan_out: usize, min_delta: i32, max_delta: i32) -> Self {
        Self {
            fan_out,
            min_delta,
            max_delta,
        }
    }

    /// Generate hashes from a peak set.
    ///
    /// Peaks are ordered by (time, freq) before pairing, so the output order
    /// (anchor time ascending, fan-out index ascending) is reproducible for a
    /// fixed peak set regardless of input order. Fewer than two peaks yield
    /// an empty sequence.
    pub fn generate(&self, peaks: &[Peak]) -> Result<Vec<FingerprintHash>, AnalysisError> {
        if self.min_delta > self.max_delta {
            return Err(AnalysisError::invalid(
                "time delta range must satisfy min <= max",
            ));
        }
        if peaks.len() < 2 {
            return Ok(Vec::new());
        }

        let mut ordered: Vec<&Peak> = peaks.iter().collect();
        ordered.sort_by_key(|p| (p.time, p.freq));

        let mut hashes = Vec::new();
        for (i, anchor) in ordered.iter().enumerate() {
            for target in ordered.iter().skip(i + 1).take(self.fan_out) {
                let delta = target.time - anchor.time;
                if delta < self.min_delta || delta > self.max_delta {
                    continue;
                }
                hashes.push(FingerprintHash {
                    freq1: anchor.freq,
                    freq2: target.freq,
                    time_delta: delta,
                    anchor_time: anchor.time,
                });
            }
        }

        Ok(hashes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peak(time: i32, freq: i16) -> Peak {
        Peak::new(time, freq, -10.0)
    }

    #[test]
    fn single_peak_yields_no_hashes() {
        let generator = HashGenerator::with_params(5, 0, 200);
        assert!(generator.generate(&[peak(3, 40)]).unwrap().is_empty());
    }

    #[test]
    fn pair_within_window_yields_one_hash() {
        let generator = HashGenerator::with_params(5, 0, 200);
        let hashes = generator.generate(&[peak(0, 40), peak(10, 55)]).unwrap();

        assert_eq!(hashes.len(), 1);
        let h = hashes[0];
        assert_eq!((h.freq1, h.freq2, h.time_delta, h.anchor_time), (40, 55, 10, 0));
    }

    #[test]
    fn delta_outside_window_is_rejected() {
        let generator = HashGenerator::with_params(5, 0, 5);
        let hashes = generator.generate(&[peak(0, 40), peak(10, 55)]).unwrap();
        assert!(hashes.is_empty());
    }

    #[test]
    fn hash_count_bounded_by_fanout() {
        let peaks: Vec<Peak> = (0..50).map(|i| peak(i, (i % 30) as i16)).collect();
        let fan_out = 5;
        let generator = HashGenerator::with_params(fan_out, 0, 200);
        let hashes = generator.generate(&peaks).unwrap();

        assert!(hashes.len() <= fan_out * (peaks.len() - 1));
        assert!(hashes
            .iter()
            .all(|h| h.time_delta >= 0 && h.time_delta <= 200));
    }

    #[test]
    fn output_order_is_anchor_then_fanout() {
        let peaks = vec![peak(20, 5), peak(0, 10), peak(10, 7)];
        let generator = HashGenerator::with_params(5, 0, 200);
        let hashes = generator.generate(&peaks).unwrap();

        let anchors: Vec<i32> = hashes.iter().map(|h| h.anchor_time).collect();
        let mut sorted = anchors.clone();
        sorted.sort();
        assert_eq!(anchors, sorted);
        // Within one anchor, targets appear in time order.
        assert_eq!(hashes[0].freq2, 7);
        assert_eq!(hashes[1].freq2, 5);
    }

    #[test]
    fn key_is_stable_and_ignores_anchor_time() {
        let a = FingerprintHash {
            freq1: 40,
            freq2: 55,
            time_delta: 10,
            anchor_time: 0,
        };
        let b = FingerprintHash { anchor_time: 77, ..a };
        assert_eq!(a.key(), b.key());

        let c = FingerprintHash { freq2: 56, ..a };
        assert_ne!(a.key(), c.key());
    }
}
