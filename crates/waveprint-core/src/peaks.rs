//! Constellation peak extraction using 2D max filtering
//!
//! A cell is a peak iff it equals the maximum over its clamped neighborhood
//! and exceeds the dB threshold relative to the grid's global maximum.

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::transform::Spectrogram;
use serde::{Deserialize, Serialize};

/// A spectral peak: one point of the constellation map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Time index (frame number)
    pub time: i32,
    /// Frequency bin index
    pub freq: i16,
    /// Magnitude in dB relative to the grid maximum
    pub magnitude_db: f32,
}

impl Peak {
    pub fn new(time: i32, freq: i16, magnitude_db: f32) -> Self {
        Self {
            time,
            freq,
            magnitude_db,
        }
    }
}

/// Peak extractor over a magnitude grid.
pub struct PeakExtractor {
    time_window: usize,
    freq_window: usize,
    threshold_db: f32,
}

impl PeakExtractor {
    pub fn new(config: &AnalyzerConfig) -> Self {
        Self {
            time_window: config.peak_time_window,
            freq_window: config.peak_freq_window,
            threshold_db: config.peak_threshold_db,
        }
    }

    pub fn with_params(time_window: usize, freq_window: usize, threshold_db: f32) -> Self {
        Self {
            time_window,
            freq_window,
            threshold_db,
        }
    }

    /// Extract peaks from a spectrogram.
    ///
    /// An empty grid, or a threshold nothing reaches, yields an empty vec.
    pub fn extract(&self, spectrogram: &Spectrogram) -> Result<Vec<Peak>, AnalysisError> {
        let db_grid = spectrogram.to_db();
        self.extract_from_db(&db_grid)
    }

    /// Extract peaks from a grid already in dB relative to its maximum.
    pub fn extract_from_db(&self, grid: &[Vec<f32>]) -> Result<Vec<Peak>, AnalysisError> {
        if grid.is_empty() {
            return Ok(Vec::new());
        }
        let num_bins = grid[0].len();
        if grid.iter().any(|row| row.len() != num_bins) {
            return Err(AnalysisError::invalid(
                "magnitude grid rows have inconsistent lengths",
            ));
        }
        if num_bins == 0 {
            return Ok(Vec::new());
        }

        let max_filtered = self.apply_2d_max_filter(grid, num_bins);
        Ok(self.find_local_maxima(grid, &max_filtered))
    }

    /// Apply 2D max filter, frequency dimension first, then time.
    ///
    /// Separable because max is associative; edges use a truncated window
    /// (no wraparound).
    fn apply_2d_max_filter(&self, grid: &[Vec<f32>], num_bins: usize) -> Vec<Vec<f32>> {
        let num_frames = grid.len();

        let mut freq_filtered = vec![vec![0.0f32; num_bins]; num_frames];
        for t in 0..num_frames {
            for f in 0..num_bins {
                let f_start = f.saturating_sub(self.freq_window / 2);
                let f_end = (f + self.freq_window / 2 + 1).min(num_bins);

                freq_filtered[t][f] = grid[t][f_start..f_end]
                    .iter()
                    .fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
            }
        }

        let mut time_filtered = vec![vec![0.0f32; num_bins]; num_frames];
        for t in 0..num_frames {
            let t_start = t.saturating_sub(self.time_window / 2);
            let t_end = (t + self.time_window / 2 + 1).min(num_frames);

            for f in 0..num_bins {
                time_filtered[t][f] = (t_start..t_end)
                    .map(|ti| freq_filtered[ti][f])
                    .fold(f32::NEG_INFINITY, f32::max);
            }
        }

        time_filtered
    }

    /// A cell is a peak iff it equals the filtered maximum and clears the
    /// threshold. Equal-valued plateau cells all qualify; the equality test
    /// against the shared neighborhood max cannot emit duplicates.
    fn find_local_maxima(&self, grid: &[Vec<f32>], max_filtered: &[Vec<f32>]) -> Vec<Peak> {
        let mut peaks = Vec::new();

        for (t, row) in grid.iter().enumerate() {
            for (f, &value) in row.iter().enumerate() {
                if value > self.threshold_db && value == max_filtered[t][f] {
                    peaks.push(Peak::new(t as i32, f as i16, value));
                }
            }
        }

        peaks
    }
}
