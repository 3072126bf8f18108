//! Configuration parameters for the analysis pipeline
//!
//! One flat struct holds every tuning constant so a catalog records the exact
//! parameters it was built with.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Analyzer configuration. `Default` gives the values the stock catalog is
/// built with; changing STFT or peak parameters invalidates stored hashes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    // Audio processing
    pub sample_rate: u32,
    /// Cap on analyzed audio, in seconds. Longer files are truncated.
    pub max_analysis_secs: f64,

    // Spectral transform
    pub fft_size: usize,
    pub hop_size: usize,

    // Peak extraction
    pub peak_time_window: usize,
    pub peak_freq_window: usize,
    /// Threshold in dB relative to the grid's global maximum (global max = 0 dB).
    pub peak_threshold_db: f32,

    // Fingerprint hashing
    pub fan_out: usize,
    pub min_time_delta: i32,
    pub max_time_delta: i32,

    // Descriptor extraction
    pub mfcc_coeffs: usize,
    pub mel_filters: usize,
    pub contrast_bands: usize,
    pub min_tempo_bpm: f64,
    pub max_tempo_bpm: f64,

    // Similarity ranking
    pub weights: RankingWeights,
}

/// Weights for the blended similarity score.
///
/// The four descriptor weights apply to fields present on both sides; missing
/// fields drop out of both the weighted sum and the weight total. When both
/// records carry an embedding, the final score is
/// `embedding_blend * cosine + (1 - embedding_blend) * descriptor_score`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RankingWeights {
    pub tempo: f64,
    pub key_mode: f64,
    pub energy: f64,
    pub brightness: f64,
    pub embedding_blend: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            tempo: 0.3,
            key_mode: 0.3,
            energy: 0.2,
            brightness: 0.2,
            embedding_blend: 0.70,
        }
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22050,
            max_analysis_secs: 30.0,

            fft_size: 2048,
            hop_size: 512,

            peak_time_window: 20,
            peak_freq_window: 20,
            peak_threshold_db: -60.0,

            fan_out: 5,
            min_time_delta: 0,
            max_time_delta: 200,

            mfcc_coeffs: 13,
            mel_filters: 26,
            contrast_bands: 6,
            min_tempo_bpm: 60.0,
            max_tempo_bpm: 180.0,

            weights: RankingWeights::default(),
        }
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.sample_rate == 0 {
            anyhow::bail!("sample_rate must be > 0");
        }
        if self.fft_size == 0 || !self.fft_size.is_power_of_two() {
            anyhow::bail!("fft_size must be a power of two");
        }
        if self.hop_size == 0 || self.hop_size > self.fft_size {
            anyhow::bail!("hop_size must be in 1..=fft_size");
        }
        if self.fan_out == 0 {
            anyhow::bail!("fan_out must be > 0");
        }
        if self.min_time_delta < 0 || self.min_time_delta > self.max_time_delta {
            anyhow::bail!("time delta range must satisfy 0 <= min <= max");
        }
        if self.min_tempo_bpm <= 0.0 || self.min_tempo_bpm >= self.max_tempo_bpm {
            anyhow::bail!("tempo range must satisfy 0 < min < max");
        }
        let w = &self.weights;
        if [w.tempo, w.key_mode, w.energy, w.brightness]
            .iter()
            .any(|&x| x < 0.0)
        {
            anyhow::bail!("descriptor weights must be non-negative");
        }
        if !(0.0..=1.0).contains(&w.embedding_blend) {
            anyhow::bail!("embedding_blend must be in [0, 1]");
        }
        Ok(())
    }

    /// Frames per second of the STFT grid.
    pub fn frame_rate(&self) -> f64 {
        self.sample_rate as f64 / self.hop_size as f64
    }
}
