//! Waveprint Core - Audio Identification and Similarity Library
//!
//! Spectral-peak fingerprinting for exact lookup, plus per-track feature
//! descriptors (tempo, key, energy, brightness) and a multi-signal
//! similarity ranker that blends learned embeddings with descriptor
//! agreement.

pub mod audio;
pub mod chroma;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod features;
pub mod fingerprint;
pub mod jobs;
pub mod key;
pub mod matching;
pub mod peaks;
pub mod ranking;
pub mod transform;

pub use config::{AnalyzerConfig, RankingWeights};
pub use descriptor::{assemble_descriptor, DescriptorRecord};
pub use error::AnalysisError;
pub use fingerprint::{FingerprintHash, HashGenerator};
pub use key::{KeyEstimate, Mode, PitchClass};
pub use peaks::{Peak, PeakExtractor};
pub use ranking::{Catalog, CatalogHandle, RankedMatch};

use std::path::Path;

/// Complete analysis of one track: constellation hashes for exact lookup
/// and a descriptor record for similarity ranking.
#[derive(Debug, Clone)]
pub struct TrackAnalysis {
    pub hashes: Vec<FingerprintHash>,
    pub descriptor: DescriptorRecord,
}

/// Generate constellation fingerprints from an audio file.
pub fn generate_fingerprints(
    audio_path: &Path,
    config: &AnalyzerConfig,
) -> anyhow::Result<Vec<FingerprintHash>> {
    let audio_data = audio::decode_audio(audio_path, config.sample_rate)?;
    fingerprint_samples(&audio_data.samples, config).map_err(Into::into)
}

/// Decode a file and run the full analysis pipeline over it.
pub fn analyze_track(audio_path: &Path, config: &AnalyzerConfig) -> anyhow::Result<TrackAnalysis> {
    let audio_data = audio::decode_audio(audio_path, config.sample_rate)?;

    let descriptor = assemble_descriptor(&audio_data.samples, config.sample_rate, config)?;
    let hashes = fingerprint_samples(&audio_data.samples, config)?;

    Ok(TrackAnalysis {
        hashes,
        descriptor,
    })
}

fn fingerprint_samples(
    samples: &[f32],
    config: &AnalyzerConfig,
) -> Result<Vec<FingerprintHash>, AnalysisError> {
    let max_samples = (config.max_analysis_secs * config.sample_rate as f64) as usize;
    let samples = &samples[..samples.len().min(max_samples)];

    let spectrogram = transform::compute_spectrogram(samples, config)?;
    let peaks = PeakExtractor::new(config).extract(&spectrogram)?;
    HashGenerator::new(config).generate(&peaks)
}
