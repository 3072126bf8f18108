//! Per-track descriptor assembly
//!
//! One `DescriptorRecord` per track: tempo, key/mode, energy, brightness,
//! roughness, contrast, MFCC summary, plus an optional externally-supplied
//! embedding. Every field is independently nullable — a failed sub-extraction
//! is logged and skipped, never fatal to the record.

use crate::chroma::compute_chroma;
use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::features;
use crate::key::{estimate_key, KeyEstimate, Mode, PitchClass};
use crate::transform::compute_spectrogram;
use serde::{Deserialize, Serialize};

/// Rounding precision per field, in decimal places. Fixed so repeated runs on
/// identical input produce bit-identical records.
pub const TEMPO_DECIMALS: i32 = 1;
pub const ENERGY_DECIMALS: i32 = 4;
pub const BRIGHTNESS_DECIMALS: i32 = 1;
pub const ROUGHNESS_DECIMALS: i32 = 4;
pub const CONTRAST_DECIMALS: i32 = 3;
pub const MFCC_DECIMALS: i32 = 4;

/// Canonical per-track feature record. Immutable after assembly; keyed by a
/// stable track identifier in the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DescriptorRecord {
    /// Estimated tempo in BPM, 1 decimal.
    pub tempo_bpm: Option<f64>,
    pub key: Option<PitchClass>,
    pub mode: Option<Mode>,
    /// Key-estimate correlation in [-1, 1].
    pub key_confidence: Option<f64>,
    /// RMS energy, 4 decimals.
    pub energy_rms: Option<f64>,
    /// Spectral centroid in Hz, 1 decimal.
    pub brightness_hz: Option<f64>,
    /// Zero-crossing rate in [0, 1], 4 decimals.
    pub roughness_zcr: Option<f64>,
    /// Spectral contrast in dB, 3 decimals.
    pub contrast: Option<f64>,
    /// MFCC means, 4 decimals each.
    pub mfcc: Option<Vec<f64>>,
    /// Learned embedding, externally supplied (opaque 512-length vector).
    pub embedding: Option<Vec<f32>>,
}

impl DescriptorRecord {
    /// True when no descriptor field carries a value.
    pub fn is_empty(&self) -> bool {
        self.tempo_bpm.is_none()
            && self.key.is_none()
            && self.mode.is_none()
            && self.energy_rms.is_none()
            && self.brightness_hz.is_none()
            && self.roughness_zcr.is_none()
            && self.contrast.is_none()
            && self.mfcc.is_none()
            && self.embedding.is_none()
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

/// Assemble a descriptor record from a mono waveform.
///
/// The waveform is truncated to `max_analysis_secs` before analysis. An empty
/// or sub-window waveform is `InvalidInput`; anything after that is
/// best-effort per field.
pub fn assemble_descriptor(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalyzerConfig,
) -> Result<DescriptorRecord, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::invalid("empty waveform"));
    }
    if sample_rate != config.sample_rate {
        return Err(AnalysisError::invalid(format!(
            "waveform sample rate {} does not match configured {}",
            sample_rate, config.sample_rate
        )));
    }

    let max_samples = (config.max_analysis_secs * sample_rate as f64) as usize;
    let samples = &samples[..samples.len().min(max_samples)];

    // The spectrogram feeds every spectral field; without it we can still
    // report the time-domain ones.
    let spectrogram = match compute_spectrogram(samples, config) {
        Ok(spec) => Some(spec),
        Err(AnalysisError::InvalidInput(msg)) => {
            return Err(AnalysisError::invalid(msg));
        }
        Err(err) => {
            log::warn!("spectrogram failed, spectral fields unset: {err}");
            None
        }
    };

    let mut record = DescriptorRecord::default();

    match features::rms_energy(samples) {
        Ok(v) => record.energy_rms = Some(round_to(v, ENERGY_DECIMALS)),
        Err(err) => log::warn!("energy extraction failed: {err}"),
    }
    match features::zero_crossing_rate(samples) {
        Ok(v) => record.roughness_zcr = Some(round_to(v, ROUGHNESS_DECIMALS)),
        Err(err) => log::warn!("roughness extraction failed: {err}"),
    }

    if let Some(spec) = &spectrogram {
        match features::estimate_tempo(spec, config) {
            Ok(v) => record.tempo_bpm = Some(round_to(v, TEMPO_DECIMALS)),
            Err(err) => log::warn!("tempo estimation failed: {err}"),
        }
        match features::spectral_centroid(spec) {
            Ok(v) => record.brightness_hz = Some(round_to(v, BRIGHTNESS_DECIMALS)),
            Err(err) => log::warn!("brightness extraction failed: {err}"),
        }
        match features::spectral_contrast(spec, config.contrast_bands) {
            Ok(v) => record.contrast = Some(round_to(v, CONTRAST_DECIMALS)),
            Err(err) => log::warn!("contrast extraction failed: {err}"),
        }
        match features::mfcc_mean(spec, config.mel_filters, config.mfcc_coeffs) {
            Ok(v) => {
                record.mfcc = Some(v.into_iter().map(|c| round_to(c, MFCC_DECIMALS)).collect())
            }
            Err(err) => log::warn!("mfcc extraction failed: {err}"),
        }
        match estimate_key(&compute_chroma(spec), None) {
            Ok(KeyEstimate {
                key,
                mode,
                confidence,
            }) => {
                record.key = Some(key);
                record.mode = Some(mode);
                record.key_confidence = Some(round_to(confidence, 4));
            }
            Err(err) => log::warn!("key estimation failed: {err}"),
        }
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn empty_waveform_is_invalid_input() {
        let config = AnalyzerConfig::default();
        assert!(matches!(
            assemble_descriptor(&[], config.sample_rate, &config),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn sample_rate_mismatch_is_invalid_input() {
        let config = AnalyzerConfig::default();
        let samples = sine(440.0, 44100, 1.0);
        assert!(assemble_descriptor(&samples, 44100, &config).is_err());
    }

    #[test]
    fn sine_gets_core_fields() {
        let config = AnalyzerConfig::default();
        let samples = sine(440.0, config.sample_rate, 2.0);
        let record = assemble_descriptor(&samples, config.sample_rate, &config).unwrap();

        assert!(record.energy_rms.is_some());
        assert!(record.brightness_hz.is_some());
        assert!(record.roughness_zcr.is_some());
        assert!(record.mfcc.is_some());
        assert_eq!(record.key, Some(PitchClass::A));
        // Steady tone has no onsets: tempo may legitimately be unset.
    }

    #[test]
    fn repeated_assembly_is_bit_identical() {
        let config = AnalyzerConfig::default();
        let samples = sine(440.0, config.sample_rate, 2.0);
        let a = assemble_descriptor(&samples, config.sample_rate, &config).unwrap();
        let b = assemble_descriptor(&samples, config.sample_rate, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rounding_precision_applied() {
        let config = AnalyzerConfig::default();
        let samples = sine(440.0, config.sample_rate, 2.0);
        let record = assemble_descriptor(&samples, config.sample_rate, &config).unwrap();

        let energy = record.energy_rms.unwrap();
        assert_eq!(energy, round_to(energy, ENERGY_DECIMALS));
        let brightness = record.brightness_hz.unwrap();
        assert_eq!(brightness, round_to(brightness, BRIGHTNESS_DECIMALS));
    }

    #[test]
    fn default_record_is_empty() {
        assert!(DescriptorRecord::default().is_empty());
        let record = DescriptorRecord {
            tempo_bpm: Some(120.0),
            ..Default::default()
        };
        assert!(!record.is_empty());
    }
}
