//! Short-time Fourier transform
//!
//! Produces the magnitude grid every downstream stage consumes: peak
//! extraction, chroma folding, and the spectral descriptors.

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use rustfft::{num_complex::Complex, FftPlanner};
use std::f32::consts::PI;

/// Magnitude spectrogram, `magnitudes[frame][bin]`, linear scale.
///
/// Immutable once produced; owned by the pipeline invocation that created it.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub magnitudes: Vec<Vec<f32>>,
    pub num_frames: usize,
    pub num_bins: usize,
    pub sample_rate: u32,
    pub fft_size: usize,
    pub hop_size: usize,
}

impl Spectrogram {
    /// Center frequency of an FFT bin in Hz.
    pub fn bin_frequency(&self, bin: usize) -> f32 {
        bin as f32 * self.sample_rate as f32 / self.fft_size as f32
    }

    /// Convert the grid to dB relative to its global maximum (max = 0 dB).
    ///
    /// An all-zero grid maps every cell to the floor value.
    pub fn to_db(&self) -> Vec<Vec<f32>> {
        const DB_FLOOR: f32 = -100.0;
        let global_max = self
            .magnitudes
            .iter()
            .flat_map(|row| row.iter().copied())
            .fold(0.0f32, f32::max);

        self.magnitudes
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&m| {
                        if global_max <= 0.0 || m <= 0.0 {
                            DB_FLOOR
                        } else {
                            (20.0 * (m / global_max).log10()).max(DB_FLOOR)
                        }
                    })
                    .collect()
            })
            .collect()
    }
}

/// Compute the STFT magnitude spectrogram of a mono waveform.
///
/// Frames shorter than a full FFT window at the tail are zero-padded. A
/// waveform shorter than one window yields `InvalidInput`.
pub fn compute_spectrogram(
    samples: &[f32],
    config: &AnalyzerConfig,
) -> Result<Spectrogram, AnalysisError> {
    let fft_size = config.fft_size;
    let hop_size = config.hop_size;

    if samples.len() < fft_size {
        return Err(AnalysisError::invalid(format!(
            "waveform too short: {} samples, need at least {}",
            samples.len(),
            fft_size
        )));
    }

    let num_frames = 1 + (samples.len() - fft_size) / hop_size;
    let num_bins = fft_size / 2 + 1;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);
    let window = hann_window(fft_size);

    let mut magnitudes = Vec::with_capacity(num_frames);
    let mut frame = vec![Complex::new(0.0f32, 0.0); fft_size];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop_size;
        for (i, slot) in frame.iter_mut().enumerate() {
            let sample = samples.get(start + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * window[i], 0.0);
        }

        fft.process(&mut frame);

        magnitudes.push(frame[..num_bins].iter().map(|c| c.norm()).collect());
    }

    Ok(Spectrogram {
        magnitudes,
        num_frames,
        num_bins,
        sample_rate: config.sample_rate,
        fft_size,
        hop_size,
    })
}

/// Hann window of the given size.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let x = i as f32 / (size - 1) as f32;
            0.5 * (1.0 - (2.0 * PI * x).cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f32, sample_rate: u32, secs: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * secs) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn hann_window_endpoints() {
        let window = hann_window(512);
        assert_relative_eq!(window[0], 0.0, epsilon = 1e-3);
        assert_relative_eq!(window[256], 1.0, epsilon = 1e-2);
    }

    #[test]
    fn sine_energy_lands_in_expected_bin() {
        let config = AnalyzerConfig::default();
        let samples = sine(1000.0, config.sample_rate, 1.0);
        let spec = compute_spectrogram(&samples, &config).unwrap();

        // Middle frame, strongest bin should be near 1 kHz.
        let frame = &spec.magnitudes[spec.num_frames / 2];
        let peak_bin = frame
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let peak_freq = spec.bin_frequency(peak_bin);
        assert!((peak_freq - 1000.0).abs() < 30.0, "peak at {peak_freq} Hz");
    }

    #[test]
    fn short_waveform_is_invalid_input() {
        let config = AnalyzerConfig::default();
        let result = compute_spectrogram(&[0.0; 100], &config);
        assert!(matches!(
            result,
            Err(crate::error::AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn db_grid_tops_out_at_zero() {
        let config = AnalyzerConfig::default();
        let samples = sine(440.0, config.sample_rate, 0.5);
        let spec = compute_spectrogram(&samples, &config).unwrap();
        let db = spec.to_db();

        let max_db = db
            .iter()
            .flat_map(|row| row.iter().copied())
            .fold(f32::NEG_INFINITY, f32::max);
        assert_relative_eq!(max_db, 0.0, epsilon = 1e-4);
    }
}
