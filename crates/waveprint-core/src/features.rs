//! Scalar and timbre descriptor extraction
//!
//! Each function is a small pure primitive over the waveform or spectrogram;
//! the descriptor assembler calls them independently so one failure cannot
//! take down the rest of the record.

use crate::config::AnalyzerConfig;
use crate::error::AnalysisError;
use crate::transform::Spectrogram;
use std::f64::consts::PI;

/// Root-mean-square energy of the waveform.
pub fn rms_energy(samples: &[f32]) -> Result<f64, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::invalid("empty waveform"));
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    Ok((sum_sq / samples.len() as f64).sqrt())
}

/// Zero-crossing rate: fraction of adjacent sample pairs changing sign, in [0, 1].
pub fn zero_crossing_rate(samples: &[f32]) -> Result<f64, AnalysisError> {
    if samples.len() < 2 {
        return Err(AnalysisError::invalid("waveform too short for ZCR"));
    }
    let crossings = samples
        .windows(2)
        .filter(|w| (w[0] >= 0.0) != (w[1] >= 0.0))
        .count();
    Ok(crossings as f64 / (samples.len() - 1) as f64)
}

/// Spectral centroid in Hz, averaged over frames: the brightness descriptor.
///
/// Silent frames contribute nothing; an entirely silent grid is a primitive
/// failure since no centroid exists.
pub fn spectral_centroid(spectrogram: &Spectrogram) -> Result<f64, AnalysisError> {
    let mut centroid_sum = 0.0f64;
    let mut frames_counted = 0usize;

    for row in &spectrogram.magnitudes {
        let total: f64 = row.iter().map(|&m| m as f64).sum();
        if total <= 0.0 {
            continue;
        }
        let weighted: f64 = row
            .iter()
            .enumerate()
            .map(|(bin, &m)| spectrogram.bin_frequency(bin) as f64 * m as f64)
            .sum();
        centroid_sum += weighted / total;
        frames_counted += 1;
    }

    if frames_counted == 0 {
        return Err(AnalysisError::primitive(
            "spectral centroid",
            "no frames with energy",
        ));
    }
    Ok(centroid_sum / frames_counted as f64)
}

/// Spectral contrast: mean peak-to-valley difference in dB across octave
/// bands starting at 200 Hz. Higher values mean more tonal texture.
pub fn spectral_contrast(
    spectrogram: &Spectrogram,
    num_bands: usize,
) -> Result<f64, AnalysisError> {
    const QUANTILE: f64 = 0.2;
    const EPS: f64 = 1e-10;

    if num_bands == 0 {
        return Err(AnalysisError::invalid("contrast needs at least one band"));
    }

    let mut band_edges = Vec::with_capacity(num_bands + 1);
    let mut edge = 200.0f32;
    for _ in 0..=num_bands {
        band_edges.push(edge);
        edge *= 2.0;
    }

    let mut contrast_sum = 0.0f64;
    let mut contrast_count = 0usize;

    for row in &spectrogram.magnitudes {
        for band in 0..num_bands {
            let lo = band_edges[band];
            let hi = band_edges[band + 1];

            let mut band_mags: Vec<f64> = (0..spectrogram.num_bins)
                .filter(|&bin| {
                    let f = spectrogram.bin_frequency(bin);
                    f >= lo && f < hi
                })
                .map(|bin| row[bin] as f64)
                .collect();
            if band_mags.len() < 2 {
                continue;
            }
            band_mags.sort_by(|a, b| a.total_cmp(b));

            let take = ((band_mags.len() as f64 * QUANTILE).ceil() as usize).max(1);
            let valley: f64 = band_mags[..take].iter().sum::<f64>() / take as f64;
            let peak: f64 =
                band_mags[band_mags.len() - take..].iter().sum::<f64>() / take as f64;

            contrast_sum += 20.0 * ((peak + EPS) / (valley + EPS)).log10();
            contrast_count += 1;
        }
    }

    if contrast_count == 0 {
        return Err(AnalysisError::primitive(
            "spectral contrast",
            "no bands with enough bins",
        ));
    }
    Ok(contrast_sum / contrast_count as f64)
}

/// MFCC summary: mean of each of the first `num_coeffs` coefficients across
/// frames. Uses a triangular mel filterbank and an orthogonal DCT-II.
pub fn mfcc_mean(
    spectrogram: &Spectrogram,
    num_filters: usize,
    num_coeffs: usize,
) -> Result<Vec<f64>, AnalysisError> {
    const EPS: f64 = 1e-10;

    if num_coeffs == 0 || num_filters < num_coeffs {
        return Err(AnalysisError::invalid(
            "mel filter count must be >= coefficient count > 0",
        ));
    }
    if spectrogram.num_frames == 0 {
        return Err(AnalysisError::primitive("mfcc", "empty spectrogram"));
    }

    let filterbank = mel_filterbank(
        num_filters,
        spectrogram.num_bins,
        spectrogram.fft_size,
        spectrogram.sample_rate,
    );

    let mut coeff_sums = vec![0.0f64; num_coeffs];
    for row in &spectrogram.magnitudes {
        // Log mel energies for this frame.
        let log_mel: Vec<f64> = filterbank
            .iter()
            .map(|filter| {
                let energy: f64 = filter
                    .iter()
                    .zip(row.iter())
                    .map(|(&w, &m)| w * (m as f64) * (m as f64))
                    .sum();
                (energy + EPS).ln()
            })
            .collect();

        // DCT-II, orthonormal scaling.
        let n = num_filters as f64;
        for (k, sum) in coeff_sums.iter_mut().enumerate() {
            let mut acc = 0.0f64;
            for (m, &x) in log_mel.iter().enumerate() {
                acc += x * (PI * k as f64 * (m as f64 + 0.5) / n).cos();
            }
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            *sum += scale * acc;
        }
    }

    for sum in &mut coeff_sums {
        *sum /= spectrogram.num_frames as f64;
    }
    Ok(coeff_sums)
}

/// Tempo in BPM from a spectral-flux onset envelope autocorrelated over the
/// configured BPM range.
pub fn estimate_tempo(
    spectrogram: &Spectrogram,
    config: &AnalyzerConfig,
) -> Result<f64, AnalysisError> {
    let envelope = onset_envelope(spectrogram);
    let frame_rate = config.frame_rate();

    // Lag bounds: fast tempo = short lag.
    let min_lag = (60.0 * frame_rate / config.max_tempo_bpm).floor() as usize;
    let max_lag = (60.0 * frame_rate / config.min_tempo_bpm).ceil() as usize;

    if envelope.len() <= max_lag * 2 {
        return Err(AnalysisError::primitive(
            "tempo",
            format!(
                "onset envelope too short ({} frames) for lag search up to {}",
                envelope.len(),
                max_lag
            ),
        ));
    }

    let mean = envelope.iter().sum::<f64>() / envelope.len() as f64;
    let centered: Vec<f64> = envelope.iter().map(|&v| v - mean).collect();
    let energy: f64 = centered.iter().map(|&v| v * v).sum();
    if energy <= 0.0 {
        return Err(AnalysisError::primitive("tempo", "flat onset envelope"));
    }

    let mut best_lag = min_lag.max(1);
    let mut best_corr = f64::NEG_INFINITY;
    for lag in min_lag.max(1)..=max_lag {
        let corr: f64 = centered[lag..]
            .iter()
            .zip(centered.iter())
            .map(|(&a, &b)| a * b)
            .sum::<f64>()
            / energy;
        if corr > best_corr {
            best_corr = corr;
            best_lag = lag;
        }
    }

    Ok(60.0 * frame_rate / best_lag as f64)
}

/// Onset strength per frame: positive spectral flux summed across bins.
fn onset_envelope(spectrogram: &Spectrogram) -> Vec<f64> {
    let mut envelope = Vec::with_capacity(spectrogram.num_frames);
    let mut prev: Option<&Vec<f32>> = None;
    for row in &spectrogram.magnitudes {
        let flux = match prev {
            Some(p) => row
                .iter()
                .zip(p.iter())
                .map(|(&cur, &old)| f64::from(cur - old).max(0.0))
                .sum(),
            None => 0.0,
        };
        envelope.push(flux);
        prev = Some(row);
    }
    envelope
}

/// Triangular mel filterbank, `filters[filter][bin]`.
fn mel_filterbank(
    num_filters: usize,
    num_bins: usize,
    fft_size: usize,
    sample_rate: u32,
) -> Vec<Vec<f64>> {
    fn hz_to_mel(hz: f64) -> f64 {
        2595.0 * (1.0 + hz / 700.0).log10()
    }
    fn mel_to_hz(mel: f64) -> f64 {
        700.0 * (10.0f64.powf(mel / 2595.0) - 1.0)
    }

    let max_hz = sample_rate as f64 / 2.0;
    let max_mel = hz_to_mel(max_hz);

    // num_filters triangles need num_filters + 2 edge points.
    let edges_hz: Vec<f64> = (0..num_filters + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (num_filters + 1) as f64))
        .collect();
    let hz_per_bin = sample_rate as f64 / fft_size as f64;

    (0..num_filters)
        .map(|f| {
            let (lo, center, hi) = (edges_hz[f], edges_hz[f + 1], edges_hz[f + 2]);
            (0..num_bins)
                .map(|bin| {
                    let freq = bin as f64 * hz_per_bin;
                    if freq <= lo || freq >= hi {
                        0.0
                    } else if freq <= center {
                        (freq - lo) / (center - lo)
                    } else {
                        (hi - freq) / (hi - center)
                    }
                })
                .collect()
        })
        .collect()
}
