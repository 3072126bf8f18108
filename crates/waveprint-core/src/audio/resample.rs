//! Sample rate conversion by linear interpolation.
//!
//! Analysis works on coarse spectral structure, so a windowed-sinc
//! resampler buys nothing here over linear interpolation.

use anyhow::Result;

/// Resample mono audio from one rate to another.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == 0 || to_rate == 0 {
        anyhow::bail!("invalid sample rate: {from_rate} -> {to_rate}");
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let out_len = (samples.len() as f64 / ratio).floor() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let src = i as f64 * ratio;
        let idx = src as usize;
        let frac = (src - idx as f64) as f32;
        let a = samples[idx];
        let b = if idx + 1 < samples.len() {
            samples[idx + 1]
        } else {
            a
        };
        out.push(a + (b - a) * frac);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_when_rates_match() {
        let input = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&input, 22050, 22050).unwrap(), input);
    }

    #[test]
    fn downsample_halves_length() {
        let input: Vec<f32> = (0..1000).map(|i| (i as f32 * 0.05).sin()).collect();
        let out = resample(&input, 44100, 22050).unwrap();
        assert_eq!(out.len(), 500);
    }

    #[test]
    fn upsample_interpolates_between_samples() {
        let input = vec![0.0, 1.0];
        let out = resample(&input, 100, 200).unwrap();
        assert_eq!(out.len(), 4);
        assert!((out[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn zero_rate_rejected() {
        assert!(resample(&[0.0], 0, 22050).is_err());
        assert!(resample(&[0.0], 22050, 0).is_err());
    }
}
