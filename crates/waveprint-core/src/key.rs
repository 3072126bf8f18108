//! Key and mode estimation via pitch-class profile correlation
//!
//! Krumhansl-Schmuckler style: the time-aggregated chroma profile is
//! correlated against both reference templates at all 12 rotations; the
//! best of the 24 candidates wins. Enumeration order is ascending rotation,
//! major before minor, and exact ties keep the first candidate, so the
//! result is deterministic.

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Krumhansl major key profile (C as tonic), re-normalized before use.
const MAJOR_PROFILE: [f64; 12] = [
    6.35, 2.23, 3.48, 2.33, 4.38, 4.09, 2.52, 5.19, 2.39, 3.66, 2.29, 2.88,
];

/// Krumhansl minor key profile (C as tonic), re-normalized before use.
const MINOR_PROFILE: [f64; 12] = [
    6.33, 2.68, 3.52, 5.38, 2.60, 3.53, 2.54, 4.75, 3.98, 2.69, 3.34, 3.17,
];

/// The 12 pitch classes, C through B.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PitchClass {
    C,
    Cs,
    D,
    Ds,
    E,
    F,
    Fs,
    G,
    Gs,
    A,
    As,
    B,
}

impl PitchClass {
    pub const ALL: [PitchClass; 12] = [
        PitchClass::C,
        PitchClass::Cs,
        PitchClass::D,
        PitchClass::Ds,
        PitchClass::E,
        PitchClass::F,
        PitchClass::Fs,
        PitchClass::G,
        PitchClass::Gs,
        PitchClass::A,
        PitchClass::As,
        PitchClass::B,
    ];

    pub fn from_index(index: usize) -> PitchClass {
        Self::ALL[index % 12]
    }

    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&p| p == self).unwrap_or(0)
    }

    pub fn name(self) -> &'static str {
        match self {
            PitchClass::C => "C",
            PitchClass::Cs => "C#",
            PitchClass::D => "D",
            PitchClass::Ds => "D#",
            PitchClass::E => "E",
            PitchClass::F => "F",
            PitchClass::Fs => "F#",
            PitchClass::G => "G",
            PitchClass::Gs => "G#",
            PitchClass::A => "A",
            PitchClass::As => "A#",
            PitchClass::B => "B",
        }
    }

    pub fn from_name(name: &str) -> Option<PitchClass> {
        Self::ALL.iter().copied().find(|p| p.name() == name)
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Major or minor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Major,
    Minor,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Major => "Major",
            Mode::Minor => "Minor",
        })
    }
}

/// Time-aggregated 12-bin pitch-class profile, normalized to sum 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneProfile(pub [f64; 12]);

impl ToneProfile {
    /// Aggregate a chroma matrix into a normalized profile.
    ///
    /// `weights` gives one weight per frame (default uniform); lengths must
    /// match. All-zero chroma yields `InvalidInput` since no profile exists.
    pub fn from_chroma(
        chroma: &[[f32; 12]],
        weights: Option<&[f32]>,
    ) -> Result<ToneProfile, AnalysisError> {
        if chroma.is_empty() {
            return Err(AnalysisError::invalid("empty chroma matrix"));
        }
        if let Some(w) = weights {
            if w.len() != chroma.len() {
                return Err(AnalysisError::invalid(format!(
                    "weight count {} does not match frame count {}",
                    w.len(),
                    chroma.len()
                )));
            }
        }

        let mut sums = [0.0f64; 12];
        for (i, frame) in chroma.iter().enumerate() {
            let w = weights.map(|w| w[i] as f64).unwrap_or(1.0);
            for (bin, &value) in frame.iter().enumerate() {
                sums[bin] += w * value as f64;
            }
        }

        let total: f64 = sums.iter().sum();
        if total <= 0.0 {
            return Err(AnalysisError::invalid(
                "chroma energy is zero, no tone profile",
            ));
        }
        for value in &mut sums {
            *value /= total;
        }
        Ok(ToneProfile(sums))
    }

    /// Rotate the profile by `semitones` upward (index i moves to i + k).
    pub fn rotated(&self, semitones: usize) -> ToneProfile {
        let mut out = [0.0f64; 12];
        for (i, &v) in self.0.iter().enumerate() {
            out[(i + semitones) % 12] = v;
        }
        ToneProfile(out)
    }
}

/// Estimated key with its correlation confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyEstimate {
    pub key: PitchClass,
    pub mode: Mode,
    /// Pearson correlation of the profile against the winning template, in [-1, 1].
    pub confidence: f64,
}

/// Estimate key and mode from a chroma matrix with optional per-frame weights.
pub fn estimate_key(
    chroma: &[[f32; 12]],
    weights: Option<&[f32]>,
) -> Result<KeyEstimate, AnalysisError> {
    let profile = ToneProfile::from_chroma(chroma, weights)?;
    Ok(estimate_key_from_profile(&profile))
}

/// Estimate key and mode from an already-aggregated tone profile.
pub fn estimate_key_from_profile(profile: &ToneProfile) -> KeyEstimate {
    let major = normalized(&MAJOR_PROFILE);
    let minor = normalized(&MINOR_PROFILE);

    let mut best = KeyEstimate {
        key: PitchClass::C,
        mode: Mode::Major,
        confidence: f64::NEG_INFINITY,
    };

    for rotation in 0..12 {
        for (mode, template) in [(Mode::Major, &major), (Mode::Minor, &minor)] {
            let rotated = rotate(template, rotation);
            let corr = pearson(&profile.0, &rotated);
            // Strict > keeps the first candidate on exact ties.
            if corr > best.confidence {
                best = KeyEstimate {
                    key: PitchClass::from_index(rotation),
                    mode,
                    confidence: corr,
                };
            }
        }
    }

    best
}

fn normalized(profile: &[f64; 12]) -> [f64; 12] {
    let total: f64 = profile.iter().sum();
    let mut out = *profile;
    for value in &mut out {
        *value /= total;
    }
    out
}

/// Rotate so index 0 of the template lands on pitch class `semitones`.
fn rotate(template: &[f64; 12], semitones: usize) -> [f64; 12] {
    let mut out = [0.0f64; 12];
    for (i, slot) in out.iter_mut().enumerate() {
        *slot = template[(i + 12 - semitones) % 12];
    }
    out
}

/// Pearson correlation coefficient. Zero variance on either side yields 0.
fn pearson(a: &[f64; 12], b: &[f64; 12]) -> f64 {
    let mean_a: f64 = a.iter().sum::<f64>() / 12.0;
    let mean_b: f64 = b.iter().sum::<f64>() / 12.0;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for i in 0..12 {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denom = (var_a * var_b).sqrt();
    if denom <= 0.0 {
        0.0
    } else {
        cov / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn profile_as_chroma(profile: &[f64; 12]) -> Vec<[f32; 12]> {
        let mut frame = [0.0f32; 12];
        for (i, &v) in profile.iter().enumerate() {
            frame[i] = v as f32;
        }
        vec![frame]
    }

    #[test]
    fn unrotated_major_template_is_c_major() {
        let estimate = estimate_key(&profile_as_chroma(&MAJOR_PROFILE), None).unwrap();
        assert_eq!(estimate.key, PitchClass::C);
        assert_eq!(estimate.mode, Mode::Major);
        assert_relative_eq!(estimate.confidence, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn unrotated_minor_template_is_c_minor() {
        let estimate = estimate_key(&profile_as_chroma(&MINOR_PROFILE), None).unwrap();
        assert_eq!(estimate.key, PitchClass::C);
        assert_eq!(estimate.mode, Mode::Minor);
        assert_relative_eq!(estimate.confidence, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn rotation_consistency_all_semitones() {
        let base = ToneProfile::from_chroma(&profile_as_chroma(&MAJOR_PROFILE), None).unwrap();
        for k in 0..12 {
            let rotated = base.rotated(k);
            let estimate = estimate_key_from_profile(&rotated);
            assert_eq!(estimate.key, PitchClass::from_index(k), "rotation {k}");
            assert_eq!(estimate.mode, Mode::Major);
            assert_relative_eq!(estimate.confidence, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn frame_weights_select_the_dominant_section() {
        // Frame 0 is G major material, frame 1 is C major material.
        let major = {
            let total: f64 = MAJOR_PROFILE.iter().sum();
            let mut out = MAJOR_PROFILE;
            for v in &mut out {
                *v /= total;
            }
            out
        };
        let g_major = ToneProfile(major).rotated(7);
        let mut chroma = profile_as_chroma(&g_major.0);
        chroma.extend(profile_as_chroma(&major));

        let weighted = estimate_key(&chroma, Some(&[1.0, 0.0])).unwrap();
        assert_eq!(weighted.key, PitchClass::G);

        let opposite = estimate_key(&chroma, Some(&[0.0, 1.0])).unwrap();
        assert_eq!(opposite.key, PitchClass::C);
    }

    #[test]
    fn empty_chroma_is_invalid_input() {
        assert!(matches!(
            estimate_key(&[], None),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn zero_energy_chroma_is_invalid_input() {
        assert!(matches!(
            estimate_key(&[[0.0; 12]], None),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn pitch_class_names_round_trip() {
        for pc in PitchClass::ALL {
            assert_eq!(PitchClass::from_name(pc.name()), Some(pc));
        }
    }
}
