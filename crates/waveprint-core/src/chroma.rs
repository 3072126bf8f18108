//! Chroma extraction
//!
//! Folds the STFT magnitude grid into per-frame 12-bin pitch-class energy,
//! collapsing octaves. Bin→pitch-class mapping uses equal temperament with
//! A4 = 440 Hz.

use crate::transform::Spectrogram;

/// Lowest frequency folded into the chromagram (below this, FFT bins are too
/// coarse to resolve semitones at a 2048-point window).
const MIN_CHROMA_HZ: f32 = 55.0;
/// Highest frequency folded into the chromagram.
const MAX_CHROMA_HZ: f32 = 4000.0;

/// Per-frame 12-bin pitch-class energy, `chroma[frame][pitch_class]`.
pub type ChromaMatrix = Vec<[f32; 12]>;

/// Pitch class (0 = C .. 11 = B) of a frequency in Hz, equal temperament.
pub fn pitch_class_of(freq: f32) -> Option<usize> {
    if freq < MIN_CHROMA_HZ || freq > MAX_CHROMA_HZ {
        return None;
    }
    // MIDI note = 69 + 12 log2(f / 440); note 60 is C4.
    let midi = 69.0 + 12.0 * (freq / 440.0).log2();
    let note = midi.round() as i32;
    Some(note.rem_euclid(12) as usize)
}

/// Fold a magnitude spectrogram into a chroma matrix.
///
/// Energy (squared magnitude) is accumulated so loud partials dominate the
/// profile the way they dominate perception of key.
pub fn compute_chroma(spectrogram: &Spectrogram) -> ChromaMatrix {
    let mut bin_classes: Vec<Option<usize>> = Vec::with_capacity(spectrogram.num_bins);
    for bin in 0..spectrogram.num_bins {
        bin_classes.push(pitch_class_of(spectrogram.bin_frequency(bin)));
    }

    spectrogram
        .magnitudes
        .iter()
        .map(|row| {
            let mut frame = [0.0f32; 12];
            for (bin, &magnitude) in row.iter().enumerate() {
                if let Some(class) = bin_classes[bin] {
                    frame[class] += magnitude * magnitude;
                }
            }
            frame
        })
        .collect()
}
