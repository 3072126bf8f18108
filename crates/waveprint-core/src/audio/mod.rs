//! Audio decoding and resampling
//!
//! Pure-Rust decoders for the formats catalogs are built from; everything is
//! mixed down to mono and resampled to the analysis rate before the pipeline
//! sees it.

mod decoder;
mod resample;

pub use decoder::{decode_audio, AudioData};
pub use resample::resample;

use std::path::Path;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Wav,
    Mp3,
    Flac,
    Ogg,
    Unknown,
}

impl AudioFormat {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("wav") | Some("wave") => AudioFormat::Wav,
            Some("mp3") => AudioFormat::Mp3,
            Some("flac") => AudioFormat::Flac,
            Some("ogg") => AudioFormat::Ogg,
            _ => AudioFormat::Unknown,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, AudioFormat::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_detection_by_extension() {
        assert_eq!(AudioFormat::from_path(Path::new("x/a.wav")), AudioFormat::Wav);
        assert_eq!(AudioFormat::from_path(Path::new("a.MP3")), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("a.flac")), AudioFormat::Flac);
        assert_eq!(AudioFormat::from_path(Path::new("a.ogg")), AudioFormat::Ogg);
        assert_eq!(AudioFormat::from_path(Path::new("a.mp4")), AudioFormat::Unknown);
        assert_eq!(AudioFormat::from_path(Path::new("noext")), AudioFormat::Unknown);
    }
}
