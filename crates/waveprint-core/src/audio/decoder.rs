//! Audio decoding for WAV, MP3, FLAC and OGG

use super::{resample, AudioFormat};
use anyhow::{Context, Result};
use std::path::Path;

/// Decoded audio, interleaved when multi-channel.
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u32,
}

impl AudioData {
    /// Mix down to mono by averaging channels.
    pub fn to_mono(&self) -> Vec<f32> {
        if self.channels <= 1 {
            return self.samples.clone();
        }
        self.samples
            .chunks(self.channels as usize)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    }

    fn duration_ms_of(samples: usize, sample_rate: u32, channels: u16) -> u32 {
        if sample_rate == 0 || channels == 0 {
            return 0;
        }
        (samples as f64 / (sample_rate as f64 * channels as f64) * 1000.0) as u32
    }
}

/// Decode an audio file to mono at the target sample rate.
pub fn decode_audio(path: &Path, target_sample_rate: u32) -> Result<AudioData> {
    if !path.exists() {
        anyhow::bail!("audio file not found: {}", path.display());
    }

    let decoded = match AudioFormat::from_path(path) {
        AudioFormat::Wav => decode_wav(path)?,
        AudioFormat::Mp3 => decode_mp3(path)?,
        AudioFormat::Flac => decode_flac(path)?,
        AudioFormat::Ogg => decode_ogg(path)?,
        AudioFormat::Unknown => {
            anyhow::bail!("unsupported audio format: {}", path.display());
        }
    };

    let duration_ms = decoded.duration_ms;
    let mono = decoded.to_mono();
    let samples = if decoded.sample_rate != target_sample_rate {
        resample(&mono, decoded.sample_rate, target_sample_rate)?
    } else {
        mono
    };

    Ok(AudioData {
        samples,
        sample_rate: target_sample_rate,
        channels: 1,
        duration_ms,
    })
}

fn decode_wav(path: &Path) -> Result<AudioData> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("failed to open WAV file: {}", path.display()))?;

    let spec = reader.spec();
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => {
            reader.samples::<f32>().collect::<Result<Vec<_>, _>>()?
        }
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<Vec<_>, _>>()?
        }
    };

    Ok(AudioData {
        duration_ms: AudioData::duration_ms_of(samples.len(), spec.sample_rate, spec.channels),
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}

fn decode_mp3(path: &Path) -> Result<AudioData> {
    let data = std::fs::read(path)
        .with_context(|| format!("failed to read MP3 file: {}", path.display()))?;

    let mut decoder = minimp3::Decoder::new(&data[..]);
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;
    let mut channels = 0u16;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                if sample_rate == 0 {
                    sample_rate = frame.sample_rate as u32;
                    channels = frame.channels as u16;
                }
                samples.extend(frame.data.iter().map(|&s| s as f32 / 32768.0));
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => anyhow::bail!("MP3 decode error in {}: {e}", path.display()),
        }
    }
    if sample_rate == 0 {
        anyhow::bail!("no decodable MP3 frames in {}", path.display());
    }

    Ok(AudioData {
        duration_ms: AudioData::duration_ms_of(samples.len(), sample_rate, channels),
        samples,
        sample_rate,
        channels,
    })
}

fn decode_flac(path: &Path) -> Result<AudioData> {
    let mut reader = claxon::FlacReader::open(path)
        .with_context(|| format!("failed to open FLAC file: {}", path.display()))?;

    let info = reader.streaminfo();
    let sample_rate = info.sample_rate;
    let channels = info.channels as u16;
    let max_val = (1i64 << (info.bits_per_sample - 1)) as f32;

    let samples: Vec<f32> = reader
        .samples()
        .map(|s| s.map(|v| v as f32 / max_val))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AudioData {
        duration_ms: AudioData::duration_ms_of(samples.len(), sample_rate, channels),
        samples,
        sample_rate,
        channels,
    })
}

fn decode_ogg(path: &Path) -> Result<AudioData> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open OGG file: {}", path.display()))?;

    let mut reader = lewton::inside_ogg::OggStreamReader::new(file)?;
    let sample_rate = reader.ident_hdr.audio_sample_rate;
    let channels = reader.ident_hdr.audio_channels as u16;

    let mut samples = Vec::new();
    while let Some(packet) = reader.read_dec_packet_itl()? {
        samples.extend(packet.iter().map(|&s| s as f32 / 32768.0));
    }

    Ok(AudioData {
        duration_ms: AudioData::duration_ms_of(samples.len(), sample_rate, channels),
        samples,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stereo_mixdown_averages_channels() {
        let audio = AudioData {
            samples: vec![1.0, 0.0, 0.5, 0.5, -1.0, 1.0],
            sample_rate: 22050,
            channels: 2,
            duration_ms: 0,
        };
        assert_eq!(audio.to_mono(), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn wav_round_trip_through_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for i in 0..44100u32 {
            let s = ((i as f32 * 0.01).sin() * 20000.0) as i16;
            writer.write_sample(s).unwrap();
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let audio = decode_audio(&path, 22050).unwrap();
        assert_eq!(audio.channels, 1);
        assert_eq!(audio.sample_rate, 22050);
        // One second of stereo 44.1 kHz becomes one second of mono 22.05 kHz.
        assert!((audio.samples.len() as i64 - 22050).unsigned_abs() < 10);
        assert_eq!(audio.duration_ms, 1000);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(decode_audio(Path::new("/nonexistent/x.wav"), 22050).is_err());
    }
}
