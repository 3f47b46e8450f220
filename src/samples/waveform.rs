// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The reference waveform and WAV file access.

use std::path::Path;
use std::time::Duration;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::info;

use crate::util::filename_display;

/// Error types for waveform file operations.
#[derive(Debug, thiserror::Error)]
pub enum WaveformError {
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("{0} has no audio channels")]
    NoChannels(String),

    #[error("Unsupported bit depth {0}")]
    UnsupportedBitDepth(u16),
}

/// A mono recording and the rate it was recorded at.
///
/// Once handed to the voice engine a waveform is shared behind an `Arc` and never modified.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: f64,
}

impl Waveform {
    /// Creates a new waveform.
    pub fn new(samples: Vec<f32>, sample_rate: f64) -> Waveform {
        Waveform {
            samples,
            sample_rate,
        }
    }

    /// Reads the first channel of a WAV file.
    pub fn from_wav_file(path: &Path) -> Result<Waveform, WaveformError> {
        let mut reader = WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err(WaveformError::NoChannels(filename_display(path).to_string()));
        }

        let channels = usize::from(spec.channels);
        let samples: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .samples::<f32>()
                .step_by(channels)
                .collect::<Result<Vec<f32>, hound::Error>>()?,
            SampleFormat::Int => {
                if spec.bits_per_sample == 0 || spec.bits_per_sample > 32 {
                    return Err(WaveformError::UnsupportedBitDepth(spec.bits_per_sample));
                }
                // Use i64 to avoid overflow for 32-bit samples.
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .step_by(channels)
                    .map(|sample| sample.map(|sample| sample as f32 * scale))
                    .collect::<Result<Vec<f32>, hound::Error>>()?
            }
        };

        info!(
            file = filename_display(path),
            channels = spec.channels,
            sample_rate = spec.sample_rate,
            frames = samples.len(),
            "Loaded waveform"
        );

        Ok(Waveform::new(samples, f64::from(spec.sample_rate)))
    }

    /// Gets the samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Gets the sample rate.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns the length of the waveform in time.
    pub fn duration(&self) -> Duration {
        if self.sample_rate <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / self.sample_rate)
    }
}

/// Writes interleaved 32-bit float audio to a WAV file.
pub fn write_wav_file(
    path: &Path,
    interleaved: &[f32],
    channels: u16,
    sample_rate: u32,
) -> Result<(), WaveformError> {
    if channels == 0 {
        return Err(WaveformError::NoChannels(filename_display(path).to_string()));
    }

    let mut writer = WavWriter::create(
        path,
        WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        },
    )?;
    for sample in interleaved {
        writer.write_sample(*sample)?;
    }
    writer.finalize()?;

    info!(
        file = filename_display(path),
        channels,
        sample_rate,
        frames = interleaved.len() / usize::from(channels),
        "Wrote WAV file"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let waveform = Waveform::new(vec![0.0; 22050], 44100.0);
        assert_eq!(Duration::from_millis(500), waveform.duration());
        assert_eq!(Duration::ZERO, Waveform::new(vec![0.0; 10], 0.0).duration());
    }

    #[test]
    fn test_float_wav_first_channel() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("stereo.wav");

        // Left channel counts up, right channel is constant.
        let interleaved: Vec<f32> = (0..100)
            .flat_map(|i| [i as f32 / 100.0, -0.5])
            .collect();
        write_wav_file(&path, &interleaved, 2, 48000)?;

        let waveform = Waveform::from_wav_file(&path)?;
        assert_eq!(48000.0, waveform.sample_rate());
        assert_eq!(100, waveform.len());
        for (i, sample) in waveform.samples().iter().enumerate() {
            assert_eq!(i as f32 / 100.0, *sample);
        }
        Ok(())
    }

    #[test]
    fn test_int_wav_is_scaled() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("mono16.wav");

        let mut writer = WavWriter::create(
            &path,
            WavSpec {
                channels: 1,
                sample_rate: 44100,
                bits_per_sample: 16,
                sample_format: SampleFormat::Int,
            },
        )?;
        writer.write_sample(i16::MAX)?;
        writer.write_sample(0i16)?;
        writer.write_sample(i16::MIN)?;
        writer.finalize()?;

        let waveform = Waveform::from_wav_file(&path)?;
        assert_eq!(3, waveform.len());
        assert!((waveform.samples()[0] - 1.0).abs() < 1e-4);
        assert_eq!(0.0, waveform.samples()[1]);
        assert_eq!(-1.0, waveform.samples()[2]);
        Ok(())
    }

    #[test]
    fn test_missing_file() {
        let result = Waveform::from_wav_file(Path::new("/nonexistent/calibration.wav"));
        assert!(matches!(result, Err(WaveformError::Wav(_))));
    }
}
