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

//! Windowed RMS envelopes.

/// Length of the RMS window in milliseconds.
pub const ENVELOPE_WINDOW_MS: f64 = 10.0;

/// An RMS energy envelope sampled at a reduced rate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Envelope {
    /// RMS value per hop.
    values: Vec<f32>,
    /// The rate at which envelope values occur (audio rate / hop size).
    sample_rate: f64,
    /// Audio samples between consecutive envelope values.
    hop_size: usize,
}

impl Envelope {
    /// Returns the RMS window size in audio samples for the given sample rate.
    pub fn window_size(sample_rate: f64) -> usize {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return 0;
        }
        (sample_rate * ENVELOPE_WINDOW_MS / 1000.0) as usize
    }

    /// Computes the RMS envelope of the samples with a 50% window overlap.
    ///
    /// Returns None if the sample rate is unusable or there isn't a full window of audio.
    pub fn compute(samples: &[f32], sample_rate: f64) -> Option<Envelope> {
        let window_size = Envelope::window_size(sample_rate);
        let hop_size = window_size / 2;

        if hop_size == 0 || samples.len() < window_size {
            return None;
        }

        let mut values = Vec::with_capacity(samples.len() / hop_size);
        let mut start = 0;
        while start + window_size <= samples.len() {
            let sum_squares: f32 = samples[start..start + window_size]
                .iter()
                .map(|sample| sample * sample)
                .sum();
            values.push((sum_squares / window_size as f32).sqrt());
            start += hop_size;
        }

        Some(Envelope {
            values,
            sample_rate: sample_rate / hop_size as f64,
            hop_size,
        })
    }

    /// Gets the envelope values.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Gets the envelope sample rate.
    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Gets the hop size in audio samples.
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the index and value of the first maximum.
    pub fn peak(&self) -> Option<(usize, f32)> {
        let mut peak: Option<(usize, f32)> = None;
        for (index, &value) in self.values.iter().enumerate() {
            match peak {
                Some((_, max)) if value <= max => {}
                _ => peak = Some((index, value)),
            }
        }
        peak
    }

    /// Converts an audio sample index into an envelope index.
    pub fn index_for_sample(&self, sample_index: usize) -> usize {
        sample_index / self.hop_size.max(1)
    }

    /// Finds the first index at or after `start` whose value is at or above the threshold.
    pub fn first_at_or_above(&self, threshold: f32, start: usize) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, &value)| value >= threshold)
            .map(|(index, _)| index)
    }

    /// Finds the first index at or after `start` whose value is at or below the threshold.
    pub fn first_at_or_below(&self, threshold: f32, start: usize) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .skip(start)
            .find(|(_, &value)| value <= threshold)
            .map(|(index, _)| index)
    }

    /// Converts a span of envelope samples into seconds.
    pub fn seconds(&self, envelope_samples: usize) -> f32 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        (envelope_samples as f64 / self.sample_rate) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_size() {
        assert_eq!(441, Envelope::window_size(44100.0));
        assert_eq!(480, Envelope::window_size(48000.0));
        assert_eq!(0, Envelope::window_size(0.0));
        assert_eq!(0, Envelope::window_size(-44100.0));
        assert_eq!(0, Envelope::window_size(f64::NAN));
    }

    #[test]
    fn test_constant_signal_envelope() {
        let samples = vec![0.5f32; 4800];
        let envelope = Envelope::compute(&samples, 48000.0).expect("expected envelope");

        assert_eq!(240, envelope.hop_size());
        assert_eq!(200.0, envelope.sample_rate());
        // Windows start every 240 samples and must fit entirely: (4800 - 480) / 240 + 1.
        assert_eq!(19, envelope.len());
        for value in envelope.values() {
            assert!((value - 0.5).abs() < 1e-5);
        }
    }

    #[test]
    fn test_too_short_for_window() {
        assert!(Envelope::compute(&[0.5; 100], 48000.0).is_none());
        assert!(Envelope::compute(&[], 48000.0).is_none());
        // One sample per window means a zero hop, which can't be stepped.
        assert!(Envelope::compute(&[0.5; 100], 100.0).is_none());
    }

    #[test]
    fn test_threshold_search() {
        let envelope = Envelope {
            values: vec![0.0, 0.2, 0.9, 1.0, 0.5, 0.05, 0.0],
            sample_rate: 200.0,
            hop_size: 240,
        };

        assert_eq!(Some((3, 1.0)), envelope.peak());
        assert_eq!(Some(2), envelope.first_at_or_above(0.9, 0));
        assert_eq!(Some(3), envelope.first_at_or_above(0.9, 3));
        assert_eq!(None, envelope.first_at_or_above(1.5, 0));
        assert_eq!(Some(5), envelope.first_at_or_below(0.1, 3));
        assert_eq!(Some(0), envelope.first_at_or_below(0.1, 0));
        assert_eq!(None, envelope.first_at_or_below(0.1, 10));
        assert_eq!(4, envelope.index_for_sample(960));
        assert!((envelope.seconds(20) - 0.1).abs() < 1e-6);
    }
}
