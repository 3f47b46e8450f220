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

//! Note-off detection for recordings where the key release time wasn't captured.
//!
//! The longest low-variation run after the peak is taken to be the sustain plateau, and the
//! key is assumed to have been released where that run ends.

use tracing::debug;

use super::envelope::Envelope;

/// Number of envelope samples examined per stability window.
pub const STABILITY_WINDOW: usize = 10;

/// Maximum (max - min) / peak inside a window for it to count as stable.
pub const STABILITY_THRESHOLD: f32 = 0.05;

/// A detected note-off this close to the end of the envelope isn't trusted.
pub const END_GUARD: usize = 10;

/// Default position of the fallback note-off, as a fraction of the envelope length.
pub const DEFAULT_FALLBACK_FRACTION: f32 = 0.6;

/// Policy for placing the note-off when the sustain plateau can't be trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteOffPolicy {
    /// Fraction of the envelope length used when detection lands too close to the end.
    fallback_fraction: f32,
}

impl NoteOffPolicy {
    /// Creates a policy with the given fallback fraction, clamped into [0, 1].
    pub fn new(fallback_fraction: f32) -> NoteOffPolicy {
        NoteOffPolicy {
            fallback_fraction: if fallback_fraction.is_finite() {
                fallback_fraction.clamp(0.0, 1.0)
            } else {
                DEFAULT_FALLBACK_FRACTION
            },
        }
    }

    /// Gets the fallback fraction.
    pub fn fallback_fraction(&self) -> f32 {
        self.fallback_fraction
    }

    /// Detects the envelope index at which the note was released.
    ///
    /// Returns None only for an empty envelope.
    pub fn detect(&self, envelope: &Envelope, peak_level: f32) -> Option<usize> {
        let (peak_index, _) = envelope.peak()?;
        let values = envelope.values();

        let mut longest_start = peak_index;
        let mut longest_length = 0;
        let mut current_start = peak_index;
        let mut current_length = 0;

        let mut index = peak_index;
        while index + STABILITY_WINDOW < values.len() {
            let window = &values[index..index + STABILITY_WINDOW];
            let (min, max) = window
                .iter()
                .fold((f32::MAX, f32::MIN), |(min, max), &value| {
                    (min.min(value), max.max(value))
                });

            if (max - min) / peak_level < STABILITY_THRESHOLD {
                current_length += 1;
                if current_length > longest_length {
                    longest_length = current_length;
                    longest_start = current_start;
                }
            } else {
                current_start = index + 1;
                current_length = 0;
            }
            index += 1;
        }

        let note_off = longest_start + longest_length;
        if note_off + END_GUARD >= values.len() {
            let fallback = (values.len() as f32 * self.fallback_fraction) as usize;
            debug!(
                detected = note_off,
                fallback,
                envelope_len = values.len(),
                "Sustain plateau runs into the end of the recording, using fallback note-off"
            );
            return Some(fallback);
        }

        Some(note_off)
    }
}

impl Default for NoteOffPolicy {
    fn default() -> Self {
        NoteOffPolicy::new(DEFAULT_FALLBACK_FRACTION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds an envelope whose values occur at 200 Hz (a 240 sample hop at 48kHz).
    fn envelope_of(values: Vec<f32>) -> Envelope {
        let mut samples = Vec::new();
        // One hop of audio per value, so each window spans two neighbouring values.
        for value in &values {
            samples.extend(std::iter::repeat(*value).take(240));
        }
        samples.extend(std::iter::repeat(0.0).take(240));
        Envelope::compute(&samples, 48000.0).expect("expected envelope")
    }

    #[test]
    fn test_detects_end_of_plateau() {
        let mut values = vec![1.0; 5];
        values.extend(vec![0.7; 40]);
        values.extend((0..40).map(|i| 0.7 * (1.0 - i as f32 / 40.0)));
        let envelope = envelope_of(values);
        let (_, peak) = envelope.peak().expect("expected peak");

        let note_off = NoteOffPolicy::default()
            .detect(&envelope, peak)
            .expect("expected note-off");

        // The plateau holds through index 44. The run of stable windows ends once a window
        // reaches far enough into the release, which is within one window of the plateau end.
        assert!(
            (34..=45).contains(&note_off),
            "note-off {} not at the end of the plateau",
            note_off
        );
    }

    #[test]
    fn test_plateau_into_end_falls_back() {
        let envelope = envelope_of(vec![0.8; 100]);
        let (_, peak) = envelope.peak().expect("expected peak");

        let note_off = NoteOffPolicy::default()
            .detect(&envelope, peak)
            .expect("expected note-off");
        assert_eq!((envelope.len() as f32 * 0.6) as usize, note_off);

        let note_off = NoteOffPolicy::new(0.25)
            .detect(&envelope, peak)
            .expect("expected note-off");
        assert_eq!((envelope.len() as f32 * 0.25) as usize, note_off);
    }

    #[test]
    fn test_empty_envelope() {
        assert_eq!(None, NoteOffPolicy::default().detect(&Envelope::default(), 1.0));
    }

    #[test]
    fn test_policy_clamps() {
        assert_eq!(1.0, NoteOffPolicy::new(3.0).fallback_fraction());
        assert_eq!(0.0, NoteOffPolicy::new(-1.0).fallback_fraction());
        assert_eq!(
            DEFAULT_FALLBACK_FRACTION,
            NoteOffPolicy::new(f32::NAN).fallback_fraction()
        );
    }
}
