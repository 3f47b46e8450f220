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

//! Attack and release analysis of a calibration recording.
//!
//! The recording is reduced to a windowed RMS envelope, from which the attack time (onset to
//! 90% of peak) and release time (note-off to 10% of peak) are measured.

mod envelope;
mod noteoff;
mod profile;

use tracing::debug;

pub use envelope::{Envelope, ENVELOPE_WINDOW_MS};
pub use noteoff::{NoteOffPolicy, DEFAULT_FALLBACK_FRACTION};
pub use profile::TimingProfile;

/// Fraction of the peak that marks the end of the attack.
pub const ATTACK_THRESHOLD: f32 = 0.9;

/// Fraction of the peak that marks the end of the release.
pub const RELEASE_THRESHOLD: f32 = 0.1;

/// Peak levels below this (about -60dB) are too quiet to analyze.
pub const SILENCE_THRESHOLD: f32 = 0.001;

/// Measures attack and release times from recordings of a single held note.
#[derive(Debug, Default)]
pub struct EnvelopeAnalyzer {
    /// The envelope computed by the last analysis, kept for visualization.
    envelope: Envelope,
    /// How to place the note-off when it isn't supplied.
    note_off_policy: NoteOffPolicy,
}

impl EnvelopeAnalyzer {
    /// Creates a new analyzer with the default note-off policy.
    pub fn new() -> EnvelopeAnalyzer {
        EnvelopeAnalyzer::default()
    }

    /// Creates a new analyzer with the given note-off policy.
    pub fn with_policy(note_off_policy: NoteOffPolicy) -> EnvelopeAnalyzer {
        EnvelopeAnalyzer {
            envelope: Envelope::default(),
            note_off_policy,
        }
    }

    /// Analyzes a mono recording of a held note.
    ///
    /// `note_off_sample` is the audio sample index at which the key was released, if known.
    /// Otherwise the release point is detected from the envelope. Any failure (no audio, a bad
    /// sample rate, a signal below the silence threshold, or an unmeasurable attack or release)
    /// yields [TimingProfile::invalid].
    pub fn analyze(
        &mut self,
        samples: &[f32],
        sample_rate: f64,
        note_off_sample: Option<usize>,
    ) -> TimingProfile {
        self.envelope = match Envelope::compute(samples, sample_rate) {
            Some(envelope) => envelope,
            None => {
                debug!(
                    samples = samples.len(),
                    sample_rate, "Not enough audio to compute an envelope"
                );
                Envelope::default()
            }
        };

        let envelope = &self.envelope;
        let (_, peak_level) = match envelope.peak() {
            Some(peak) => peak,
            None => return TimingProfile::invalid(),
        };

        if peak_level < SILENCE_THRESHOLD {
            debug!(peak_level, "Signal too quiet to analyze");
            return TimingProfile::invalid();
        }

        let attack_time = envelope
            .first_at_or_above(peak_level * ATTACK_THRESHOLD, 0)
            .map(|index| envelope.seconds(index))
            .unwrap_or(0.0);

        let note_off = match note_off_sample {
            Some(sample) => Some(envelope.index_for_sample(sample)),
            None => self.note_off_policy.detect(envelope, peak_level),
        };

        let release_time = match note_off {
            Some(note_off) if note_off < envelope.len() => {
                match envelope.first_at_or_below(peak_level * RELEASE_THRESHOLD, note_off) {
                    Some(release_end) => envelope.seconds(release_end - note_off),
                    // The recording stopped before the release finished, so the remaining
                    // length is the best available estimate.
                    None => envelope.seconds(envelope.len() - note_off),
                }
            }
            _ => 0.0,
        };

        let profile = TimingProfile::new(attack_time, release_time, peak_level);
        if !profile.is_valid() {
            debug!(
                attack_time,
                release_time, peak_level, "Attack or release could not be measured"
            );
            return TimingProfile::invalid();
        }

        profile
    }

    /// Gets the envelope computed by the last analysis.
    pub fn envelope(&self) -> &[f32] {
        self.envelope.values()
    }

    /// Gets the sample rate of the last computed envelope.
    pub fn envelope_sample_rate(&self) -> f64 {
        self.envelope.sample_rate()
    }

    /// Gets the note-off policy.
    pub fn note_off_policy(&self) -> NoteOffPolicy {
        self.note_off_policy
    }
}
