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

//! Voice management for polyphonic playback of the reference waveform.
//!
//! Handles voice allocation, stealing, pitching and release behavior. Voices live in a fixed
//! pool so nothing is allocated on the audio thread.

use std::sync::Arc;

use tracing::debug;

use super::waveform::Waveform;

/// The MIDI note the reference waveform was recorded at.
pub const REFERENCE_NOTE: u8 = 60;

/// Number of voices in the pool.
pub const MAX_VOICES: usize = 16;

/// Time constant of the release envelope in seconds.
pub const RELEASE_TIME: f64 = 0.05;

/// Release gain below which a voice is silenced.
pub const RELEASE_FLOOR: f32 = 0.001;

/// Returns the playback speed that transposes the reference to the given note.
pub fn pitch_ratio(note: u8) -> f64 {
    let semitones = i32::from(note) - i32::from(REFERENCE_NOTE);
    2f64.powf(f64::from(semitones) / 12.0)
}

/// Returns the per-sample release gain multiplier at the given sample rate.
pub fn release_decay(sample_rate: f64) -> f32 {
    (1.0 - 1.0 / (RELEASE_TIME * sample_rate)).clamp(0.0, 1.0) as f32
}

/// A single playing instance of the reference waveform.
#[derive(Debug, Clone)]
pub struct Voice {
    /// The MIDI note that triggered this voice (for Note Off matching).
    note: u8,
    /// Gain derived from the note velocity.
    velocity_gain: f32,
    /// Read position in the reference, in (fractional) samples.
    position: f64,
    /// How far the position advances per output sample.
    pitch_ratio: f64,
    /// The waveform being played.
    reference: Option<Arc<Waveform>>,
    /// Whether this voice is producing audio.
    active: bool,
    /// Whether the note has been released.
    released: bool,
    /// Current gain of the release envelope.
    release_gain: f32,
}

impl Voice {
    /// Creates a new, inactive voice.
    pub fn new() -> Voice {
        Voice {
            note: 0,
            velocity_gain: 1.0,
            position: 0.0,
            pitch_ratio: 1.0,
            reference: None,
            active: false,
            released: false,
            release_gain: 1.0,
        }
    }

    /// Starts playing the reference from the beginning at the pitch of the given note.
    pub fn trigger(&mut self, note: u8, velocity: u8, reference: Arc<Waveform>) {
        self.note = note;
        self.velocity_gain = f32::from(velocity) / 127.0;
        self.position = 0.0;
        self.pitch_ratio = pitch_ratio(note);
        self.reference = Some(reference);
        self.active = true;
        self.released = false;
        self.release_gain = 1.0;
    }

    /// Begins the release of this voice.
    pub fn release(&mut self) {
        self.released = true;
    }

    /// Produces the next output sample, deactivating the voice when the reference runs out or
    /// the release has decayed.
    pub fn next_sample(&mut self, sample_rate: f64) -> f32 {
        if !self.active {
            return 0.0;
        }
        let data = match &self.reference {
            Some(reference) => reference.samples(),
            None => {
                self.active = false;
                return 0.0;
            }
        };

        let index = self.position as usize;
        if index + 1 >= data.len() {
            self.active = false;
            return 0.0;
        }

        // Linear interpolation between the two bracketing samples.
        let frac = (self.position - index as f64) as f32;
        let mut sample = data[index] * (1.0 - frac) + data[index + 1] * frac;
        sample *= self.velocity_gain;

        if self.released {
            sample *= self.release_gain;
            self.release_gain *= release_decay(sample_rate);
            if self.release_gain < RELEASE_FLOOR {
                self.active = false;
            }
        }

        self.position += self.pitch_ratio;
        sample
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Gets the note this voice is playing.
    pub fn note(&self) -> u8 {
        self.note
    }

    /// Gets the current read position in reference samples.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn pitch_ratio(&self) -> f64 {
        self.pitch_ratio
    }

    pub fn release_gain(&self) -> f32 {
        self.release_gain
    }
}

impl Default for Voice {
    fn default() -> Self {
        Voice::new()
    }
}

/// A fixed pool of voices. Allocation is a linear scan for an inactive slot.
#[derive(Debug)]
pub struct VoicePool {
    voices: [Voice; MAX_VOICES],
}

impl VoicePool {
    /// Creates a pool of inactive voices.
    pub fn new() -> VoicePool {
        VoicePool {
            voices: std::array::from_fn(|_| Voice::new()),
        }
    }

    /// Returns the first inactive voice, or steals the first slot if every voice is playing.
    pub fn allocate(&mut self) -> &mut Voice {
        let slot = match self.voices.iter().position(|voice| !voice.is_active()) {
            Some(slot) => slot,
            None => {
                debug!(
                    max_voices = MAX_VOICES,
                    note = self.voices[0].note(),
                    "Voice pool exhausted, stealing first slot"
                );
                0
            }
        };
        &mut self.voices[slot]
    }

    /// Finds the first sounding voice playing the given note, released or not.
    pub fn find_playing(&mut self, note: u8) -> Option<&mut Voice> {
        self.voices
            .iter_mut()
            .find(|voice| voice.is_active() && voice.note() == note)
    }

    /// Releases every voice.
    pub fn release_all(&mut self) {
        self.voices.iter_mut().for_each(Voice::release);
    }

    /// Sums the next sample of every active voice.
    pub fn next_sample(&mut self, sample_rate: f64) -> f32 {
        self.voices
            .iter_mut()
            .filter(|voice| voice.is_active())
            .map(|voice| voice.next_sample(sample_rate))
            .sum()
    }

    /// Returns the current number of active voices.
    pub fn active_count(&self) -> usize {
        self.voices.iter().filter(|voice| voice.is_active()).count()
    }

    /// Gets the voices in slot order.
    pub fn voices(&self) -> &[Voice] {
        &self.voices
    }
}

impl Default for VoicePool {
    fn default() -> Self {
        VoicePool::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> Arc<Waveform> {
        Arc::new(Waveform::new(
            (0..len).map(|i| i as f32 / len as f32).collect(),
            44100.0,
        ))
    }

    fn play_to_end(voice: &mut Voice) -> Vec<f32> {
        let mut output = Vec::new();
        while voice.is_active() {
            output.push(voice.next_sample(44100.0));
        }
        output
    }

    #[test]
    fn test_pitch_ratio() {
        assert_eq!(1.0, pitch_ratio(60));
        assert_eq!(2.0, pitch_ratio(72));
        assert_eq!(0.5, pitch_ratio(48));
        assert!((pitch_ratio(67) - 1.498307).abs() < 1e-6);
    }

    #[test]
    fn test_reference_pitch_reproduces_waveform() {
        let reference = ramp(1000);
        let mut voice = Voice::new();
        voice.trigger(60, 127, reference.clone());

        let output = play_to_end(&mut voice);

        // The final sample has no neighbour to interpolate with, so the voice ends before it.
        assert_eq!(1000, output.len());
        assert_eq!(&reference.samples()[..999], &output[..999]);
        assert_eq!(0.0, output[999]);
    }

    #[test]
    fn test_octave_up_plays_twice_as_fast() {
        let reference = ramp(1001);

        let mut unison = Voice::new();
        unison.trigger(60, 127, reference.clone());
        let unison_frames = play_to_end(&mut unison).len() - 1;

        let mut octave = Voice::new();
        octave.trigger(72, 127, reference.clone());
        assert_eq!(2.0, octave.pitch_ratio());
        let output = play_to_end(&mut octave);
        let octave_frames = output.len() - 1;

        assert_eq!(1000, unison_frames);
        assert_eq!(500, octave_frames);
        for (i, sample) in output[..octave_frames].iter().enumerate() {
            assert_eq!(reference.samples()[i * 2], *sample);
        }
    }

    #[test]
    fn test_interpolation() {
        let reference = Arc::new(Waveform::new(vec![0.0, 1.0, 0.0], 44100.0));
        let mut voice = Voice::new();
        voice.trigger(48, 127, reference);

        assert_eq!(0.0, voice.next_sample(44100.0));
        assert_eq!(0.5, voice.next_sample(44100.0));
        assert_eq!(1.0, voice.next_sample(44100.0));
        assert_eq!(0.5, voice.next_sample(44100.0));
        assert_eq!(0.0, voice.next_sample(44100.0));
        assert!(!voice.is_active());
    }

    #[test]
    fn test_velocity_gain() {
        let reference = Arc::new(Waveform::new(vec![1.0; 10], 44100.0));
        let mut voice = Voice::new();
        voice.trigger(60, 64, reference);
        assert!((voice.next_sample(44100.0) - 64.0 / 127.0).abs() < 1e-6);
    }

    #[test]
    fn test_release_decays_below_floor() {
        let reference = Arc::new(Waveform::new(vec![1.0; 44100], 44100.0));
        let mut voice = Voice::new();
        voice.trigger(60, 127, reference);
        voice.release();

        let output = play_to_end(&mut voice);
        let decay = release_decay(44100.0);

        // Each sample is the previous one scaled by the decay coefficient.
        for pair in output.windows(2).take(output.len() - 2) {
            assert!((pair[1] - pair[0] * decay).abs() < 1e-6);
        }
        // About ln(0.001) / ln(decay) samples, well short of the reference length.
        let expected = (RELEASE_FLOOR.ln() / decay.ln()).ceil() as usize;
        assert!(output.len().abs_diff(expected) <= 8);
        assert!(output.len() < 44100);
        assert!(voice.release_gain() < RELEASE_FLOOR);
    }

    #[test]
    fn test_pool_allocates_free_then_steals_first() {
        let reference = ramp(1000);
        let mut pool = VoicePool::new();

        for note in 0..MAX_VOICES as u8 {
            pool.allocate().trigger(40 + note, 100, reference.clone());
        }
        assert_eq!(MAX_VOICES, pool.active_count());
        for (slot, voice) in pool.voices().iter().enumerate() {
            assert_eq!(40 + slot as u8, voice.note());
        }

        pool.allocate().trigger(90, 100, reference.clone());
        assert_eq!(MAX_VOICES, pool.active_count());
        assert_eq!(90, pool.voices()[0].note());
        assert_eq!(41, pool.voices()[1].note());
    }

    #[test]
    fn test_find_playing_takes_first_slot() {
        let reference = ramp(1000);
        let mut pool = VoicePool::new();
        pool.allocate().trigger(60, 100, reference.clone());
        pool.allocate().trigger(60, 100, reference.clone());

        // A repeated note-off lands on the already released first voice again.
        pool.find_playing(60).expect("expected a voice").release();
        pool.find_playing(60).expect("expected a voice").release();
        assert!(pool.voices()[0].is_released());
        assert!(!pool.voices()[1].is_released());
        assert!(pool.find_playing(61).is_none());
    }
}
