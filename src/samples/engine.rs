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

//! Voice engine that plays the reference waveform at the pitch of incoming notes.

use std::sync::Arc;

use tracing::{debug, info};

use super::voice::VoicePool;
use super::waveform::Waveform;

/// Polyphonic monitoring engine for the calibrated reference waveform.
pub struct VoiceEngine {
    /// The fixed voice pool.
    voices: VoicePool,
    /// The waveform triggered voices play. Replaced wholesale, never modified.
    reference: Option<Arc<Waveform>>,
    /// Whether the engine responds to notes and renders audio.
    enabled: bool,
}

impl VoiceEngine {
    /// Creates a new, enabled voice engine with no reference loaded.
    pub fn new() -> VoiceEngine {
        VoiceEngine {
            voices: VoicePool::new(),
            reference: None,
            enabled: true,
        }
    }

    /// Replaces the reference waveform. Voices already playing keep the waveform they started
    /// with.
    pub fn set_reference_waveform(&mut self, reference: Arc<Waveform>) {
        info!(
            frames = reference.len(),
            sample_rate = reference.sample_rate(),
            "Reference waveform loaded"
        );
        self.reference = Some(reference);
    }

    /// Gets the reference waveform, if one is loaded.
    pub fn reference_waveform(&self) -> Option<&Arc<Waveform>> {
        self.reference.as_ref()
    }

    /// Triggers a voice for the given note. Ignored while disabled or without a reference.
    pub fn note_on(&mut self, note: u8, velocity: u8) {
        if !self.enabled {
            return;
        }
        let reference = match &self.reference {
            Some(reference) if !reference.is_empty() => reference.clone(),
            _ => return,
        };

        self.voices.allocate().trigger(note, velocity, reference);
        debug!(note, velocity, "Voice triggered");
    }

    /// Releases the first voice playing the given note. Ignored while disabled.
    pub fn note_off(&mut self, note: u8) {
        if !self.enabled {
            return;
        }

        if let Some(voice) = self.voices.find_playing(note) {
            voice.release();
            debug!(note, "Voice released");
        }
    }

    /// Releases every voice.
    pub fn all_notes_off(&mut self) {
        self.voices.release_all();
    }

    /// Renders `frames` frames of interleaved stereo into the output buffer, overwriting it.
    ///
    /// The mono voice mix is written to both channels. A disabled engine writes silence.
    pub fn render_block(&mut self, output: &mut [f32], frames: usize, sample_rate: f64) {
        let frames = frames.min(output.len() / 2);
        let output = &mut output[..frames * 2];

        if !self.enabled {
            output.fill(0.0);
            return;
        }

        for frame in output.chunks_exact_mut(2) {
            let mix = self.voices.next_sample(sample_rate);
            frame[0] = mix;
            frame[1] = mix;
        }
    }

    /// Plays one note held for `held_frames`, then renders its release until every voice has
    /// gone quiet. Note and velocity are clamped to the MIDI range. Returns interleaved stereo.
    pub fn render_note(
        &mut self,
        note: u8,
        velocity: u8,
        held_frames: usize,
        block_size: usize,
        sample_rate: f64,
    ) -> Vec<f32> {
        // Silent blocks never advance the voices.
        if !self.enabled {
            return Vec::new();
        }
        let note = note.min(127);
        let block_size = block_size.max(1);
        self.note_on(note, velocity.min(127));

        let mut output = Vec::new();
        let mut block = vec![0.0; block_size * 2];
        let mut rendered = 0;
        let mut released = false;
        while self.active_voice_count() > 0 {
            if !released && rendered >= held_frames {
                self.note_off(note);
                released = true;
            }
            self.render_block(&mut block, block_size, sample_rate);
            output.extend_from_slice(&block);
            rendered += block_size;
        }
        output
    }

    /// Enables or disables the engine.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the number of active voices.
    pub fn active_voice_count(&self) -> usize {
        self.voices.active_count()
    }

    /// Gets the voice pool.
    pub fn voices(&self) -> &VoicePool {
        &self.voices
    }
}

impl Default for VoiceEngine {
    fn default() -> Self {
        VoiceEngine::new()
    }
}

impl std::fmt::Debug for VoiceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VoiceEngine")
            .field("enabled", &self.enabled)
            .field(
                "reference_frames",
                &self.reference.as_ref().map(|reference| reference.len()),
            )
            .field("active_voices", &self.active_voice_count())
            .finish()
    }
}
