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

//! MIDI-triggered playback of the reference waveform.
//!
//! This module provides:
//! - The reference waveform and WAV file access
//! - Voice management with a fixed pool and slot stealing
//! - The voice engine that renders pitched voices into stereo blocks

mod engine;
mod voice;
mod waveform;

pub use engine::VoiceEngine;
pub use voice::{
    pitch_ratio, release_decay, Voice, VoicePool, MAX_VOICES, REFERENCE_NOTE, RELEASE_FLOOR,
    RELEASE_TIME,
};
pub use waveform::{write_wav_file, Waveform, WaveformError};
