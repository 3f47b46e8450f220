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
use std::fmt;

/// A timestamped note event captured during a performance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// Seconds since the first event of the capture.
    timestamp: f64,
    note: u8,
    velocity: u8,
    is_note_on: bool,
    /// How long the note was held. Only set on note-off events once the capture is paired.
    duration: f64,
}

impl NoteEvent {
    /// Creates a new, unpaired note event.
    pub fn new(timestamp: f64, note: u8, velocity: u8, is_note_on: bool) -> NoteEvent {
        NoteEvent {
            timestamp,
            note,
            velocity,
            is_note_on,
            duration: 0.0,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn note(&self) -> u8 {
        self.note
    }

    pub fn velocity(&self) -> u8 {
        self.velocity
    }

    pub fn is_note_on(&self) -> bool {
        self.is_note_on
    }

    /// Returns true if this event starts a note. A note-on with zero velocity doesn't.
    pub fn starts_note(&self) -> bool {
        self.is_note_on && self.velocity > 0
    }

    /// Returns true if this event ends a note, including a note-on with zero velocity.
    pub fn ends_note(&self) -> bool {
        !self.starts_note()
    }

    /// Gets the held duration in seconds.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub(super) fn set_duration(&mut self, duration: f64) {
        self.duration = duration;
    }
}

impl fmt::Display for NoteEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.starts_note() {
            write!(
                f,
                "{:>9.3}s  on   note {:>3}  velocity {:>3}",
                self.timestamp, self.note, self.velocity
            )
        } else {
            write!(
                f,
                "{:>9.3}s  off  note {:>3}  held {:.3}s",
                self.timestamp, self.note, self.duration
            )
        }
    }
}
