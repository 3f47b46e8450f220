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

use midly::live::LiveEvent;
use midly::MidiMessage;

pub mod smf;

/// Status nibble of a note-off message.
const NOTE_OFF_STATUS: u8 = 0x80;

/// Status nibble of a note-on message.
const NOTE_ON_STATUS: u8 = 0x90;

/// A decoded note message. The channel is not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoteMessage {
    /// A note-on with a non-zero velocity.
    On { note: u8, velocity: u8 },
    Off { note: u8 },
}

impl NoteMessage {
    /// Decodes a raw MIDI message. Data bytes are masked to seven bits. Anything that isn't a
    /// note-on or note-off, including messages shorter than three bytes, yields None.
    pub fn parse(raw: &[u8]) -> Option<NoteMessage> {
        let raw = raw.get(..3)?;
        let masked = [raw[0], raw[1] & 0x7f, raw[2] & 0x7f];

        match LiveEvent::parse(&masked).ok()? {
            LiveEvent::Midi { message, .. } => NoteMessage::from_midi(message),
            _ => None,
        }
    }

    /// Converts a midly message into a note message. A note-on with zero velocity becomes a
    /// note-off.
    pub fn from_midi(message: MidiMessage) -> Option<NoteMessage> {
        match message {
            MidiMessage::NoteOn { key, vel } if vel.as_int() > 0 => Some(NoteMessage::On {
                note: key.as_int(),
                velocity: vel.as_int(),
            }),
            MidiMessage::NoteOn { key, .. } | MidiMessage::NoteOff { key, .. } => {
                Some(NoteMessage::Off { note: key.as_int() })
            }
            _ => None,
        }
    }

    /// Encodes the message on the given channel.
    pub fn to_bytes(&self, channel: u8) -> [u8; 3] {
        let channel = channel & 0x0f;
        match *self {
            NoteMessage::On { note, velocity } => {
                [NOTE_ON_STATUS | channel, note & 0x7f, velocity & 0x7f]
            }
            NoteMessage::Off { note } => [NOTE_OFF_STATUS | channel, note & 0x7f, 0],
        }
    }

    /// Gets the note number.
    pub fn note(&self) -> u8 {
        match *self {
            NoteMessage::On { note, .. } | NoteMessage::Off { note } => note,
        }
    }
}

impl fmt::Display for NoteMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoteMessage::On { note, velocity } => write!(f, "note on {} ({})", note, velocity),
            NoteMessage::Off { note } => write!(f, "note off {}", note),
        }
    }
}

/// A raw MIDI message delivered with its host timestamp in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct TimedMessage {
    timestamp: f64,
    bytes: Vec<u8>,
}

impl TimedMessage {
    pub fn new(timestamp: f64, bytes: Vec<u8>) -> TimedMessage {
        TimedMessage { timestamp, bytes }
    }

    /// Creates a timed note message on channel 0.
    pub fn note(timestamp: f64, message: NoteMessage) -> TimedMessage {
        TimedMessage::new(timestamp, message.to_bytes(0).to_vec())
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns a copy of this message moved by the given number of seconds.
    pub fn offset(&self, seconds: f64) -> TimedMessage {
        TimedMessage::new(self.timestamp + seconds, self.bytes.clone())
    }
}
