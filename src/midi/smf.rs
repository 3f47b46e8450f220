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

//! Reads the note messages of a Standard MIDI File as timestamped raw messages.
//!
//! This is only a source of performance input. Everything other than note messages and tempo
//! changes is skipped.

use std::fs;
use std::path::Path;

use midly::{Format, MetaMessage, Smf, Timing, TrackEventKind};
use tracing::info;

use super::{NoteMessage, TimedMessage};
use crate::util::filename_display;

/// Tempo assumed until the file sets one, in microseconds per quarter note.
const DEFAULT_TEMPO: u32 = 500_000;

/// Error types for reading MIDI files.
#[derive(Debug, thiserror::Error)]
pub enum SmfError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI parse error: {0}")]
    Parse(#[from] midly::Error),
}

/// Converts ticks into seconds, following tempo changes for metrical timing.
struct Clock {
    timing: Timing,
    seconds_per_tick: f64,
}

impl Clock {
    fn new(timing: Timing) -> Clock {
        let mut clock = Clock {
            timing,
            seconds_per_tick: 0.0,
        };
        clock.set_tempo(DEFAULT_TEMPO);
        clock
    }

    /// Applies a tempo change. Timecode timing has a fixed tick length and ignores tempo.
    fn set_tempo(&mut self, micros_per_quarter: u32) {
        self.seconds_per_tick = match self.timing {
            Timing::Metrical(ticks_per_quarter) => {
                f64::from(micros_per_quarter)
                    / 1_000_000.0
                    / f64::from(ticks_per_quarter.as_int().max(1))
            }
            Timing::Timecode(fps, subframes) => {
                1.0 / (f64::from(fps.as_f32()) * f64::from(subframes.max(1)))
            }
        };
    }
}

/// Reads every note message from the given file, ordered by time.
pub fn read_note_messages(path: &Path) -> Result<Vec<TimedMessage>, SmfError> {
    let buf = fs::read(path)?;
    let smf = Smf::parse(&buf)?;

    let mut clock = Clock::new(smf.header.timing);
    let mut messages = Vec::new();
    let mut last_tick = 0u64;
    let mut seconds = 0.0;

    for (tick, kind) in merge_tracks(&smf) {
        seconds += (tick - last_tick) as f64 * clock.seconds_per_tick;
        last_tick = tick;

        match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => clock.set_tempo(tempo.as_int()),
            TrackEventKind::Midi { channel, message } => {
                if let Some(note) = NoteMessage::from_midi(*message) {
                    messages.push(TimedMessage::new(
                        seconds,
                        note.to_bytes(channel.as_int()).to_vec(),
                    ));
                }
            }
            _ => {}
        }
    }

    info!(
        file = filename_display(path),
        tracks = smf.tracks.len(),
        messages = messages.len(),
        duration = seconds,
        "Read MIDI file"
    );
    Ok(messages)
}

/// Flattens the tracks into events at absolute ticks. Parallel tracks share a timeline,
/// sequential tracks follow each other. Events at the same tick keep track order.
fn merge_tracks<'a>(smf: &'a Smf<'a>) -> Vec<(u64, &'a TrackEventKind<'a>)> {
    let mut events = Vec::new();
    let mut track_start = 0u64;

    for track in &smf.tracks {
        let mut tick = match smf.header.format {
            Format::Sequential => track_start,
            Format::SingleTrack | Format::Parallel => 0,
        };
        for event in track {
            tick += u64::from(event.delta.as_int());
            events.push((tick, &event.kind));
        }
        track_start = tick;
    }

    events.sort_by_key(|(tick, _)| *tick);
    events
}
