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

//! Performance capture. Note events are timestamped relative to the first event and paired into
//! held durations when the capture stops.

mod event;

use tracing::{debug, info};

pub use event::NoteEvent;

/// Default number of events reserved up front.
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Records the note events of a performance.
#[derive(Debug)]
pub struct PerformanceRecorder {
    events: Vec<NoteEvent>,
    recording: bool,
    /// Host timestamp of the first accepted event.
    anchor: Option<f64>,
    note_count: usize,
}

impl PerformanceRecorder {
    /// Creates a new recorder with the default event reservation.
    pub fn new() -> PerformanceRecorder {
        PerformanceRecorder::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Creates a new recorder that reserves room for the given number of events.
    pub fn with_capacity(capacity: usize) -> PerformanceRecorder {
        PerformanceRecorder {
            events: Vec::with_capacity(capacity),
            recording: false,
            anchor: None,
            note_count: 0,
        }
    }

    /// Discards any previous capture and starts accepting events.
    pub fn start_capture(&mut self) {
        self.reset();
        self.recording = true;
        debug!("Performance capture armed");
    }

    /// Records an event. Events are dropped unless a capture is in progress.
    pub fn record_event(&mut self, note: u8, velocity: u8, is_note_on: bool, host_timestamp: f64) {
        if !self.recording {
            return;
        }

        let anchor = *self.anchor.get_or_insert(host_timestamp);
        // Events stamped before the anchor are pinned to zero.
        let timestamp = (host_timestamp - anchor).max(0.0);
        let event = NoteEvent::new(timestamp, note, velocity, is_note_on);
        if event.starts_note() {
            self.note_count += 1;
        }
        self.events.push(event);
    }

    /// Stops accepting events and pairs note-offs with the note-ons that started them.
    pub fn stop_capture(&mut self) {
        if !self.recording {
            return;
        }
        self.recording = false;
        self.pair_events();

        info!(
            events = self.events.len(),
            notes = self.note_count,
            duration = self.duration(),
            "Performance capture stopped"
        );
    }

    /// Discards all events and stops any capture in progress.
    pub fn clear(&mut self) {
        self.reset();
        self.recording = false;
    }

    fn reset(&mut self) {
        self.events.clear();
        self.anchor = None;
        self.note_count = 0;
    }

    /// Stores the held duration on each note-off. A second note-on for a note that is already
    /// open replaces the first, which is left unpaired.
    fn pair_events(&mut self) {
        let mut open: [Option<usize>; 256] = [None; 256];

        for index in 0..self.events.len() {
            let event = self.events[index];
            let slot = &mut open[usize::from(event.note())];

            if event.starts_note() {
                *slot = Some(index);
            } else if let Some(on_index) = slot.take() {
                let on_timestamp = self.events[on_index].timestamp();
                self.events[index].set_duration(event.timestamp() - on_timestamp);
            }
        }
    }

    /// Gets the captured events in arrival order.
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Gets the number of notes played, not counting zero-velocity note-ons.
    pub fn note_count(&self) -> usize {
        self.note_count
    }

    /// Gets the time of the last event in seconds, or zero when nothing was captured.
    pub fn duration(&self) -> f64 {
        self.events.last().map_or(0.0, NoteEvent::timestamp)
    }
}

impl Default for PerformanceRecorder {
    fn default() -> Self {
        PerformanceRecorder::new()
    }
}
