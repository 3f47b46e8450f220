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
use std::sync::atomic::{AtomicU8, Ordering};

/// The stage a session is in. Exactly one stage handles each audio callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum SessionState {
    #[default]
    Idle = 0,
    /// Recording the reference note for analysis.
    Calibrating = 1,
    /// Recording a performance while monitoring it through the voice engine.
    RecordingPerformance = 2,
    PlayingBack = 3,
}

impl SessionState {
    fn from_u8(value: u8) -> SessionState {
        match value {
            1 => SessionState::Calibrating,
            2 => SessionState::RecordingPerformance,
            3 => SessionState::PlayingBack,
            _ => SessionState::Idle,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SessionState::Idle => "idle",
            SessionState::Calibrating => "calibrating",
            SessionState::RecordingPerformance => "recording performance",
            SessionState::PlayingBack => "playing back",
        })
    }
}

/// A session state that can be shared between the audio and control threads without locking.
///
/// Loads acquire and stores release, so anything written before a state is published is visible
/// to whoever observes that state.
#[derive(Debug, Default)]
pub struct AtomicSessionState(AtomicU8);

impl AtomicSessionState {
    pub fn new(state: SessionState) -> AtomicSessionState {
        AtomicSessionState(AtomicU8::new(state as u8))
    }

    pub fn load(&self) -> SessionState {
        SessionState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::Release);
    }
}
