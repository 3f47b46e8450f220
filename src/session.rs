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

//! The session state machine that decides what each audio and MIDI callback does.
//!
//! A session moves between idle and one of three stages: calibrating (recording the reference
//! note), recording a performance with monitoring, and playing back. The controller is owned by
//! the host, and monitors let other threads observe it without blocking the audio thread.

mod controller;
mod monitor;
mod state;

pub use controller::SessionController;
pub use monitor::SessionMonitor;
pub use state::{AtomicSessionState, SessionState};
