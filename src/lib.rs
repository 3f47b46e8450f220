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

//! Captures the character of a vintage synthesizer from a single reference note.
//!
//! A session calibrates against a recording of the reference note, measuring its attack and
//! release, then records a performance while playing the reference back at the pitch of each
//! key so the performer hears an approximation of the instrument.

pub mod analysis;
pub mod capture;
pub mod config;
pub mod host;
pub mod midi;
pub mod samples;
pub mod session;
pub mod util;

#[cfg(test)]
mod testutil;
