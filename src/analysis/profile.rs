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

use crate::util::{amplitude_to_db, format_seconds};

/// The timing characteristics measured from a calibration recording.
///
/// An unsuccessful analysis produces a profile where every field is zero, so a single
/// [TimingProfile::is_valid] check is enough to tell whether calibration succeeded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingProfile {
    /// Seconds from the start of the recording until the envelope reaches 90% of its peak.
    attack_time: f32,
    /// Seconds from note-off until the envelope falls to 10% of its peak.
    release_time: f32,
    /// Peak RMS level of the recording.
    peak_level: f32,
}

impl TimingProfile {
    /// Creates a new timing profile.
    pub fn new(attack_time: f32, release_time: f32, peak_level: f32) -> TimingProfile {
        TimingProfile {
            attack_time,
            release_time,
            peak_level,
        }
    }

    /// The profile reported when analysis fails.
    pub fn invalid() -> TimingProfile {
        TimingProfile::default()
    }

    /// Gets the attack time in seconds.
    pub fn attack_time(&self) -> f32 {
        self.attack_time
    }

    /// Gets the release time in seconds.
    pub fn release_time(&self) -> f32 {
        self.release_time
    }

    /// Gets the peak RMS level as linear amplitude.
    pub fn peak_level(&self) -> f32 {
        self.peak_level
    }

    /// Returns true if every measurement is strictly positive.
    pub fn is_valid(&self) -> bool {
        self.attack_time > 0.0 && self.release_time > 0.0 && self.peak_level > 0.0
    }

    /// Returns how long a note held for `held` seconds keeps sounding, release tail included.
    pub fn sonic_duration(&self, held: f32) -> f32 {
        held + self.release_time
    }
}

impl fmt::Display for TimingProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_valid() {
            return write!(f, "invalid (analysis failed)");
        }

        write!(
            f,
            "attack {}, release {}, peak {:.1} dBFS",
            format_seconds(f64::from(self.attack_time)),
            format_seconds(f64::from(self.release_time)),
            amplitude_to_db(self.peak_level)
        )
    }
}
