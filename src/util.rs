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

use std::path::Path;
use std::time::Duration;

/// Extracts a displayable file name from a path, returning a fallback if the name is unreadable.
pub fn filename_display(path: &Path) -> &str {
    path.file_name()
        .and_then(|f| f.to_str())
        .unwrap_or("unreadable file name")
}

/// Outputs the given duration in a minutes:seconds format.
pub fn duration_minutes_seconds(duration: Duration) -> String {
    let minutes = duration.as_secs() / 60;
    let secs = duration.as_secs() - minutes * 60;
    format!("{}:{:02}", minutes, secs)
}

/// Formats a short time, in milliseconds below one second.
pub fn format_seconds(seconds: f64) -> String {
    if seconds.abs() < 1.0 {
        format!("{:.1} ms", seconds * 1000.0)
    } else {
        format!("{:.3} s", seconds)
    }
}

/// Converts a linear amplitude to decibels relative to full scale.
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude <= 0.0 {
        return f32::NEG_INFINITY;
    }
    20.0 * amplitude.log10()
}

#[cfg(test)]
mod test {
    use std::time::Duration;

    use crate::util::{amplitude_to_db, duration_minutes_seconds, format_seconds};

    #[test]
    fn test_duration_minutes_strings() {
        assert_eq!("0:00", duration_minutes_seconds(Duration::new(0, 0)));
        assert_eq!("0:05", duration_minutes_seconds(Duration::new(5, 0)));
        assert_eq!("1:00", duration_minutes_seconds(Duration::new(60, 0)));
        assert_eq!("2:05", duration_minutes_seconds(Duration::new(125, 0)));
    }

    #[test]
    fn test_format_seconds() {
        assert_eq!("0.0 ms", format_seconds(0.0));
        assert_eq!("250.0 ms", format_seconds(0.25));
        assert_eq!("1.500 s", format_seconds(1.5));
    }

    #[test]
    fn test_amplitude_to_db() {
        assert_eq!(0.0, amplitude_to_db(1.0));
        assert!((amplitude_to_db(0.5) + 6.0206).abs() < 1e-3);
        assert!((amplitude_to_db(0.001) + 60.0).abs() < 1e-3);
        assert_eq!(f32::NEG_INFINITY, amplitude_to_db(0.0));
    }
}
