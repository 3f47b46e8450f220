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

use config::{Config, File, FileFormat};
use duration_string::DurationString;
use serde::Deserialize;
use tracing::info;

use crate::analysis::{NoteOffPolicy, DEFAULT_FALLBACK_FRACTION};
use crate::capture::DEFAULT_EVENT_CAPACITY;
use crate::util::filename_display;

mod error;

pub use error::ConfigError;

/// The default number of frames per audio callback.
pub const DEFAULT_BLOCK_SIZE: usize = 256;

/// The default length of calibration audio reserved up front.
pub const DEFAULT_CALIBRATION_CAPACITY: Duration = Duration::from_secs(30);

/// Session settings. Every field is optional and falls back to a default.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Settings {
    /// Frames per audio callback when driving a session offline.
    block_size: Option<usize>,

    /// How much calibration audio to reserve room for, e.g. "30s" or "1m".
    calibration_capacity: Option<String>,

    /// How many performance events to reserve room for.
    event_capacity: Option<usize>,

    /// Where to assume the key was released, as a fraction of the recording, when the sustain
    /// can't be found. Must be in (0, 1].
    note_off_fallback: Option<f32>,
}

impl Settings {
    /// Loads settings from a file. The format is inferred from the extension.
    pub fn load(path: &Path) -> Result<Settings, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize()?;
        settings.validate()?;

        info!(
            file = filename_display(path),
            block_size = settings.block_size(),
            event_capacity = settings.event_capacity(),
            note_off_fallback = settings.note_off_fallback(),
            "Loaded settings"
        );
        Ok(settings)
    }

    /// Parses settings from a YAML string.
    pub fn parse(yaml: &str) -> Result<Settings, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == Some(0) {
            return Err(ConfigError::Invalid("block_size must be at least 1".into()));
        }
        self.calibration_capacity()?;
        if let Some(fraction) = self.note_off_fallback {
            if !(fraction > 0.0 && fraction <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "note_off_fallback must be in (0, 1], got {}",
                    fraction
                )));
            }
        }
        Ok(())
    }

    /// Returns the block size (default: 256 frames).
    pub fn block_size(&self) -> usize {
        self.block_size.unwrap_or(DEFAULT_BLOCK_SIZE)
    }

    /// Returns the calibration capacity (default: 30s).
    pub fn calibration_capacity(&self) -> Result<Duration, ConfigError> {
        match &self.calibration_capacity {
            Some(capacity) => Ok(DurationString::from_string(capacity.clone())
                .map_err(|e| {
                    ConfigError::Invalid(format!("calibration_capacity {}: {}", capacity, e))
                })?
                .into()),
            None => Ok(DEFAULT_CALIBRATION_CAPACITY),
        }
    }

    /// Returns the event capacity (default: 4096).
    pub fn event_capacity(&self) -> usize {
        self.event_capacity.unwrap_or(DEFAULT_EVENT_CAPACITY)
    }

    /// Returns the note-off fallback fraction (default: 0.6).
    pub fn note_off_fallback(&self) -> f32 {
        self.note_off_fallback.unwrap_or(DEFAULT_FALLBACK_FRACTION)
    }

    /// Returns the note-off policy described by these settings.
    pub fn note_off_policy(&self) -> NoteOffPolicy {
        NoteOffPolicy::new(self.note_off_fallback())
    }
}
