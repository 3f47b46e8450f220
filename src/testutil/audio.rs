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

use std::f32::consts::PI;

/// A piecewise linear envelope. Times are in seconds, sustain is a level.
#[derive(Debug, Clone, Copy)]
pub struct Adsr {
    pub attack: f32,
    pub decay: f32,
    pub sustain: f32,
    /// How long the sustain level is held before the key is released.
    pub hold: f32,
    pub release: f32,
}

impl Adsr {
    fn segment(seconds: f32, sample_rate: u32) -> usize {
        (seconds * sample_rate as f32) as usize
    }

    /// Returns the sample index at which the key is released.
    pub fn note_off_sample(&self, sample_rate: u32) -> usize {
        Adsr::segment(self.attack, sample_rate)
            + Adsr::segment(self.decay, sample_rate)
            + Adsr::segment(self.hold, sample_rate)
    }
}

/// Generate a sine tone shaped by the given envelope.
pub fn generate_adsr_tone(adsr: &Adsr, frequency: f32, sample_rate: u32) -> Vec<f32> {
    let attack = Adsr::segment(adsr.attack, sample_rate);
    let decay = Adsr::segment(adsr.decay, sample_rate);
    let hold = Adsr::segment(adsr.hold, sample_rate);
    let release = Adsr::segment(adsr.release, sample_rate);

    let mut levels = Vec::with_capacity(attack + decay + hold + release);
    levels.extend((0..attack).map(|i| i as f32 / attack as f32));
    levels.extend((0..decay).map(|i| 1.0 - (1.0 - adsr.sustain) * i as f32 / decay as f32));
    levels.extend(std::iter::repeat(adsr.sustain).take(hold));
    levels.extend((0..release).map(|i| adsr.sustain * (1.0 - i as f32 / release as f32)));

    levels
        .into_iter()
        .enumerate()
        .map(|(i, level)| {
            let t = i as f32 / sample_rate as f32;
            level * (2.0 * PI * frequency * t).sin()
        })
        .collect()
}

/// Calculate RMS (Root Mean Square) of a signal
pub fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&x| x * x).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
