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

//! An offline stand-in for a plugin host. It feeds a session fixed-size blocks of audio along
//! with the MIDI messages that fall inside each block, and keeps a running clock across runs.

use std::time::Duration;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::midi::TimedMessage;
use crate::session::SessionController;

/// Drives a [SessionController] block by block.
#[derive(Debug)]
pub struct OfflineHost {
    block_size: usize,
    sample_rate: u32,
    /// Frames processed since the host was created.
    elapsed_frames: u64,
    /// Interleaved stereo block handed to the controller.
    buffer: Vec<f32>,
}

impl OfflineHost {
    /// Creates a new host. A block size of zero is treated as one.
    pub fn new(block_size: usize, sample_rate: u32) -> OfflineHost {
        let block_size = block_size.max(1);
        OfflineHost {
            block_size,
            sample_rate,
            elapsed_frames: 0,
            buffer: vec![0.0; block_size * 2],
        }
    }

    /// Creates a new host using the block size from the given settings.
    pub fn from_settings(settings: &Settings, sample_rate: u32) -> OfflineHost {
        OfflineHost::new(settings.block_size(), sample_rate)
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Gets the number of frames processed so far.
    pub fn elapsed_frames(&self) -> u64 {
        self.elapsed_frames
    }

    /// Gets the host clock in seconds. MIDI message timestamps are on this clock.
    pub fn elapsed(&self) -> f64 {
        self.seconds(self.elapsed_frames)
    }

    fn seconds(&self, frames: u64) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        frames as f64 / f64::from(self.sample_rate)
    }

    /// Converts a duration into a frame count at the host sample rate.
    pub fn frames_for(&self, duration: Duration) -> usize {
        (duration.as_secs_f64() * f64::from(self.sample_rate)).ceil() as usize
    }

    /// Runs mono input through the controller and returns the interleaved stereo output.
    ///
    /// Each message is delivered with the block that contains its timestamp. Messages stamped
    /// before the current clock are delivered with the first block, and those past the end of
    /// the input are dropped.
    pub fn run(
        &mut self,
        controller: &SessionController,
        input: &[f32],
        messages: &[TimedMessage],
    ) -> Vec<f32> {
        self.process(controller, input.len(), |frame| input[frame], messages)
    }

    /// Runs the given number of silent input frames through the controller.
    pub fn render(
        &mut self,
        controller: &SessionController,
        frames: usize,
        messages: &[TimedMessage],
    ) -> Vec<f32> {
        self.process(controller, frames, |_| 0.0, messages)
    }

    fn process<F>(
        &mut self,
        controller: &SessionController,
        frames: usize,
        input: F,
        messages: &[TimedMessage],
    ) -> Vec<f32>
    where
        F: Fn(usize) -> f32,
    {
        let mut messages = messages.to_vec();
        messages.sort_by(|a, b| a.timestamp().total_cmp(&b.timestamp()));

        let mut output = Vec::with_capacity(frames * 2);
        let mut next_message = 0;
        let mut offset = 0;

        while offset < frames {
            let block = self.block_size.min(frames - offset);
            let block_end = self.seconds(self.elapsed_frames + block as u64);
            let due = messages[next_message..]
                .iter()
                .take_while(|message| message.timestamp() < block_end)
                .count();

            let buffer = &mut self.buffer[..block * 2];
            for (i, frame) in buffer.chunks_exact_mut(2).enumerate() {
                frame[0] = input(offset + i);
                frame[1] = 0.0;
            }
            controller.process_block(
                buffer,
                block,
                f64::from(self.sample_rate),
                &messages[next_message..next_message + due],
            );
            output.extend_from_slice(buffer);

            next_message += due;
            offset += block;
            self.elapsed_frames += block as u64;
        }

        if next_message < messages.len() {
            warn!(
                dropped = messages.len() - next_message,
                "MIDI messages past the end of the run were not delivered"
            );
        }
        debug!(
            frames,
            messages = next_message,
            elapsed = self.elapsed(),
            "Offline run complete"
        );
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::NoteMessage;
    use crate::session::SessionState;

    #[test]
    fn test_clock_advances_across_runs() {
        let mut host = OfflineHost::new(100, 1000);
        let controller = SessionController::new();

        let output = host.render(&controller, 250, &[]);
        assert_eq!(500, output.len());
        assert_eq!(250, host.elapsed_frames());
        assert_eq!(0.25, host.elapsed());

        host.run(&controller, &[0.0; 50], &[]);
        assert_eq!(0.3, host.elapsed());
    }

    #[test]
    fn test_zero_block_size() {
        let host = OfflineHost::new(0, 44100);
        assert_eq!(1, host.block_size());
    }

    #[test]
    fn test_run_feeds_left_channel() {
        let mut host = OfflineHost::new(3, 1000);
        let controller = SessionController::new();
        controller.start_calibration();

        let input = [0.1, 0.2, 0.3, 0.4, 0.5];
        let output = host.run(&controller, &input, &[]);

        assert_eq!(vec![0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.4, 0.4, 0.5, 0.5], output);
        assert_eq!(5, controller.calibration_len());
    }

    #[test]
    fn test_messages_delivered_by_block() {
        let mut host = OfflineHost::new(100, 1000);
        let controller = SessionController::new();
        controller.start_recording();

        // Out of order on purpose. The last message lands after the run ends.
        let messages = [
            TimedMessage::note(0.25, NoteMessage::Off { note: 60 }),
            TimedMessage::note(
                0.05,
                NoteMessage::On {
                    note: 60,
                    velocity: 100,
                },
            ),
            TimedMessage::note(0.5, NoteMessage::Off { note: 62 }),
        ];
        host.render(&controller, 300, &messages);
        controller.stop_recording();

        assert_eq!(SessionState::Idle, controller.state());
        let events = controller.events();
        assert_eq!(2, events.len());
        assert!(events[0].is_note_on());
        assert!((events[1].duration() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_frames_for() {
        let host = OfflineHost::new(256, 48000);
        assert_eq!(24000, host.frames_for(Duration::from_millis(500)));
    }
}
