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
use std::mem;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, span, warn, Level};

use super::monitor::{SessionMonitor, Shared};
use super::state::SessionState;
use crate::analysis::{EnvelopeAnalyzer, TimingProfile};
use crate::capture::{NoteEvent, PerformanceRecorder};
use crate::config::{ConfigError, Settings};
use crate::midi::{NoteMessage, TimedMessage};
use crate::samples::{VoiceEngine, Waveform};

/// Sample rate assumed for the calibration buffer until the first audio callback arrives.
const DEFAULT_SAMPLE_RATE: f64 = 44100.0;

/// Everything the audio callback reads or writes.
struct AudioSide {
    engine: VoiceEngine,
    recorder: PerformanceRecorder,
    /// Audio captured while calibrating.
    calibration: Vec<f32>,
    /// Cleared when the calibration buffer is handed to the control side.
    capturing: bool,
    calibration_sample_rate: f64,
    /// Paired events of the last completed capture. Replaced, never modified.
    performance: Arc<[NoteEvent]>,
    /// Index of the next recorded event the playback cursor hasn't reached.
    playback_index: usize,
    /// Seconds of playback rendered so far.
    playback_time: f64,
}

impl AudioSide {
    fn advance_playback(&mut self, frames: usize, sample_rate: f64) {
        if sample_rate <= 0.0 {
            return;
        }
        self.playback_time += frames as f64 / sample_rate;

        let remaining = self
            .performance
            .get(self.playback_index..)
            .unwrap_or_default();
        let playback_time = self.playback_time;
        self.playback_index += remaining
            .iter()
            .take_while(|event| event.timestamp() <= playback_time)
            .count();
    }
}

/// Everything only the control thread touches.
struct ControlSide {
    analyzer: EnvelopeAnalyzer,
    calibration_capacity: Duration,
    reference: Option<Arc<Waveform>>,
}

/// The authoritative session state machine.
///
/// A controller is shared between the host's audio callback, which calls
/// [SessionController::process_block], and a control thread that starts and stops stages. Every
/// method takes `&self`.
///
/// The audio path never waits. It only tries the audio-side lock, and if a control transition
/// holds it the block passes calibration input through (or outputs silence) and its MIDI is
/// dropped. Control transitions hold that lock to swap buffers and flags or to pair a stopped
/// capture's events, never while analyzing. Observers on other threads use a
/// [SessionMonitor].
pub struct SessionController {
    shared: Arc<Shared>,
    audio: Mutex<AudioSide>,
    /// Also serializes control transitions.
    control: Mutex<ControlSide>,
}

impl SessionController {
    /// Creates a new idle controller with default settings.
    pub fn new() -> SessionController {
        SessionController::build(&Settings::default(), crate::config::DEFAULT_CALIBRATION_CAPACITY)
    }

    /// Creates a new idle controller from the given settings.
    pub fn from_settings(settings: &Settings) -> Result<SessionController, ConfigError> {
        Ok(SessionController::build(
            settings,
            settings.calibration_capacity()?,
        ))
    }

    fn build(settings: &Settings, calibration_capacity: Duration) -> SessionController {
        SessionController {
            shared: Arc::new(Shared::new()),
            audio: Mutex::new(AudioSide {
                engine: VoiceEngine::new(),
                recorder: PerformanceRecorder::with_capacity(settings.event_capacity()),
                calibration: Vec::new(),
                capturing: false,
                calibration_sample_rate: DEFAULT_SAMPLE_RATE,
                performance: Arc::from(Vec::new()),
                playback_index: 0,
                playback_time: 0.0,
            }),
            control: Mutex::new(ControlSide {
                analyzer: EnvelopeAnalyzer::with_policy(settings.note_off_policy()),
                calibration_capacity,
                reference: None,
            }),
        }
    }

    /// Returns a read-only handle for observing this session from other threads.
    pub fn monitor(&self) -> SessionMonitor {
        SessionMonitor::new(self.shared.clone())
    }

    /// Gets the current state.
    pub fn state(&self) -> SessionState {
        self.shared.state.load()
    }

    fn publish(&self, state: SessionState) {
        info!(from = %self.state(), to = %state, "Session state changed");
        self.shared.state.store(state);
    }

    /// Ends whatever stage is running so a new one can start from idle.
    fn leave_current_stage(&self, control: &mut ControlSide) {
        match self.state() {
            SessionState::Idle => {}
            SessionState::Calibrating => self.finish_calibration(control),
            SessionState::RecordingPerformance => self.finish_recording(),
            SessionState::PlayingBack => self.finish_playback(),
        }
    }

    fn enable_monitoring(&self, audio: &mut AudioSide, enabled: bool) {
        audio.engine.set_enabled(enabled);
        self.shared.monitoring.store(enabled, Ordering::Release);
    }

    /// Starts recording the reference note. The previous calibration audio is discarded.
    pub fn start_calibration(&self) {
        let mut control = self.control.lock();
        self.leave_current_stage(&mut control);

        let sample_rate = self.audio.lock().calibration_sample_rate;
        let frames = (control.calibration_capacity.as_secs_f64() * sample_rate).ceil() as usize;
        let buffer = Vec::with_capacity(frames);
        let previous = {
            let mut audio = self.audio.lock();
            audio.capturing = true;
            mem::replace(&mut audio.calibration, buffer)
        };
        drop(previous);

        self.publish(SessionState::Calibrating);
    }

    /// Stops recording the reference note and analyzes it. A valid recording becomes the voice
    /// engine's reference. Does nothing unless calibrating.
    pub fn stop_calibration(&self) {
        let mut control = self.control.lock();
        self.finish_calibration(&mut control);
    }

    fn finish_calibration(&self, control: &mut ControlSide) {
        if self.state() != SessionState::Calibrating {
            return;
        }
        let span = span!(Level::INFO, "stop calibration");
        let _enter = span.enter();

        // Input keeps passing through, uncaptured, until idle is published.
        let (samples, sample_rate) = {
            let mut audio = self.audio.lock();
            audio.capturing = false;
            (
                mem::take(&mut audio.calibration),
                audio.calibration_sample_rate,
            )
        };

        let profile = control.analyzer.analyze(&samples, sample_rate, None);
        *self.shared.profile.write() = profile;

        if profile.is_valid() {
            info!(
                attack_time = profile.attack_time(),
                release_time = profile.release_time(),
                peak_level = profile.peak_level(),
                "Calibration analyzed"
            );
            let reference = Arc::new(Waveform::new(samples, sample_rate));
            self.audio
                .lock()
                .engine
                .set_reference_waveform(reference.clone());
            control.reference = Some(reference);
        } else {
            warn!(
                frames = samples.len(),
                "Calibration could not be analyzed, keeping the previous reference"
            );
        }

        // The reference is installed before idle becomes visible.
        self.publish(SessionState::Idle);
    }

    /// Starts recording a performance with monitoring enabled.
    pub fn start_recording(&self) {
        let mut control = self.control.lock();
        self.leave_current_stage(&mut control);

        {
            let mut audio = self.audio.lock();
            audio.recorder.start_capture();
            self.enable_monitoring(&mut audio, true);
        }
        self.shared.event_count.store(0, Ordering::Relaxed);
        if control.reference.is_none() {
            warn!("No reference waveform, monitoring will be silent");
        }

        self.publish(SessionState::RecordingPerformance);
    }

    /// Stops recording the performance and pairs its events. Does nothing unless recording.
    pub fn stop_recording(&self) {
        let _control = self.control.lock();
        self.finish_recording();
    }

    fn finish_recording(&self) {
        if self.state() != SessionState::RecordingPerformance {
            return;
        }

        let performance = {
            let mut audio = self.audio.lock();
            audio.recorder.stop_capture();
            audio.engine.all_notes_off();
            self.enable_monitoring(&mut audio, false);
            let performance: Arc<[NoteEvent]> = Arc::from(audio.recorder.events());
            audio.performance = performance.clone();
            performance
        };
        *self.shared.performance.write() = performance;

        self.publish(SessionState::Idle);
    }

    /// Starts playback of the recorded performance from the beginning.
    pub fn start_playback(&self) {
        let mut control = self.control.lock();
        self.leave_current_stage(&mut control);

        {
            let mut audio = self.audio.lock();
            audio.playback_index = 0;
            audio.playback_time = 0.0;
        }

        self.publish(SessionState::PlayingBack);
    }

    /// Stops playback and releases every voice. Does nothing unless playing back.
    pub fn stop_playback(&self) {
        let _control = self.control.lock();
        self.finish_playback();
    }

    fn finish_playback(&self) {
        if self.state() != SessionState::PlayingBack {
            return;
        }

        {
            let mut audio = self.audio.lock();
            audio.engine.all_notes_off();
            debug!(
                index = audio.playback_index,
                time = audio.playback_time,
                "Playback stopped"
            );
        }
        self.publish(SessionState::Idle);
    }

    /// Processes one audio callback.
    ///
    /// `buffer` is interleaved stereo. On the way in, the left channel holds the input; on the
    /// way out, both channels hold the output. MIDI messages are handled before the audio so
    /// notes starting in this block sound in it.
    pub fn process_block(
        &self,
        buffer: &mut [f32],
        frames: usize,
        sample_rate: f64,
        messages: &[TimedMessage],
    ) {
        let frames = frames.min(buffer.len() / 2);
        let buffer = &mut buffer[..frames * 2];

        let mut guard = match self.audio.try_lock() {
            Some(guard) => guard,
            None => {
                // A control transition holds the audio side for this block.
                match self.state() {
                    SessionState::Calibrating => {
                        for frame in buffer.chunks_exact_mut(2) {
                            frame[1] = frame[0];
                        }
                    }
                    _ => buffer.fill(0.0),
                }
                return;
            }
        };
        let audio = &mut *guard;

        for message in messages {
            self.route_midi(audio, message.bytes(), message.timestamp());
        }

        match self.state() {
            SessionState::Calibrating => {
                audio.calibration_sample_rate = sample_rate;
                for frame in buffer.chunks_exact_mut(2) {
                    let input = frame[0];
                    if audio.capturing {
                        audio.calibration.push(input);
                    }
                    frame[1] = input;
                }
            }
            SessionState::RecordingPerformance => {
                audio.engine.render_block(buffer, frames, sample_rate)
            }
            SessionState::PlayingBack => {
                buffer.fill(0.0);
                audio.advance_playback(frames, sample_rate);
            }
            SessionState::Idle => buffer.fill(0.0),
        }
    }

    /// Handles a raw MIDI message outside of a block. Notes are only acted on while recording a
    /// performance, and are dropped if a control transition holds the audio side.
    pub fn process_midi_message(&self, raw: &[u8], timestamp: f64) {
        if let Some(mut audio) = self.audio.try_lock() {
            self.route_midi(&mut audio, raw, timestamp);
        }
    }

    fn route_midi(&self, audio: &mut AudioSide, raw: &[u8], timestamp: f64) {
        let message = match NoteMessage::parse(raw) {
            Some(message) => message,
            None => return,
        };
        if self.state() != SessionState::RecordingPerformance {
            return;
        }

        match message {
            NoteMessage::On { note, velocity } => {
                audio.recorder.record_event(note, velocity, true, timestamp);
                audio.engine.note_on(note, velocity);
            }
            NoteMessage::Off { note } => {
                audio.recorder.record_event(note, 0, false, timestamp);
                audio.engine.note_off(note);
            }
        }
        self.shared
            .event_count
            .store(audio.recorder.event_count(), Ordering::Relaxed);
    }

    /// Enables or disables monitoring through the voice engine.
    pub fn set_monitoring_enabled(&self, enabled: bool) {
        let mut audio = self.audio.lock();
        self.enable_monitoring(&mut audio, enabled);
    }

    pub fn is_monitoring_enabled(&self) -> bool {
        self.shared.monitoring.load(Ordering::Acquire)
    }

    /// Gets the timing profile of the last calibration.
    pub fn timing_profile(&self) -> TimingProfile {
        *self.shared.profile.read()
    }

    /// Returns true if the last calibration produced a valid profile.
    pub fn is_calibrated(&self) -> bool {
        self.timing_profile().is_valid()
    }

    /// Gets the reference waveform the voice engine plays, if any.
    pub fn reference_waveform(&self) -> Option<Arc<Waveform>> {
        self.control.lock().reference.clone()
    }

    /// Gets the number of frames captured by the calibration in progress.
    pub fn calibration_len(&self) -> usize {
        self.audio.lock().calibration.len()
    }

    /// Gets the sample rate of the most recent calibration audio.
    pub fn calibration_sample_rate(&self) -> f64 {
        self.audio.lock().calibration_sample_rate
    }

    /// Gets the paired events of the last completed capture.
    pub fn events(&self) -> Arc<[NoteEvent]> {
        self.shared.performance.read().clone()
    }

    pub fn event_count(&self) -> usize {
        self.shared.event_count.load(Ordering::Relaxed)
    }

    pub fn note_count(&self) -> usize {
        self.audio.lock().recorder.note_count()
    }

    /// Gets the time of the last recorded event.
    pub fn performance_duration(&self) -> f64 {
        self.audio.lock().recorder.duration()
    }

    /// Gets the index of the next event the playback cursor hasn't reached.
    pub fn playback_index(&self) -> usize {
        self.audio.lock().playback_index
    }

    /// Gets the playback position in seconds.
    pub fn playback_time(&self) -> f64 {
        self.audio.lock().playback_time
    }

    /// Returns the number of voices sounding in the voice engine.
    pub fn active_voice_count(&self) -> usize {
        self.audio.lock().engine.active_voice_count()
    }

    /// Gets a copy of the envelope computed by the last calibration.
    pub fn envelope(&self) -> Vec<f32> {
        self.control.lock().analyzer.envelope().to_vec()
    }
}

impl Default for SessionController {
    fn default() -> Self {
        SessionController::new()
    }
}
