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
use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{crate_version, Parser, Subcommand};
use duration_string::DurationString;
use tracing::info;
use vintage_capture::analysis::EnvelopeAnalyzer;
use vintage_capture::config::{Settings, DEFAULT_BLOCK_SIZE};
use vintage_capture::host::OfflineHost;
use vintage_capture::midi::{smf, TimedMessage};
use vintage_capture::samples::{write_wav_file, VoiceEngine, Waveform, MAX_VOICES};
use vintage_capture::session::SessionController;
use vintage_capture::util::{duration_minutes_seconds, format_seconds};

/// Extra time rendered after the last performance event so releases can finish.
const RELEASE_TAIL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Captures the character of a vintage synthesizer from a single reference note."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Measures the attack and release of a recorded reference note.
    Analyze {
        /// The WAV file holding the reference note. Only the first channel is used.
        path: String,
        /// The sample at which the key was released, if known.
        #[arg[short, long]]
        note_off_sample: Option<usize>,
        /// The path to a settings file.
        #[arg[short, long]]
        config: Option<String>,
    },
    /// Renders one note of a reference recording at another pitch.
    Render {
        /// The WAV file holding the reference note.
        path: String,
        /// The stereo WAV file to write.
        output_path: String,
        /// The MIDI note to play. The reference is note 60.
        #[arg[short, long]]
        note: u8,
        /// The note velocity.
        #[arg[short, long, default_value_t = 127]]
        velocity: u8,
        /// How long the key is held, e.g. 500ms or 2s.
        #[arg[long, default_value = "1s"]]
        hold: String,
    },
    /// Calibrates against a reference recording, then records a performance from a MIDI file
    /// while monitoring it.
    Session {
        /// The WAV file holding the reference note.
        calibration_path: String,
        /// The Standard MIDI File holding the performance.
        performance_path: String,
        /// Where to write the monitored performance as a stereo WAV file.
        #[arg[short, long]]
        output: Option<String>,
        /// The path to a settings file.
        #[arg[short, long]]
        config: Option<String>,
    },
}

fn load_settings(config: Option<String>) -> Result<Settings, Box<dyn Error>> {
    Ok(match config {
        Some(config) => Settings::load(&PathBuf::from(config))?,
        None => Settings::default(),
    })
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            path,
            note_off_sample,
            config,
        } => {
            let settings = load_settings(config)?;
            let waveform = Waveform::from_wav_file(&PathBuf::from(&path))?;

            let mut analyzer = EnvelopeAnalyzer::with_policy(settings.note_off_policy());
            let profile =
                analyzer.analyze(waveform.samples(), waveform.sample_rate(), note_off_sample);

            println!("{} ({} frames)", path, waveform.len());
            println!("Envelope: {} points", analyzer.envelope().len());
            println!("Profile: {}", profile);
        }
        Commands::Render {
            path,
            output_path,
            note,
            velocity,
            hold,
        } => {
            let hold: Duration = DurationString::from_string(hold)?.into();
            let waveform = Arc::new(Waveform::from_wav_file(&PathBuf::from(&path))?);
            let sample_rate = waveform.sample_rate();
            let held_frames = (hold.as_secs_f64() * sample_rate).ceil() as usize;

            let mut engine = VoiceEngine::new();
            engine.set_reference_waveform(waveform);
            let output =
                engine.render_note(note, velocity, held_frames, DEFAULT_BLOCK_SIZE, sample_rate);
            let rendered = output.len() / 2;

            write_wav_file(&PathBuf::from(&output_path), &output, 2, sample_rate as u32)?;
            println!(
                "Rendered note {} for {} ({} voices available)",
                note.min(127),
                format_seconds(rendered as f64 / sample_rate),
                MAX_VOICES
            );
        }
        Commands::Session {
            calibration_path,
            performance_path,
            output,
            config,
        } => {
            let settings = load_settings(config)?;
            let waveform = Waveform::from_wav_file(&PathBuf::from(&calibration_path))?;
            let messages = smf::read_note_messages(&PathBuf::from(&performance_path))?;

            let mut host = OfflineHost::from_settings(&settings, waveform.sample_rate() as u32);
            let controller = SessionController::from_settings(&settings)?;

            controller.start_calibration();
            host.run(&controller, waveform.samples(), &[]);
            controller.stop_calibration();

            let profile = controller.timing_profile();
            println!("Calibration: {}", profile);
            if !controller.is_calibrated() {
                println!("Calibration failed, not recording the performance.");
                return Ok(());
            }

            controller.start_recording();
            let start = host.elapsed();
            let messages: Vec<TimedMessage> = messages
                .iter()
                .map(|message| message.offset(start))
                .collect();
            let last = messages
                .last()
                .map_or(0.0, |message| message.timestamp() - start);
            let frames = host.frames_for(
                Duration::from_secs_f64(last + f64::from(profile.release_time())) + RELEASE_TAIL,
            );
            let rendered = host.render(&controller, frames, &messages);
            controller.stop_recording();

            println!(
                "Performance: {} events, {} notes, {}",
                controller.event_count(),
                controller.note_count(),
                duration_minutes_seconds(Duration::from_secs_f64(
                    controller.performance_duration()
                ))
            );
            for event in controller.events().iter() {
                println!("  {}", event);
            }

            if let Some(output) = output {
                write_wav_file(&PathBuf::from(&output), &rendered, 2, host.sample_rate())?;
                info!(output = output.as_str(), "Wrote monitored performance");
            }
        }
    }

    Ok(())
}
