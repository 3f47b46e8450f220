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
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use std::time::Duration;
use vintage_capture::analysis::EnvelopeAnalyzer;
use vintage_capture::samples::{VoiceEngine, Waveform, MAX_VOICES};

const SAMPLE_RATE: u32 = 44100;

/// A decaying tone with a few partials, roughly what a held synth note looks like.
fn generate_test_note(duration_seconds: f32, sample_rate: u32) -> Vec<f32> {
    let num_samples = (duration_seconds * sample_rate as f32) as usize;
    let attack = sample_rate as f32 * 0.05;

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let level = (i as f32 / attack).min(1.0) * (-t).exp();
            level
                * (0.5 * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
                    + 0.2 * (2.0 * std::f32::consts::PI * 440.0 * t).sin()
                    + 0.1 * (2.0 * std::f32::consts::PI * 660.0 * t).sin())
        })
        .collect()
}

fn benchmark_voice_rendering(c: &mut Criterion) {
    let mut group = c.benchmark_group("voice_rendering");
    let reference = Arc::new(Waveform::new(
        generate_test_note(10.0, SAMPLE_RATE),
        f64::from(SAMPLE_RATE),
    ));

    for voices in [1, 4, MAX_VOICES] {
        for block_size in [64, 256, 1024] {
            let mut engine = VoiceEngine::new();
            engine.set_reference_waveform(reference.clone());
            let mut buffer = vec![0.0; block_size * 2];

            group.bench_with_input(
                BenchmarkId::new(format!("{}_voices", voices), block_size),
                &block_size,
                |b, &block_size| {
                    b.iter(|| {
                        // Restart the chord when the reference runs out.
                        if engine.active_voice_count() < voices {
                            engine.all_notes_off();
                            for note in 0..voices {
                                engine.note_on(48 + note as u8, 100);
                            }
                        }
                        engine.render_block(
                            black_box(&mut buffer),
                            block_size,
                            f64::from(SAMPLE_RATE),
                        );
                    })
                },
            );
        }
    }

    group.finish();
}

fn benchmark_envelope_analysis(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_analysis");
    group.measurement_time(Duration::from_secs(10));

    for seconds in [1.0, 5.0, 30.0] {
        let samples = generate_test_note(seconds, SAMPLE_RATE);
        let mut analyzer = EnvelopeAnalyzer::new();

        group.bench_with_input(
            BenchmarkId::new("analyze", format!("{}s", seconds)),
            &samples,
            |b, samples| {
                b.iter(|| {
                    black_box(analyzer.analyze(
                        black_box(samples),
                        f64::from(SAMPLE_RATE),
                        None,
                    ))
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_voice_rendering,
    benchmark_envelope_analysis
);
criterion_main!(benches);
