use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tiltwrite::bridge::{SpeechSink, Transcript};
use tiltwrite::controller::Mode;
use tiltwrite::input::{DirectionClassifier, TiltSample};
use tiltwrite::{Config, PredictiveEngine, SelectionStateMachine};

const STEP: Duration = Duration::from_nanos(16_666_667);

struct Mute;

impl SpeechSink for Mute {
    fn speak(&self, _text: &str) {}
}

/// Head movement as a slow random walk, the way a real sensor drifts
fn random_walk(len: usize, seed: u64) -> Vec<TiltSample> {
    let mut rng = StdRng::seed_from_u64(seed);
    let (mut roll, mut pitch) = (0.0f64, 0.0f64);
    (0..len)
        .map(|_| {
            roll = (roll + rng.gen_range(-0.05..0.05)).clamp(-1.0, 1.0);
            pitch = (pitch + rng.gen_range(-0.05..0.05)).clamp(-1.0, 1.0);
            TiltSample::new(roll, pitch)
        })
        .collect()
}

fn machine(mode: Mode) -> SelectionStateMachine {
    let transcript = Transcript::from_lines(["the quick brown fox", "jumps over the lazy dog"]);
    SelectionStateMachine::new(
        &Config::default(),
        Arc::new(PredictiveEngine::with_defaults()),
        transcript,
        Arc::new(Mute),
    )
    .with_mode(mode)
}

fn bench_classifier(c: &mut Criterion) {
    let samples = random_walk(4096, 7);
    let mut classifier = DirectionClassifier::new(Config::default().gesture);
    let base = Instant::now();

    c.bench_function("classify_4096_samples", |b| {
        b.iter(|| {
            let mut now = base;
            for sample in &samples {
                now += STEP;
                black_box(classifier.classify(sample.roll, sample.pitch, now));
            }
        })
    });
}

fn bench_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_update");
    let samples = random_walk(1024, 42);

    for mode in [Mode::Write, Mode::Caption] {
        group.bench_with_input(BenchmarkId::new("random_walk", mode), &mode, |b, &mode| {
            b.iter_batched_ref(
                || machine(mode),
                |machine| {
                    let mut now = Instant::now();
                    for sample in &samples {
                        now += STEP;
                        machine.update(sample.roll, sample.pitch, now);
                    }
                    black_box(machine.dwell_percent());
                },
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_snapshot(c: &mut Criterion) {
    let mut machine = machine(Mode::Write);
    machine.buffer_mut().sentence = "I WOULD LIKE SOME ".to_string();
    machine.buffer_mut().prefix = "WA".to_string();
    machine.update(0.0, 0.0, Instant::now());

    c.bench_function("render_snapshot", |b| b.iter(|| black_box(machine.snapshot())));
}

criterion_group!(benches, bench_classifier, bench_update, bench_snapshot);
criterion_main!(benches);
