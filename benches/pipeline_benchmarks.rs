//! Benchmarks for the per-frame pipeline and its stages

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use eye_mouse::{
    blink_detector::BlinkDetector,
    click_state::ClickStateMachine,
    constants::{EYE_LOWER_LID, EYE_UPPER_LID, IRIS_GAZE_OFFSET, IRIS_RANGE, NUM_FACE_MESH_LANDMARKS},
    cursor_control::{ActionSink, CursorSink},
    filters::{damping::DampingFilter, CursorFilter},
    gaze_mapper::{FrameSize, GazeMapper, ScreenBounds},
    landmarks::{FrameLandmarks, Landmark},
    pipeline::{FramePipeline, SessionState},
    Result,
};
use std::time::Duration;

const SCREEN: ScreenBounds = ScreenBounds::new(1920.0, 1080.0);
const FRAME: FrameSize = FrameSize::new(640, 480);

struct NullSink;

impl CursorSink for NullSink {
    fn move_to(&mut self, x: f64, y: f64) -> Result<()> {
        black_box((x, y));
        Ok(())
    }

    fn screen_bounds(&self) -> ScreenBounds {
        SCREEN
    }
}

impl ActionSink for NullSink {
    fn click(&mut self) -> Result<()> {
        Ok(())
    }

    fn close_window(&mut self) -> Result<()> {
        Ok(())
    }
}

fn face(gaze: (f32, f32), aperture: f32) -> FrameLandmarks {
    let mut points = vec![Landmark::new(0.5, 0.5, 0.0); NUM_FACE_MESH_LANDMARKS];
    points[IRIS_RANGE.start + IRIS_GAZE_OFFSET] = Landmark::new(gaze.0, gaze.1, 0.0);
    points[EYE_UPPER_LID] = Landmark::new(0.45, 0.40, 0.0);
    points[EYE_LOWER_LID] = Landmark::new(0.45, 0.40 + aperture, 0.0);
    FrameLandmarks::new(points)
}

/// Simulated gaze track with jitter and a blink every 30 frames
fn gaze_track(len: usize) -> Vec<FrameLandmarks> {
    (0..len)
        .map(|i| {
            let t = i as f32 * 0.05;
            let x = 0.5 + 0.3 * t.sin() + 0.01 * rand::random::<f32>();
            let y = 0.5 + 0.2 * (t * 0.7).cos() + 0.01 * rand::random::<f32>();
            let aperture = if i % 30 == 0 { 0.001 } else { 0.02 };
            face((x, y), aperture)
        })
        .collect()
}

fn bench_process_frame(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline");
    let track = gaze_track(300);
    let mapper = GazeMapper::new(SCREEN, 50.0).unwrap();
    let pipeline = FramePipeline::new(mapper, BlinkDetector::new(0.004));

    group.bench_function("process_frame", |b| {
        let mut state = SessionState::new(
            DampingFilter::new(5.0).unwrap(),
            ClickStateMachine::new(Duration::from_secs(1), Duration::from_secs(1)),
        );
        let mut sink = NullSink;
        let mut actions = NullSink;
        let mut frame = 0_usize;
        b.iter(|| {
            let landmarks = &track[frame % track.len()];
            let now = Duration::from_millis(frame as u64 * 33);
            frame += 1;
            black_box(
                pipeline
                    .process_frame(&mut state, Some(landmarks), FRAME, now, &mut sink, &mut actions)
                    .unwrap(),
            )
        });
    });

    group.bench_function("process_frame_no_face", |b| {
        let mut state = SessionState::new(
            DampingFilter::new(5.0).unwrap(),
            ClickStateMachine::new(Duration::from_secs(1), Duration::from_secs(1)),
        );
        let mut sink = NullSink;
        let mut actions = NullSink;
        b.iter(|| {
            black_box(
                pipeline
                    .process_frame(&mut state, None, FRAME, Duration::ZERO, &mut sink, &mut actions)
                    .unwrap(),
            )
        });
    });

    group.finish();
}

fn bench_stages(c: &mut Criterion) {
    let mut group = c.benchmark_group("stages");
    let mapper = GazeMapper::new(SCREEN, 50.0).unwrap();
    let detector = BlinkDetector::new(0.004);
    let sample = face((0.4, 0.6), 0.02);

    group.bench_function("map", |b| {
        b.iter(|| black_box(mapper.map(black_box(211.0), black_box(377.0), FRAME)));
    });

    group.bench_function("classify", |b| {
        b.iter(|| black_box(detector.classify(black_box(&sample)).unwrap()));
    });

    for factor in [1.0, 5.0, 10.0] {
        group.bench_with_input(BenchmarkId::new("smoothing", factor), &factor, |b, &factor| {
            let mut filter = DampingFilter::new(factor).unwrap();
            b.iter(|| black_box(filter.apply(black_box(960.0), black_box(540.0))));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_process_frame, bench_stages);
criterion_main!(benches);
