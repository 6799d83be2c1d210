//! Integration tests for the per-frame pipeline with synthetic landmarks


use eye_mouse::{
    blink_detector::BlinkDetector,
    click_state::{ClickAction, ClickStateMachine},
    filters::damping::DampingFilter,
    gaze_mapper::{FrameSize, GazeMapper},
    landmarks::{FrameLandmarks, Landmark},
    pipeline::{FramePipeline, SessionState},
    Error,
};
use proptest::prelude::*;
use std::time::Duration;
use test_helpers::{closed_eye, open_eye, RecordingSink, SinkEvent, FRAME, SCREEN};

fn pipeline() -> FramePipeline {
    let mapper = GazeMapper::new(SCREEN, 50.0).expect("valid mapper");
    FramePipeline::new(mapper, BlinkDetector::new(0.004))
}

fn session(cooldown: f64, window: f64) -> SessionState {
    SessionState::new(
        DampingFilter::new(5.0).expect("valid factor"),
        ClickStateMachine::new(Duration::from_secs_f64(cooldown), Duration::from_secs_f64(window)),
    )
}

#[test]
fn test_open_eye_moves_cursor_toward_mapped_gaze() {
    let pipeline = pipeline();
    let mut state = session(1.0, 1.0);
    let mut cursor = RecordingSink::default();
    let mut actions = RecordingSink::default();

    let report = pipeline
        .process_frame(
            &mut state,
            Some(&open_eye((0.5, 0.5))),
            FRAME,
            Duration::ZERO,
            &mut cursor,
            &mut actions,
        )
        .unwrap()
        .expect("face present");

    assert_eq!(report.gaze_pixel, (320, 240));
    assert!((report.target.0 - 960.0).abs() < 1e-9);
    assert!((report.target.1 - 540.0).abs() < 1e-9);
    // First step from the origin covers a fifth of the distance
    assert!((report.cursor.0 - 192.0).abs() < 1e-9);
    assert!((report.cursor.1 - 108.0).abs() < 1e-9);
    assert!(!report.blink.closed);
    assert_eq!(report.action, ClickAction::None);

    assert_eq!(cursor.moves(), vec![report.cursor]);
    assert!(actions.events.is_empty());
}

#[test]
fn test_cursor_converges_on_steady_gaze() {
    let pipeline = pipeline();
    let mut state = session(1.0, 1.0);
    let mut cursor = RecordingSink::default();
    let mut actions = RecordingSink::default();
    let face = open_eye((0.5, 0.5));

    for frame in 0..60 {
        pipeline
            .process_frame(
                &mut state,
                Some(&face),
                FRAME,
                Duration::from_millis(frame * 33),
                &mut cursor,
                &mut actions,
            )
            .unwrap();
    }

    let moves = cursor.moves();
    assert_eq!(moves.len(), 60);
    assert!(moves.windows(2).all(|w| w[0].0 < w[1].0 && w[0].1 < w[1].1));
    let (x, y) = state.cursor.position();
    assert!((x - 960.0).abs() < 0.01 && (y - 540.0).abs() < 0.01);
}

#[test]
fn test_scenario_cooldown_suppresses_and_double_blink_stays_unreachable() {
    let pipeline = pipeline();
    let mut state = session(1.0, 1.0);
    let mut cursor = RecordingSink::default();
    let mut actions = RecordingSink::default();
    let face = closed_eye((0.5, 0.5));

    let mut fired = Vec::new();
    for t in [0.0, 0.5, 1.2] {
        let report = pipeline
            .process_frame(
                &mut state,
                Some(&face),
                FRAME,
                Duration::from_secs_f64(t),
                &mut cursor,
                &mut actions,
            )
            .unwrap()
            .expect("face present");
        fired.push(report.action);
    }

    assert_eq!(fired, vec![ClickAction::Click, ClickAction::None, ClickAction::Click]);
    assert_eq!(actions.events, vec![SinkEvent::Click, SinkEvent::Click]);
    let timers = state.clicks.timers();
    assert_eq!(timers.last_click, Some(Duration::from_secs_f64(1.2)));
    assert_eq!(timers.last_blink, Some(Duration::from_secs_f64(1.2)));
}

#[test]
fn test_double_blink_closes_window_after_click() {
    let pipeline = pipeline();
    let mut state = session(0.5, 1.0);
    let mut cursor = RecordingSink::default();
    let mut actions = RecordingSink::default();
    let face = closed_eye((0.3, 0.6));

    for t in [0.0, 0.7] {
        pipeline
            .process_frame(
                &mut state,
                Some(&face),
                FRAME,
                Duration::from_secs_f64(t),
                &mut cursor,
                &mut actions,
            )
            .unwrap();
    }

    assert_eq!(
        actions.events,
        vec![SinkEvent::Click, SinkEvent::Click, SinkEvent::CloseWindow]
    );
}

#[test]
fn test_no_face_leaves_state_and_sinks_untouched() {
    let pipeline = pipeline();
    let mut state = session(1.0, 1.0);
    let mut cursor = RecordingSink::default();
    let mut actions = RecordingSink::default();

    pipeline
        .process_frame(
            &mut state,
            Some(&closed_eye((0.2, 0.2))),
            FRAME,
            Duration::ZERO,
            &mut cursor,
            &mut actions,
        )
        .unwrap();
    let position = state.cursor.position();
    let timers = state.clicks.timers();
    let events = cursor.events.len() + actions.events.len();

    let report = pipeline
        .process_frame(
            &mut state,
            None,
            FRAME,
            Duration::from_secs(5),
            &mut cursor,
            &mut actions,
        )
        .unwrap();

    assert!(report.is_none());
    assert_eq!(state.cursor.position(), position);
    assert_eq!(state.clicks.timers(), timers);
    assert_eq!(cursor.events.len() + actions.events.len(), events);
}

#[test]
fn test_incomplete_landmarks_are_rejected_before_any_update() {
    let pipeline = pipeline();
    let mut state = session(1.0, 1.0);
    let mut cursor = RecordingSink::default();
    let mut actions = RecordingSink::default();
    let partial = FrameLandmarks::new(vec![Landmark::new(0.5, 0.5, 0.0); 200]);

    let result = pipeline.process_frame(
        &mut state,
        Some(&partial),
        FRAME,
        Duration::ZERO,
        &mut cursor,
        &mut actions,
    );

    assert!(matches!(result, Err(Error::Landmarks(_))));
    assert_eq!(state.cursor.position(), (0.0, 0.0));
    assert_eq!(state.clicks.timers().last_click, None);
    assert!(cursor.events.is_empty() && actions.events.is_empty());
}

#[test]
fn test_cursor_sink_failure_still_runs_blink_branch() {
    let pipeline = pipeline();
    let mut state = session(1.0, 1.0);
    let mut cursor = RecordingSink {
        fail_moves: true,
        ..RecordingSink::default()
    };
    let mut actions = RecordingSink::default();

    let result = pipeline.process_frame(
        &mut state,
        Some(&closed_eye((0.5, 0.5))),
        FRAME,
        Duration::from_secs(2),
        &mut cursor,
        &mut actions,
    );

    assert!(matches!(result, Err(Error::InputInjection(_))));
    assert_eq!(actions.events, vec![SinkEvent::Click]);
    assert_eq!(state.clicks.timers().last_click, Some(Duration::from_secs(2)));
    assert!((state.cursor.position().0 - 192.0).abs() < 1e-9);
}

#[test]
fn test_action_sink_failure_still_moves_cursor() {
    let pipeline = pipeline();
    let mut state = session(1.0, 1.0);
    let mut cursor = RecordingSink::default();
    let mut actions = RecordingSink {
        fail_clicks: true,
        ..RecordingSink::default()
    };

    let result = pipeline.process_frame(
        &mut state,
        Some(&closed_eye((0.5, 0.5))),
        FRAME,
        Duration::ZERO,
        &mut cursor,
        &mut actions,
    );

    assert!(matches!(result, Err(Error::InputInjection(_))));
    assert_eq!(cursor.moves().len(), 1);
    assert_eq!(state.clicks.timers().last_click, Some(Duration::ZERO));
}

#[test]
fn test_narrow_frame_uses_full_width() {
    let pipeline = pipeline();
    let mut state = session(1.0, 1.0);
    let mut sink = RecordingSink::default();
    let mut actions = RecordingSink::default();

    // 80 px wide with a 50 px margin leaves no interior
    let report = pipeline
        .process_frame(
            &mut state,
            Some(&open_eye((0.5, 0.5))),
            FrameSize::new(80, 480),
            Duration::ZERO,
            &mut sink,
            &mut actions,
        )
        .unwrap()
        .expect("face present");

    assert_eq!(report.gaze_pixel.0, 40);
    assert!((report.target.0 - 960.0).abs() < 1e-9);
}

proptest! {
    #[test]
    fn prop_clicks_respect_cooldown(
        gaps_ms in prop::collection::vec(0u64..1500, 1..60),
        closed in prop::collection::vec(any::<bool>(), 60),
    ) {
        let cooldown = Duration::from_secs(1);
        let pipeline = pipeline();
        let mut state = session(1.0, 1.0);
        let mut cursor = RecordingSink::default();
        let mut actions = RecordingSink::default();

        let mut now = Duration::ZERO;
        let mut fired = Vec::new();
        for (gap, is_closed) in gaps_ms.iter().zip(closed.iter()) {
            now += Duration::from_millis(*gap);
            let face = if *is_closed { closed_eye((0.5, 0.5)) } else { open_eye((0.5, 0.5)) };
            let report = pipeline
                .process_frame(&mut state, Some(&face), FRAME, now, &mut cursor, &mut actions)
                .unwrap()
                .expect("face present");
            if report.action.clicks() {
                fired.push(now);
            }
        }

        prop_assert_eq!(fired.len(), actions.clicks());
        for pair in fired.windows(2) {
            prop_assert!(pair[1] - pair[0] > cooldown);
        }
    }

    #[test]
    fn prop_cursor_stays_on_screen(
        gaze in prop::collection::vec((-0.5f32..1.5, -0.5f32..1.5), 1..40),
    ) {
        let pipeline = pipeline();
        let mut state = session(1.0, 1.0);
        let mut cursor = RecordingSink::default();
        let mut actions = RecordingSink::default();

        for (i, point) in gaze.iter().enumerate() {
            let report = pipeline
                .process_frame(
                    &mut state,
                    Some(&open_eye(*point)),
                    FRAME,
                    Duration::from_millis(i as u64 * 33),
                    &mut cursor,
                    &mut actions,
                )
                .unwrap()
                .expect("face present");
            prop_assert!((0.0..=SCREEN.width).contains(&report.target.0));
            prop_assert!((0.0..=SCREEN.height).contains(&report.target.1));
            prop_assert!((0.0..=SCREEN.width).contains(&report.cursor.0));
            prop_assert!((0.0..=SCREEN.height).contains(&report.cursor.1));
        }
    }
}
