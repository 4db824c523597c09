use std::cell::Cell;
use std::rc::Rc;

use editorial::{
    AppContext, AppOptions, EditorialContext, PresetOutcome, ReadingMetrics, TelemetrySnapshot,
};
use renderer::{
    FixedTimeSource, FrameQueue, GeometryVariant, HeadlessContext, ParameterPatch,
    ProjectionVariant, SurfaceSize, TickOutcome, CHANNEL_COUNT, GLOBAL_BUFFER_LEN,
};

fn app_with(queue: &FrameQueue, autostart: bool) -> AppContext<HeadlessContext> {
    AppContext::init(
        || Ok(HeadlessContext::new(SurfaceSize::new(320, 200))),
        Box::new(queue.clone()),
        AppOptions {
            time_source: Box::new(FixedTimeSource::new(2.0)),
            autostart,
            ..AppOptions::default()
        },
    )
    .expect("headless init")
}

fn pump(app: &mut AppContext<HeadlessContext>, queue: &FrameQueue, frames: usize) -> usize {
    let mut rendered = 0;
    for _ in 0..frames {
        let Some(ticket) = queue.pop() else { break };
        if app.tick(ticket) == TickOutcome::Rendered {
            rendered += 1;
        }
    }
    rendered
}

#[test]
fn every_variant_pair_is_built_once() {
    let queue = FrameQueue::new();
    let mut app = app_with(&queue, false);
    for geometry in GeometryVariant::ALL {
        for projection in ProjectionVariant::ALL {
            app.update_parameters(&ParameterPatch::with_variants(geometry, projection))
                .unwrap();
        }
    }
    for geometry in GeometryVariant::ALL {
        for projection in ProjectionVariant::ALL {
            app.update_parameters(&ParameterPatch::with_variants(geometry, projection))
                .unwrap();
        }
    }
    let engine = app.engine();
    assert_eq!(engine.shaders().len(), 9);
    assert_eq!(engine.context().log().links, 9);
}

#[test]
fn partial_patch_leaves_other_fields() {
    let queue = FrameQueue::new();
    let mut app = app_with(&queue, false);
    let before = app.engine().state().clone();
    let report = app
        .update_parameters(&ParameterPatch {
            morph_factor: Some(0.9),
            ..ParameterPatch::default()
        })
        .unwrap();
    assert_eq!(report.changed, 1);
    let after = app.engine().state();
    assert_eq!(after.morph_factor, 0.9);
    assert_eq!(after.rotation_speed, before.rotation_speed);
    assert_eq!(after.primary_color, before.primary_color);
    assert_eq!(after.geometry, before.geometry);
}

#[test]
fn telemetry_fills_channels_and_buffer() {
    let queue = FrameQueue::new();
    let mut app = app_with(&queue, false);
    let update = app
        .update_data(&TelemetrySnapshot::new().with("engagement", 0.75))
        .unwrap();
    assert_eq!(update.channels.len(), CHANNEL_COUNT);
    let state = app.engine().state();
    assert_eq!(state.data_channels.len(), CHANNEL_COUNT);
    assert_eq!(state.global_data_buffer.len(), GLOBAL_BUFFER_LEN);
    assert_eq!(state.data_channels[2], 0.75);
    assert_eq!(state.global_data_buffer[2], 0.75);
    assert_eq!(state.global_data_buffer[CHANNEL_COUNT + 2], 0.0);
}

#[test]
fn reading_metrics_drive_channels() {
    let queue = FrameQueue::new();
    let mut app = app_with(&queue, false);
    let metrics = ReadingMetrics {
        scroll_progress: 0.5,
        engagement: 0.4,
        window_width: 1920.0,
        ..ReadingMetrics::default()
    };
    app.update_reading_metrics_at(&metrics, 0.75).unwrap();
    let channels = app.engine().state().data_channels;
    assert!((channels[0] - 1.0).abs() < 1e-6);
    assert_eq!(channels[2], 0.4);
    assert_eq!(channels[5], 1.0);
    assert_eq!(channels[7], 0.75);
}

#[test]
fn unknown_section_uses_home_preset() {
    let queue = FrameQueue::new();
    let mut app = app_with(&queue, false);
    app.apply_section_preset("science").unwrap();
    let outcome = app
        .set_editorial_context(&EditorialContext::section("sports"))
        .unwrap();
    assert_eq!(outcome.applied_name(), Some("home"));
    let state = app.engine().state();
    assert_eq!(state.geometry, GeometryVariant::Hypercube);
    assert_eq!(state.projection, ProjectionVariant::Perspective);
    assert_eq!(state.primary_color, [1.0, 0.0, 1.0]);
}

#[test]
fn unknown_editorial_preset_changes_nothing() {
    let queue = FrameQueue::new();
    let mut app = app_with(&queue, false);
    let before = app.engine().state().clone();
    let outcome = app.apply_editorial_preset("retro").unwrap();
    assert!(matches!(outcome, PresetOutcome::Unknown { .. }));
    assert_eq!(app.engine().state(), &before);

    app.apply_editorial_preset("energetic").unwrap();
    let state = app.engine().state();
    assert_eq!(state.geometry, GeometryVariant::Hypertetrahedron);
    assert_eq!(state.grid_density, 24.0);
}

#[test]
fn start_then_stop_draws_nothing() {
    let queue = FrameQueue::ignoring_cancel();
    let mut app = app_with(&queue, false);
    assert!(app.start());
    assert!(app.stop());
    assert_eq!(queue.pending(), 1);
    assert_eq!(pump(&mut app, &queue, 4), 0);
    assert_eq!(app.engine().context().log().draws, 0);
}

#[test]
fn running_loop_renders_each_tick() {
    let queue = FrameQueue::new();
    let mut app = app_with(&queue, true);
    assert_eq!(pump(&mut app, &queue, 5), 5);
    let log = app.engine().context().log();
    assert_eq!(log.draws, 5);
    assert_eq!(log.vertices_drawn, 20);
    assert_eq!(app.engine().state().time, 2.0);
}

#[test]
fn dispose_is_idempotent() {
    let queue = FrameQueue::new();
    let mut app = app_with(&queue, true);
    let torn_down = Rc::new(Cell::new(0));
    let counter = Rc::clone(&torn_down);
    app.register_teardown("metrics timer", move || counter.set(counter.get() + 1));

    assert!(app.dispose());
    assert!(!app.dispose());
    let log = app.engine().context().log();
    assert_eq!(log.detaches, 1);
    assert_eq!(log.releases, 1);
    assert_eq!(torn_down.get(), 1);
    assert!(!app.start());
    assert!(app
        .update_parameters(&ParameterPatch {
            color_shift: Some(0.2),
            ..ParameterPatch::default()
        })
        .is_err());
}
