use std::fmt;

use anyhow::{Context, Result};
use editorial::{AppContext, AppOptions};
use renderer::{
    FrameError, FrameQueue, HeadlessContext, ProgramKey, SteppedTimeSource, TickOutcome,
};
use tracing::{info, warn};

use crate::bootstrap::{apply_plan, LaunchPlan};
use crate::simulate::SimulatedReader;

#[derive(Debug)]
pub struct HeadlessSummary {
    pub frames: u64,
    pub draws: u64,
    pub links: u64,
    pub program: ProgramKey,
    pub metrics_updates: u32,
    pub stopped: Option<FrameError>,
}

impl fmt::Display for HeadlessSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rendered {} frames ({} draws, {} programs linked, active {}, {} metric updates)",
            self.frames, self.draws, self.links, self.program, self.metrics_updates
        )?;
        if let Some(reason) = &self.stopped {
            write!(f, "; stopped early: {reason}")?;
        }
        Ok(())
    }
}

/// Drives the engine against the recording context for `frames` ticks.
///
/// Time advances by exactly one frame period per tick, so runs with the same
/// plan and seed are reproducible.
pub fn run_headless(plan: &LaunchPlan, frames: u64) -> Result<HeadlessSummary> {
    let queue = FrameQueue::new();
    let size = plan.size;
    let mut app = AppContext::init(
        || Ok(HeadlessContext::new(size)),
        Box::new(queue.clone()),
        AppOptions {
            time_source: Box::new(SteppedTimeSource::from_fps(plan.fps)),
            initial_patch: None,
            editorial: plan.editorial.clone(),
            autostart: false,
        },
    )
    .context("failed to initialise headless renderer")?;
    apply_plan(&mut app, plan);
    app.start();

    let frames_per_update =
        ((plan.metrics_interval.as_secs_f32() * plan.fps).round() as u64).max(1);
    let mut simulator = plan.simulate.then(|| SimulatedReader::new(plan.seed));
    let mut metrics_updates = 0;
    let mut stopped = None;

    for frame in 1..=frames {
        if let Some(reader) = simulator.as_mut() {
            if frame % frames_per_update == 0 {
                let metrics = reader.advance(plan.metrics_interval);
                match app.update_reading_metrics(&metrics) {
                    Ok(_) => metrics_updates += 1,
                    Err(err) => warn!(error = %err, "simulated metrics rejected"),
                }
            }
        }

        let Some(ticket) = queue.pop() else {
            warn!(frame, "no frame scheduled; ending headless run");
            break;
        };
        if let TickOutcome::Stopped { reason } = app.tick(ticket) {
            stopped = Some(reason);
            break;
        }
    }

    let log = app.engine().context().log();
    let summary = HeadlessSummary {
        frames: app.engine().frames_rendered(),
        draws: log.draws,
        links: log.links,
        program: app.engine().active_program().key(),
        metrics_updates,
        stopped,
    };
    app.dispose();
    info!(
        frames = summary.frames,
        draws = summary.draws,
        links = summary.links,
        program = %summary.program,
        "headless run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use renderer::{GeometryVariant, ParameterPatch, ProjectionVariant, SurfaceSize};

    use super::*;

    fn plan() -> LaunchPlan {
        LaunchPlan {
            title: "test".into(),
            size: SurfaceSize::new(64, 48),
            fps: 30.0,
            vsync: true,
            low_power: false,
            metrics_interval: Duration::from_millis(100),
            editorial: None,
            preset: None,
            patches: Vec::new(),
            simulate: false,
            seed: 5,
        }
    }

    #[test]
    fn renders_requested_frames() {
        let summary = run_headless(&plan(), 10).unwrap();
        assert_eq!(summary.frames, 10);
        assert_eq!(summary.draws, 10);
        assert_eq!(summary.links, 1);
        assert!(summary.stopped.is_none());
        assert!(summary.to_string().starts_with("rendered 10 frames"));
    }

    #[test]
    fn simulation_feeds_metrics_on_interval() {
        let plan = LaunchPlan {
            simulate: true,
            ..plan()
        };
        let summary = run_headless(&plan, 30).unwrap();
        assert_eq!(summary.metrics_updates, 10);
    }

    #[test]
    fn plan_patches_and_preset_apply() {
        let plan = LaunchPlan {
            preset: Some("immersive".into()),
            patches: vec![ParameterPatch::with_variants(
                GeometryVariant::Hypertetrahedron,
                ProjectionVariant::Perspective,
            )],
            ..plan()
        };
        let summary = run_headless(&plan, 2).unwrap();
        assert_eq!(
            summary.program,
            ProgramKey {
                geometry: GeometryVariant::Hypertetrahedron,
                projection: ProjectionVariant::Perspective,
            }
        );
        assert_eq!(summary.links, 3);
    }
}
