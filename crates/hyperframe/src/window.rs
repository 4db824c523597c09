use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use editorial::{AppContext, AppOptions, PresetOutcome, EDITORIAL_PRESETS, SECTION_PRESETS};
use renderer::gpu::{WgpuContext, WgpuOptions};
use renderer::winit::event::{ElementState, MouseScrollDelta, WindowEvent};
use renderer::winit::keyboard::{Key, NamedKey};
use renderer::winit::window::Window;
use renderer::{FrameTicket, SystemTimeSource, TickOutcome, WindowControl, WindowDelegate, WinitFrameHost};
use scheduler::{Scheduler, TimerId};
use tracing::{debug, info, warn};

use crate::bootstrap::{apply_plan, LaunchPlan};
use crate::reader::InputReader;
use crate::simulate::SimulatedReader;

const LINE_SCROLL_STEP: f32 = 0.02;
const PIXEL_SCROLL_RANGE: f32 = 4000.0;
const PRESET_KEYS: [&str; 4] = ["q", "w", "e", "r"];

/// Window side of a run: owns the app once the window exists and turns
/// input into reading metrics.
pub struct FrameWindow {
    plan: LaunchPlan,
    app: Option<AppContext<WgpuContext>>,
    scheduler: Rc<RefCell<Scheduler>>,
    metrics_timer: Option<TimerId>,
    reader: InputReader,
    simulator: Option<SimulatedReader>,
}

impl FrameWindow {
    pub fn new(plan: LaunchPlan) -> Self {
        let reader = InputReader::new(Instant::now(), plan.size.width);
        let simulator = plan.simulate.then(|| SimulatedReader::new(plan.seed));
        if simulator.is_some() {
            info!(seed = plan.seed, "simulated reader enabled");
        }
        Self {
            plan,
            app: None,
            scheduler: Rc::new(RefCell::new(Scheduler::new())),
            metrics_timer: None,
            reader,
            simulator,
        }
    }

    fn push_metrics(&mut self, now: Instant) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        let metrics = match self.simulator.as_mut() {
            Some(simulator) => simulator.advance(self.plan.metrics_interval),
            None => self.reader.sample(now),
        };
        match app.update_reading_metrics(&metrics) {
            Ok(update) => debug!(
                scroll = metrics.scroll_progress,
                direct = update.direct_fields,
                "pushed reading metrics"
            ),
            Err(err) => warn!(error = %err, "reading metrics rejected"),
        }
    }

    fn handle_key(&mut self, key: &Key) -> WindowControl {
        let Some(app) = self.app.as_mut() else {
            return WindowControl::Continue;
        };
        match key {
            Key::Named(NamedKey::Escape) => return WindowControl::Exit,
            Key::Named(NamedKey::Space) => {
                if !app.stop() {
                    app.start();
                }
            }
            Key::Character(text) => {
                let text = text.as_str();
                if let Some(index) = text
                    .parse::<usize>()
                    .ok()
                    .filter(|index| (1..=SECTION_PRESETS.len()).contains(index))
                {
                    let section = SECTION_PRESETS[index - 1].name;
                    self.reader.set_depth(index as u32 - 1);
                    log_outcome(app.apply_section_preset(section), section);
                } else if let Some(position) = PRESET_KEYS
                    .iter()
                    .position(|candidate| candidate.eq_ignore_ascii_case(text))
                {
                    let preset = EDITORIAL_PRESETS[position].name;
                    log_outcome(app.apply_editorial_preset(preset), preset);
                }
            }
            _ => {}
        }
        WindowControl::Continue
    }
}

fn log_outcome<E: std::fmt::Display>(result: Result<PresetOutcome, E>, requested: &str) {
    match result {
        Ok(outcome) => info!(requested, applied = outcome.applied_name(), "switched look"),
        Err(err) => warn!(requested, error = %err, "failed to switch look"),
    }
}

impl WindowDelegate for FrameWindow {
    fn attach(&mut self, window: Arc<Window>, frames: WinitFrameHost) -> Result<()> {
        let options = WgpuOptions {
            low_power: self.plan.low_power,
            vsync: self.plan.vsync,
        };
        let mut app = AppContext::init(
            || WgpuContext::new(window, options),
            Box::new(frames),
            AppOptions {
                time_source: Box::new(SystemTimeSource::new()),
                initial_patch: None,
                editorial: self.plan.editorial.clone(),
                autostart: false,
            },
        )
        .context("graphics context unavailable")?;
        apply_plan(&mut app, &self.plan);

        let timer = self
            .scheduler
            .borrow_mut()
            .schedule_every("reading metrics", self.plan.metrics_interval, Instant::now())
            .context("failed to schedule reading metrics")?;
        let scheduler = Rc::clone(&self.scheduler);
        app.register_teardown("reading metrics timer", move || {
            scheduler.borrow_mut().cancel(timer);
        });
        self.metrics_timer = Some(timer);

        app.start();
        self.app = Some(app);
        Ok(())
    }

    fn redraw(&mut self, ticket: FrameTicket) {
        let Some(app) = self.app.as_mut() else {
            return;
        };
        if let TickOutcome::Stopped { reason } = app.tick(ticket) {
            warn!(error = %reason, "rendering halted; press space to retry");
        }
    }

    fn input(&mut self, event: &WindowEvent) -> WindowControl {
        match event {
            WindowEvent::Resized(size) => {
                self.reader.resize(size.width);
                WindowControl::Continue
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let step = match delta {
                    MouseScrollDelta::LineDelta(_, y) => -y * LINE_SCROLL_STEP,
                    MouseScrollDelta::PixelDelta(position) => {
                        -(position.y as f32) / PIXEL_SCROLL_RANGE
                    }
                };
                self.reader.scroll(step);
                WindowControl::Continue
            }
            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                ..
            } => {
                self.reader.click(Instant::now());
                WindowControl::Continue
            }
            WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed => {
                self.handle_key(&event.logical_key)
            }
            _ => WindowControl::Continue,
        }
    }

    fn poll(&mut self, now: Instant) -> Option<Instant> {
        let fired = self.scheduler.borrow_mut().tick(now);
        for event in fired {
            if Some(event.id) == self.metrics_timer {
                self.push_metrics(event.fired_at);
            }
        }
        self.scheduler.borrow().next_deadline()
    }

    fn detach(&mut self) {
        if let Some(mut app) = self.app.take() {
            app.dispose();
        }
        self.metrics_timer = None;
    }
}
