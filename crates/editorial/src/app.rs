use renderer::{
    BoxedTimeSource, CapabilityError, FrameHost, FrameTicket, GraphicsContext, ParameterPatch,
    PatchError, RenderEngine, SystemTimeSource, TickOutcome, UpdateReport,
};
use scheduler::SubscriptionId;
use tracing::{error, info, warn};

use crate::controller::{ChannelUpdate, PresetOutcome, TelemetryController};
use crate::metrics::{time_of_day_fraction, EditorialContext, ReadingMetrics, TelemetrySnapshot};

/// Startup knobs for [`AppContext::init`].
pub struct AppOptions {
    pub time_source: BoxedTimeSource,
    /// Applied right after the engine comes up.
    pub initial_patch: Option<ParameterPatch>,
    pub editorial: Option<EditorialContext>,
    pub autostart: bool,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            time_source: Box::new(SystemTimeSource::new()),
            initial_patch: None,
            editorial: None,
            autostart: true,
        }
    }
}

/// The public surface: one render engine plus the telemetry mapping in
/// front of it.
pub struct AppContext<C: GraphicsContext> {
    engine: RenderEngine<C>,
    telemetry: TelemetryController,
}

impl<C: GraphicsContext> AppContext<C> {
    /// Acquires a graphics context from `provide` and brings the engine up.
    ///
    /// A rejected initial patch is logged and skipped; only a missing context
    /// or an unbuildable default program fails initialization.
    pub fn init(
        provide: impl FnOnce() -> Result<C, CapabilityError>,
        host: Box<dyn FrameHost>,
        options: AppOptions,
    ) -> Result<Self, CapabilityError> {
        let context = provide()?;
        let engine = RenderEngine::new(context, host, options.time_source)?;
        let mut app = Self {
            engine,
            telemetry: TelemetryController::new(),
        };

        if let Some(patch) = &options.initial_patch {
            if let Err(err) = app.engine.update_parameters(patch) {
                warn!(error = %err, "ignoring invalid initial parameters");
            }
        }
        if let Some(context) = &options.editorial {
            if let Err(err) = app.set_editorial_context(context) {
                warn!(error = %err, "ignoring editorial context");
            }
        }
        if options.autostart {
            app.engine.start();
        }
        info!(autostart = options.autostart, "hyperframe initialized");
        Ok(app)
    }

    /// Like [`AppContext::init`], but reports failure as `None` after logging it.
    pub fn try_init(
        provide: impl FnOnce() -> Result<C, CapabilityError>,
        host: Box<dyn FrameHost>,
        options: AppOptions,
    ) -> Option<Self> {
        match Self::init(provide, host, options) {
            Ok(app) => Some(app),
            Err(err) => {
                error!(error = %err, "graphics unavailable; rendering disabled");
                None
            }
        }
    }

    pub fn update_parameters(&mut self, patch: &ParameterPatch) -> Result<UpdateReport, PatchError> {
        self.engine.update_parameters(patch)
    }

    pub fn update_parameters_json(&mut self, json: &str) -> Result<UpdateReport, PatchError> {
        let patch = ParameterPatch::from_json(json)?;
        self.engine.update_parameters(&patch)
    }

    pub fn start(&mut self) -> bool {
        self.engine.start()
    }

    pub fn stop(&mut self) -> bool {
        self.engine.stop()
    }

    pub fn tick(&mut self, ticket: FrameTicket) -> TickOutcome {
        self.engine.tick(ticket)
    }

    pub fn dispose(&mut self) -> bool {
        self.engine.dispose()
    }

    pub fn set_editorial_context(
        &mut self,
        context: &EditorialContext,
    ) -> Result<PresetOutcome, PatchError> {
        self.telemetry
            .set_editorial_context(&mut self.engine, context)
    }

    pub fn apply_section_preset(&mut self, section: &str) -> Result<PresetOutcome, PatchError> {
        self.telemetry.apply_section_preset(&mut self.engine, section)
    }

    pub fn apply_editorial_preset(&mut self, name: &str) -> Result<PresetOutcome, PatchError> {
        self.telemetry.apply_editorial_preset(&mut self.engine, name)
    }

    /// Uses the local wall clock for the time-of-day channel.
    pub fn update_reading_metrics(
        &mut self,
        metrics: &ReadingMetrics,
    ) -> Result<ChannelUpdate, PatchError> {
        let time_of_day = time_of_day_fraction(&chrono::Local::now());
        self.update_reading_metrics_at(metrics, time_of_day)
    }

    pub fn update_reading_metrics_at(
        &mut self,
        metrics: &ReadingMetrics,
        time_of_day: f32,
    ) -> Result<ChannelUpdate, PatchError> {
        self.telemetry
            .update_reading_metrics(&mut self.engine, metrics, time_of_day)
    }

    pub fn update_audio_levels(
        &mut self,
        bass: f32,
        mid: f32,
        high: f32,
    ) -> Result<ChannelUpdate, PatchError> {
        self.telemetry
            .update_audio_levels(&mut self.engine, bass, mid, high)
    }

    pub fn update_data(&mut self, snapshot: &TelemetrySnapshot) -> Result<ChannelUpdate, PatchError> {
        self.telemetry.update_data(&mut self.engine, snapshot)
    }

    pub fn register_teardown(
        &mut self,
        label: impl Into<String>,
        teardown: impl FnOnce() + 'static,
    ) -> SubscriptionId {
        self.engine.register_teardown(label, teardown)
    }

    pub fn engine(&self) -> &RenderEngine<C> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut RenderEngine<C> {
        &mut self.engine
    }

    pub fn telemetry(&self) -> &TelemetryController {
        &self.telemetry
    }
}
