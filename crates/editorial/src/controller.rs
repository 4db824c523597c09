use std::collections::VecDeque;

use renderer::{
    GraphicsContext, ParameterPatch, PatchError, RenderEngine, UpdateReport, CHANNEL_COUNT,
    GLOBAL_BUFFER_LEN,
};
use tracing::{debug, warn};

use crate::metrics::{EditorialContext, ReadingMetrics, TelemetrySnapshot};
use crate::presets::{default_section_preset, editorial_preset, section_preset, EditorialPreset};
use crate::rules::{map_snapshot, MAPPING_RULES};

/// Anything that accepts parameter patches; in practice a [`RenderEngine`].
pub trait ParameterSink {
    fn apply_patch(&mut self, patch: &ParameterPatch) -> Result<UpdateReport, PatchError>;
}

impl<C: GraphicsContext> ParameterSink for RenderEngine<C> {
    fn apply_patch(&mut self, patch: &ParameterPatch) -> Result<UpdateReport, PatchError> {
        self.update_parameters(patch)
    }
}

pub const DEFAULT_INTENSITY: f32 = 0.5;
pub const DEFAULT_COMPLEXITY: f32 = 0.5;
pub const DEFAULT_DYNAMISM: f32 = 0.5;

/// Number of channel vectors kept for the global data buffer.
pub const HISTORY_DEPTH: usize = GLOBAL_BUFFER_LEN / CHANNEL_COUNT;

#[derive(Debug, Clone, PartialEq)]
pub enum PresetOutcome {
    Applied {
        name: &'static str,
        report: UpdateReport,
    },
    /// The requested name was unknown and the default section was applied.
    Fallback {
        requested: String,
        applied: &'static str,
        report: UpdateReport,
    },
    /// The requested name was unknown and nothing was sent.
    Unknown { requested: String },
}

impl PresetOutcome {
    pub fn applied_name(&self) -> Option<&'static str> {
        match self {
            PresetOutcome::Applied { name, .. } => Some(name),
            PresetOutcome::Fallback { applied, .. } => Some(applied),
            PresetOutcome::Unknown { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelUpdate {
    pub channels: [f32; CHANNEL_COUNT],
    pub direct_fields: usize,
    pub report: UpdateReport,
}

/// Turns reading telemetry and presets into parameter patches.
///
/// The controller is stateless towards the engine. It only remembers what it
/// needs to derive signals over time: the previous scroll sample (for
/// `scrollVelocity`), the last audio levels, and the most recent channel
/// vectors that make up the global data buffer.
#[derive(Debug, Default)]
pub struct TelemetryController {
    history: VecDeque<[f32; CHANNEL_COUNT]>,
    last_scroll: Option<ScrollSample>,
    audio: Option<[f32; 3]>,
    last_snapshot: TelemetrySnapshot,
}

#[derive(Debug, Clone, Copy)]
struct ScrollSample {
    progress: f32,
    seconds: f64,
}

impl TelemetryController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the preset for `context.section` plus scalars derived from
    /// the context's intensity, complexity and dynamism.
    pub fn set_editorial_context<S: ParameterSink>(
        &mut self,
        sink: &mut S,
        context: &EditorialContext,
    ) -> Result<PresetOutcome, PatchError> {
        let (preset, fallback) = match section_preset(&context.section) {
            Some(preset) => (preset, false),
            None => {
                let preset = default_section_preset();
                warn!(
                    requested = %context.section,
                    fallback = preset.name,
                    "unknown section; using default preset"
                );
                (preset, true)
            }
        };

        let patch = context_patch(preset, context);
        let report = sink.apply_patch(&patch)?;
        debug!(section = preset.name, changed = report.changed, "applied editorial context");
        Ok(if fallback {
            PresetOutcome::Fallback {
                requested: context.section.clone(),
                applied: preset.name,
                report,
            }
        } else {
            PresetOutcome::Applied {
                name: preset.name,
                report,
            }
        })
    }

    pub fn apply_section_preset<S: ParameterSink>(
        &mut self,
        sink: &mut S,
        section: &str,
    ) -> Result<PresetOutcome, PatchError> {
        self.set_editorial_context(sink, &EditorialContext::section(section))
    }

    /// Applies a named editorial preset. Unknown names send nothing.
    pub fn apply_editorial_preset<S: ParameterSink>(
        &mut self,
        sink: &mut S,
        name: &str,
    ) -> Result<PresetOutcome, PatchError> {
        let Some(preset) = editorial_preset(name) else {
            warn!(requested = name, "unknown editorial preset; ignoring");
            return Ok(PresetOutcome::Unknown {
                requested: name.to_string(),
            });
        };
        let patch = ParameterPatch {
            grid_density: Some(grid_density(1.0, preset.complexity)),
            ..preset.base_patch()
        };
        let report = sink.apply_patch(&patch)?;
        debug!(preset = preset.name, changed = report.changed, "applied editorial preset");
        Ok(PresetOutcome::Applied {
            name: preset.name,
            report,
        })
    }

    /// Normalizes `metrics` and forwards the snapshot to [`Self::update_data`].
    ///
    /// `time_of_day` is the fraction of the local day elapsed.
    pub fn update_reading_metrics<S: ParameterSink>(
        &mut self,
        sink: &mut S,
        metrics: &ReadingMetrics,
        time_of_day: f32,
    ) -> Result<ChannelUpdate, PatchError> {
        let mut snapshot = TelemetrySnapshot::from_metrics(metrics, time_of_day);
        let sample = ScrollSample::from_metrics(metrics);
        snapshot.set("scrollVelocity", sample.velocity_since(self.last_scroll));
        if let Some([bass, mid, high]) = self.audio {
            snapshot.set("audioBass", bass);
            snapshot.set("audioMid", mid);
            snapshot.set("audioHigh", high);
        }
        let update = self.update_data(sink, &snapshot)?;
        self.last_scroll = Some(sample);
        Ok(update)
    }

    /// Records new audio levels and re-sends the last snapshot with them.
    pub fn update_audio_levels<S: ParameterSink>(
        &mut self,
        sink: &mut S,
        bass: f32,
        mid: f32,
        high: f32,
    ) -> Result<ChannelUpdate, PatchError> {
        let levels = [bass, mid, high].map(|level| {
            if level.is_finite() {
                level.clamp(0.0, 1.0)
            } else {
                0.0
            }
        });
        let snapshot = self
            .last_snapshot
            .clone()
            .with("audioBass", levels[0])
            .with("audioMid", levels[1])
            .with("audioHigh", levels[2]);
        let update = self.update_data(sink, &snapshot)?;
        self.audio = Some(levels);
        Ok(update)
    }

    /// Maps `snapshot` through the rule table and sends one combined patch:
    /// a fresh channel vector, the rolling global buffer and any direct
    /// fields present in the snapshot.
    ///
    /// Nothing is recorded unless the sink accepts the patch.
    pub fn update_data<S: ParameterSink>(
        &mut self,
        sink: &mut S,
        snapshot: &TelemetrySnapshot,
    ) -> Result<ChannelUpdate, PatchError> {
        let mapping = map_snapshot(&MAPPING_RULES, snapshot);
        let buffer = fill_buffer(
            std::iter::once(&mapping.channels).chain(self.history.iter().take(HISTORY_DEPTH - 1)),
        );

        let patch = ParameterPatch {
            data_channels: Some(mapping.channels.to_vec()),
            global_data_buffer: Some(buffer.to_vec()),
            ..mapping.direct
        };
        let report = sink.apply_patch(&patch)?;

        self.history.push_front(mapping.channels);
        self.history.truncate(HISTORY_DEPTH);
        self.last_snapshot = snapshot.clone();

        Ok(ChannelUpdate {
            channels: mapping.channels,
            direct_fields: mapping.direct_fields,
            report,
        })
    }

    /// Channel history, most recent vector first, zero-padded.
    pub fn global_buffer(&self) -> [f32; GLOBAL_BUFFER_LEN] {
        fill_buffer(self.history.iter())
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn last_snapshot(&self) -> &TelemetrySnapshot {
        &self.last_snapshot
    }
}

impl ScrollSample {
    fn from_metrics(metrics: &ReadingMetrics) -> Self {
        Self {
            progress: metrics.scroll_progress.clamp(0.0, 1.0),
            seconds: metrics.time_on_page.max(0.0) / 1000.0,
        }
    }

    /// `|Δprogress| / Δseconds`, capped at 1; zero without a usable previous sample.
    fn velocity_since(&self, previous: Option<ScrollSample>) -> f32 {
        match previous {
            Some(previous) if self.seconds > previous.seconds => {
                let delta = (self.progress - previous.progress).abs() as f64;
                (delta / (self.seconds - previous.seconds)).min(1.0) as f32
            }
            _ => 0.0,
        }
    }
}

/// Lays channel vectors out back to back, zero-padding missing rows.
fn fill_buffer<'a>(
    rows: impl Iterator<Item = &'a [f32; CHANNEL_COUNT]>,
) -> [f32; GLOBAL_BUFFER_LEN] {
    let mut buffer = [0.0; GLOBAL_BUFFER_LEN];
    for (slot, channels) in buffer.chunks_exact_mut(CHANNEL_COUNT).zip(rows) {
        slot.copy_from_slice(channels);
    }
    buffer
}

fn clamp_input(value: Option<f32>, default: f32) -> f32 {
    match value {
        Some(value) if value.is_finite() => value.clamp(0.0, 1.0),
        _ => default,
    }
}

fn grid_density(complexity: f32, preset_complexity: f32) -> f32 {
    6.0 + 18.0 * complexity * preset_complexity
}

fn context_patch(preset: &EditorialPreset, context: &EditorialContext) -> ParameterPatch {
    let intensity = clamp_input(context.intensity, DEFAULT_INTENSITY);
    let complexity = clamp_input(context.complexity, DEFAULT_COMPLEXITY);
    let dynamism = clamp_input(context.dynamism, DEFAULT_DYNAMISM);
    ParameterPatch {
        pattern_intensity: Some(0.5 + intensity),
        glitch_intensity: Some(0.15 * intensity),
        grid_density: Some(grid_density(complexity, preset.complexity)),
        morph_factor: Some(0.2 + 0.6 * dynamism),
        rotation_speed: Some(0.1 + 0.9 * dynamism),
        ..preset.base_patch()
    }
}

#[cfg(test)]
mod tests {
    use renderer::{GeometryVariant, ProgramSwap, ProjectionVariant};

    use super::*;
    use crate::transforms::smooth_scroll;

    #[derive(Default)]
    struct RecordingSink {
        patches: Vec<ParameterPatch>,
    }

    impl ParameterSink for RecordingSink {
        fn apply_patch(&mut self, patch: &ParameterPatch) -> Result<UpdateReport, PatchError> {
            patch.validate()?;
            self.patches.push(patch.clone());
            Ok(UpdateReport {
                changed: 0,
                program: ProgramSwap::Unchanged,
            })
        }
    }

    #[test]
    fn unknown_section_falls_back_to_home() {
        let mut sink = RecordingSink::default();
        let mut controller = TelemetryController::new();
        let outcome = controller
            .set_editorial_context(&mut sink, &EditorialContext::section("nonexistent"))
            .unwrap();
        assert!(matches!(
            outcome,
            PresetOutcome::Fallback {
                applied: "home",
                ..
            }
        ));
        let patch = &sink.patches[0];
        assert_eq!(patch.geometry, Some(GeometryVariant::Hypercube));
        assert_eq!(patch.projection, Some(ProjectionVariant::Perspective));
    }

    #[test]
    fn context_scalars_follow_linear_formulas() {
        let mut sink = RecordingSink::default();
        let mut controller = TelemetryController::new();
        controller
            .set_editorial_context(
                &mut sink,
                &EditorialContext {
                    section: "technology".into(),
                    intensity: Some(1.0),
                    complexity: Some(1.0),
                    dynamism: Some(0.0),
                },
            )
            .unwrap();
        let patch = &sink.patches[0];
        assert_eq!(patch.pattern_intensity, Some(1.5));
        assert_eq!(patch.glitch_intensity, Some(0.15));
        assert!((patch.grid_density.unwrap() - (6.0 + 18.0 * 0.8)).abs() < 1e-5);
        assert_eq!(patch.morph_factor, Some(0.2));
        assert!((patch.rotation_speed.unwrap() - 0.1).abs() < 1e-6);
    }

    #[test]
    fn missing_context_values_use_defaults() {
        let mut sink = RecordingSink::default();
        let mut controller = TelemetryController::new();
        controller.apply_section_preset(&mut sink, "home").unwrap();
        let patch = &sink.patches[0];
        assert_eq!(patch.pattern_intensity, Some(1.0));
        assert!((patch.morph_factor.unwrap() - 0.5).abs() < 1e-6);
        assert!((patch.grid_density.unwrap() - 10.5).abs() < 1e-5);
    }

    #[test]
    fn unknown_editorial_preset_sends_nothing() {
        let mut sink = RecordingSink::default();
        let mut controller = TelemetryController::new();
        let outcome = controller.apply_editorial_preset(&mut sink, "vaporwave").unwrap();
        assert_eq!(
            outcome,
            PresetOutcome::Unknown {
                requested: "vaporwave".into()
            }
        );
        assert!(sink.patches.is_empty());
    }

    #[test]
    fn update_data_sends_one_combined_patch() {
        let mut sink = RecordingSink::default();
        let mut controller = TelemetryController::new();
        let snapshot = TelemetrySnapshot::new()
            .with("scrollProgress", 0.5)
            .with("colorShift", 0.3);
        let update = controller.update_data(&mut sink, &snapshot).unwrap();
        assert_eq!(sink.patches.len(), 1);
        let patch = &sink.patches[0];
        assert_eq!(patch.data_channels.as_ref().map(Vec::len), Some(CHANNEL_COUNT));
        assert_eq!(
            patch.global_data_buffer.as_ref().map(Vec::len),
            Some(GLOBAL_BUFFER_LEN)
        );
        assert_eq!(patch.color_shift, Some(0.3));
        assert_eq!(update.direct_fields, 1);
        assert!((update.channels[0] - smooth_scroll(0.5)).abs() < 1e-6);
    }

    #[test]
    fn history_keeps_latest_vectors_first() {
        let mut sink = RecordingSink::default();
        let mut controller = TelemetryController::new();
        for step in 0..6 {
            let snapshot = TelemetrySnapshot::new().with("readingTime", step as f32 / 10.0);
            controller.update_data(&mut sink, &snapshot).unwrap();
        }
        assert_eq!(controller.history_len(), HISTORY_DEPTH);
        let buffer = controller.global_buffer();
        assert_eq!(buffer[1], 0.5);
        assert_eq!(buffer[CHANNEL_COUNT + 1], 0.4);
        assert_eq!(buffer[3 * CHANNEL_COUNT + 1], 0.2);
    }

    #[test]
    fn scroll_velocity_uses_time_on_page() {
        let mut sink = RecordingSink::default();
        let mut controller = TelemetryController::new();
        let first = ReadingMetrics {
            scroll_progress: 0.1,
            time_on_page: 1_000.0,
            ..ReadingMetrics::default()
        };
        let update = controller
            .update_reading_metrics(&mut sink, &first, 0.5)
            .unwrap();
        assert_eq!(update.channels[8], 0.0);

        let second = ReadingMetrics {
            scroll_progress: 0.3,
            time_on_page: 3_000.0,
            ..ReadingMetrics::default()
        };
        let update = controller
            .update_reading_metrics(&mut sink, &second, 0.5)
            .unwrap();
        assert!((update.channels[8] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn audio_levels_carry_into_later_metrics() {
        let mut sink = RecordingSink::default();
        let mut controller = TelemetryController::new();
        let update = controller
            .update_audio_levels(&mut sink, 0.8, 2.0, f32::NAN)
            .unwrap();
        assert_eq!(&update.channels[10..13], &[0.8, 1.0, 0.0]);
        assert_eq!(sink.patches[0].audio_bass, Some(0.8));

        let update = controller
            .update_reading_metrics(&mut sink, &ReadingMetrics::default(), 0.5)
            .unwrap();
        assert_eq!(update.channels[10], 0.8);
    }

    #[test]
    fn rejected_patch_propagates() {
        struct Refusing;
        impl ParameterSink for Refusing {
            fn apply_patch(&mut self, _: &ParameterPatch) -> Result<UpdateReport, PatchError> {
                Err(PatchError::Disposed)
            }
        }
        let mut controller = TelemetryController::new();
        let err = controller
            .update_data(&mut Refusing, &TelemetrySnapshot::new())
            .unwrap_err();
        assert!(matches!(err, PatchError::Disposed));
    }

    #[test]
    fn refused_updates_leave_no_trace() {
        struct Refusing;
        impl ParameterSink for Refusing {
            fn apply_patch(&mut self, _: &ParameterPatch) -> Result<UpdateReport, PatchError> {
                Err(PatchError::Disposed)
            }
        }
        let mut controller = TelemetryController::new();
        for value in [0.3, 0.6, 0.9] {
            let snapshot = TelemetrySnapshot::new().with("readingTime", value);
            assert!(controller.update_data(&mut Refusing, &snapshot).is_err());
        }
        let metrics = ReadingMetrics {
            scroll_progress: 0.8,
            time_on_page: 1_000.0,
            ..ReadingMetrics::default()
        };
        assert!(controller
            .update_reading_metrics(&mut Refusing, &metrics, 0.5)
            .is_err());
        assert!(controller
            .update_audio_levels(&mut Refusing, 0.7, 0.7, 0.7)
            .is_err());

        assert_eq!(controller.history_len(), 0);
        assert_eq!(controller.global_buffer(), [0.0; GLOBAL_BUFFER_LEN]);
        assert!(controller.last_snapshot().is_empty());

        // The first accepted sample has nothing to measure velocity against.
        let mut sink = RecordingSink::default();
        let later = ReadingMetrics {
            scroll_progress: 0.9,
            time_on_page: 2_000.0,
            ..ReadingMetrics::default()
        };
        let update = controller
            .update_reading_metrics(&mut sink, &later, 0.5)
            .unwrap();
        assert_eq!(update.channels[8], 0.0);
        assert_eq!(update.channels[10], 0.0);
        let buffer = sink.patches[0].global_data_buffer.as_ref().unwrap();
        assert_eq!(&buffer[CHANNEL_COUNT..], &[0.0; GLOBAL_BUFFER_LEN - CHANNEL_COUNT][..]);
        assert_eq!(controller.history_len(), 1);
    }
}
