//! Editorial telemetry layer for hyperframe.
//!
//! Reading signals from a page (scroll position, dwell time, clicks, audio
//! levels) are normalized into a [`TelemetrySnapshot`], pushed through the
//! [`MAPPING_RULES`] table and handed to the renderer as a single
//! [`renderer::ParameterPatch`]. Section and editorial presets pick the
//! geometry, projection and palette.
//!
//! [`AppContext`] bundles a [`renderer::RenderEngine`] with the
//! [`TelemetryController`] and is the surface embedders talk to.

mod app;
mod controller;
mod metrics;
mod presets;
mod rules;
mod transforms;

pub use app::{AppContext, AppOptions};
pub use controller::{
    ChannelUpdate, ParameterSink, PresetOutcome, TelemetryController, DEFAULT_COMPLEXITY,
    DEFAULT_DYNAMISM, DEFAULT_INTENSITY, HISTORY_DEPTH,
};
pub use metrics::{
    content_complexity, time_of_day_fraction, EditorialContext, ReadingMetrics,
    TelemetrySnapshot, CLICK_RATE_CEILING, MAX_SECTION_DEPTH, READING_TIME_WINDOW_MS,
    SPATIAL_WIDTH_THRESHOLD,
};
pub use presets::{
    color_scheme, default_section_preset, editorial_preset, section_preset, ColorScheme,
    EditorialPreset, COLOR_SCHEMES, DEFAULT_SECTION, EDITORIAL_PRESETS, SECTION_PRESETS,
};
pub use rules::{map_snapshot, ChannelMapping, Destination, DirectField, MappingRule, MAPPING_RULES};
pub use transforms::{complexity_curve, smooth_scroll, Transform};
