use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use editorial::{AppContext, EditorialContext, PresetOutcome};
use frameconfig::FrameConfig;
use renderer::{
    GeometryVariant, GraphicsContext, ParameterPatch, ProgramKey, ProjectionVariant, SurfaceSize,
};
use tracing::{debug, info, warn};

use crate::cli::Args;

pub const DEFAULT_CONFIG_FILE: &str = "hyperframe.toml";
pub const DEFAULT_FPS: f32 = 60.0;

/// Everything a run needs, after merging the config file with CLI flags.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub title: String,
    pub size: SurfaceSize,
    pub fps: f32,
    pub vsync: bool,
    pub low_power: bool,
    pub metrics_interval: Duration,
    pub editorial: Option<EditorialContext>,
    pub preset: Option<String>,
    /// Applied in order: config `[parameters]` first, then `--params`.
    pub patches: Vec<ParameterPatch>,
    pub simulate: bool,
    pub seed: u64,
}

pub fn load_config(args: &Args) -> Result<FrameConfig> {
    match &args.config {
        Some(path) => FrameConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            FrameConfig::load_or_default(&path)
                .with_context(|| format!("failed to load {}", path.display()))
        }
    }
}

pub fn resolve_launch(args: &Args, config: &FrameConfig) -> Result<LaunchPlan> {
    let size = match &args.size {
        Some(value) => parse_surface_size(value)?,
        None => SurfaceSize::new(config.render.width, config.render.height),
    };

    let fps = match args.fps.or(config.render.fps) {
        Some(fps) if fps.is_finite() && fps > 0.0 => fps,
        Some(fps) => bail!("fps must be positive, got {fps}"),
        None => DEFAULT_FPS,
    };

    let mut patches = Vec::new();
    if let Some(patch) = config
        .parameters_as::<ParameterPatch>()
        .context("invalid [parameters] table")?
    {
        patches.push(patch);
    }
    if let Some(json) = &args.params {
        let patch = ParameterPatch::from_json(json).context("invalid --params JSON")?;
        patches.push(patch);
    }

    let telemetry = &config.telemetry;
    let section = args.section.clone().or_else(|| telemetry.section.clone());
    let editorial = section.map(|section| EditorialContext {
        section,
        intensity: telemetry.intensity,
        complexity: telemetry.complexity,
        dynamism: telemetry.dynamism,
    });

    let plan = LaunchPlan {
        title: config.render.title.clone(),
        size,
        fps,
        vsync: config.render.vsync,
        low_power: args.low_power || config.render.low_power,
        metrics_interval: telemetry.metrics_interval,
        editorial,
        preset: args.preset.clone().or_else(|| telemetry.preset.clone()),
        patches,
        simulate: args.simulate || telemetry.simulate,
        seed: args.seed.or(telemetry.seed).unwrap_or_else(rand::random),
    };
    debug!(?plan, "resolved launch plan");
    Ok(plan)
}

/// Applies the plan's preset and patches to a freshly initialised app.
///
/// The editorial section goes in through `AppOptions` at init; the preset
/// then overrides its look and explicit patches win last.
pub fn apply_plan<C: GraphicsContext>(app: &mut AppContext<C>, plan: &LaunchPlan) {
    if let Some(name) = &plan.preset {
        match app.apply_editorial_preset(name) {
            Ok(PresetOutcome::Unknown { .. }) => {}
            Ok(outcome) => info!(preset = outcome.applied_name(), "applied editorial preset"),
            Err(err) => warn!(preset = %name, error = %err, "failed to apply editorial preset"),
        }
    }
    for patch in &plan.patches {
        if let Err(err) = app.update_parameters(patch) {
            warn!(error = %err, "ignoring invalid parameter patch");
        }
    }
}

pub fn parse_surface_size(spec: &str) -> Result<SurfaceSize> {
    let trimmed = spec.trim();
    let (width, height) = trimmed
        .split_once(['x', 'X', '×'])
        .ok_or_else(|| anyhow!("expected WxH format, e.g. 1280x720"))?;

    let width: u32 = width
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid width in size specification"))?;
    let height: u32 = height
        .trim()
        .parse()
        .map_err(|_| anyhow!("invalid height in size specification"))?;

    if width == 0 || height == 0 {
        bail!("surface dimensions must be greater than zero");
    }

    Ok(SurfaceSize::new(width, height))
}

/// Strict lookup for `--print-shader`; unknown names are an error here.
pub fn parse_program_key(names: &[String]) -> Result<ProgramKey> {
    let [geometry, projection] = names else {
        bail!("expected a geometry and a projection name");
    };
    let geometry = GeometryVariant::from_name(geometry).ok_or_else(|| {
        anyhow!(
            "unknown geometry '{geometry}'; expected one of {}",
            list_names(GeometryVariant::ALL.iter().map(|variant| variant.name()))
        )
    })?;
    let projection = ProjectionVariant::from_name(projection).ok_or_else(|| {
        anyhow!(
            "unknown projection '{projection}'; expected one of {}",
            list_names(ProjectionVariant::ALL.iter().map(|variant| variant.name()))
        )
    })?;
    Ok(ProgramKey {
        geometry,
        projection,
    })
}

fn list_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}
