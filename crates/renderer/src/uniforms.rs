//! Packs [`RenderState`] into the std140 bytes of the uniform block.

use crate::compile::{UniformKind, UniformLayout, CHANNEL_UNIFORMS, GLOBAL_DATA_UNIFORM};
use crate::state::RenderState;

#[derive(Debug, Clone, Copy, PartialEq)]
enum UniformValue<'a> {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4Array(&'a [f32]),
}

impl UniformValue<'_> {
    fn matches(&self, kind: UniformKind) -> bool {
        matches!(
            (self, kind),
            (UniformValue::Float(_), UniformKind::Float)
                | (UniformValue::Vec2(_), UniformKind::Vec2)
                | (UniformValue::Vec3(_), UniformKind::Vec3)
                | (UniformValue::Vec4Array(_), UniformKind::Vec4Array { .. })
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Writes every state field whose uniform exists in `layout` into `out`.
///
/// `out` is resized to the block size. Names missing from the layout, or
/// declared with a different type, are skipped.
pub fn write_uniforms(state: &RenderState, layout: &UniformLayout, out: &mut Vec<u8>) -> UploadSummary {
    out.clear();
    out.resize(layout.block_size() as usize, 0);

    let mut summary = UploadSummary::default();
    let named = [
        ("u_resolution", UniformValue::Vec2(state.resolution)),
        ("u_time", UniformValue::Float(state.time)),
        ("u_morphFactor", UniformValue::Float(state.morph_factor)),
        ("u_rotationSpeed", UniformValue::Float(state.rotation_speed)),
        ("u_gridDensity", UniformValue::Float(state.grid_density)),
        ("u_lineThickness", UniformValue::Float(state.line_thickness)),
        ("u_shellWidth", UniformValue::Float(state.shell_width)),
        ("u_tetraThickness", UniformValue::Float(state.tetra_thickness)),
        ("u_glitchIntensity", UniformValue::Float(state.glitch_intensity)),
        ("u_colorShift", UniformValue::Float(state.color_shift)),
        ("u_patternIntensity", UniformValue::Float(state.pattern_intensity)),
        ("u_universeModifier", UniformValue::Float(state.universe_modifier)),
        ("u_dimension", UniformValue::Float(state.dimension)),
        ("u_audioBass", UniformValue::Float(state.audio_bass)),
        ("u_audioMid", UniformValue::Float(state.audio_mid)),
        ("u_audioHigh", UniformValue::Float(state.audio_high)),
        ("u_primaryColor", UniformValue::Vec3(state.primary_color)),
        ("u_secondaryColor", UniformValue::Vec3(state.secondary_color)),
        ("u_backgroundColor", UniformValue::Vec3(state.background_color)),
        (GLOBAL_DATA_UNIFORM, UniformValue::Vec4Array(&state.global_data_buffer)),
    ];
    let channels = CHANNEL_UNIFORMS
        .iter()
        .zip(state.data_channels)
        .map(|(name, value)| (*name, UniformValue::Float(value)));

    for (name, value) in named.into_iter().chain(channels) {
        if write_value(layout, out, name, value) {
            summary.written += 1;
        } else {
            summary.skipped += 1;
        }
    }
    summary
}

fn write_value(layout: &UniformLayout, out: &mut [u8], name: &str, value: UniformValue<'_>) -> bool {
    let Some(location) = layout.location(name) else {
        tracing::trace!(name, "uniform not present in program");
        return false;
    };
    if !value.matches(location.kind) {
        tracing::debug!(name, kind = ?location.kind, "uniform type mismatch; skipping");
        return false;
    }
    let offset = location.offset as usize;
    match value {
        UniformValue::Float(v) => put(out, offset, &[v]),
        UniformValue::Vec2(v) => put(out, offset, &v),
        UniformValue::Vec3(v) => put(out, offset, &v),
        UniformValue::Vec4Array(values) => {
            let UniformKind::Vec4Array { len, stride } = location.kind else {
                return false;
            };
            let mut ok = true;
            for (index, chunk) in values.chunks_exact(4).take(len as usize).enumerate() {
                ok &= put(out, offset + index * stride as usize, chunk);
            }
            ok
        }
    }
}

fn put(out: &mut [u8], offset: usize, values: &[f32]) -> bool {
    let bytes: &[u8] = bytemuck::cast_slice(values);
    match out.get_mut(offset..offset + bytes.len()) {
        Some(slot) => {
            slot.copy_from_slice(bytes);
            true
        }
        None => false,
    }
}
