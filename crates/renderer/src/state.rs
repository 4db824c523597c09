use serde::{Deserialize, Serialize};

use crate::geometry::GeometryVariant;
use crate::projection::ProjectionVariant;
use crate::shader::ProgramKey;
use crate::types::{Rgb, CHANNEL_COUNT, GLOBAL_BUFFER_LEN};

#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("field `{field}` must be finite")]
    NonFinite { field: &'static str },
    #[error("dataChannels must hold exactly {expected} values, got {actual}")]
    ChannelLength { expected: usize, actual: usize },
    #[error("globalDataBuffer must hold exactly {expected} values, got {actual}")]
    BufferLength { expected: usize, actual: usize },
    #[error("invalid parameter patch: {0}")]
    Json(#[from] serde_json::Error),
    #[error("render engine has been disposed")]
    Disposed,
}

/// Partial update of [`RenderState`]. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParameterPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<GeometryVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projection: Option<ProjectionVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub morph_factor: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_speed: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grid_density: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_thickness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shell_width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tetra_thickness: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub glitch_intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_shift: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universe_modifier: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<Rgb>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_bass: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_mid: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_high: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_channels: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_data_buffer: Option<Vec<f32>>,
}

impl ParameterPatch {
    pub fn from_json(json: &str) -> Result<Self, PatchError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn with_variants(geometry: GeometryVariant, projection: ProjectionVariant) -> Self {
        Self {
            geometry: Some(geometry),
            projection: Some(projection),
            ..Self::default()
        }
    }

    /// Checks lengths and finiteness without touching any state.
    pub fn validate(&self) -> Result<(), PatchError> {
        for (field, value) in self.scalars() {
            if let Some(value) = value {
                ensure_finite(field, value)?;
            }
        }
        for (field, color) in [
            ("primaryColor", self.primary_color),
            ("secondaryColor", self.secondary_color),
            ("backgroundColor", self.background_color),
        ] {
            if let Some(color) = color {
                for component in color {
                    ensure_finite(field, component)?;
                }
            }
        }
        if let Some(channels) = &self.data_channels {
            if channels.len() != CHANNEL_COUNT {
                return Err(PatchError::ChannelLength {
                    expected: CHANNEL_COUNT,
                    actual: channels.len(),
                });
            }
            for value in channels {
                ensure_finite("dataChannels", *value)?;
            }
        }
        if let Some(buffer) = &self.global_data_buffer {
            if buffer.len() != GLOBAL_BUFFER_LEN {
                return Err(PatchError::BufferLength {
                    expected: GLOBAL_BUFFER_LEN,
                    actual: buffer.len(),
                });
            }
            for value in buffer {
                ensure_finite("globalDataBuffer", *value)?;
            }
        }
        Ok(())
    }

    fn scalars(&self) -> [(&'static str, Option<f32>); 14] {
        [
            ("morphFactor", self.morph_factor),
            ("rotationSpeed", self.rotation_speed),
            ("gridDensity", self.grid_density),
            ("lineThickness", self.line_thickness),
            ("shellWidth", self.shell_width),
            ("tetraThickness", self.tetra_thickness),
            ("glitchIntensity", self.glitch_intensity),
            ("colorShift", self.color_shift),
            ("patternIntensity", self.pattern_intensity),
            ("universeModifier", self.universe_modifier),
            ("dimension", self.dimension),
            ("audioBass", self.audio_bass),
            ("audioMid", self.audio_mid),
            ("audioHigh", self.audio_high),
        ]
    }
}

fn ensure_finite(field: &'static str, value: f32) -> Result<(), PatchError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PatchError::NonFinite { field })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderState {
    pub time: f32,
    pub resolution: [f32; 2],
    pub geometry: GeometryVariant,
    pub projection: ProjectionVariant,
    pub morph_factor: f32,
    pub rotation_speed: f32,
    pub grid_density: f32,
    pub line_thickness: f32,
    pub shell_width: f32,
    pub tetra_thickness: f32,
    pub glitch_intensity: f32,
    pub color_shift: f32,
    pub pattern_intensity: f32,
    pub universe_modifier: f32,
    pub dimension: f32,
    pub primary_color: Rgb,
    pub secondary_color: Rgb,
    pub background_color: Rgb,
    pub audio_bass: f32,
    pub audio_mid: f32,
    pub audio_high: f32,
    pub data_channels: [f32; CHANNEL_COUNT],
    pub global_data_buffer: [f32; GLOBAL_BUFFER_LEN],
    pub running: bool,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            time: 0.0,
            resolution: [1.0, 1.0],
            geometry: GeometryVariant::DEFAULT,
            projection: ProjectionVariant::DEFAULT,
            morph_factor: 0.5,
            rotation_speed: 0.5,
            grid_density: 12.0,
            line_thickness: 0.03,
            shell_width: 0.025,
            tetra_thickness: 0.035,
            glitch_intensity: 0.0,
            color_shift: 0.0,
            pattern_intensity: 1.0,
            universe_modifier: 1.0,
            dimension: 4.0,
            primary_color: [1.0, 0.0, 1.0],
            secondary_color: [0.0, 1.0, 1.0],
            background_color: [0.02, 0.02, 0.05],
            audio_bass: 0.0,
            audio_mid: 0.0,
            audio_high: 0.0,
            data_channels: [0.0; CHANNEL_COUNT],
            global_data_buffer: [0.0; GLOBAL_BUFFER_LEN],
            running: false,
        }
    }
}

impl RenderState {
    pub fn program_key(&self) -> ProgramKey {
        ProgramKey::new(self.geometry, self.projection)
    }

    /// Merges the present fields of a validated patch.
    ///
    /// Returns how many fields changed value. Callers must run
    /// [`ParameterPatch::validate`] first; the channel and buffer vectors are
    /// ignored here if their lengths are wrong.
    pub fn merge(&mut self, patch: &ParameterPatch) -> usize {
        let mut changed = 0;
        changed += assign(&mut self.geometry, patch.geometry);
        changed += assign(&mut self.projection, patch.projection);
        changed += assign(&mut self.morph_factor, patch.morph_factor);
        changed += assign(&mut self.rotation_speed, patch.rotation_speed);
        changed += assign(&mut self.grid_density, patch.grid_density);
        changed += assign(&mut self.line_thickness, patch.line_thickness);
        changed += assign(&mut self.shell_width, patch.shell_width);
        changed += assign(&mut self.tetra_thickness, patch.tetra_thickness);
        changed += assign(&mut self.glitch_intensity, patch.glitch_intensity);
        changed += assign(&mut self.color_shift, patch.color_shift);
        changed += assign(&mut self.pattern_intensity, patch.pattern_intensity);
        changed += assign(&mut self.universe_modifier, patch.universe_modifier);
        changed += assign(&mut self.dimension, patch.dimension);
        changed += assign(&mut self.primary_color, patch.primary_color);
        changed += assign(&mut self.secondary_color, patch.secondary_color);
        changed += assign(&mut self.background_color, patch.background_color);
        changed += assign(&mut self.audio_bass, patch.audio_bass);
        changed += assign(&mut self.audio_mid, patch.audio_mid);
        changed += assign(&mut self.audio_high, patch.audio_high);

        if let Some(channels) = patch.data_channels.as_deref() {
            if let Ok(channels) = <[f32; CHANNEL_COUNT]>::try_from(channels) {
                changed += assign(&mut self.data_channels, Some(channels));
            }
        }
        if let Some(buffer) = patch.global_data_buffer.as_deref() {
            if let Ok(buffer) = <[f32; GLOBAL_BUFFER_LEN]>::try_from(buffer) {
                changed += assign(&mut self.global_data_buffer, Some(buffer));
            }
        }
        changed
    }
}

fn assign<T: PartialEq>(slot: &mut T, value: Option<T>) -> usize {
    match value {
        Some(value) if *slot != value => {
            *slot = value;
            1
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_merge_leaves_absent_fields() {
        let mut state = RenderState::default();
        let before = state.clone();
        let patch = ParameterPatch {
            morph_factor: Some(0.9),
            primary_color: Some([0.1, 0.2, 0.3]),
            ..ParameterPatch::default()
        };
        patch.validate().unwrap();
        assert_eq!(state.merge(&patch), 2);

        assert_eq!(state.morph_factor, 0.9);
        assert_eq!(state.primary_color, [0.1, 0.2, 0.3]);
        let mut expected = before;
        expected.morph_factor = 0.9;
        expected.primary_color = [0.1, 0.2, 0.3];
        assert_eq!(state, expected);
    }

    #[test]
    fn merging_same_values_counts_nothing() {
        let mut state = RenderState::default();
        let patch = ParameterPatch {
            grid_density: Some(state.grid_density),
            ..ParameterPatch::default()
        };
        assert_eq!(state.merge(&patch), 0);
    }

    #[test]
    fn rejects_wrong_lengths() {
        let patch = ParameterPatch {
            data_channels: Some(vec![0.0; 15]),
            ..ParameterPatch::default()
        };
        assert!(matches!(
            patch.validate(),
            Err(PatchError::ChannelLength {
                expected: 16,
                actual: 15
            })
        ));

        let patch = ParameterPatch {
            global_data_buffer: Some(vec![0.0; 65]),
            ..ParameterPatch::default()
        };
        assert!(matches!(
            patch.validate(),
            Err(PatchError::BufferLength { actual: 65, .. })
        ));
    }

    #[test]
    fn rejects_non_finite_values() {
        let patch = ParameterPatch {
            rotation_speed: Some(f32::NAN),
            ..ParameterPatch::default()
        };
        assert!(matches!(
            patch.validate(),
            Err(PatchError::NonFinite {
                field: "rotationSpeed"
            })
        ));
    }

    #[test]
    fn parses_camel_case_json() {
        let patch = ParameterPatch::from_json(
            r#"{"geometry": "hypersphere", "gridDensity": 8.0, "backgroundColor": [0, 0, 0]}"#,
        )
        .unwrap();
        assert_eq!(patch.geometry, Some(GeometryVariant::Hypersphere));
        assert_eq!(patch.grid_density, Some(8.0));
        assert_eq!(patch.background_color, Some([0.0, 0.0, 0.0]));
        assert!(patch.projection.is_none());
    }

    #[test]
    fn json_rejects_unknown_keys() {
        let err = ParameterPatch::from_json(r#"{"gridDensty": 8.0}"#).unwrap_err();
        assert!(matches!(err, PatchError::Json(_)));
    }

    #[test]
    fn json_unknown_variant_resolves_to_default() {
        let patch = ParameterPatch::from_json(r#"{"projection": "fisheye"}"#).unwrap();
        assert_eq!(patch.projection, Some(ProjectionVariant::Perspective));
    }
}
