//! Declarative table mapping telemetry fields onto render parameters.

use renderer::{ParameterPatch, CHANNEL_COUNT};

use crate::metrics::TelemetrySnapshot;
use crate::transforms::Transform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectField {
    MorphFactor,
    RotationSpeed,
    GlitchIntensity,
    ColorShift,
    PatternIntensity,
    AudioBass,
    AudioMid,
    AudioHigh,
}

impl DirectField {
    fn write(self, patch: &mut ParameterPatch, value: f32) {
        let slot = match self {
            DirectField::MorphFactor => &mut patch.morph_factor,
            DirectField::RotationSpeed => &mut patch.rotation_speed,
            DirectField::GlitchIntensity => &mut patch.glitch_intensity,
            DirectField::ColorShift => &mut patch.color_shift,
            DirectField::PatternIntensity => &mut patch.pattern_intensity,
            DirectField::AudioBass => &mut patch.audio_bass,
            DirectField::AudioMid => &mut patch.audio_mid,
            DirectField::AudioHigh => &mut patch.audio_high,
        };
        *slot = Some(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Destination {
    Channel {
        index: usize,
        default: f32,
        transform: Option<Transform>,
    },
    /// Copied onto a state field, only when the snapshot carries the source.
    Direct(DirectField),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MappingRule {
    pub source: &'static str,
    pub destination: Destination,
}

const fn channel(
    source: &'static str,
    index: usize,
    default: f32,
    transform: Option<Transform>,
) -> MappingRule {
    MappingRule {
        source,
        destination: Destination::Channel {
            index,
            default,
            transform,
        },
    }
}

const fn direct(source: &'static str, field: DirectField) -> MappingRule {
    MappingRule {
        source,
        destination: Destination::Direct(field),
    }
}

pub const MAPPING_RULES: [MappingRule; 21] = [
    channel("scrollProgress", 0, 0.0, Some(Transform::SmoothScroll)),
    channel("readingTime", 1, 0.0, None),
    channel("engagement", 2, 0.5, None),
    channel("interactionRate", 3, 0.0, None),
    channel("contentComplexity", 4, 0.5, Some(Transform::ComplexityCurve)),
    channel("spatialAwareness", 5, 0.0, None),
    channel("sectionDepth", 6, 0.0, None),
    channel("timeOfDay", 7, 0.5, None),
    channel("scrollVelocity", 8, 0.0, None),
    channel("focus", 9, 0.5, None),
    channel("audioBass", 10, 0.0, None),
    channel("audioMid", 11, 0.0, None),
    channel("audioHigh", 12, 0.0, None),
    direct("morphFactor", DirectField::MorphFactor),
    direct("rotationSpeed", DirectField::RotationSpeed),
    direct("glitchIntensity", DirectField::GlitchIntensity),
    direct("colorShift", DirectField::ColorShift),
    direct("patternIntensity", DirectField::PatternIntensity),
    direct("audioBass", DirectField::AudioBass),
    direct("audioMid", DirectField::AudioMid),
    direct("audioHigh", DirectField::AudioHigh),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelMapping {
    pub channels: [f32; CHANNEL_COUNT],
    /// Patch holding only the direct fields present in the snapshot.
    pub direct: ParameterPatch,
    pub direct_fields: usize,
}

/// Evaluates every rule against `snapshot`.
///
/// Channels start from zero; each channel rule writes its source value, or
/// its default when the snapshot lacks the field, after applying the rule's
/// transform. Indices outside the channel range are skipped.
pub fn map_snapshot(rules: &[MappingRule], snapshot: &TelemetrySnapshot) -> ChannelMapping {
    let mut channels = [0.0; CHANNEL_COUNT];
    let mut direct_patch = ParameterPatch::default();
    let mut direct_fields = 0;

    for rule in rules {
        match rule.destination {
            Destination::Channel {
                index,
                default,
                transform,
            } => {
                let raw = snapshot.get(rule.source).unwrap_or(default);
                let value = transform.map_or(raw, |transform| transform.apply(raw));
                match channels.get_mut(index) {
                    Some(slot) => *slot = value,
                    None => tracing::warn!(
                        source = rule.source,
                        index,
                        "mapping rule targets a channel out of range"
                    ),
                }
            }
            Destination::Direct(field) => {
                if let Some(value) = snapshot.get(rule.source) {
                    field.write(&mut direct_patch, value);
                    direct_fields += 1;
                }
            }
        }
    }

    ChannelMapping {
        channels,
        direct: direct_patch,
        direct_fields,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::transforms::{complexity_curve, smooth_scroll};

    #[test]
    fn channel_indices_are_unique_and_in_range() {
        let mut seen = HashSet::new();
        for rule in MAPPING_RULES {
            if let Destination::Channel { index, .. } = rule.destination {
                assert!(index < CHANNEL_COUNT, "{}", rule.source);
                assert!(seen.insert(index), "duplicate channel {index}");
            }
        }
        assert_eq!(seen.len(), 13);
    }

    #[test]
    fn empty_snapshot_yields_defaults() {
        let mapping = map_snapshot(&MAPPING_RULES, &TelemetrySnapshot::new());
        assert_eq!(mapping.channels[0], smooth_scroll(0.0));
        assert_eq!(mapping.channels[2], 0.5);
        assert_eq!(mapping.channels[4], complexity_curve(0.5));
        assert_eq!(mapping.channels[7], 0.5);
        assert_eq!(mapping.channels[9], 0.5);
        assert_eq!(&mapping.channels[13..], &[0.0, 0.0, 0.0]);
        assert!(mapping.direct.is_empty());
        assert_eq!(mapping.direct_fields, 0);
    }

    #[test]
    fn applies_transforms_and_direct_fields() {
        let snapshot = TelemetrySnapshot::new()
            .with("scrollProgress", 0.5)
            .with("contentComplexity", 1.0)
            .with("morphFactor", 0.9)
            .with("audioBass", 0.4);
        let mapping = map_snapshot(&MAPPING_RULES, &snapshot);
        assert!((mapping.channels[0] - 1.0).abs() < 1e-6);
        assert!((mapping.channels[4] - 1.0).abs() < 1e-6);
        assert_eq!(mapping.channels[10], 0.4);
        assert_eq!(mapping.direct.morph_factor, Some(0.9));
        assert_eq!(mapping.direct.audio_bass, Some(0.4));
        assert_eq!(mapping.direct.rotation_speed, None);
        assert_eq!(mapping.direct_fields, 2);
    }

    #[test]
    fn out_of_range_rule_is_skipped() {
        let rules = [channel("scrollProgress", CHANNEL_COUNT, 0.7, None)];
        let mapping = map_snapshot(&rules, &TelemetrySnapshot::new());
        assert_eq!(mapping.channels, [0.0; CHANNEL_COUNT]);
    }
}
