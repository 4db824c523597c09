use std::collections::BTreeMap;

use chrono::Timelike;
use serde::{Deserialize, Serialize};

/// Where the reader is and how hard the page should push the visuals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EditorialContext {
    pub section: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dynamism: Option<f32>,
}

impl EditorialContext {
    pub fn section(section: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Raw reading signals as reported by the page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct ReadingMetrics {
    /// Fraction of the article scrolled, nominally in `[0, 1]`.
    pub scroll_progress: f32,
    /// Milliseconds since the page was opened.
    pub time_on_page: f64,
    pub engagement: f32,
    pub clicks_per_minute: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub window_width: f32,
    /// Nesting depth of the current section.
    pub depth: u32,
}

impl ReadingMetrics {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

pub const READING_TIME_WINDOW_MS: f64 = 60_000.0;
pub const CLICK_RATE_CEILING: f32 = 10.0;
pub const SPATIAL_WIDTH_THRESHOLD: f32 = 1024.0;
pub const MAX_SECTION_DEPTH: f32 = 5.0;

pub fn content_complexity(content_type: Option<&str>) -> f32 {
    match content_type.map(|kind| kind.trim().to_ascii_lowercase()).as_deref() {
        Some("text") => 0.3,
        Some("mixed") => 0.6,
        Some("media") => 0.75,
        Some("interactive") => 0.9,
        _ => 0.5,
    }
}

/// Fraction of the local day elapsed at `time`, in `[0, 1)`.
pub fn time_of_day_fraction(time: &impl Timelike) -> f32 {
    time.num_seconds_from_midnight() as f32 / 86_400.0
}

/// Normalized telemetry fields keyed by their camelCase names.
///
/// Non-finite values are never stored, so every lookup yields a usable number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    fields: BTreeMap<String, f32>,
}

impl TelemetrySnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds raw reading metrics into `[0, 1]` fields.
    pub fn from_metrics(metrics: &ReadingMetrics, time_of_day: f32) -> Self {
        let interaction_rate = clamp_unit(metrics.clicks_per_minute / CLICK_RATE_CEILING);
        let engagement = clamp_unit(metrics.engagement);
        let reading_time = (metrics.time_on_page.max(0.0) / READING_TIME_WINDOW_MS).min(1.0) as f32;

        let mut snapshot = Self::new();
        snapshot.set("scrollProgress", clamp_unit(metrics.scroll_progress));
        snapshot.set("readingTime", reading_time);
        snapshot.set("engagement", engagement);
        snapshot.set("interactionRate", interaction_rate);
        snapshot.set(
            "contentComplexity",
            content_complexity(metrics.content_type.as_deref()),
        );
        snapshot.set(
            "spatialAwareness",
            if metrics.window_width > SPATIAL_WIDTH_THRESHOLD {
                1.0
            } else {
                0.0
            },
        );
        snapshot.set(
            "sectionDepth",
            (metrics.depth as f32 / MAX_SECTION_DEPTH).min(1.0),
        );
        snapshot.set("timeOfDay", clamp_unit(time_of_day));
        snapshot.set(
            "focus",
            clamp_unit(engagement * (1.0 - 0.5 * interaction_rate)),
        );
        snapshot
    }

    pub fn with(mut self, field: impl Into<String>, value: f32) -> Self {
        self.set(field, value);
        self
    }

    /// Stores `value` unless it is NaN or infinite.
    pub fn set(&mut self, field: impl Into<String>, value: f32) -> bool {
        let field = field.into();
        if !value.is_finite() {
            tracing::warn!(field = %field, "dropping non-finite telemetry value");
            return false;
        }
        self.fields.insert(field, value);
        true
    }

    pub fn get(&self, field: &str) -> Option<f32> {
        self.fields.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), *value))
    }

    /// Copies every field of `other` over this snapshot.
    pub fn merge(&mut self, other: &TelemetrySnapshot) {
        for (name, value) in other.iter() {
            self.fields.insert(name.to_string(), value);
        }
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;

    #[test]
    fn normalizes_reading_metrics() {
        let metrics = ReadingMetrics {
            scroll_progress: 1.4,
            time_on_page: 30_000.0,
            engagement: 0.8,
            clicks_per_minute: 5.0,
            content_type: Some("Interactive".into()),
            window_width: 1440.0,
            depth: 2,
        };
        let snapshot = TelemetrySnapshot::from_metrics(&metrics, 0.25);
        assert_eq!(snapshot.get("scrollProgress"), Some(1.0));
        assert_eq!(snapshot.get("readingTime"), Some(0.5));
        assert_eq!(snapshot.get("interactionRate"), Some(0.5));
        assert_eq!(snapshot.get("contentComplexity"), Some(0.9));
        assert_eq!(snapshot.get("spatialAwareness"), Some(1.0));
        assert_eq!(snapshot.get("sectionDepth"), Some(0.4));
        assert_eq!(snapshot.get("timeOfDay"), Some(0.25));
        assert!((snapshot.get("focus").unwrap() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn long_sessions_saturate() {
        let metrics = ReadingMetrics {
            time_on_page: 10.0 * READING_TIME_WINDOW_MS,
            clicks_per_minute: 400.0,
            depth: 12,
            window_width: 1024.0,
            ..ReadingMetrics::default()
        };
        let snapshot = TelemetrySnapshot::from_metrics(&metrics, 0.0);
        assert_eq!(snapshot.get("readingTime"), Some(1.0));
        assert_eq!(snapshot.get("interactionRate"), Some(1.0));
        assert_eq!(snapshot.get("sectionDepth"), Some(1.0));
        assert_eq!(snapshot.get("spatialAwareness"), Some(0.0));
        assert_eq!(snapshot.get("contentComplexity"), Some(0.5));
    }

    #[test]
    fn rejects_non_finite_fields() {
        let mut snapshot = TelemetrySnapshot::new();
        assert!(!snapshot.set("morphFactor", f32::INFINITY));
        assert!(snapshot.get("morphFactor").is_none());
    }

    #[test]
    fn time_of_day_is_a_fraction() {
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert_eq!(time_of_day_fraction(&noon), 0.5);
    }

    #[test]
    fn metrics_json_uses_camel_case() {
        let metrics = ReadingMetrics::from_json(
            r#"{"scrollProgress": 0.2, "timeOnPage": 1500, "contentType": "text"}"#,
        )
        .unwrap();
        assert_eq!(metrics.scroll_progress, 0.2);
        assert_eq!(metrics.time_on_page, 1500.0);
        assert_eq!(metrics.content_type.as_deref(), Some("text"));
        assert!(ReadingMetrics::from_json(r#"{"scrollPos": 0.2}"#).is_err());
    }

    #[test]
    fn context_json_requires_section() {
        let context = EditorialContext::from_json(r#"{"section": "science", "intensity": 0.9}"#)
            .unwrap();
        assert_eq!(context.section, "science");
        assert_eq!(context.intensity, Some(0.9));
        assert!(EditorialContext::from_json(r#"{"intensity": 0.9}"#).is_err());
    }
}
