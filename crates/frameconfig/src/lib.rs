use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FrameConfig {
    pub version: u32,
    #[serde(default)]
    pub render: RenderSection,
    #[serde(default)]
    pub telemetry: TelemetrySection,
    /// Initial parameter patch, camelCase keys as in the JSON boundary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<toml::Table>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RenderSection {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default)]
    pub fps: Option<f32>,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(default)]
    pub low_power: bool,
}

impl Default for RenderSection {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: None,
            title: default_title(),
            vsync: true,
            low_power: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelemetrySection {
    #[serde(
        default = "default_metrics_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub metrics_interval: Duration,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub intensity: Option<f32>,
    #[serde(default)]
    pub complexity: Option<f32>,
    #[serde(default)]
    pub dynamism: Option<f32>,
    #[serde(default)]
    pub simulate: bool,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Default for TelemetrySection {
    fn default() -> Self {
        Self {
            metrics_interval: default_metrics_interval(),
            section: None,
            preset: None,
            intensity: None,
            complexity: None,
            dynamism: None,
            simulate: false,
            seed: None,
        }
    }
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_title() -> String {
    "hyperframe".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metrics_interval() -> Duration {
    Duration::from_secs(1)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Duration;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a duration as number of seconds or human-readable string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            humantime::parse_duration(v)
                .map_err(|err| E::custom(format!("invalid duration '{v}': {err}")))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            u64::try_from(v)
                .map(Duration::from_secs)
                .map_err(|_| E::custom("duration must be non-negative"))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Duration::from_secs(v))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            if !v.is_finite() || v.is_sign_negative() {
                return Err(E::custom("duration must be non-negative"));
            }
            Ok(Duration::from_secs_f64(v))
        }
    }

    deserializer.deserialize_any(Visitor)
}

fn serialize_duration<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&humantime::format_duration(*value).to_string())
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            render: RenderSection::default(),
            telemetry: TelemetrySection::default(),
            parameters: None,
        }
    }
}

impl FrameConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: FrameConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` if it exists; a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match fs::metadata(path) {
            Ok(_) => Self::load(path),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no configuration file; using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|err| ConfigError::Invalid(err.to_string()))
    }

    /// Decodes the `[parameters]` table into the caller's patch type.
    pub fn parameters_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ConfigError> {
        match &self.parameters {
            Some(table) => Ok(Some(toml::Value::Table(table.clone()).try_into()?)),
            None => Ok(None),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        if self.render.width == 0 || self.render.height == 0 {
            return Err(ConfigError::Invalid(format!(
                "render size must be non-zero, got {}x{}",
                self.render.width, self.render.height
            )));
        }

        if let Some(fps) = self.render.fps {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "render fps must be positive, got {fps}"
                )));
            }
        }

        if self.telemetry.metrics_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "telemetry metrics_interval must be greater than zero".into(),
            ));
        }

        for (name, value) in [
            ("intensity", self.telemetry.intensity),
            ("complexity", self.telemetry.complexity),
            ("dynamism", self.telemetry.dynamism),
        ] {
            if let Some(value) = value {
                if !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::Invalid(format!(
                        "telemetry {name} must lie in [0, 1], got {value}"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
version = 1

[render]
width = 1920
height = 1080
fps = 30
title = "newsroom wall"

[telemetry]
metrics_interval = "500ms"
section = "science"
preset = "immersive"
intensity = 0.8

[parameters]
geometry = "hypersphere"
gridDensity = 9.0
primaryColor = [0.2, 0.4, 1.0]
"#;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Patch {
        geometry: Option<String>,
        grid_density: Option<f32>,
        primary_color: Option<[f32; 3]>,
    }

    #[test]
    fn parses_sample_config() {
        let config = FrameConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.render.width, 1920);
        assert_eq!(config.render.fps, Some(30.0));
        assert!(config.render.vsync);
        assert_eq!(config.telemetry.metrics_interval, Duration::from_millis(500));
        assert_eq!(config.telemetry.section.as_deref(), Some("science"));
        assert_eq!(config.telemetry.intensity, Some(0.8));
        assert_eq!(config.telemetry.complexity, None);
    }

    #[test]
    fn decodes_parameter_table() {
        let config = FrameConfig::from_toml_str(SAMPLE).unwrap();
        let patch: Patch = config.parameters_as().unwrap().unwrap();
        assert_eq!(patch.geometry.as_deref(), Some("hypersphere"));
        assert_eq!(patch.grid_density, Some(9.0));
        assert_eq!(patch.primary_color, Some([0.2, 0.4, 1.0]));
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = FrameConfig::from_toml_str("version = 1").unwrap();
        assert_eq!(config.render, RenderSection::default());
        assert_eq!(config.telemetry.metrics_interval, Duration::from_secs(1));
        assert!(config.parameters.is_none());
    }

    #[test]
    fn numeric_interval_is_seconds() {
        let config =
            FrameConfig::from_toml_str("version = 1\n[telemetry]\nmetrics_interval = 3\n").unwrap();
        assert_eq!(config.telemetry.metrics_interval, Duration::from_secs(3));
    }

    #[test]
    fn rejects_wrong_version() {
        let err = FrameConfig::from_toml_str("version = 2").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_out_of_range_intensity() {
        let err = FrameConfig::from_toml_str("version = 1\n[telemetry]\nintensity = 1.5\n")
            .unwrap_err();
        assert!(err.to_string().contains("intensity"));
    }

    #[test]
    fn rejects_unknown_sections() {
        let err = FrameConfig::from_toml_str("version = 1\n[playlists]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn rejects_zero_interval() {
        let err = FrameConfig::from_toml_str("version = 1\n[telemetry]\nmetrics_interval = \"0s\"\n")
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }
}
