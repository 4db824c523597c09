//! 4D to 3D projection fragments.
//!
//! Every fragment defines `vec3 project4D(vec4 p)`.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{normalize_name, Resolved};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProjectionVariant {
    Perspective,
    Orthographic,
    Stereographic,
}

impl ProjectionVariant {
    pub const ALL: [ProjectionVariant; 3] = [
        ProjectionVariant::Perspective,
        ProjectionVariant::Orthographic,
        ProjectionVariant::Stereographic,
    ];

    pub const DEFAULT: ProjectionVariant = ProjectionVariant::Perspective;

    pub fn name(self) -> &'static str {
        match self {
            ProjectionVariant::Perspective => "perspective",
            ProjectionVariant::Orthographic => "orthographic",
            ProjectionVariant::Stereographic => "stereographic",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = normalize_name(name);
        Self::ALL
            .into_iter()
            .find(|variant| variant.name() == normalized)
    }

    /// Resolves a boundary name, falling back to [`ProjectionVariant::DEFAULT`].
    pub fn resolve(name: &str) -> Resolved<Self> {
        match Self::from_name(name) {
            Some(variant) => Resolved::exact(variant),
            None => {
                tracing::warn!(
                    requested = name,
                    fallback = Self::DEFAULT.name(),
                    "unknown projection variant; using default"
                );
                Resolved::fallback(Self::DEFAULT, name)
            }
        }
    }
}

impl Default for ProjectionVariant {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for ProjectionVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ProjectionVariant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ProjectionVariant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::resolve(&name).value)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectionManager;

impl ProjectionManager {
    pub fn new() -> Self {
        Self
    }

    pub fn variants(&self) -> &'static [ProjectionVariant] {
        &ProjectionVariant::ALL
    }

    pub fn code(&self, variant: ProjectionVariant) -> &'static str {
        match variant {
            ProjectionVariant::Perspective => PERSPECTIVE_PROJECTION,
            ProjectionVariant::Orthographic => ORTHOGRAPHIC_PROJECTION,
            ProjectionVariant::Stereographic => STEREOGRAPHIC_PROJECTION,
        }
    }

    pub fn code_for_name(&self, name: &str) -> (Resolved<ProjectionVariant>, &'static str) {
        let resolved = ProjectionVariant::resolve(name);
        let code = self.code(resolved.value);
        (resolved, code)
    }
}

// The viewer sits on the +w axis; the universe modifier pushes it further out.
const PERSPECTIVE_PROJECTION: &str = r"vec3 project4D(vec4 p) {
    float viewer = 2.0 + u_universeModifier;
    float depth = max(viewer - p.w, 0.1);
    return p.xyz * (viewer * 0.5 / depth);
}
";

const ORTHOGRAPHIC_PROJECTION: &str = r"vec3 project4D(vec4 p) {
    return p.xyz + vec3(p.w * 0.15 * u_universeModifier);
}
";

const STEREOGRAPHIC_PROJECTION: &str = r"vec3 project4D(vec4 p) {
    float radius = max(length(p), 0.0001);
    vec4 unit = p / radius;
    float denom = max(1.0 - unit.w, 0.05);
    return unit.xyz * (radius / denom) * 0.5;
}
";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_defines_projection() {
        let manager = ProjectionManager::new();
        for variant in manager.variants() {
            assert!(manager
                .code(*variant)
                .contains("vec3 project4D(vec4 p)"));
        }
    }

    #[test]
    fn unknown_name_falls_back_to_perspective() {
        let manager = ProjectionManager::new();
        let (resolved, code) = manager.code_for_name("fisheye");
        assert_eq!(resolved.value, ProjectionVariant::Perspective);
        assert_eq!(
            resolved.resolution,
            crate::types::Resolution::Fallback {
                requested: "fisheye".to_string()
            }
        );
        assert_eq!(code, manager.code(ProjectionVariant::Perspective));
    }

    #[test]
    fn known_names_resolve_exactly() {
        for variant in ProjectionVariant::ALL {
            let resolved = ProjectionVariant::resolve(variant.name());
            assert_eq!(resolved.value, variant);
            assert!(!resolved.is_fallback());
        }
    }
}
