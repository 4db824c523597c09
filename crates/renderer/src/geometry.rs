//! Lattice field generators.
//!
//! Each variant contributes a GLSL function `float latticeField(vec3 p)` that
//! returns how strongly the projected point `p` lies on the structure, in
//! `[0, 1]`. The fragments only read uniforms declared by the shader skeleton
//! in [`crate::compile`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::types::{normalize_name, Resolved};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GeometryVariant {
    Hypercube,
    Hypersphere,
    Hypertetrahedron,
}

impl GeometryVariant {
    pub const ALL: [GeometryVariant; 3] = [
        GeometryVariant::Hypercube,
        GeometryVariant::Hypersphere,
        GeometryVariant::Hypertetrahedron,
    ];

    pub const DEFAULT: GeometryVariant = GeometryVariant::Hypercube;

    pub fn name(self) -> &'static str {
        match self {
            GeometryVariant::Hypercube => "hypercube",
            GeometryVariant::Hypersphere => "hypersphere",
            GeometryVariant::Hypertetrahedron => "hypertetrahedron",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let normalized = normalize_name(name);
        Self::ALL
            .into_iter()
            .find(|variant| variant.name() == normalized)
    }

    /// Resolves a boundary name, falling back to [`GeometryVariant::DEFAULT`].
    pub fn resolve(name: &str) -> Resolved<Self> {
        match Self::from_name(name) {
            Some(variant) => Resolved::exact(variant),
            None => {
                tracing::warn!(
                    requested = name,
                    fallback = Self::DEFAULT.name(),
                    "unknown geometry variant; using default"
                );
                Resolved::fallback(Self::DEFAULT, name)
            }
        }
    }
}

impl Default for GeometryVariant {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for GeometryVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for GeometryVariant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for GeometryVariant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::resolve(&name).value)
    }
}

/// Registry of lattice field fragments keyed by [`GeometryVariant`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GeometryManager;

impl GeometryManager {
    pub fn new() -> Self {
        Self
    }

    pub fn variants(&self) -> &'static [GeometryVariant] {
        &GeometryVariant::ALL
    }

    pub fn code(&self, variant: GeometryVariant) -> &'static str {
        match variant {
            GeometryVariant::Hypercube => HYPERCUBE_FIELD,
            GeometryVariant::Hypersphere => HYPERSPHERE_FIELD,
            GeometryVariant::Hypertetrahedron => HYPERTETRAHEDRON_FIELD,
        }
    }

    /// Looks up a fragment by name; unknown names yield the default fragment.
    pub fn code_for_name(&self, name: &str) -> (Resolved<GeometryVariant>, &'static str) {
        let resolved = GeometryVariant::resolve(name);
        let code = self.code(resolved.value);
        (resolved, code)
    }
}

const HYPERCUBE_FIELD: &str = r"float latticeField(vec3 p) {
    vec3 cell = fract(p * u_gridDensity);
    vec3 edge = min(cell, vec3(1.0) - cell);
    float nearest = min(edge.x, min(edge.y, edge.z));
    float lines = 1.0 - smoothstep(0.0, u_lineThickness, nearest);
    float faces = 1.0 - smoothstep(0.0, u_lineThickness * 3.0, max(edge.x, max(edge.y, edge.z)) - 0.45);
    float pulse = 0.5 + 0.5 * sin(u_time * 0.5 + u_dataChannel4 * TAU);
    float field = max(lines, faces * 0.25 * u_dataChannel6) * (0.6 + 0.4 * pulse);
    return clamp(field * u_patternIntensity, 0.0, 1.0);
}
";

const HYPERSPHERE_FIELD: &str = r"float latticeField(vec3 p) {
    float radius = length(p) * u_gridDensity * 0.25;
    float shell = abs(fract(radius) - 0.5);
    float rings = 1.0 - smoothstep(0.0, u_shellWidth, shell);
    float theta = atan(p.y, p.x);
    float meridian = abs(sin(theta * (2.0 + u_dimension)));
    float meridians = 1.0 - smoothstep(0.0, u_lineThickness * 4.0, meridian);
    float breathing = 0.75 + 0.25 * sin(u_time * 0.8 + u_dataChannel4 * PI);
    float field = max(rings * breathing, meridians * 0.5);
    return clamp(field * u_patternIntensity, 0.0, 1.0);
}
";

const HYPERTETRAHEDRON_FIELD: &str = r"float latticeField(vec3 p) {
    vec3 q = fract(p * u_gridDensity * 0.5) - vec3(0.5);
    float d1 = abs(dot(q, normalize(vec3(1.0, 1.0, 1.0))));
    float d2 = abs(dot(q, normalize(vec3(-1.0, -1.0, 1.0))));
    float d3 = abs(dot(q, normalize(vec3(-1.0, 1.0, -1.0))));
    float d4 = abs(dot(q, normalize(vec3(1.0, -1.0, -1.0))));
    float nearest = min(min(d1, d2), min(d3, d4));
    float planes = 1.0 - smoothstep(0.0, u_tetraThickness, nearest);
    float vertices = 1.0 - smoothstep(0.0, u_tetraThickness * 2.0, length(q) - 0.35);
    float field = max(planes, vertices * (0.3 + 0.7 * u_dataChannel4));
    return clamp(field * u_patternIntensity, 0.0, 1.0);
}
";
