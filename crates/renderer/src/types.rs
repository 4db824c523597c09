use std::fmt;

/// Number of scalar telemetry slots exposed to shading code.
pub const CHANNEL_COUNT: usize = 16;

/// Number of floats in the shared global data buffer (sixteen `vec4`s).
pub const GLOBAL_BUFFER_LEN: usize = 64;

/// Vertices in the full-screen triangle strip.
pub const QUAD_VERTEX_COUNT: u32 = 4;

pub type Rgb = [f32; 3];

/// Pixel dimensions of a drawable surface or its backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn as_resolution(&self) -> [f32; 2] {
        [self.width as f32, self.height as f32]
    }
}

impl fmt::Display for SurfaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// How a name at the public boundary was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The name matched a registered entry.
    Exact,
    /// The name was unknown and the documented default was used instead.
    Fallback { requested: String },
}

impl Resolution {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::Fallback { .. })
    }
}

/// A resolved value paired with the path taken to obtain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub resolution: Resolution,
}

impl<T> Resolved<T> {
    pub fn exact(value: T) -> Self {
        Self {
            value,
            resolution: Resolution::Exact,
        }
    }

    pub fn fallback(value: T, requested: impl Into<String>) -> Self {
        Self {
            value,
            resolution: Resolution::Fallback {
                requested: requested.into(),
            },
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.resolution.is_fallback()
    }
}

pub(crate) fn normalize_name(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}
