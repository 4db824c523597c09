use std::collections::HashMap;
use std::fmt::Write as _;

use wgpu::naga;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::ShaderStage;

use crate::types::CHANNEL_COUNT;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ShaderError {
    #[error("failed to compile {stage} shader for {label}: {message}")]
    Compile {
        label: String,
        stage: &'static str,
        message: String,
    },
    #[error("failed to link program {label}: {message}")]
    Link { label: String, message: String },
}

/// Data type of a reflected uniform block member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniformKind {
    Float,
    Vec2,
    Vec3,
    Vec4,
    Vec4Array { len: u32, stride: u32 },
}

/// Byte offset of a member inside the std140 uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UniformLocation {
    pub offset: u32,
    pub kind: UniformKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeLocation(pub u32);

impl AttributeLocation {
    pub fn index(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Default)]
pub struct UniformLayout {
    block_size: u32,
    entries: HashMap<String, UniformLocation>,
}

impl UniformLayout {
    pub fn location(&self, name: &str) -> Option<UniformLocation> {
        self.entries.get(name).copied()
    }

    pub fn block_size(&self) -> u32 {
        self.block_size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[cfg(test)]
    pub(crate) fn from_entries(block_size: u32, entries: &[(&str, UniformLocation)]) -> Self {
        Self {
            block_size,
            entries: entries
                .iter()
                .map(|(name, location)| (name.to_string(), *location))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttributeTable {
    entries: HashMap<String, AttributeLocation>,
}

impl AttributeTable {
    pub fn location(&self, name: &str) -> Option<AttributeLocation> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A validated vertex/fragment pair plus its reflected interface.
#[derive(Debug, Clone)]
pub struct CompiledShader {
    pub label: String,
    pub vertex_source: &'static str,
    pub fragment_source: String,
    pub uniforms: UniformLayout,
    pub attributes: AttributeTable,
}

/// Name of the vertex attribute carrying quad corner positions.
pub const POSITION_ATTRIBUTE: &str = "a_position";

pub const CHANNEL_UNIFORMS: [&str; CHANNEL_COUNT] = [
    "u_dataChannel0",
    "u_dataChannel1",
    "u_dataChannel2",
    "u_dataChannel3",
    "u_dataChannel4",
    "u_dataChannel5",
    "u_dataChannel6",
    "u_dataChannel7",
    "u_dataChannel8",
    "u_dataChannel9",
    "u_dataChannel10",
    "u_dataChannel11",
    "u_dataChannel12",
    "u_dataChannel13",
    "u_dataChannel14",
    "u_dataChannel15",
];

pub const GLOBAL_DATA_UNIFORM: &str = "u_globalData";

/// Scalar and vector members of the uniform block, in declaration order.
const BLOCK_MEMBERS: &[(&str, &str)] = &[
    ("vec2", "u_resolution"),
    ("float", "u_time"),
    ("float", "u_morphFactor"),
    ("float", "u_rotationSpeed"),
    ("float", "u_gridDensity"),
    ("float", "u_lineThickness"),
    ("float", "u_shellWidth"),
    ("float", "u_tetraThickness"),
    ("float", "u_glitchIntensity"),
    ("float", "u_colorShift"),
    ("float", "u_patternIntensity"),
    ("float", "u_universeModifier"),
    ("float", "u_dimension"),
    ("float", "u_audioBass"),
    ("float", "u_audioMid"),
    ("float", "u_audioHigh"),
    ("vec3", "u_primaryColor"),
    ("vec3", "u_secondaryColor"),
    ("vec3", "u_backgroundColor"),
];

/// Builds the complete fragment shader for a geometry/projection pair.
///
/// Layout of the generated source:
///
/// 1. [`FRAGMENT_PRELUDE`]: version, stage interface and constants.
/// 2. The `FieldParams` uniform block built from [`BLOCK_MEMBERS`], the
///    sixteen data channels and the global data buffer. The block is
///    anonymous, so fragments read members by their bare names.
/// 3. 4D rotation helpers, then the projection and geometry fragments.
/// 4. [`FRAGMENT_MAIN`], which wires them together.
pub fn synthesize_fragment(geometry: &str, projection: &str) -> String {
    let mut source = String::with_capacity(
        FRAGMENT_PRELUDE.len()
            + ROTATION_HELPERS.len()
            + FRAGMENT_MAIN.len()
            + geometry.len()
            + projection.len()
            + 1024,
    );
    source.push_str(FRAGMENT_PRELUDE);
    source.push_str("layout(std140, set = 0, binding = 0) uniform FieldParams {\n");
    for (ty, name) in BLOCK_MEMBERS {
        let _ = writeln!(source, "    {ty} {name};");
    }
    for name in CHANNEL_UNIFORMS {
        let _ = writeln!(source, "    float {name};");
    }
    let _ = writeln!(source, "    vec4 {GLOBAL_DATA_UNIFORM}[16];");
    source.push_str("};\n\n");
    source.push_str(ROTATION_HELPERS);
    source.push('\n');
    source.push_str(projection);
    source.push('\n');
    source.push_str(geometry);
    source.push('\n');
    source.push_str(FRAGMENT_MAIN);
    source
}

/// Parses and validates both stages, then reflects the program interface.
pub fn compile_program(label: &str, fragment_source: String) -> Result<CompiledShader, ShaderError> {
    parse_stage(label, ShaderStage::Vertex, VERTEX_SHADER_GLSL)?;
    let fragment = parse_stage(label, ShaderStage::Fragment, &fragment_source)?;
    let uniforms = reflect_uniform_block(&fragment);
    let attributes = reflect_attributes(VERTEX_SHADER_GLSL);
    tracing::trace!(
        label,
        uniforms = uniforms.len(),
        block_size = uniforms.block_size(),
        attributes = attributes.len(),
        "reflected program interface"
    );
    Ok(CompiledShader {
        label: label.to_string(),
        vertex_source: VERTEX_SHADER_GLSL,
        fragment_source,
        uniforms,
        attributes,
    })
}

fn parse_stage(
    label: &str,
    stage: ShaderStage,
    source: &str,
) -> Result<naga::Module, ShaderError> {
    let stage_name = match stage {
        ShaderStage::Vertex => "vertex",
        ShaderStage::Fragment => "fragment",
        _ => "compute",
    };
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage), source)
        .map_err(|errors| ShaderError::Compile {
            label: label.to_string(),
            stage: stage_name,
            message: errors.emit_to_string(source),
        })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| ShaderError::Compile {
            label: label.to_string(),
            stage: stage_name,
            message: err.emit_to_string(source),
        })?;
    Ok(module)
}

fn reflect_uniform_block(module: &naga::Module) -> UniformLayout {
    let mut layout = UniformLayout::default();
    for (_, global) in module.global_variables.iter() {
        if global.space != naga::AddressSpace::Uniform {
            continue;
        }
        let naga::TypeInner::Struct { ref members, span } = module.types[global.ty].inner else {
            continue;
        };
        layout.block_size = layout.block_size.max(span);
        for member in members {
            let Some(name) = member.name.as_deref() else {
                continue;
            };
            match uniform_kind(module, member.ty) {
                Some(kind) => {
                    layout.entries.insert(
                        name.to_string(),
                        UniformLocation {
                            offset: member.offset,
                            kind,
                        },
                    );
                }
                None => tracing::debug!(name, "skipping uniform with unsupported type"),
            }
        }
    }
    layout
}

fn uniform_kind(module: &naga::Module, ty: naga::Handle<naga::Type>) -> Option<UniformKind> {
    match module.types[ty].inner {
        naga::TypeInner::Scalar(scalar) if scalar == naga::Scalar::F32 => Some(UniformKind::Float),
        naga::TypeInner::Vector { size, scalar } if scalar == naga::Scalar::F32 => match size {
            naga::VectorSize::Bi => Some(UniformKind::Vec2),
            naga::VectorSize::Tri => Some(UniformKind::Vec3),
            naga::VectorSize::Quad => Some(UniformKind::Vec4),
        },
        naga::TypeInner::Array {
            base,
            size: naga::ArraySize::Constant(len),
            stride,
        } => match uniform_kind(module, base) {
            Some(UniformKind::Vec4) => Some(UniformKind::Vec4Array {
                len: len.get(),
                stride,
            }),
            _ => None,
        },
        _ => None,
    }
}

/// Reads `layout(location = N) in TYPE NAME;` declarations from a vertex stage.
fn reflect_attributes(source: &str) -> AttributeTable {
    let mut table = AttributeTable::default();
    for line in source.lines() {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix("layout(") else {
            continue;
        };
        let Some((qualifiers, declaration)) = rest.split_once(')') else {
            continue;
        };
        let Some(declaration) = declaration.trim().strip_prefix("in ") else {
            continue;
        };
        let location = qualifiers.split(',').find_map(|qualifier| {
            let (key, value) = qualifier.split_once('=')?;
            if key.trim() == "location" {
                value.trim().parse::<u32>().ok()
            } else {
                None
            }
        });
        let name = declaration
            .trim()
            .trim_end_matches(';')
            .split_whitespace()
            .last();
        if let (Some(location), Some(name)) = (location, name) {
            table
                .entries
                .insert(name.to_string(), AttributeLocation(location));
        }
    }
    table
}

const FRAGMENT_PRELUDE: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

const float PI = 3.14159265;
const float TAU = 6.28318531;

";

const ROTATION_HELPERS: &str = r"mat4 rotateXW(float a) {
    float c = cos(a);
    float s = sin(a);
    return mat4(c, 0.0, 0.0, s,
                0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0,
                -s, 0.0, 0.0, c);
}

mat4 rotateYW(float a) {
    float c = cos(a);
    float s = sin(a);
    return mat4(1.0, 0.0, 0.0, 0.0,
                0.0, c, 0.0, s,
                0.0, 0.0, 1.0, 0.0,
                0.0, -s, 0.0, c);
}

mat4 rotateZW(float a) {
    float c = cos(a);
    float s = sin(a);
    return mat4(1.0, 0.0, 0.0, 0.0,
                0.0, 1.0, 0.0, 0.0,
                0.0, 0.0, c, s,
                0.0, 0.0, -s, c);
}

mat4 rotateXY(float a) {
    float c = cos(a);
    float s = sin(a);
    return mat4(c, s, 0.0, 0.0,
                -s, c, 0.0, 0.0,
                0.0, 0.0, 1.0, 0.0,
                0.0, 0.0, 0.0, 1.0);
}

float glitchNoise(vec2 uv) {
    return fract(sin(dot(uv, vec2(12.9898, 78.233)) + floor(u_time * 12.0)) * 43758.5453);
}
";

const FRAGMENT_MAIN: &str = r"void main() {
    float shortest = max(min(u_resolution.x, u_resolution.y), 1.0);
    vec2 uv = (gl_FragCoord.xy - 0.5 * u_resolution) / shortest;
    float t = u_time * u_rotationSpeed;
    float fold = clamp(u_dimension - 3.0, 0.0, 1.0);
    float w = sin(t * 0.7 + u_dataChannel0 * PI) * u_morphFactor * fold;
    vec4 p4 = vec4(uv * (1.5 + 0.5 * u_dataChannel1), 0.25 * sin(t * 0.31 + u_dataChannel2), w);
    mat4 rotation = rotateXW(t * 0.5) * rotateYW(t * 0.37 + u_dataChannel3) * rotateZW(t * 0.23) * rotateXY(t * 0.11);
    vec4 rotated = rotation * p4;
    float glitch = u_glitchIntensity * (glitchNoise(uv) - 0.5);
    vec3 p = project4D(rotated) + vec3(glitch, 0.0, 0.0);
    float field = latticeField(p);
    float history = dot(u_globalData[4], vec4(0.25));
    float audio = 1.0 + 0.4 * u_audioBass + 0.2 * u_audioMid + 0.1 * u_audioHigh;
    float glow = clamp(field * audio * (0.85 + 0.15 * u_dataChannel5) + 0.1 * history * field, 0.0, 1.0);
    float hue = 0.5 + 0.5 * sin(u_colorShift * TAU + rotated.w * 2.0 + u_dataChannel7 * PI);
    vec3 lattice = mix(u_primaryColor, u_secondaryColor, hue);
    vec3 color = mix(u_backgroundColor, lattice, glow);
    outColor = vec4(color, 1.0);
}
";

/// Full-screen quad vertex shader fed by a four-vertex triangle strip.
pub const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = a_position * 0.5 + vec2(0.5, 0.5);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";
