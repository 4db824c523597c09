use std::borrow::Cow;

use wgpu::naga::ShaderStage;

use crate::compile::{CompiledShader, ShaderError, POSITION_ATTRIBUTE};

/// Corner positions of the full-screen quad, in triangle-strip order.
pub(crate) const QUAD_VERTICES: [[f32; 2]; 4] = [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]];

/// A linked render pipeline for one geometry/projection pair.
#[derive(Debug)]
pub struct WgpuProgram {
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) label: String,
}

impl WgpuProgram {
    pub fn label(&self) -> &str {
        &self.label
    }
}

pub(crate) fn uniform_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("field params layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}

/// Turns a validated shader pair into a render pipeline.
///
/// Driver-side validation errors are captured with an error scope so a bad
/// program is reported instead of aborting the device.
pub(crate) fn link(
    device: &wgpu::Device,
    uniform_layout: &wgpu::BindGroupLayout,
    surface_format: wgpu::TextureFormat,
    shader: &CompiledShader,
) -> Result<WgpuProgram, ShaderError> {
    let link_error = |message: String| ShaderError::Link {
        label: shader.label.clone(),
        message,
    };
    let position = shader
        .attributes
        .location(POSITION_ATTRIBUTE)
        .ok_or_else(|| link_error(format!("vertex stage does not declare `{POSITION_ATTRIBUTE}`")))?;

    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("quad vertex"),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(shader.vertex_source),
            stage: ShaderStage::Vertex,
            defines: &[],
        },
    });
    let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(shader.label.as_str()),
        source: wgpu::ShaderSource::Glsl {
            shader: Cow::Borrowed(shader.fragment_source.as_str()),
            stage: ShaderStage::Fragment,
            defines: &[],
        },
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("field pipeline layout"),
        bind_group_layouts: &[uniform_layout],
        push_constant_ranges: &[],
    });

    let attributes = [wgpu::VertexAttribute {
        format: wgpu::VertexFormat::Float32x2,
        offset: 0,
        shader_location: position.index(),
    }];
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(shader.label.as_str()),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &vertex_module,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: std::mem::size_of::<[f32; 2]>() as wgpu::BufferAddress,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment_module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });

    if let Some(err) = pollster::block_on(device.pop_error_scope()) {
        return Err(link_error(err.to_string()));
    }

    Ok(WgpuProgram {
        pipeline,
        label: shader.label.clone(),
    })
}
