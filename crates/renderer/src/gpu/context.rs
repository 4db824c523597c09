use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::compile::{CompiledShader, ShaderError};
use crate::context::{CapabilityError, Frame, FrameError, GraphicsContext};
use crate::types::SurfaceSize;

use super::pipeline::{self, WgpuProgram, QUAD_VERTICES};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WgpuOptions {
    pub low_power: bool,
    pub vsync: bool,
}

impl Default for WgpuOptions {
    fn default() -> Self {
        Self {
            low_power: false,
            vsync: true,
        }
    }
}

/// Window-backed [`GraphicsContext`] drawing through wgpu.
pub struct WgpuContext {
    surface: Option<wgpu::Surface<'static>>,
    _instance: wgpu::Instance,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    uniform_layout: wgpu::BindGroupLayout,
    uniforms: Option<UniformSlot>,
    vertex_buffer: Option<wgpu::Buffer>,
    adapter_name: String,
    released: bool,
    window: Arc<Window>,
}

struct UniformSlot {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    capacity: u64,
}

impl WgpuContext {
    pub fn new(window: Arc<Window>, options: WgpuOptions) -> Result<Self, CapabilityError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let window_handle = window
            .window_handle()
            .map_err(|err| CapabilityError::Surface(format!("window handle: {err}")))?;
        let display_handle = window
            .display_handle()
            .map_err(|err| CapabilityError::Surface(format!("display handle: {err}")))?;

        // The surface field is declared before the window, so it is always
        // dropped first.
        let surface = unsafe {
            instance.create_surface_unsafe(wgpu::SurfaceTargetUnsafe::RawHandle {
                raw_display_handle: display_handle.as_raw(),
                raw_window_handle: window_handle.as_raw(),
            })
        }
        .map_err(|err| CapabilityError::Surface(err.to_string()))?;

        let power_preference = if options.low_power {
            wgpu::PowerPreference::LowPower
        } else {
            wgpu::PowerPreference::HighPerformance
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: Some(&surface),
            force_fallback_adapter: false,
        }))
        .map_err(|err| CapabilityError::NoAdapter(err.to_string()))?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("hyperframe device"),
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| CapabilityError::NoAdapter(err.to_string()))?;

        let caps = surface.get_capabilities(&adapter);
        let Some(&fallback_format) = caps.formats.first() else {
            return Err(CapabilityError::Surface(
                "surface reports no supported formats".to_string(),
            ));
        };
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|format| !format.is_srgb())
            .unwrap_or(fallback_format);
        let present_mode = choose_present_mode(&caps.present_modes, options.vsync);
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let size = window.inner_size();
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);
        tracing::debug!(?format, ?present_mode, "configured surface");

        let uniform_layout = pipeline::uniform_bind_group_layout(&device);
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("quad vertices"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });

        Ok(Self {
            surface: Some(surface),
            _instance: instance,
            device,
            queue,
            config,
            uniform_layout,
            uniforms: None,
            vertex_buffer: Some(vertex_buffer),
            adapter_name: info.name,
            released: false,
            window,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    fn ensure_uniform_capacity(&mut self, size: u64) {
        let size = size.max(16);
        if self.uniforms.as_ref().is_some_and(|slot| slot.capacity >= size) {
            return;
        }
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("field params"),
            size,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("field params bind group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
        });
        if let Some(previous) = self.uniforms.replace(UniformSlot {
            buffer,
            bind_group,
            capacity: size,
        }) {
            previous.buffer.destroy();
        }
    }

    fn reconfigure(&self) {
        if let Some(surface) = &self.surface {
            surface.configure(&self.device, &self.config);
        }
    }
}

impl GraphicsContext for WgpuContext {
    type Program = WgpuProgram;

    fn surface_size(&self) -> SurfaceSize {
        let size = self.window.inner_size();
        SurfaceSize::new(size.width, size.height)
    }

    fn backing_size(&self) -> SurfaceSize {
        SurfaceSize::new(self.config.width, self.config.height)
    }

    fn resize_backing(&mut self, size: SurfaceSize) {
        if size.is_empty() {
            return;
        }
        self.config.width = size.width;
        self.config.height = size.height;
        self.reconfigure();
    }

    fn link_program(&mut self, shader: &CompiledShader) -> Result<Self::Program, ShaderError> {
        self.ensure_uniform_capacity(u64::from(shader.uniforms.block_size()));
        pipeline::link(&self.device, &self.uniform_layout, self.config.format, shader)
    }

    fn render(&mut self, frame: Frame<'_, Self::Program>) -> Result<(), FrameError> {
        if self.released {
            return Err(FrameError::Released);
        }
        let Some(surface) = self.surface.as_ref() else {
            return Err(FrameError::SurfaceUnavailable("surface detached".to_string()));
        };

        let texture = match surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                tracing::debug!("surface lost or outdated; reconfiguring");
                self.reconfigure();
                return Ok(());
            }
            Err(wgpu::SurfaceError::Timeout) => {
                tracing::debug!("surface timeout; skipping frame");
                return Ok(());
            }
            Err(wgpu::SurfaceError::OutOfMemory) => {
                return Err(FrameError::Fatal("surface out of memory".to_string()));
            }
            Err(other) => return Err(FrameError::SurfaceUnavailable(other.to_string())),
        };

        let (Some(slot), Some(vertex_buffer)) = (self.uniforms.as_ref(), self.vertex_buffer.as_ref())
        else {
            return Err(FrameError::Released);
        };
        if !frame.uniforms.is_empty() {
            if frame.uniforms.len() as u64 > slot.capacity {
                return Err(FrameError::Fatal(format!(
                    "uniform block of {} bytes exceeds buffer of {} bytes",
                    frame.uniforms.len(),
                    slot.capacity
                )));
            }
            self.queue.write_buffer(&slot.buffer, 0, frame.uniforms);
        }

        let view = texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        {
            let [r, g, b] = frame.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("field pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color {
                            r: f64::from(r),
                            g: f64::from(g),
                            b: f64::from(b),
                            a: 1.0,
                        }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            pass.set_pipeline(&frame.program.pipeline);
            pass.set_bind_group(0, &slot.bind_group, &[]);
            pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            pass.draw(0..frame.vertex_count, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        texture.present();
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        if let Some(slot) = self.uniforms.take() {
            slot.buffer.destroy();
        }
        if let Some(buffer) = self.vertex_buffer.take() {
            buffer.destroy();
        }
        self.released = true;
        tracing::debug!("released GPU buffers");
    }

    fn detach(&mut self) {
        if self.surface.take().is_some() {
            self.window.set_visible(false);
            tracing::debug!("detached surface from window");
        }
    }
}

fn choose_present_mode(modes: &[wgpu::PresentMode], vsync: bool) -> wgpu::PresentMode {
    let has = |wanted: wgpu::PresentMode| modes.iter().copied().find(|mode| *mode == wanted);
    if vsync {
        has(wgpu::PresentMode::Fifo).unwrap_or(wgpu::PresentMode::AutoVsync)
    } else {
        has(wgpu::PresentMode::Immediate)
            .or_else(|| has(wgpu::PresentMode::Mailbox))
            .unwrap_or(wgpu::PresentMode::AutoNoVsync)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsync_prefers_fifo() {
        let modes = [wgpu::PresentMode::Mailbox, wgpu::PresentMode::Fifo];
        assert_eq!(choose_present_mode(&modes, true), wgpu::PresentMode::Fifo);
        assert_eq!(choose_present_mode(&modes, false), wgpu::PresentMode::Mailbox);
        assert_eq!(choose_present_mode(&[], false), wgpu::PresentMode::AutoNoVsync);
    }
}
