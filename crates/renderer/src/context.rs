//! Seam between the render engine and whatever owns the pixels.
//!
//! [`crate::gpu::WgpuContext`] draws into a window surface;
//! [`crate::headless::HeadlessContext`] records the same calls for tests and
//! the headless run mode.

use crate::compile::{CompiledShader, ShaderError};
use crate::types::{Rgb, SurfaceSize};

/// Everything a context needs to draw one frame.
#[derive(Debug)]
pub struct Frame<'a, P> {
    pub program: &'a P,
    /// std140 bytes for the uniform block, sized to the program's layout.
    pub uniforms: &'a [u8],
    pub clear_color: Rgb,
    pub vertex_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FrameError {
    #[error("graphics context has been released")]
    Released,
    #[error("surface is unavailable: {0}")]
    SurfaceUnavailable(String),
    #[error("graphics context failure: {0}")]
    Fatal(String),
}

/// Raised when no graphics context can be obtained at startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CapabilityError {
    #[error("no compatible graphics adapter: {0}")]
    NoAdapter(String),
    #[error("failed to create drawing surface: {0}")]
    Surface(String),
    #[error("failed to compile default program: {0}")]
    DefaultProgram(#[from] ShaderError),
}

pub trait GraphicsContext {
    type Program;

    /// Logical size of the drawable as laid out by its container.
    fn surface_size(&self) -> SurfaceSize;

    /// Size of the buffer frames are actually rendered into.
    fn backing_size(&self) -> SurfaceSize;

    fn resize_backing(&mut self, size: SurfaceSize);

    fn link_program(&mut self, shader: &CompiledShader) -> Result<Self::Program, ShaderError>;

    /// Clears to `frame.clear_color` and draws one triangle strip.
    fn render(&mut self, frame: Frame<'_, Self::Program>) -> Result<(), FrameError>;

    /// Frees buffers and programs. Later renders fail with [`FrameError::Released`].
    fn release(&mut self);

    /// Removes the drawable from its container.
    fn detach(&mut self);
}
