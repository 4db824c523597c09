//! wgpu implementation of [`crate::context::GraphicsContext`].
//!
//! - `context` owns the instance, device and window surface, the uniform
//!   buffer and the quad vertex buffer.
//! - `pipeline` links validated GLSL into a triangle-strip render pipeline
//!   with a single uniform bind group.

mod context;
mod pipeline;

pub use context::{WgpuContext, WgpuOptions};
pub use pipeline::WgpuProgram;
