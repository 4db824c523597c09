//! Renderer crate for hyperframe.
//!
//! Draws an animated 4D lattice projection on a full-screen quad. The flow
//! for one frame is:
//!
//! ```text
//!   update_parameters(patch) ──▶ RenderState ──┐
//!          │ variant change                    │
//!          ▼                                   ▼
//!   ShaderManager ─▶ compile (naga) ─▶ link   tick(ticket) ─▶ write_uniforms ─▶ GraphicsContext::render
//! ```
//!
//! `RenderEngine` is generic over [`GraphicsContext`] so the same loop drives
//! a wgpu window surface or the recording [`HeadlessContext`].

mod compile;
mod context;
mod engine;
mod geometry;
pub mod gpu;
mod headless;
mod projection;
mod runtime;
mod shader;
mod state;
mod types;
mod uniforms;
mod window;

pub use compile::{
    compile_program, synthesize_fragment, AttributeLocation, AttributeTable, CompiledShader,
    ShaderError, UniformKind, UniformLayout, UniformLocation, CHANNEL_UNIFORMS,
    GLOBAL_DATA_UNIFORM, POSITION_ATTRIBUTE, VERTEX_SHADER_GLSL,
};
pub use context::{CapabilityError, Frame, FrameError, GraphicsContext};
pub use engine::{LoopState, ProgramSwap, RenderEngine, TickOutcome, UpdateReport};
pub use geometry::{GeometryManager, GeometryVariant};
pub use headless::{HeadlessContext, HeadlessLog, HeadlessProgram};
pub use projection::{ProjectionManager, ProjectionVariant};
pub use runtime::{
    BoxedTimeSource, FixedTimeSource, FrameHost, FrameQueue, FrameTicket, SteppedTimeSource,
    SystemTimeSource, TimeSample, TimeSource,
};
pub use shader::{CacheStats, ProgramEntry, ProgramHandle, ProgramKey, ShaderManager};
pub use state::{ParameterPatch, PatchError, RenderState};
pub use types::{
    Resolution, Resolved, Rgb, SurfaceSize, CHANNEL_COUNT, GLOBAL_BUFFER_LEN, QUAD_VERTEX_COUNT,
};
pub use uniforms::{write_uniforms, UploadSummary};
pub use window::{run_window, WindowConfig, WindowControl, WindowDelegate, WinitFrameHost};

/// Re-exported so dependents can name window types without their own winit.
pub use winit;
