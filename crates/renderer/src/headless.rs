//! Recording [`GraphicsContext`] used by tests and `--headless` runs.
//!
//! Nothing is rasterized. Every call is counted in a [`HeadlessLog`] so the
//! engine's behaviour (draws, clears, uploads, resizes, teardown) can be
//! asserted without a GPU.

use crate::compile::{CompiledShader, ShaderError};
use crate::context::{Frame, FrameError, GraphicsContext};
use crate::types::{Rgb, SurfaceSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadlessProgram {
    pub id: u64,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadlessLog {
    pub draws: u64,
    pub clears: u64,
    pub uploads: u64,
    pub resizes: Vec<SurfaceSize>,
    pub links: u64,
    pub releases: u64,
    pub detaches: u64,
    pub vertices_drawn: u64,
    pub last_uniforms: Vec<u8>,
    pub last_clear: Option<Rgb>,
    pub last_program: Option<String>,
}

#[derive(Debug)]
pub struct HeadlessContext {
    surface: SurfaceSize,
    backing: SurfaceSize,
    log: HeadlessLog,
    next_program: u64,
    fail_links: bool,
    fail_renders: Option<FrameError>,
    released: bool,
    attached: bool,
}

impl HeadlessContext {
    pub fn new(size: SurfaceSize) -> Self {
        Self {
            surface: size,
            backing: size,
            log: HeadlessLog::default(),
            next_program: 1,
            fail_links: false,
            fail_renders: None,
            released: false,
            attached: true,
        }
    }

    pub fn log(&self) -> &HeadlessLog {
        &self.log
    }

    /// Simulates the container laying the drawable out at a new size.
    pub fn set_surface_size(&mut self, size: SurfaceSize) {
        self.surface = size;
    }

    pub fn fail_links(&mut self, fail: bool) {
        self.fail_links = fail;
    }

    /// Makes every later `render` return `error` until cleared with `None`.
    pub fn fail_renders(&mut self, error: Option<FrameError>) {
        self.fail_renders = error;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }
}

impl GraphicsContext for HeadlessContext {
    type Program = HeadlessProgram;

    fn surface_size(&self) -> SurfaceSize {
        self.surface
    }

    fn backing_size(&self) -> SurfaceSize {
        self.backing
    }

    fn resize_backing(&mut self, size: SurfaceSize) {
        self.backing = size;
        self.log.resizes.push(size);
    }

    fn link_program(&mut self, shader: &CompiledShader) -> Result<Self::Program, ShaderError> {
        if self.fail_links {
            return Err(ShaderError::Link {
                label: shader.label.clone(),
                message: "link rejected by headless context".to_string(),
            });
        }
        let id = self.next_program;
        self.next_program += 1;
        self.log.links += 1;
        Ok(HeadlessProgram {
            id,
            label: shader.label.clone(),
        })
    }

    fn render(&mut self, frame: Frame<'_, Self::Program>) -> Result<(), FrameError> {
        if self.released {
            return Err(FrameError::Released);
        }
        if let Some(err) = &self.fail_renders {
            return Err(err.clone());
        }
        self.log.uploads += 1;
        self.log.last_uniforms.clear();
        self.log.last_uniforms.extend_from_slice(frame.uniforms);
        self.log.clears += 1;
        self.log.last_clear = Some(frame.clear_color);
        self.log.draws += 1;
        self.log.vertices_drawn += u64::from(frame.vertex_count);
        self.log.last_program = Some(frame.program.label.clone());
        Ok(())
    }

    fn release(&mut self) {
        self.released = true;
        self.log.releases += 1;
    }

    fn detach(&mut self) {
        if self.attached {
            self.attached = false;
            self.log.detaches += 1;
        }
    }
}
