use std::collections::HashSet;
use std::time::{Duration, Instant};

use scheduler::{SubscriptionId, Subscriptions};
use tracing::{debug, error, info, trace, warn};

use crate::compile::ShaderError;
use crate::context::{Frame, FrameError, GraphicsContext};
use crate::runtime::{BoxedTimeSource, FrameHost, FrameTicket};
use crate::shader::{ProgramHandle, ProgramKey, ShaderManager};
use crate::state::{ParameterPatch, PatchError, RenderState};
use crate::types::QUAD_VERTEX_COUNT;
use crate::uniforms::write_uniforms;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramSwap {
    Unchanged,
    Swapped(ProgramKey),
    /// The requested program could not be built; the previous one stays bound.
    Failed {
        requested: ProgramKey,
        error: ShaderError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateReport {
    /// Number of state fields whose value changed.
    pub changed: usize,
    pub program: ProgramSwap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Rendered,
    /// The ticket was cancelled or superseded; nothing was drawn.
    Stale,
    /// The frame failed and the loop was stopped.
    Stopped { reason: FrameError },
}

#[derive(Debug)]
struct FrameStats {
    frames: u64,
    window_frames: u32,
    window_start: Instant,
    fps: f32,
}

impl FrameStats {
    fn new() -> Self {
        Self {
            frames: 0,
            window_frames: 0,
            window_start: Instant::now(),
            fps: 0.0,
        }
    }

    fn restart_window(&mut self) {
        self.window_frames = 0;
        self.window_start = Instant::now();
    }

    fn record(&mut self, time: f32, program: ProgramKey) {
        self.frames += 1;
        self.window_frames += 1;
        let now = Instant::now();
        let elapsed = now.saturating_duration_since(self.window_start);
        if elapsed >= Duration::from_secs(1) {
            self.fps = self.window_frames as f32 / elapsed.as_secs_f32();
            self.window_frames = 0;
            self.window_start = now;
            debug!(
                fps = self.fps.round(),
                frame_count = self.frames,
                time,
                program = %program,
                "render stats"
            );
        }
    }
}

/// Owns the graphics context, parameter state and the frame loop.
///
/// The loop is cooperative: `start` asks the [`FrameHost`] for a callback, the
/// host hands the ticket to [`RenderEngine::tick`], and every rendered tick
/// requests the next one. Only the most recently issued ticket is honoured,
/// so `stop` takes effect even if the host already queued a callback.
pub struct RenderEngine<C: GraphicsContext> {
    context: C,
    shaders: ShaderManager<C::Program>,
    active: ProgramHandle<C::Program>,
    state: RenderState,
    loop_state: LoopState,
    time_source: BoxedTimeSource,
    host: Box<dyn FrameHost>,
    pending: Option<FrameTicket>,
    next_ticket: u64,
    staging: Vec<u8>,
    /// Programs whose uniform coverage has already been checked.
    uniforms_checked: HashSet<ProgramKey>,
    subscriptions: Subscriptions,
    stats: FrameStats,
    disposed: bool,
}

impl<C: GraphicsContext> RenderEngine<C> {
    /// Builds the engine and its default program.
    pub fn new(
        mut context: C,
        host: Box<dyn FrameHost>,
        time_source: BoxedTimeSource,
    ) -> Result<Self, ShaderError> {
        let mut shaders = ShaderManager::new();
        let state = RenderState {
            resolution: context.backing_size().as_resolution(),
            ..RenderState::default()
        };
        let key = state.program_key();
        let active = shaders.create_program(&mut context, key.geometry, key.projection)?;
        shaders.use_program(&active);
        info!(program = %key, size = %context.backing_size(), "render engine ready");

        Ok(Self {
            context,
            shaders,
            active,
            state,
            loop_state: LoopState::Stopped,
            time_source,
            host,
            pending: None,
            next_ticket: 0,
            staging: Vec::new(),
            uniforms_checked: HashSet::new(),
            subscriptions: Subscriptions::new(),
            stats: FrameStats::new(),
            disposed: false,
        })
    }

    /// Merges `patch` into the state and swaps programs if a variant changed.
    ///
    /// Invalid patches are rejected whole. A failed program build is reported
    /// in the returned [`UpdateReport`] rather than as an error; the previous
    /// program keeps drawing and the state's variants are rolled back to it.
    pub fn update_parameters(&mut self, patch: &ParameterPatch) -> Result<UpdateReport, PatchError> {
        if self.disposed {
            return Err(PatchError::Disposed);
        }
        if let Err(err) = patch.validate() {
            warn!(error = %err, "rejected parameter patch");
            return Err(err);
        }

        let mut changed = self.state.merge(patch);
        let requested = self.state.program_key();
        let current = self.active.key();
        let program = if requested == current {
            ProgramSwap::Unchanged
        } else {
            match self
                .shaders
                .create_program(&mut self.context, requested.geometry, requested.projection)
            {
                Ok(handle) => {
                    self.shaders.use_program(&handle);
                    self.active = handle;
                    debug!(from = %current, to = %requested, "swapped program");
                    ProgramSwap::Swapped(requested)
                }
                Err(error) => {
                    warn!(
                        requested = %requested,
                        active = %current,
                        error = %error,
                        "keeping previous program"
                    );
                    changed = changed.saturating_sub(
                        usize::from(self.state.geometry != current.geometry)
                            + usize::from(self.state.projection != current.projection),
                    );
                    self.state.geometry = current.geometry;
                    self.state.projection = current.projection;
                    ProgramSwap::Failed { requested, error }
                }
            }
        };

        trace!(changed, "merged parameter patch");
        Ok(UpdateReport { changed, program })
    }

    /// Starts the loop. Returns `false` if it was already running or the
    /// engine has been disposed.
    pub fn start(&mut self) -> bool {
        if self.disposed {
            warn!("start() called on a disposed render engine");
            return false;
        }
        if self.loop_state == LoopState::Running {
            return false;
        }
        self.time_source.reset();
        self.stats.restart_window();
        self.set_loop_state(LoopState::Running);
        self.schedule_next();
        info!("render loop started");
        true
    }

    /// Stops the loop and cancels the pending tick. Returns `false` if the
    /// loop was not running.
    pub fn stop(&mut self) -> bool {
        if self.loop_state == LoopState::Stopped {
            return false;
        }
        if let Some(ticket) = self.pending.take() {
            self.host.cancel_frame(ticket);
        }
        self.set_loop_state(LoopState::Stopped);
        info!(frames = self.stats.frames, "render loop stopped");
        true
    }

    /// Runs one frame for `ticket` if it is the tick the engine is waiting on.
    pub fn tick(&mut self, ticket: FrameTicket) -> TickOutcome {
        if self.loop_state != LoopState::Running || self.pending != Some(ticket) {
            trace!(%ticket, "ignoring stale frame ticket");
            return TickOutcome::Stale;
        }
        self.pending = None;

        match self.render_frame() {
            Ok(()) => {
                self.stats.record(self.state.time, self.active.key());
                if self.loop_state == LoopState::Running {
                    self.schedule_next();
                }
                TickOutcome::Rendered
            }
            Err(reason) => {
                error!(error = %reason, "frame failed; stopping render loop");
                self.stop();
                TickOutcome::Stopped { reason }
            }
        }
    }

    /// Stops the loop, tears down registered listeners and timers, then
    /// releases and detaches the graphics context. Only the first call acts.
    pub fn dispose(&mut self) -> bool {
        if self.disposed {
            return false;
        }
        self.stop();
        let removed = self.subscriptions.teardown_all();
        self.context.release();
        self.context.detach();
        self.disposed = true;
        info!(
            subscriptions = removed,
            frames = self.stats.frames,
            "render engine disposed"
        );
        true
    }

    /// Registers cleanup to run inside [`RenderEngine::dispose`].
    pub fn register_teardown(
        &mut self,
        label: impl Into<String>,
        teardown: impl FnOnce() + 'static,
    ) -> SubscriptionId {
        self.subscriptions.register(label, teardown)
    }

    pub fn remove_teardown(&mut self, id: SubscriptionId) -> bool {
        self.subscriptions.remove(id)
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn loop_state(&self) -> LoopState {
        self.loop_state
    }

    pub fn is_running(&self) -> bool {
        self.loop_state == LoopState::Running
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn pending_ticket(&self) -> Option<FrameTicket> {
        self.pending
    }

    pub fn active_program(&self) -> &ProgramHandle<C::Program> {
        &self.active
    }

    pub fn shaders(&self) -> &ShaderManager<C::Program> {
        &self.shaders
    }

    pub fn frames_rendered(&self) -> u64 {
        self.stats.frames
    }

    pub fn subscriptions(&self) -> &Subscriptions {
        &self.subscriptions
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut C {
        &mut self.context
    }

    fn set_loop_state(&mut self, state: LoopState) {
        self.loop_state = state;
        self.state.running = state == LoopState::Running;
    }

    fn schedule_next(&mut self) {
        self.next_ticket += 1;
        let ticket = FrameTicket(self.next_ticket);
        self.pending = Some(ticket);
        self.host.request_frame(ticket);
    }

    fn render_frame(&mut self) -> Result<(), FrameError> {
        let sample = self.time_source.sample();
        self.state.time = sample.seconds;

        let logical = self.context.surface_size();
        if !logical.is_empty() && logical != self.context.backing_size() {
            self.context.resize_backing(logical);
            debug!(size = %logical, "resized backing buffer");
        }
        self.state.resolution = self.context.backing_size().as_resolution();

        let summary = write_uniforms(&self.state, self.active.uniforms(), &mut self.staging);
        let key = self.active.key();
        if self.uniforms_checked.insert(key) && summary.skipped > 0 {
            debug!(
                skipped = summary.skipped,
                program = %key,
                "uniforms absent from program"
            );
        }

        self.context.render(Frame {
            program: self.active.program(),
            uniforms: &self.staging,
            clear_color: self.state.background_color,
            vertex_count: QUAD_VERTEX_COUNT,
        })
    }
}

impl<C: GraphicsContext> Drop for RenderEngine<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}
