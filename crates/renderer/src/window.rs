use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder};
use winit::window::{Window, WindowBuilder};

use crate::runtime::{FrameHost, FrameTicket};
use crate::types::SurfaceSize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub size: SurfaceSize,
    pub visible: bool,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "hyperframe".to_string(),
            size: SurfaceSize::new(1280, 720),
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowControl {
    Continue,
    Exit,
}

/// Frame host backed by `Window::request_redraw`.
///
/// The requested ticket is parked until the next `RedrawRequested`; a
/// cancelled ticket is simply never handed out.
#[derive(Debug, Clone)]
pub struct WinitFrameHost {
    window: Arc<Window>,
    slot: Rc<Cell<Option<FrameTicket>>>,
}

impl WinitFrameHost {
    pub fn new(window: Arc<Window>) -> Self {
        Self {
            window,
            slot: Rc::new(Cell::new(None)),
        }
    }

    pub fn take_ticket(&self) -> Option<FrameTicket> {
        self.slot.take()
    }
}

impl FrameHost for WinitFrameHost {
    fn request_frame(&mut self, ticket: FrameTicket) {
        self.slot.set(Some(ticket));
        self.window.request_redraw();
    }

    fn cancel_frame(&mut self, ticket: FrameTicket) {
        if self.slot.get() == Some(ticket) {
            self.slot.set(None);
        }
    }
}

/// Application side of the window event loop. Every call happens on the
/// event-loop thread.
pub trait WindowDelegate {
    /// Called once, after the window exists and before events flow.
    fn attach(&mut self, window: Arc<Window>, frames: WinitFrameHost) -> Result<()>;

    fn redraw(&mut self, ticket: FrameTicket);

    fn input(&mut self, event: &WindowEvent) -> WindowControl;

    /// Runs timers due at `now`; returns the next deadline, if any.
    fn poll(&mut self, now: Instant) -> Option<Instant>;

    /// Called once when the window closes or the loop exits.
    fn detach(&mut self);
}

/// Opens a window and drives `delegate` until the window closes.
pub fn run_window<D: WindowDelegate>(config: &WindowConfig, mut delegate: D) -> Result<()> {
    let event_loop = EventLoopBuilder::new()
        .build()
        .map_err(|err| anyhow!("failed to create event loop: {err}"))?;

    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(config.size.width, config.size.height))
        .with_visible(config.visible)
        .build(&event_loop)
        .map_err(|err| anyhow!("failed to create window: {err}"))?;
    let window = Arc::new(window);

    let frames = WinitFrameHost::new(Arc::clone(&window));
    delegate
        .attach(Arc::clone(&window), frames.clone())
        .context("failed to attach renderer to window")?;

    let mut detached = false;
    let run_result = event_loop.run(move |event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                if !detached {
                    delegate.detach();
                    detached = true;
                }
                elwt.exit();
            }
            WindowEvent::RedrawRequested => {
                if let Some(ticket) = frames.take_ticket() {
                    delegate.redraw(ticket);
                }
            }
            other => {
                if delegate.input(&other) == WindowControl::Exit {
                    if !detached {
                        delegate.detach();
                        detached = true;
                    }
                    elwt.exit();
                }
            }
        },
        Event::AboutToWait => match delegate.poll(Instant::now()) {
            Some(deadline) => {
                tracing::trace!(
                    deadline_ms = deadline.saturating_duration_since(Instant::now()).as_millis(),
                    "waiting for next timer"
                );
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            }
            None => elwt.set_control_flow(ControlFlow::Wait),
        },
        Event::LoopExiting => {
            if !detached {
                delegate.detach();
                detached = true;
            }
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}
