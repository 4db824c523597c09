use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

/// Animation clock reading for one frame, written to `u_time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Seconds since the loop was last started.
    pub seconds: f32,
    /// Frames sampled since the loop was last started.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            frame_index,
        }
    }
}

/// Clock the engine samples once per rendered frame.
pub trait TimeSource: Send {
    /// Rewinds to zero; `RenderEngine::start` calls this.
    fn reset(&mut self);
    fn sample(&mut self) -> TimeSample;
}

/// Wall-clock seconds since the last reset.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    started: Instant,
    samples: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            samples: 0,
        }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn reset(&mut self) {
        *self = Self::new();
    }

    fn sample(&mut self) -> TimeSample {
        let index = self.samples;
        self.samples += 1;
        TimeSample::new(self.started.elapsed().as_secs_f32(), index)
    }
}

/// Frozen clock; every frame sees the same `u_time`.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    at: f32,
}

impl FixedTimeSource {
    pub fn new(at: f32) -> Self {
        Self { at }
    }

    pub fn time(&self) -> f32 {
        self.at
    }
}

impl TimeSource for FixedTimeSource {
    fn reset(&mut self) {}

    fn sample(&mut self) -> TimeSample {
        TimeSample {
            seconds: self.at,
            frame_index: 0,
        }
    }
}

/// Advances by a fixed step per sample, as if frames arrived at a steady rate.
#[derive(Debug, Clone, Copy)]
pub struct SteppedTimeSource {
    step: f32,
    samples: u64,
}

impl SteppedTimeSource {
    pub fn new(step: f32) -> Self {
        Self { step, samples: 0 }
    }

    pub fn from_fps(fps: f32) -> Self {
        Self::new(if fps > 0.0 { fps.recip() } else { 0.0 })
    }
}

impl TimeSource for SteppedTimeSource {
    fn reset(&mut self) {
        self.samples = 0;
    }

    fn sample(&mut self) -> TimeSample {
        let index = self.samples;
        self.samples += 1;
        TimeSample::new(index as f32 * self.step, index)
    }
}

pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Generation number identifying one scheduled frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameTicket(pub u64);

impl fmt::Display for FrameTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame#{}", self.0)
    }
}

/// The host's "call me back on the next display refresh" primitive.
///
/// A host hands the ticket back to `RenderEngine::tick`. Cancelling is best
/// effort: the engine ignores any ticket it is no longer waiting for.
pub trait FrameHost {
    fn request_frame(&mut self, ticket: FrameTicket);
    fn cancel_frame(&mut self, ticket: FrameTicket);
}

/// Manually pumped frame host.
///
/// Cloning shares the queue, so a driver can keep one handle while the engine
/// owns another.
#[derive(Debug, Clone)]
pub struct FrameQueue {
    inner: Rc<RefCell<FrameQueueInner>>,
}

#[derive(Debug, Default)]
struct FrameQueueInner {
    queued: VecDeque<FrameTicket>,
    requested: u64,
    cancelled: u64,
    /// When false, cancellations are recorded but the ticket stays queued.
    honour_cancel: bool,
}

impl FrameQueue {
    pub fn new() -> Self {
        Self::with_cancel(true)
    }

    /// A queue that keeps cancelled tickets, as a host that already
    /// dispatched its callback would.
    pub fn ignoring_cancel() -> Self {
        Self::with_cancel(false)
    }

    fn with_cancel(honour_cancel: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FrameQueueInner {
                honour_cancel,
                ..FrameQueueInner::default()
            })),
        }
    }

    pub fn pop(&self) -> Option<FrameTicket> {
        self.inner.borrow_mut().queued.pop_front()
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().queued.len()
    }

    pub fn requested(&self) -> u64 {
        self.inner.borrow().requested
    }

    pub fn cancelled(&self) -> u64 {
        self.inner.borrow().cancelled
    }
}

impl Default for FrameQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameHost for FrameQueue {
    fn request_frame(&mut self, ticket: FrameTicket) {
        let mut inner = self.inner.borrow_mut();
        inner.requested += 1;
        inner.queued.push_back(ticket);
    }

    fn cancel_frame(&mut self, ticket: FrameTicket) {
        let mut inner = self.inner.borrow_mut();
        inner.cancelled += 1;
        if inner.honour_cancel {
            inner.queued.retain(|queued| *queued != ticket);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepped_source_resets_to_zero() {
        let mut source = SteppedTimeSource::from_fps(10.0);
        assert_eq!(source.sample().seconds, 0.0);
        assert!((source.sample().seconds - 0.1).abs() < 1e-6);
        source.reset();
        assert_eq!(source.sample(), TimeSample::new(0.0, 0));
    }

    #[test]
    fn boxed_sources_are_interchangeable() {
        let mut sources: Vec<BoxedTimeSource> = vec![
            Box::new(FixedTimeSource::new(1.5)),
            Box::new(SteppedTimeSource::new(0.5)),
        ];
        for source in &mut sources {
            source.sample();
        }
        let seconds: Vec<f32> = sources.iter_mut().map(|s| s.sample().seconds).collect();
        assert_eq!(seconds, vec![1.5, 0.5]);
    }

    #[test]
    fn queue_shares_state_between_clones() {
        let queue = FrameQueue::new();
        let mut host = queue.clone();
        host.request_frame(FrameTicket(1));
        host.request_frame(FrameTicket(2));
        host.cancel_frame(FrameTicket(1));
        assert_eq!(queue.pending(), 1);
        assert_eq!(queue.pop(), Some(FrameTicket(2)));
        assert_eq!(queue.requested(), 2);
        assert_eq!(queue.cancelled(), 1);
    }

    #[test]
    fn ignoring_queue_keeps_cancelled_tickets() {
        let queue = FrameQueue::ignoring_cancel();
        let mut host = queue.clone();
        host.request_frame(FrameTicket(7));
        host.cancel_frame(FrameTicket(7));
        assert_eq!(queue.pop(), Some(FrameTicket(7)));
    }

    #[test]
    fn default_queue_drops_cancelled_tickets() {
        let queue = FrameQueue::default();
        let mut host = queue.clone();
        host.request_frame(FrameTicket(3));
        host.cancel_frame(FrameTicket(3));
        assert_eq!(queue.pending(), 0);
        assert_eq!(queue.pop(), None);
    }
}
