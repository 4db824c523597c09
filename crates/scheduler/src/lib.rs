use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("timer '{0}' requires a non-zero interval")]
    ZeroInterval(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct TimerFired {
    pub id: TimerId,
    pub label: String,
    pub fired_at: Instant,
}

/// Periodic timers polled from the host event loop.
///
/// Nothing here runs on its own: the host calls [`Scheduler::tick`] whenever it
/// wakes up and sleeps until [`Scheduler::next_deadline`]. Missed periods are
/// coalesced into a single firing.
pub struct Scheduler {
    timers: HashMap<TimerId, TimerState>,
    next_id: u64,
}

struct TimerState {
    label: String,
    interval: Duration,
    next_due: Instant,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            timers: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn schedule_every(
        &mut self,
        label: impl Into<String>,
        interval: Duration,
        now: Instant,
    ) -> Result<TimerId, SchedulerError> {
        let label = label.into();
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval(label));
        }
        let id = TimerId(self.next_id);
        self.next_id += 1;
        tracing::debug!(%id, label = %label, interval_ms = interval.as_millis() as u64, "scheduled timer");
        self.timers.insert(
            id,
            TimerState {
                label,
                interval,
                next_due: now + interval,
            },
        );
        Ok(id)
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.timers.remove(&id) {
            Some(state) => {
                tracing::debug!(%id, label = %state.label, "cancelled timer");
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.timers.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.timers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.values().map(|state| state.next_due).min()
    }

    pub fn tick(&mut self, now: Instant) -> Vec<TimerFired> {
        let mut fired = Vec::new();
        for (id, state) in self.timers.iter_mut() {
            if state.next_due > now {
                continue;
            }
            fired.push(TimerFired {
                id: *id,
                label: state.label.clone(),
                fired_at: now,
            });
            while state.next_due <= now {
                state.next_due += state.interval;
            }
        }
        fired.sort_by_key(|event| event.id);
        fired
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Teardown callbacks for listeners and timers registered on behalf of an owner.
///
/// Every callback runs at most once: either when removed individually or when
/// the owner calls [`Subscriptions::teardown_all`]. Teardown runs in reverse
/// registration order.
#[derive(Default)]
pub struct Subscriptions {
    entries: Vec<Subscription>,
    next_id: u64,
}

struct Subscription {
    id: SubscriptionId,
    label: String,
    teardown: Box<dyn FnOnce()>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        label: impl Into<String>,
        teardown: impl FnOnce() + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.entries.push(Subscription {
            id,
            label: label.into(),
            teardown: Box::new(teardown),
        });
        id
    }

    pub fn remove(&mut self, id: SubscriptionId) -> bool {
        let Some(position) = self.entries.iter().position(|entry| entry.id == id) else {
            return false;
        };
        let entry = self.entries.remove(position);
        tracing::debug!(label = %entry.label, "removed subscription");
        (entry.teardown)();
        true
    }

    pub fn teardown_all(&mut self) -> usize {
        let count = self.entries.len();
        while let Some(entry) = self.entries.pop() {
            tracing::debug!(label = %entry.label, "tearing down subscription");
            (entry.teardown)();
        }
        count
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.labels()).finish()
    }
}
