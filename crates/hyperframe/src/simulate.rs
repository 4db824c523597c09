use std::time::Duration;

use editorial::ReadingMetrics;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CONTENT_TYPES: [&str; 4] = ["text", "mixed", "media", "interactive"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Scrolling,
    Dwelling,
}

/// Seeded model of a reader working through an article.
///
/// The reader alternates between scrolling bursts and dwelling on a passage,
/// clicks now and then, and slowly gains or loses interest. The same seed
/// always produces the same metric sequence.
#[derive(Debug)]
pub struct SimulatedReader {
    rng: StdRng,
    phase: Phase,
    phase_left: Duration,
    metrics: ReadingMetrics,
    elapsed: Duration,
}

impl SimulatedReader {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let content_type = CONTENT_TYPES[rng.gen_range(0..CONTENT_TYPES.len())];
        let metrics = ReadingMetrics {
            engagement: rng.gen_range(0.3..0.8),
            content_type: Some(content_type.to_string()),
            window_width: if rng.gen_bool(0.7) { 1440.0 } else { 800.0 },
            depth: rng.gen_range(0..=3),
            ..ReadingMetrics::default()
        };
        Self {
            rng,
            phase: Phase::Dwelling,
            phase_left: Duration::from_secs(2),
            metrics,
            elapsed: Duration::ZERO,
        }
    }

    /// Moves the reader forward by `dt` and returns the metrics at that point.
    pub fn advance(&mut self, dt: Duration) -> ReadingMetrics {
        self.elapsed += dt;
        let seconds = dt.as_secs_f32();

        if self.phase_left <= dt {
            self.switch_phase();
        } else {
            self.phase_left -= dt;
        }

        let metrics = &mut self.metrics;
        match self.phase {
            Phase::Scrolling => {
                let speed = self.rng.gen_range(0.01..0.06);
                metrics.scroll_progress = (metrics.scroll_progress + speed * seconds).min(1.0);
                metrics.engagement = (metrics.engagement - 0.01 * seconds).max(0.0);
            }
            Phase::Dwelling => {
                metrics.engagement = (metrics.engagement + 0.03 * seconds).min(1.0);
            }
        }

        let clicks = if self.rng.gen_bool(0.2) {
            self.rng.gen_range(1.0..4.0)
        } else {
            0.0
        };
        // Exponential moving average, one sample per advance.
        metrics.clicks_per_minute = 0.8 * metrics.clicks_per_minute + 0.2 * clicks * 60.0 / 10.0;
        metrics.time_on_page = self.elapsed.as_secs_f64() * 1000.0;

        self.metrics.clone()
    }

    fn switch_phase(&mut self) {
        self.phase = match self.phase {
            Phase::Scrolling => Phase::Dwelling,
            Phase::Dwelling => Phase::Scrolling,
        };
        let secs = match self.phase {
            Phase::Scrolling => self.rng.gen_range(1.0..4.0),
            Phase::Dwelling => self.rng.gen_range(2.0..12.0),
        };
        self.phase_left = Duration::from_secs_f64(secs);
    }
}
