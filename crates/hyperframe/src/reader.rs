use std::collections::VecDeque;
use std::time::{Duration, Instant};

use editorial::ReadingMetrics;

const CLICK_WINDOW: Duration = Duration::from_secs(60);
const ENGAGEMENT_DECAY: f32 = 0.9;
const ENGAGEMENT_BUMP: f32 = 0.08;

/// Reading metrics accumulated from real window input.
#[derive(Debug)]
pub struct InputReader {
    opened: Instant,
    scroll_progress: f32,
    clicks: VecDeque<Instant>,
    engagement: f32,
    window_width: f32,
    depth: u32,
}

impl InputReader {
    pub fn new(opened: Instant, window_width: u32) -> Self {
        Self {
            opened,
            scroll_progress: 0.0,
            clicks: VecDeque::new(),
            engagement: 0.5,
            window_width: window_width as f32,
            depth: 0,
        }
    }

    /// Positive `delta` scrolls further down the article.
    pub fn scroll(&mut self, delta: f32) {
        if !delta.is_finite() {
            return;
        }
        self.scroll_progress = (self.scroll_progress + delta).clamp(0.0, 1.0);
        self.engage();
    }

    pub fn click(&mut self, at: Instant) {
        self.clicks.push_back(at);
        self.engage();
    }

    pub fn resize(&mut self, width: u32) {
        self.window_width = width as f32;
    }

    pub fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    /// Current metrics; also decays engagement by one step.
    pub fn sample(&mut self, now: Instant) -> ReadingMetrics {
        while let Some(first) = self.clicks.front() {
            if now.saturating_duration_since(*first) > CLICK_WINDOW {
                self.clicks.pop_front();
            } else {
                break;
            }
        }
        let metrics = ReadingMetrics {
            scroll_progress: self.scroll_progress,
            time_on_page: now.saturating_duration_since(self.opened).as_secs_f64() * 1000.0,
            engagement: self.engagement,
            clicks_per_minute: self.clicks_per_minute(now),
            content_type: Some("mixed".to_string()),
            window_width: self.window_width,
            depth: self.depth,
        };
        self.engagement *= ENGAGEMENT_DECAY;
        metrics
    }

    fn clicks_per_minute(&self, now: Instant) -> f32 {
        let span = now
            .saturating_duration_since(self.opened)
            .min(CLICK_WINDOW)
            .as_secs_f32();
        if span <= 0.0 {
            return 0.0;
        }
        self.clicks.len() as f32 * 60.0 / span.max(1.0)
    }

    fn engage(&mut self) {
        self.engagement = (self.engagement + ENGAGEMENT_BUMP).min(1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scroll_is_clamped() {
        let opened = Instant::now();
        let mut reader = InputReader::new(opened, 1280);
        reader.scroll(0.4);
        reader.scroll(0.9);
        assert_eq!(reader.sample(opened).scroll_progress, 1.0);
        reader.scroll(-3.0);
        assert_eq!(reader.sample(opened).scroll_progress, 0.0);
        reader.scroll(f32::NAN);
        assert_eq!(reader.sample(opened).scroll_progress, 0.0);
    }

    #[test]
    fn clicks_expire_after_a_minute() {
        let opened = Instant::now();
        let mut reader = InputReader::new(opened, 1280);
        reader.click(opened + Duration::from_secs(1));
        reader.click(opened + Duration::from_secs(2));
        let metrics = reader.sample(opened + Duration::from_secs(30));
        assert_eq!(metrics.clicks_per_minute, 4.0);
        let metrics = reader.sample(opened + Duration::from_secs(120));
        assert_eq!(metrics.clicks_per_minute, 0.0);
        assert_eq!(metrics.time_on_page, 120_000.0);
    }

    #[test]
    fn engagement_rises_with_input_and_decays() {
        let opened = Instant::now();
        let mut reader = InputReader::new(opened, 1920);
        reader.scroll(0.1);
        let first = reader.sample(opened + Duration::from_secs(1));
        assert!(first.engagement > 0.5);
        let second = reader.sample(opened + Duration::from_secs(2));
        assert!(second.engagement < first.engagement);
        assert_eq!(second.window_width, 1920.0);
    }
}
