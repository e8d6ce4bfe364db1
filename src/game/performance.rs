//! Simulation step timing
//!
//! Keeps a rolling window of fixed-step durations and classifies them against
//! the step budget. The game loop logs a warning whenever the status degrades.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Samples kept in the rolling window (~2 seconds at 60 steps/s)
const WINDOW: usize = 120;

/// Samples required before the status moves off `Good`
const MIN_SAMPLES: usize = 10;

/// Step health, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PerformanceStatus {
    /// Comfortably inside the step budget
    Good,
    /// Steps eat most of the budget; frames will start running multiple steps
    Warning,
    /// Steps exceed the budget; the accumulator cap will drop simulated time
    Critical,
}

pub struct PerformanceMonitor {
    durations: VecDeque<Duration>,
    budget: Duration,
    /// Fractions of the budget at which the status worsens
    warning_threshold: f32,
    critical_threshold: f32,
    status: PerformanceStatus,
    step_start: Option<Instant>,
    last_entity_count: usize,
}

impl PerformanceMonitor {
    /// Monitor for a fixed step of `step_ms` milliseconds
    pub fn new(step_ms: f64) -> Self {
        Self {
            durations: VecDeque::with_capacity(WINDOW),
            budget: Duration::from_secs_f64(step_ms.max(0.001) / 1000.0),
            warning_threshold: 0.7,
            critical_threshold: 1.0,
            status: PerformanceStatus::Good,
            step_start: None,
            last_entity_count: 0,
        }
    }

    pub fn step_start(&mut self) {
        self.step_start = Some(Instant::now());
    }

    /// Close the current measurement
    ///
    /// Returns the new status when it is worse than before.
    pub fn step_end(&mut self, entity_count: usize) -> Option<PerformanceStatus> {
        let start = self.step_start.take()?;
        self.last_entity_count = entity_count;
        self.record(start.elapsed())
    }

    fn record(&mut self, duration: Duration) -> Option<PerformanceStatus> {
        self.durations.push_back(duration);
        while self.durations.len() > WINDOW {
            self.durations.pop_front();
        }
        if self.durations.len() < MIN_SAMPLES {
            return None;
        }

        let previous = self.status;
        let ratio = self.budget_usage();
        self.status = if ratio < self.warning_threshold {
            PerformanceStatus::Good
        } else if ratio < self.critical_threshold {
            PerformanceStatus::Warning
        } else {
            PerformanceStatus::Critical
        };
        (self.status > previous).then_some(self.status)
    }

    pub fn average(&self) -> Duration {
        if self.durations.is_empty() {
            return Duration::ZERO;
        }
        let sum: Duration = self.durations.iter().sum();
        sum / self.durations.len() as u32
    }

    /// 95th percentile step duration
    pub fn p95(&self) -> Duration {
        let mut sorted: Vec<Duration> = self.durations.iter().copied().collect();
        sorted.sort_unstable();
        let idx = (sorted.len() as f32 * 0.95) as usize;
        sorted
            .get(idx.min(sorted.len().saturating_sub(1)))
            .copied()
            .unwrap_or(Duration::ZERO)
    }

    /// Average step duration as a fraction of the budget
    pub fn budget_usage(&self) -> f32 {
        self.average().as_secs_f32() / self.budget.as_secs_f32()
    }

    pub fn status(&self) -> PerformanceStatus {
        self.status
    }

    pub fn last_entity_count(&self) -> usize {
        self.last_entity_count
    }

    pub fn summary(&self) -> String {
        format!(
            "{:?} - {:.1}% budget (p95 {:?}), {} entities",
            self.status,
            self.budget_usage() * 100.0,
            self.p95(),
            self.last_entity_count
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(monitor: &mut PerformanceMonitor, micros: u64, n: usize) -> Option<PerformanceStatus> {
        let mut last = None;
        for _ in 0..n {
            if let Some(s) = monitor.record(Duration::from_micros(micros)) {
                last = Some(s);
            }
        }
        last
    }

    #[test]
    fn test_starts_good() {
        let monitor = PerformanceMonitor::new(1000.0 / 60.0);
        assert_eq!(monitor.status(), PerformanceStatus::Good);
        assert_eq!(monitor.average(), Duration::ZERO);
        assert_eq!(monitor.p95(), Duration::ZERO);
    }

    #[test]
    fn test_needs_samples_before_judging() {
        let mut monitor = PerformanceMonitor::new(10.0);
        assert_eq!(fill(&mut monitor, 20_000, MIN_SAMPLES - 1), None);
        assert_eq!(monitor.status(), PerformanceStatus::Good);
    }

    #[test]
    fn test_status_levels() {
        let mut monitor = PerformanceMonitor::new(10.0);
        assert_eq!(fill(&mut monitor, 2_000, 20), None);
        assert_eq!(monitor.status(), PerformanceStatus::Good);

        let mut monitor = PerformanceMonitor::new(10.0);
        assert_eq!(fill(&mut monitor, 8_000, 20), Some(PerformanceStatus::Warning));

        let mut monitor = PerformanceMonitor::new(10.0);
        assert_eq!(fill(&mut monitor, 15_000, 20), Some(PerformanceStatus::Critical));
    }

    #[test]
    fn test_degradation_reported_once() {
        let mut monitor = PerformanceMonitor::new(10.0);
        fill(&mut monitor, 15_000, MIN_SAMPLES);
        assert_eq!(monitor.record(Duration::from_micros(15_000)), None);
    }

    #[test]
    fn test_step_timing() {
        let mut monitor = PerformanceMonitor::new(16.0);
        assert_eq!(monitor.step_end(3), None);
        monitor.step_start();
        monitor.step_end(42);
        assert_eq!(monitor.last_entity_count(), 42);
        assert_eq!(monitor.durations.len(), 1);
        assert!(monitor.summary().contains("42 entities"));
    }
}
