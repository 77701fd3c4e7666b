//! Annotation timing.
//!
//! [`AnnotationTimer`] owns its state as an explicit machine; callers drive
//! it through transition methods and never touch shared mutable timing data.
//! Elapsed time accrues against the active label while running, so a
//! segmentation save can report both the total duration and a per-label
//! breakdown.

use std::time::{Duration, Instant};

use indexmap::IndexMap;

/// Lifecycle of a per-case timing session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    /// No case timing has started yet.
    #[default]
    Idle,
    /// Accruing time against the active label.
    Running,
    /// Started but not currently accruing.
    Paused,
    /// Finalized by a save; totals are frozen until `reset`.
    Stopped,
}

/// Accumulates total and per-label annotation time for one case.
///
/// Redundant transitions (`pause` while paused, `resume` while running,
/// `stop` after stop) are no-ops rather than errors; UI event streams
/// deliver duplicates routinely.
#[derive(Debug, Clone)]
pub struct AnnotationTimer {
    state: TimerState,
    totals: IndexMap<String, Duration>,
    active_label: Option<String>,
    running_since: Option<Instant>,
}

impl Default for AnnotationTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationTimer {
    /// Create an idle timer with no accrued time.
    pub fn new() -> Self {
        Self {
            state: TimerState::Idle,
            totals: IndexMap::new(),
            active_label: None,
            running_since: None,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> TimerState {
        self.state
    }

    /// The label time is currently accruing against, if any.
    pub fn active_label(&self) -> Option<&str> {
        self.active_label.as_deref()
    }

    /// Start timing against a label. Restarting while already running banks
    /// the accrued time and switches the active label.
    pub fn start(&mut self, label: &str) {
        self.start_at(label, Instant::now());
    }

    /// Pause accrual. No-op unless running.
    pub fn pause(&mut self) {
        self.pause_at(Instant::now());
    }

    /// Resume accrual against the previously active label. No-op unless
    /// paused.
    pub fn resume(&mut self) {
        self.resume_at(Instant::now());
    }

    /// Finalize the session; totals stay readable but stop accruing.
    pub fn stop(&mut self) {
        self.stop_at(Instant::now());
    }

    /// Discard all accrued time and return to idle. Called after a save
    /// hands the case off.
    pub fn reset(&mut self) {
        self.state = TimerState::Idle;
        self.totals.clear();
        self.active_label = None;
        self.running_since = None;
    }

    /// Total accrued time across all labels.
    pub fn total(&self) -> Duration {
        self.total_at(Instant::now())
    }

    /// Accrued time for one label.
    pub fn total_for(&self, label: &str) -> Duration {
        self.total_for_at(label, Instant::now())
    }

    /// Per-label totals in first-started order, including in-flight time.
    pub fn label_totals(&self) -> Vec<(String, Duration)> {
        let now = Instant::now();
        self.totals
            .keys()
            .map(|label| (label.clone(), self.total_for_at(label, now)))
            .collect()
    }

    fn start_at(&mut self, label: &str, now: Instant) {
        if self.state == TimerState::Running {
            self.bank(now);
        }
        self.totals.entry(label.to_string()).or_default();
        self.active_label = Some(label.to_string());
        self.running_since = Some(now);
        self.state = TimerState::Running;
    }

    fn pause_at(&mut self, now: Instant) {
        if self.state != TimerState::Running {
            return;
        }
        self.bank(now);
        self.state = TimerState::Paused;
    }

    fn resume_at(&mut self, now: Instant) {
        if self.state != TimerState::Paused {
            return;
        }
        self.running_since = Some(now);
        self.state = TimerState::Running;
    }

    fn stop_at(&mut self, now: Instant) {
        if self.state == TimerState::Running {
            self.bank(now);
        }
        if self.state != TimerState::Idle {
            self.state = TimerState::Stopped;
        }
    }

    /// Move in-flight time into the active label's bucket.
    fn bank(&mut self, now: Instant) {
        if let (Some(label), Some(since)) = (&self.active_label, self.running_since.take()) {
            let elapsed = now.saturating_duration_since(since);
            *self.totals.entry(label.clone()).or_default() += elapsed;
        }
    }

    fn total_at(&self, now: Instant) -> Duration {
        let banked: Duration = self.totals.values().sum();
        banked + self.in_flight(now)
    }

    fn total_for_at(&self, label: &str, now: Instant) -> Duration {
        let banked = self.totals.get(label).copied().unwrap_or_default();
        if self.active_label.as_deref() == Some(label) {
            banked + self.in_flight(now)
        } else {
            banked
        }
    }

    fn in_flight(&self, now: Instant) -> Duration {
        match (self.state, self.running_since) {
            (TimerState::Running, Some(since)) => now.saturating_duration_since(since),
            _ => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_idle_timer_reports_zero() {
        let timer = AnnotationTimer::new();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.total(), Duration::ZERO);
        assert_eq!(timer.total_for("ICH"), Duration::ZERO);
    }

    #[test]
    fn test_accrues_against_active_label() {
        let t0 = Instant::now();
        let mut timer = AnnotationTimer::new();
        timer.start_at("ICH", t0);

        assert_eq!(timer.total_at(t0 + secs(5)), secs(5));
        assert_eq!(timer.total_for_at("ICH", t0 + secs(5)), secs(5));
        assert_eq!(timer.total_for_at("IVH", t0 + secs(5)), Duration::ZERO);
    }

    #[test]
    fn test_switching_labels_banks_time() {
        let t0 = Instant::now();
        let mut timer = AnnotationTimer::new();
        timer.start_at("ICH", t0);
        timer.start_at("IVH", t0 + secs(10));

        assert_eq!(timer.state(), TimerState::Running);
        assert_eq!(timer.active_label(), Some("IVH"));
        assert_eq!(timer.total_for_at("ICH", t0 + secs(13)), secs(10));
        assert_eq!(timer.total_for_at("IVH", t0 + secs(13)), secs(3));
        assert_eq!(timer.total_at(t0 + secs(13)), secs(13));
    }

    #[test]
    fn test_pause_stops_accrual() {
        let t0 = Instant::now();
        let mut timer = AnnotationTimer::new();
        timer.start_at("ICH", t0);
        timer.pause_at(t0 + secs(4));

        assert_eq!(timer.state(), TimerState::Paused);
        // Time while paused does not count.
        assert_eq!(timer.total_at(t0 + secs(60)), secs(4));

        timer.resume_at(t0 + secs(60));
        assert_eq!(timer.total_at(t0 + secs(62)), secs(6));
    }

    #[test]
    fn test_redundant_transitions_are_noops() {
        let t0 = Instant::now();
        let mut timer = AnnotationTimer::new();

        // Pause, resume and stop before any start do nothing.
        timer.pause_at(t0);
        timer.resume_at(t0);
        timer.stop_at(t0);
        assert_eq!(timer.state(), TimerState::Idle);

        timer.start_at("ICH", t0);
        timer.pause_at(t0 + secs(2));
        timer.pause_at(t0 + secs(9));
        assert_eq!(timer.total_at(t0 + secs(9)), secs(2));

        timer.resume_at(t0 + secs(10));
        timer.resume_at(t0 + secs(20));
        assert_eq!(timer.total_at(t0 + secs(15)), secs(7));
    }

    #[test]
    fn test_stop_freezes_totals() {
        let t0 = Instant::now();
        let mut timer = AnnotationTimer::new();
        timer.start_at("ICH", t0);
        timer.stop_at(t0 + secs(8));

        assert_eq!(timer.state(), TimerState::Stopped);
        assert_eq!(timer.total_at(t0 + secs(100)), secs(8));

        // Stopped is terminal until reset.
        timer.stop_at(t0 + secs(100));
        assert_eq!(timer.total_at(t0 + secs(200)), secs(8));
    }

    #[test]
    fn test_reset_clears_everything() {
        let t0 = Instant::now();
        let mut timer = AnnotationTimer::new();
        timer.start_at("ICH", t0);
        timer.stop_at(t0 + secs(8));
        timer.reset();

        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.total(), Duration::ZERO);
        assert!(timer.label_totals().is_empty());
    }

    #[test]
    fn test_label_totals_in_first_started_order() {
        let t0 = Instant::now();
        let mut timer = AnnotationTimer::new();
        timer.start_at("IVH", t0);
        timer.start_at("ICH", t0 + secs(1));
        timer.start_at("IVH", t0 + secs(3));
        timer.pause_at(t0 + secs(6));

        let totals = timer.label_totals();
        assert_eq!(totals[0].0, "IVH");
        assert_eq!(totals[0].1, secs(4));
        assert_eq!(totals[1].0, "ICH");
        assert_eq!(totals[1].1, secs(2));
    }
}
