// Copyright (c) 2026 rezky_nightky

use std::time::{Duration, Instant};

pub trait Scheduler {
    fn start(&mut self, now: Instant);
    fn stop(&mut self);
    fn is_running(&self) -> bool;
    /// Time left before the next tick is due. `None` while stopped, zero when
    /// the tick is already due.
    fn until_next(&self, now: Instant) -> Option<Duration>;
    fn rearm(&mut self, now: Instant);
}

#[derive(Clone, Debug)]
pub struct FramePacer {
    period: Duration,
    next: Option<Instant>,
}

impl FramePacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_micros(1)),
            next: None,
        }
    }

    pub fn from_fps(fps: f64) -> Self {
        let fps = if fps.is_finite() && fps > 0.0 { fps } else { 60.0 };
        Self::new(Duration::from_secs_f64(1.0 / fps))
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Scheduler for FramePacer {
    fn start(&mut self, now: Instant) {
        if self.next.is_none() {
            self.next = Some(now);
        }
    }

    fn stop(&mut self) {
        self.next = None;
    }

    fn is_running(&self) -> bool {
        self.next.is_some()
    }

    fn until_next(&self, now: Instant) -> Option<Duration> {
        self.next.map(|next| next.saturating_duration_since(now))
    }

    fn rearm(&mut self, now: Instant) {
        let Some(next) = self.next.as_mut() else {
            return;
        };
        *next += self.period;
        if now > *next {
            *next = now;
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ManualScheduler {
    running: bool,
    armed: u64,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self) -> u64 {
        self.armed
    }
}

impl Scheduler for ManualScheduler {
    fn start(&mut self, _now: Instant) {
        self.running = true;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn until_next(&self, _now: Instant) -> Option<Duration> {
        self.running.then_some(Duration::ZERO)
    }

    fn rearm(&mut self, _now: Instant) {
        if self.running {
            self.armed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pacer_is_idle_until_started() {
        let p = FramePacer::from_fps(60.0);
        assert!(!p.is_running());
        assert_eq!(p.until_next(Instant::now()), None);
    }

    #[test]
    fn pacer_advances_by_one_period() {
        let t0 = Instant::now();
        let mut p = FramePacer::new(Duration::from_millis(10));
        p.start(t0);
        assert_eq!(p.until_next(t0), Some(Duration::ZERO));
        p.rearm(t0);
        assert_eq!(p.until_next(t0), Some(Duration::from_millis(10)));
        assert_eq!(
            p.until_next(t0 + Duration::from_millis(4)),
            Some(Duration::from_millis(6))
        );
    }

    #[test]
    fn late_ticks_do_not_burst() {
        let t0 = Instant::now();
        let mut p = FramePacer::new(Duration::from_millis(10));
        p.start(t0);
        let late = t0 + Duration::from_millis(100);
        p.rearm(late);
        assert_eq!(p.until_next(late), Some(Duration::ZERO));
        p.rearm(late);
        assert_eq!(p.until_next(late), Some(Duration::from_millis(10)));
    }

    #[test]
    fn bad_fps_falls_back() {
        assert_eq!(
            FramePacer::from_fps(0.0).period(),
            Duration::from_secs_f64(1.0 / 60.0)
        );
        assert_eq!(
            FramePacer::from_fps(f64::NAN).period(),
            Duration::from_secs_f64(1.0 / 60.0)
        );
    }

    #[test]
    fn manual_is_due_while_running() {
        let now = Instant::now();
        let mut m = ManualScheduler::new();
        assert_eq!(m.until_next(now), None);
        m.start(now);
        assert_eq!(m.until_next(now), Some(Duration::ZERO));
        m.rearm(now);
        m.rearm(now);
        assert_eq!(m.armed(), 2);
        m.stop();
        m.rearm(now);
        assert_eq!(m.armed(), 2);
        assert!(!m.is_running());
    }
}
