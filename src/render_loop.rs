// Copyright (c) 2026 rezky_nightky

use std::io;
use std::time::{Duration, Instant};

use crate::config::Configuration;
use crate::engine::Engine;
use crate::scheduler::Scheduler;
use crate::surface::{Surface, Viewport};

pub trait Present {
    fn present(&mut self, surface: &Surface) -> io::Result<()>;
}

pub struct RenderLoop<S, P> {
    engine: Engine,
    surface: Surface,
    presenter: P,
    scheduler: S,
    frames: u64,
}

impl<S: Scheduler, P: Present> RenderLoop<S, P> {
    pub fn new(engine: Engine, presenter: P, scheduler: S) -> Self {
        let (w, h) = engine.viewport().pixel_dims();
        Self {
            engine,
            surface: Surface::new(w, h),
            presenter,
            scheduler,
            frames: 0,
        }
    }

    pub fn start(&mut self, now: Instant) {
        self.scheduler.start(now);
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        self.scheduler.until_next(now)
    }

    // idle frames are presented too so the screen empties on disable
    pub fn tick(&mut self, now: Instant) -> io::Result<()> {
        self.surface.clear();
        self.engine.step();
        self.engine.draw(&mut self.surface);
        let presented = self.presenter.present(&self.surface);
        self.frames = self.frames.wrapping_add(1);
        self.scheduler.rearm(now);
        presented
    }

    pub fn pump(&mut self, now: Instant) -> io::Result<bool> {
        match self.scheduler.until_next(now) {
            Some(wait) if wait.is_zero() => {
                self.tick(now)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn resize(&mut self, viewport: Viewport) {
        let (w, h) = viewport.pixel_dims();
        self.surface.resize(w, h);
        self.engine.resize(viewport);
    }

    pub fn apply_config(&mut self, config: Configuration) {
        self.engine.apply_config(config);
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParticleKind;
    use crate::engine::LoopState;
    use crate::scheduler::{FramePacer, ManualScheduler};

    #[derive(Debug, Default)]
    struct Recorder {
        blank: Vec<bool>,
        sizes: Vec<(usize, usize)>,
    }

    impl Present for Recorder {
        fn present(&mut self, surface: &Surface) -> io::Result<()> {
            self.blank.push(surface.is_blank());
            self.sizes.push((surface.width(), surface.height()));
            Ok(())
        }
    }

    fn running_loop(config: Configuration) -> RenderLoop<ManualScheduler, Recorder> {
        let engine = Engine::with_seed(config, Viewport::new(160.0, 96.0), 42);
        let mut rl = RenderLoop::new(engine, Recorder::default(), ManualScheduler::new());
        rl.start(Instant::now());
        rl
    }

    #[test]
    fn stopped_loop_does_not_tick() {
        let engine = Engine::with_seed(Configuration::default(), Viewport::new(8.0, 8.0), 1);
        let mut rl = RenderLoop::new(engine, Recorder::default(), ManualScheduler::new());
        assert!(!rl.pump(Instant::now()).unwrap());
        assert_eq!(rl.frames(), 0);
    }

    #[test]
    fn keeps_ticking_while_idle() {
        let mut rl = running_loop(Configuration::default());
        for _ in 0..10 {
            assert!(rl.pump(Instant::now()).unwrap());
        }
        assert_eq!(rl.frames(), 10);
        assert_eq!(rl.scheduler().armed(), 10);
        assert!(rl.presenter().blank.iter().all(|b| *b));
    }

    #[test]
    fn enable_then_disable_round_trip() {
        let mut rl = running_loop(Configuration::default());
        rl.pump(Instant::now()).unwrap();

        let on = Configuration {
            enabled: true,
            kind: ParticleKind::Snow,
            count: 120,
            ..Configuration::default()
        };
        rl.apply_config(on.clone());
        rl.pump(Instant::now()).unwrap();
        assert_eq!(rl.engine().state(), LoopState::Running);
        assert_eq!(rl.presenter().blank.last(), Some(&false));

        rl.apply_config(Configuration {
            enabled: false,
            ..on
        });
        rl.pump(Instant::now()).unwrap();
        assert_eq!(rl.engine().state(), LoopState::Idle);
        assert!(rl.engine().population().is_cleared());
        assert_eq!(rl.presenter().blank.last(), Some(&true));
    }

    #[test]
    fn resize_reaches_surface_and_engine() {
        let mut rl = running_loop(Configuration {
            enabled: true,
            ..Configuration::default()
        });
        rl.resize(Viewport::new(40.0, 20.0));
        rl.pump(Instant::now()).unwrap();
        assert_eq!(rl.presenter().sizes.last(), Some(&(40, 20)));
        assert_eq!(rl.engine().viewport(), Viewport::new(40.0, 20.0));
    }

    #[test]
    fn pacer_gates_ticks() {
        let engine = Engine::with_seed(Configuration::default(), Viewport::new(8.0, 8.0), 1);
        let mut rl = RenderLoop::new(
            engine,
            Recorder::default(),
            FramePacer::new(Duration::from_millis(50)),
        );
        let t0 = Instant::now();
        rl.start(t0);
        assert!(rl.pump(t0).unwrap());
        assert!(!rl.pump(t0 + Duration::from_millis(10)).unwrap());
        assert!(rl.pump(t0 + Duration::from_millis(50)).unwrap());
        assert_eq!(rl.frames(), 2);
    }
}
