// Copyright (c) 2026 rezky_nightky

use rand::Rng;

use crate::config::Configuration;
use crate::particle::{Boundary, DrawCtx, Particle};
use crate::splash::{spawn_burst, Splash};
use crate::surface::{Surface, Viewport};

#[derive(Debug, Default)]
pub struct Population {
    particles: Vec<Particle>,
    splashes: Vec<Splash>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn splashes(&self) -> &[Splash] {
        &self.splashes
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn is_cleared(&self) -> bool {
        self.particles.is_empty() && self.splashes.is_empty()
    }

    /// Appends or truncates the tail only; survivors are untouched.
    pub fn reconcile<R: Rng + ?Sized>(
        &mut self,
        target: usize,
        config: &Configuration,
        viewport: Viewport,
        initial: bool,
        rng: &mut R,
    ) -> isize {
        let len = self.particles.len();
        if len < target {
            self.particles.reserve(target - len);
            for _ in len..target {
                self.particles
                    .push(Particle::spawn(config, viewport, initial, rng));
            }
        } else if len > target {
            self.particles.truncate(target);
        }
        target as isize - len as isize
    }

    pub fn materialize<R: Rng + ?Sized>(
        &mut self,
        config: &Configuration,
        viewport: Viewport,
        rng: &mut R,
    ) {
        self.particles.clear();
        self.splashes.clear();
        self.reconcile(config.count as usize, config, viewport, true, rng);
    }

    pub fn release(&mut self) {
        if self.particles.capacity() > 0 || self.splashes.capacity() > 0 {
            self.particles = Vec::new();
            self.splashes = Vec::new();
        }
    }

    pub fn step<R: Rng + ?Sized>(
        &mut self,
        config: &Configuration,
        viewport: Viewport,
        rng: &mut R,
    ) {
        if config.kind.is_rain_variant() {
            for s in &mut self.splashes {
                s.update();
            }
            self.splashes.retain(Splash::is_alive);
        } else {
            self.splashes.clear();
        }

        let splashes = config.kind.is_rain();
        for p in &mut self.particles {
            match p.update(config, viewport, rng) {
                Boundary::Inside => {}
                Boundary::Bottom => {
                    if splashes {
                        spawn_burst(
                            p.x,
                            viewport.height,
                            p.size,
                            config.wind,
                            p.alpha,
                            rng,
                            &mut self.splashes,
                        );
                    }
                    p.reset(config, viewport, false, rng);
                }
                Boundary::Side => {
                    p.reset(config, viewport, false, rng);
                    p.scatter_x(viewport, config.wind, rng);
                }
            }
        }
    }

    pub fn draw(&self, ctx: &DrawCtx<'_>, surface: &mut Surface) {
        for p in &self.particles {
            p.draw(ctx, surface);
        }
        for s in &self.splashes {
            s.draw(ctx.color, ctx.opacity, surface);
        }
    }
}
