// Copyright (c) 2026 rezky_nightky

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::config::{Configuration, ParticleKind};
use crate::image_slot::ImageSlot;
use crate::particle::{DrawCtx, IMAGE_PLACEHOLDER};
use crate::population::Population;
use crate::surface::{Surface, Viewport};
use crate::texture::{TextureCache, TextureKey};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
}

#[derive(Debug)]
pub struct Engine {
    config: Configuration,
    viewport: Viewport,
    state: LoopState,
    population: Population,
    textures: TextureCache,
    image: ImageSlot,
    rng: StdRng,
    rebuild: bool,
    ticks: u64,
}

impl Engine {
    pub fn new(config: Configuration, viewport: Viewport) -> Self {
        Self::with_seed(config, viewport, rand::random())
    }

    pub fn with_seed(config: Configuration, viewport: Viewport, seed: u64) -> Self {
        let mut engine = Self {
            config: Configuration::default(),
            viewport,
            state: LoopState::Idle,
            population: Population::new(),
            textures: TextureCache::new(),
            image: ImageSlot::new(),
            rng: StdRng::seed_from_u64(seed),
            rebuild: true,
            ticks: 0,
        };
        engine.apply_config(config);
        engine
    }

    /// A type change rebuilds the population on the next tick; other fields
    /// reach particles as they respawn.
    pub fn apply_config(&mut self, config: Configuration) {
        let config = config.sanitized();
        if config.kind != self.config.kind {
            log::debug!("type {} -> {}", self.config.kind, config.kind);
            self.rebuild = true;
        }
        if config.enabled != self.config.enabled {
            log::debug!("enabled -> {}", config.enabled);
        }
        self.config = config;
        self.sync_textures();
        let path = match self.config.kind {
            ParticleKind::Image => self.config.image_path(),
            _ => None,
        };
        self.image.request(path);
    }

    pub fn resize(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            log::debug!("viewport {}x{}", viewport.width, viewport.height);
            self.viewport = viewport;
            self.rebuild = true;
        }
    }

    fn sync_textures(&mut self) {
        self.textures.sync(TextureKey {
            kind: self.config.kind,
            color: self.config.rgb(),
        });
    }

    pub fn step(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        self.image.poll();

        if !self.config.enabled {
            if self.state == LoopState::Running {
                log::debug!("running -> idle");
                self.state = LoopState::Idle;
            }
            self.population.release();
            return;
        }

        if self.state == LoopState::Idle || self.rebuild {
            if self.state == LoopState::Idle {
                log::debug!("idle -> running with {} particles", self.config.count);
            }
            self.population
                .materialize(&self.config, self.viewport, &mut self.rng);
            self.state = LoopState::Running;
            self.rebuild = false;
        } else {
            self.population.reconcile(
                self.config.count as usize,
                &self.config,
                self.viewport,
                false,
                &mut self.rng,
            );
        }

        self.population
            .step(&self.config, self.viewport, &mut self.rng);
    }

    pub fn draw(&mut self, surface: &mut Surface) {
        self.sync_textures();
        if self.state == LoopState::Idle {
            return;
        }
        let glyph = match self.config.kind {
            ParticleKind::Image => IMAGE_PLACEHOLDER,
            _ => self.config.glyph(),
        };
        let ctx = DrawCtx {
            color: self.config.rgb(),
            opacity: self.config.opacity,
            glyph,
            sprite: self.textures.sprite(),
            image: self.image.sprite().filter(|_| self.image.is_loaded()),
        };
        self.population.draw(&ctx, surface);
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn population(&self) -> &Population {
        &self.population
    }

    pub fn textures(&self) -> &TextureCache {
        &self.textures
    }

    pub fn image(&self) -> &ImageSlot {
        &self.image
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}
