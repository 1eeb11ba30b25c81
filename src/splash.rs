// Copyright (c) 2026 rezky_nightky

use std::ops::RangeInclusive;

use rand::Rng;

use crate::palette::Rgb;
use crate::surface::Surface;

pub const SPLASH_CHANCE: f32 = 0.5;
pub const SPLASH_COUNT: RangeInclusive<u32> = 3..=6;
pub const SPLASH_GRAVITY: f32 = 0.2;
pub const SPLASH_FADE: f32 = 0.04;

#[derive(Clone, Debug, PartialEq)]
pub struct Splash {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub vx: f32,
    pub vy: f32,
    pub gravity: f32,
    pub opacity: f32,
}

impl Splash {
    pub fn new<R: Rng + ?Sized>(
        x: f32,
        y: f32,
        parent_size: f32,
        wind: f32,
        opacity: f32,
        rng: &mut R,
    ) -> Self {
        Self {
            x,
            y,
            size: (parent_size * 0.5).max(1.0) * rng.random_range(0.5..1.0),
            vx: rng.random_range(-2.0..2.0) + wind * 0.3,
            vy: -rng.random_range(1.0..3.0),
            gravity: SPLASH_GRAVITY,
            opacity,
        }
    }

    pub fn update(&mut self) {
        self.vy += self.gravity;
        self.x += self.vx;
        self.y += self.vy;
        self.opacity -= SPLASH_FADE;
    }

    pub fn is_alive(&self) -> bool {
        self.opacity > 0.0
    }

    pub fn draw(&self, color: Rgb, global_opacity: f32, surface: &mut Surface) {
        if !self.is_alive() {
            return;
        }
        surface.fill_circle(self.x, self.y, self.size, color, self.opacity * global_opacity);
    }
}

pub fn spawn_burst<R: Rng + ?Sized>(
    x: f32,
    y: f32,
    parent_size: f32,
    wind: f32,
    opacity: f32,
    rng: &mut R,
    out: &mut Vec<Splash>,
) -> usize {
    if rng.random::<f32>() >= SPLASH_CHANCE {
        return 0;
    }
    let n = rng.random_range(SPLASH_COUNT) as usize;
    out.extend((0..n).map(|_| Splash::new(x, y, parent_size, wind, opacity, rng)));
    n
}
