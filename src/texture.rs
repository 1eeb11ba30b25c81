// Copyright (c) 2026 rezky_nightky

use image::imageops;
use image::{ImageBuffer, Luma, Rgba, Rgba32FImage};

use crate::config::ParticleKind;
use crate::palette::Rgb;
use crate::surface::Sprite;

pub const SPRITE_SIZE: usize = 60;

// share of the half-extent taken by the sharp shape; the rest is glow
pub const SHAPE_FILL: f32 = 0.66;

const SUPERSAMPLE: usize = 4;
// Matches two passes of a radius-5 box blur.
const GLOW_SIGMA: f32 = 4.5;
const GLOW_STRENGTH: f32 = 0.6;
const VEIN_SHADE: f32 = 0.55;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureKey {
    pub kind: ParticleKind,
    pub color: Rgb,
}

type Mask = ImageBuffer<Luma<f32>, Vec<f32>>;

type ShapeFn = fn(f32, f32) -> Option<f32>;

fn circle(x: f32, y: f32) -> Option<f32> {
    (x * x + y * y <= 1.0).then_some(1.0)
}

fn point_in_polygon(x: f32, y: f32, pts: &[(f32, f32)]) -> bool {
    let mut inside = false;
    let mut j = pts.len() - 1;
    for i in 0..pts.len() {
        let (xi, yi) = pts[i];
        let (xj, yj) = pts[j];
        if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
            inside = !inside;
        }
        j = i;
    }
    inside
}

fn star(x: f32, y: f32) -> Option<f32> {
    const INNER: f32 = 0.38;
    let mut pts = [(0.0f32, 0.0f32); 8];
    for (i, p) in pts.iter_mut().enumerate() {
        let r = if i % 2 == 0 { 1.0 } else { INNER };
        let a = std::f32::consts::FRAC_PI_4 * i as f32 - std::f32::consts::FRAC_PI_2;
        *p = (a.cos() * r, a.sin() * r);
    }
    point_in_polygon(x, y, &pts).then_some(1.0)
}

fn leaf(x: f32, y: f32) -> Option<f32> {
    let e = (x / 0.5).powi(2) + y * y;
    if e > 1.0 {
        return None;
    }
    let on_vein = x.abs() < 0.05 && y.abs() < 0.9;
    Some(if on_vein { VEIN_SHADE } else { 1.0 })
}

// Two petals bounded by mirrored quadratic beziers, control point (±0.9, ±0.5):
// half-width is 2t(1-t)*0.9 at |y| = t.
fn flower(x: f32, y: f32) -> Option<f32> {
    let t = y.abs();
    if t > 1.0 {
        return None;
    }
    let half_width = 2.0 * t * (1.0 - t) * 0.9;
    (x.abs() <= half_width).then_some(1.0)
}

fn shape_for(kind: ParticleKind) -> Option<ShapeFn> {
    match kind {
        ParticleKind::Snow => Some(circle),
        ParticleKind::Star => Some(star),
        ParticleKind::Leaf => Some(leaf),
        ParticleKind::Flower => Some(flower),
        _ => None,
    }
}

pub fn uses_sprite(kind: ParticleKind) -> bool {
    shape_for(kind).is_some()
}

fn rasterize(shape: ShapeFn) -> (Mask, Mask) {
    let n = SPRITE_SIZE as u32;
    let step = 1.0 / SUPERSAMPLE as f32;
    let samples = (SUPERSAMPLE * SUPERSAMPLE) as f32;
    let half = SPRITE_SIZE as f32 * 0.5;
    let radius = half * SHAPE_FILL;

    let mut coverage = Mask::new(n, n);
    let mut shade = Mask::new(n, n);
    for (px, py, cov) in coverage.enumerate_pixels_mut() {
        let mut hits = 0.0;
        let mut tone = 0.0;
        for sy in 0..SUPERSAMPLE {
            for sx in 0..SUPERSAMPLE {
                let x = (px as f32 + (sx as f32 + 0.5) * step - half) / radius;
                let y = (py as f32 + (sy as f32 + 0.5) * step - half) / radius;
                if let Some(s) = shape(x, y) {
                    hits += 1.0;
                    tone += s;
                }
            }
        }
        *cov = Luma([hits / samples]);
        if hits > 0.0 {
            shade.put_pixel(px, py, Luma([tone / hits]));
        }
    }
    (coverage, shade)
}

pub fn render_sprite(key: TextureKey) -> Option<Sprite> {
    let shape = shape_for(key.kind)?;
    let (coverage, shade) = rasterize(shape);
    let glow = imageops::fast_blur(&coverage, GLOW_SIGMA);
    let [r, g, b] = key.color.to_unit();

    let n = SPRITE_SIZE as u32;
    let sprite = Rgba32FImage::from_fn(n, n, |x, y| {
        let Luma([cov]) = *coverage.get_pixel(x, y);
        let Luma([tone]) = *shade.get_pixel(x, y);
        let halo = glow.get_pixel(x, y)[0].clamp(0.0, 1.0) * GLOW_STRENGTH;
        // sharp shape over its own halo, both in the particle color
        let a = cov + halo * (1.0 - cov);
        let lit = cov * tone + halo * (1.0 - cov);
        Rgba([r * lit, g * lit, b * lit, a])
    });
    Some(Sprite::new(sprite))
}

#[derive(Debug, Default)]
pub struct TextureCache {
    key: Option<TextureKey>,
    sprite: Option<Sprite>,
    generation: u64,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when the sprite was regenerated.
    pub fn sync(&mut self, key: TextureKey) -> bool {
        if self.key == Some(key) {
            return false;
        }
        self.sprite = render_sprite(key);
        self.key = Some(key);
        self.generation = self.generation.wrapping_add(1);
        log::debug!(
            "texture cache regenerated for {} {} (gen {})",
            key.kind,
            key.color.to_hex(),
            self.generation
        );
        true
    }

    pub fn sprite(&self) -> Option<&Sprite> {
        self.sprite.as_ref()
    }

    pub fn key(&self) -> Option<TextureKey> {
        self.key
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}
