// Copyright (c) 2026 rezky_nightky

use image::imageops::{self, FilterType};
use image::{GenericImageView, Rgba, Rgba32FImage};

use crate::palette::Rgb;

// Premultiplied RGBA in 0.0..=1.0.
pub type Texel = [f32; 4];

const EMPTY: Texel = [0.0; 4];

#[inline]
fn over(dst: &mut Texel, src: Texel, k: f32) {
    let inv = 1.0 - src[3] * k;
    dst[0] = src[0] * k + dst[0] * inv;
    dst[1] = src[1] * k + dst[1] * inv;
    dst[2] = src[2] * k + dst[2] * inv;
    dst[3] = src[3] * k + dst[3] * inv;
}

fn sample(level: &Rgba32FImage, u: f32, v: f32) -> Texel {
    let fx = u - 0.5;
    let fy = v - 0.5;
    let x0 = fx.floor();
    let y0 = fy.floor();
    let tx = fx - x0;
    let ty = fy - y0;
    let (w, h) = (level.width() as i64, level.height() as i64);
    let fetch = |x: i64, y: i64| {
        if x < 0 || y < 0 || x >= w || y >= h {
            EMPTY
        } else {
            level.get_pixel(x as u32, y as u32).0
        }
    };
    let (x0, y0) = (x0 as i64, y0 as i64);
    let a = fetch(x0, y0);
    let b = fetch(x0 + 1, y0);
    let c = fetch(x0, y0 + 1);
    let d = fetch(x0 + 1, y0 + 1);
    let mut out = EMPTY;
    for i in 0..4 {
        let top = a[i] + (b[i] - a[i]) * tx;
        let bottom = c[i] + (d[i] - c[i]) * tx;
        out[i] = top + (bottom - top) * ty;
    }
    out
}

/// A square premultiplied image with a mip chain, blitted scaled and rotated.
#[derive(Clone, Debug, PartialEq)]
pub struct Sprite {
    levels: Vec<Rgba32FImage>,
}

impl Sprite {
    pub fn new(base: Rgba32FImage) -> Self {
        debug_assert_eq!(base.width(), base.height());
        let mut levels = vec![base];
        while let Some(prev) = levels.last() {
            let size = prev.width() / 2;
            if size < 2 {
                break;
            }
            let next = imageops::resize(prev, size, size, FilterType::Triangle);
            levels.push(next);
        }
        Self { levels }
    }

    pub fn size(&self) -> usize {
        self.levels[0].width() as usize
    }

    pub fn base(&self) -> &Rgba32FImage {
        &self.levels[0]
    }

    // smallest level still at least as large as the on-screen extent
    fn level_for(&self, extent: f32) -> &Rgba32FImage {
        self.levels
            .iter()
            .rev()
            .find(|l| l.width() as f32 >= extent)
            .unwrap_or(&self.levels[0])
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn pixel_dims(self) -> (usize, usize) {
        (self.width.ceil() as usize, self.height.ceil() as usize)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    pub x: f32,
    pub y: f32,
    pub ch: char,
    pub color: Rgb,
    pub alpha: f32,
}

// Glyph particles are not rasterized; the presenter places them into cells.
#[derive(Clone, Debug)]
pub struct Surface {
    pixels: Rgba32FImage,
    glyphs: Vec<Glyph>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            pixels: Rgba32FImage::new(width as u32, height as u32),
            glyphs: Vec::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.pixels.width() as usize
    }

    pub fn height(&self) -> usize {
        self.pixels.height() as usize
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        self.pixels = Rgba32FImage::new(width as u32, height as u32);
        self.glyphs.clear();
    }

    pub fn clear(&mut self) {
        self.pixels.fill(0.0);
        self.glyphs.clear();
    }

    pub fn texel(&self, x: usize, y: usize) -> Texel {
        self.pixels
            .get_pixel_checked(x as u32, y as u32)
            .map_or(EMPTY, |p| p.0)
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn is_blank(&self) -> bool {
        self.glyphs.is_empty() && self.pixels.pixels().all(|p| p[3] <= 0.0)
    }

    pub fn average(&self, x0: usize, y0: usize, w: usize, h: usize) -> Texel {
        let view = imageops::crop_imm(&self.pixels, x0 as u32, y0 as u32, w as u32, h as u32);
        let (vw, vh) = view.dimensions();
        if vw == 0 || vh == 0 {
            return EMPTY;
        }
        let mut acc = EMPTY;
        for (_, _, Rgba(t)) in view.pixels() {
            for i in 0..4 {
                acc[i] += t[i];
            }
        }
        let n = (vw * vh) as f32;
        acc.map(|v| v / n)
    }

    #[inline]
    fn blend(&mut self, x: i64, y: i64, src: Texel, k: f32) {
        if k <= 0.0 {
            return;
        }
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if let Some(p) = self.pixels.get_pixel_mut_checked(x, y) {
            over(&mut p.0, src, k.min(1.0));
        }
    }

    fn solid(color: Rgb, alpha: f32) -> Texel {
        let [r, g, b] = color.to_unit();
        let a = alpha.clamp(0.0, 1.0);
        [r * a, g * a, b * a, a]
    }

    fn span(&self, lo: f32, hi: f32, limit: usize) -> (i64, i64) {
        let lo = (lo.floor() as i64).max(0);
        let hi = (hi.ceil() as i64).min(limit as i64 - 1);
        (lo, hi)
    }

    pub fn fill_circle(&mut self, cx: f32, cy: f32, r: f32, color: Rgb, alpha: f32) {
        if r <= 0.0 || alpha <= 0.0 {
            return;
        }
        let r_eff = r.max(0.5);
        let alpha = alpha * (r / r_eff).powi(2);
        let src = Self::solid(color, alpha);
        let (x0, x1) = self.span(cx - r_eff - 1.0, cx + r_eff + 1.0, self.width());
        let (y0, y1) = self.span(cy - r_eff - 1.0, cy + r_eff + 1.0, self.height());
        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                let d = (dx * dx + dy * dy).sqrt();
                let cov = (r_eff - d + 0.5).clamp(0.0, 1.0);
                self.blend(x, y, src, cov);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn stroke_line(
        &mut self,
        x0: f32,
        y0: f32,
        x1: f32,
        y1: f32,
        width: f32,
        color: Rgb,
        alpha: f32,
    ) {
        if width <= 0.0 || alpha <= 0.0 {
            return;
        }
        let hw = (width * 0.5).max(0.5);
        let alpha = alpha * (width / (hw * 2.0)).min(1.0);
        let src = Self::solid(color, alpha);

        let (bx0, bx1) = self.span(x0.min(x1) - hw - 1.0, x0.max(x1) + hw + 1.0, self.width());
        let (by0, by1) = self.span(y0.min(y1) - hw - 1.0, y0.max(y1) + hw + 1.0, self.height());
        let (sx, sy) = (x1 - x0, y1 - y0);
        let len2 = sx * sx + sy * sy;

        for y in by0..=by1 {
            for x in bx0..=bx1 {
                let px = x as f32 + 0.5 - x0;
                let py = y as f32 + 0.5 - y0;
                let t = if len2 > 0.0 {
                    ((px * sx + py * sy) / len2).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let dx = px - sx * t;
                let dy = py - sy * t;
                let d = (dx * dx + dy * dy).sqrt();
                let cov = (hw - d + 0.5).clamp(0.0, 1.0);
                self.blend(x, y, src, cov);
            }
        }
    }

    /// Draws `sprite` centred on `(cx, cy)`, scaled to `extent` pixels square
    /// and rotated by `angle` radians.
    pub fn blit(&mut self, sprite: &Sprite, cx: f32, cy: f32, extent: f32, angle: f32, alpha: f32) {
        if extent <= 0.0 || alpha <= 0.0 {
            return;
        }
        let level = sprite.level_for(extent);
        let scale = level.width() as f32 / extent;
        let (sin, cos) = angle.sin_cos();
        let reach = extent * std::f32::consts::FRAC_1_SQRT_2 + 1.0;
        let (x0, x1) = self.span(cx - reach, cx + reach, self.width());
        let (y0, y1) = self.span(cy - reach, cy + reach, self.height());
        let n = level.width() as f32;
        let half = n * 0.5;

        for y in y0..=y1 {
            for x in x0..=x1 {
                let dx = x as f32 + 0.5 - cx;
                let dy = y as f32 + 0.5 - cy;
                // inverse rotation into sprite space
                let lx = dx * cos + dy * sin;
                let ly = -dx * sin + dy * cos;
                let u = lx * scale + half;
                let v = ly * scale + half;
                if u < -1.0 || v < -1.0 || u > n + 1.0 || v > n + 1.0 {
                    continue;
                }
                let t = sample(level, u, v);
                if t[3] > 0.0 {
                    self.blend(x, y, t, alpha);
                }
            }
        }
    }

    pub fn put_glyph(&mut self, x: f32, y: f32, ch: char, color: Rgb, alpha: f32) {
        if alpha <= 0.0 || x < 0.0 || y < 0.0 || x >= self.width() as f32 || y >= self.height() as f32
        {
            return;
        }
        self.glyphs.push(Glyph {
            x,
            y,
            ch,
            color,
            alpha: alpha.min(1.0),
        });
    }
}
