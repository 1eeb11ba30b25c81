// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::cell::{glyph_width, Cell, LOWER_HALF, UPPER_HALF, WIDE_TAIL};
use crate::palette::{quantize, Rgb};
use crate::runtime::{Backdrop, ColorMode};
use crate::surface::{Surface, Texel, Viewport};

const VISIBLE: f32 = 0.04;
const SHADES: [char; 5] = [' ', '░', '▒', '▓', '█'];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Layout {
    pub cell_w: u16,
    pub cell_h: u16,
    pub backdrop: Backdrop,
    pub mode: ColorMode,
}

impl Layout {
    pub fn backdrop_bg(&self) -> Option<Color> {
        match self.backdrop {
            Backdrop::Black => quantize(Rgb::BLACK, self.mode),
            Backdrop::DefaultBackground | Backdrop::Transparent => None,
        }
    }

    pub fn viewport_for(&self, cols: u16, rows: u16) -> Viewport {
        Viewport::new(
            cols as f32 * self.cell_w.max(1) as f32,
            rows as f32 * self.cell_h.max(1) as f32,
        )
    }

    pub fn cells_for(&self, width: usize, height: usize) -> (u16, u16) {
        let cw = self.cell_w.max(1) as usize;
        let ch = self.cell_h.max(1) as usize;
        (
            width.div_ceil(cw).min(u16::MAX as usize) as u16,
            height.div_ceil(ch).min(u16::MAX as usize) as u16,
        )
    }

    /// Resolved color of a premultiplied texel. Over black the coverage
    /// darkens the color; over an unknown background it can only dim it.
    fn flatten(&self, t: Texel) -> Rgb {
        match self.backdrop {
            Backdrop::Black => Rgb::from_unit([t[0], t[1], t[2]]),
            Backdrop::DefaultBackground | Backdrop::Transparent => {
                let a = t[3].max(f32::EPSILON);
                let k = (0.4 + 0.6 * t[3].min(1.0)) / a;
                Rgb::from_unit([t[0] * k, t[1] * k, t[2] * k])
            }
        }
    }

    fn dim(&self, color: Rgb, alpha: f32) -> Rgb {
        let [r, g, b] = color.to_unit();
        let k = match self.backdrop {
            Backdrop::Black => alpha,
            Backdrop::DefaultBackground | Backdrop::Transparent => 0.4 + 0.6 * alpha,
        };
        Rgb::from_unit([r * k, g * k, b * k])
    }
}

#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
    blank: Cell,
    dirty_all: bool,
    dirty_map: Vec<bool>,
    dirty: Vec<usize>,
}

impl Frame {
    pub fn new(width: u16, height: u16, bg: Option<Color>) -> Self {
        let len = width as usize * height as usize;
        let blank = Cell::blank_with_bg(bg);
        Self {
            width,
            height,
            cells: vec![blank; len],
            blank,
            dirty_all: true,
            dirty_map: vec![false; len],
            dirty: Vec::new(),
        }
    }

    pub fn blank(&self) -> Cell {
        self.blank
    }

    pub fn is_dirty_all(&self) -> bool {
        self.dirty_all
    }

    pub fn dirty_indices(&self) -> &[usize] {
        &self.dirty
    }

    pub fn mark_all_dirty(&mut self) {
        self.dirty_all = true;
        self.dirty.clear();
    }

    pub fn clear_dirty(&mut self) {
        if self.dirty_all {
            self.dirty_all = false;
            self.dirty_map.fill(false);
            self.dirty.clear();
            return;
        }

        for &i in &self.dirty {
            if let Some(v) = self.dirty_map.get_mut(i) {
                *v = false;
            }
        }
        self.dirty.clear();
    }

    pub fn index(&self, x: u16, y: u16) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y as usize * self.width as usize + x as usize)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        self.index(x, y).map(|i| &self.cells[i])
    }

    pub fn cell_at_index(&self, i: usize) -> Cell {
        self.cells.get(i).copied().unwrap_or(self.blank)
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        let Some(i) = self.index(x, y) else {
            return;
        };
        if self.cells[i] == cell {
            return;
        }
        self.cells[i] = cell;
        if !self.dirty_all && !self.dirty_map[i] {
            self.dirty_map[i] = true;
            self.dirty.push(i);
        }
    }

    pub fn compose(&mut self, surface: &Surface, layout: &Layout) {
        let cw = layout.cell_w.max(1) as usize;
        let ch = layout.cell_h.max(1) as usize;
        let top_h = ch.div_ceil(2);
        let bg = layout.backdrop_bg();
        self.blank = Cell::blank_with_bg(bg);

        for cy in 0..self.height {
            for cx in 0..self.width {
                let x0 = cx as usize * cw;
                let y0 = cy as usize * ch;
                let top = surface.average(x0, y0, cw, top_h);
                let bottom = surface.average(x0, y0 + top_h, cw, ch - top_h);
                let cell = half_block(top, bottom, bg, layout);
                self.set(cx, cy, cell);
            }
        }

        for g in surface.glyphs() {
            let cx = (g.x / cw as f32) as u16;
            let cy = (g.y / ch as f32) as u16;
            let fg = match layout.mode {
                ColorMode::Mono => None,
                mode => quantize(layout.dim(g.color, g.alpha), mode),
            };
            self.place_glyph(cx, cy, g.ch, fg, bg);
        }
    }

    fn place_glyph(&mut self, x: u16, y: u16, ch: char, fg: Option<Color>, bg: Option<Color>) {
        let wide = glyph_width(ch) == 2;
        if x >= self.width || y >= self.height || (wide && x + 1 >= self.width) {
            return;
        }
        // Landing on the tail of a wide glyph orphans its head.
        if self.get(x, y).is_some_and(Cell::is_wide_tail) && x > 0 {
            self.set(x - 1, y, self.blank);
        }
        let right = if wide { x + 1 } else { x };
        // Covering the head of a wide glyph orphans its tail.
        if self.get(right, y).is_some_and(|c| glyph_width(c.ch) == 2) {
            self.set(right + 1, y, self.blank);
        }
        self.set(x, y, Cell { ch, fg, bg });
        if wide {
            self.set(x + 1, y, Cell { ch: WIDE_TAIL, fg, bg });
        }
    }
}

fn half_block(top: Texel, bottom: Texel, bg: Option<Color>, layout: &Layout) -> Cell {
    let top_on = top[3] >= VISIBLE;
    let bottom_on = bottom[3] >= VISIBLE;

    if layout.mode == ColorMode::Mono {
        let level = [top, bottom]
            .iter()
            .filter(|t| t[3] >= VISIBLE)
            .map(|t| layout.flatten(*t).luma())
            .fold(0.0f32, f32::max);
        let idx = ((level * (SHADES.len() - 1) as f32).round() as usize).min(SHADES.len() - 1);
        let idx = if top_on || bottom_on { idx.max(1) } else { 0 };
        return Cell { ch: SHADES[idx], fg: None, bg: None };
    }

    let color = |t: Texel| quantize(layout.flatten(t), layout.mode);
    match (top_on, bottom_on) {
        (false, false) => Cell::blank_with_bg(bg),
        (true, true) => Cell { ch: UPPER_HALF, fg: color(top), bg: color(bottom) },
        (true, false) => Cell { ch: UPPER_HALF, fg: color(top), bg },
        (false, true) => Cell { ch: LOWER_HALF, fg: color(bottom), bg },
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn layout(backdrop: Backdrop, mode: ColorMode) -> Layout {
        Layout {
            cell_w: 2,
            cell_h: 4,
            backdrop,
            mode,
        }
    }

    fn paint(s: &mut Surface, x0: usize, y0: usize, w: usize, h: usize) {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                // two coats of a sub-pixel dot stay inside their own pixel
                s.fill_circle(x as f32 + 0.5, y as f32 + 0.5, 0.45, Rgb::WHITE, 1.0);
                s.fill_circle(x as f32 + 0.5, y as f32 + 0.5, 0.45, Rgb::WHITE, 1.0);
            }
        }
    }

    #[test]
    fn viewport_and_cells_agree() {
        let l = layout(Backdrop::Black, ColorMode::TrueColor);
        let vp = l.viewport_for(80, 24);
        assert_eq!(vp, Viewport::new(160.0, 96.0));
        let (w, h) = vp.pixel_dims();
        assert_eq!(l.cells_for(w, h), (80, 24));
    }

    #[test]
    fn set_tracks_only_real_changes() {
        let mut f = Frame::new(2, 2, None);
        f.clear_dirty();
        f.set(0, 0, Cell::blank_with_bg(None));
        assert!(f.dirty_indices().is_empty());
        f.set(1, 1, Cell { ch: 'x', fg: None, bg: None });
        assert_eq!(f.dirty_indices(), &[3]);
        assert_eq!(f.get(1, 1).unwrap().ch, 'x');
    }

    #[test]
    fn folds_pixels_into_half_blocks() {
        let l = layout(Backdrop::Black, ColorMode::TrueColor);
        let mut s = Surface::new(6, 4);
        paint(&mut s, 0, 0, 2, 2); // top half of cell 0
        paint(&mut s, 2, 2, 2, 2); // bottom half of cell 1
        paint(&mut s, 4, 0, 2, 4); // all of cell 2
        let (w, h) = l.cells_for(s.width(), s.height());
        let mut f = Frame::new(w, h, l.backdrop_bg());
        f.compose(&s, &l);

        let black = Some(Color::Rgb { r: 0, g: 0, b: 0 });
        let c0 = *f.get(0, 0).unwrap();
        assert_eq!(c0.ch, UPPER_HALF);
        assert_eq!(c0.bg, black);
        assert_eq!(f.get(1, 0).unwrap().ch, LOWER_HALF);
        let c2 = *f.get(2, 0).unwrap();
        assert_eq!(c2.ch, UPPER_HALF);
        assert_ne!(c2.bg, black);
    }

    #[test]
    fn empty_surface_composes_to_backdrop() {
        let l = layout(Backdrop::DefaultBackground, ColorMode::Color256);
        let s = Surface::new(8, 8);
        let mut f = Frame::new(4, 2, None);
        f.compose(&s, &l);
        assert!(f.cells.iter().all(|c| *c == Cell::blank_with_bg(None)));
    }

    #[test]
    fn mono_uses_shades() {
        let l = layout(Backdrop::Black, ColorMode::Mono);
        let mut s = Surface::new(2, 4);
        paint(&mut s, 0, 0, 2, 4);
        let mut f = Frame::new(1, 1, None);
        f.compose(&s, &l);
        let c = *f.get(0, 0).unwrap();
        assert_eq!(c.ch, '█');
        assert_eq!(c.fg, None);
    }

    #[test]
    fn glyphs_land_in_their_cell_and_wide_ones_take_two() {
        let l = layout(Backdrop::Black, ColorMode::Color16);
        let mut s = Surface::new(8, 4);
        s.put_glyph(0.5, 1.0, '❄', Rgb::WHITE, 1.0);
        s.put_glyph(4.5, 1.0, '雪', Rgb::WHITE, 1.0);
        let mut f = Frame::new(4, 1, None);
        f.compose(&s, &l);
        assert_eq!(f.get(0, 0).unwrap().ch, '❄');
        assert_eq!(f.get(2, 0).unwrap().ch, '雪');
        assert!(f.get(3, 0).unwrap().is_wide_tail());
    }

    #[test]
    fn wide_glyph_at_right_edge_is_dropped() {
        let l = layout(Backdrop::Black, ColorMode::Color16);
        let mut s = Surface::new(4, 4);
        s.put_glyph(3.0, 1.0, '雪', Rgb::WHITE, 1.0);
        let mut f = Frame::new(2, 1, None);
        f.compose(&s, &l);
        assert!(f.cells.iter().all(|c| c.ch == ' '));
    }

    #[test]
    fn narrow_glyph_on_a_tail_clears_the_head() {
        let l = layout(Backdrop::Black, ColorMode::Color16);
        let mut s = Surface::new(8, 4);
        s.put_glyph(0.5, 1.0, '雪', Rgb::WHITE, 1.0);
        s.put_glyph(2.5, 1.0, '*', Rgb::WHITE, 1.0);
        let mut f = Frame::new(4, 1, None);
        f.compose(&s, &l);
        assert_eq!(f.get(0, 0).unwrap().ch, ' ');
        assert_eq!(f.get(1, 0).unwrap().ch, '*');
    }
}
