// Copyright (c) 2026 rezky_nightky

use std::io::{stdout, Result, Stdout, Write};

use crossterm::{
    cursor, event,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
    terminal, ExecutableCommand, QueueableCommand,
};

use crate::cell::{glyph_width, Cell, WIDE_TAIL};
use crate::frame::{Frame, Layout};
use crate::render_loop::Present;
use crate::surface::Surface;

struct LastFrame {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
}

impl LastFrame {
    fn new(width: u16, height: u16) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            cells: vec![Cell::blank_with_bg(None); len],
        }
    }
}

/// Columns the cursor advances when `ch` is printed.
fn advance(ch: char) -> u16 {
    if ch == WIDE_TAIL {
        0
    } else {
        glyph_width(ch)
    }
}

/// Terminal presenter. Owns raw mode and the alternate screen for as long as
/// it lives, and writes only the cells that changed since the last frame.
pub struct Terminal {
    stdout: Stdout,
    layout: Layout,
    frame: Frame,
    last: Option<LastFrame>,
    run_buf: String,
    row_dirty: Vec<Vec<usize>>,
    touched_rows: Vec<u16>,
}

impl Terminal {
    pub fn new(layout: Layout) -> Result<Self> {
        let mut out = stdout();
        terminal::enable_raw_mode()?;
        let init_res: Result<()> = (|| {
            out.execute(terminal::EnterAlternateScreen)?;
            out.execute(cursor::Hide)?;
            let _ = out.execute(terminal::DisableLineWrap);
            out.execute(SetAttribute(Attribute::Reset))?;
            out.execute(ResetColor)?;
            out.execute(terminal::Clear(terminal::ClearType::All))?;
            out.flush()?;
            Ok(())
        })();
        if let Err(e) = init_res {
            restore_terminal_best_effort();
            return Err(e);
        }
        Ok(Self {
            stdout: out,
            layout,
            frame: Frame::new(0, 0, layout.backdrop_bg()),
            last: None,
            run_buf: String::with_capacity(64),
            row_dirty: Vec::new(),
            touched_rows: Vec::new(),
        })
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn size() -> Result<(u16, u16)> {
        terminal::size()
    }

    pub fn poll_event(timeout: std::time::Duration) -> Result<bool> {
        event::poll(timeout)
    }

    pub fn read_event() -> Result<event::Event> {
        event::read()
    }

    fn queue_colors(
        &mut self,
        fg: Option<Color>,
        bg: Option<Color>,
        cur_fg: &mut Option<Option<Color>>,
        cur_bg: &mut Option<Option<Color>>,
    ) -> Result<()> {
        if *cur_fg != Some(fg) {
            self.stdout
                .queue(SetForegroundColor(fg.unwrap_or(Color::Reset)))?;
            *cur_fg = Some(fg);
        }
        if *cur_bg != Some(bg) {
            self.stdout
                .queue(SetBackgroundColor(bg.unwrap_or(Color::Reset)))?;
            *cur_bg = Some(bg);
        }
        Ok(())
    }

    fn draw(&mut self) -> Result<()> {
        let mut cur_fg: Option<Option<Color>> = None;
        let mut cur_bg: Option<Option<Color>> = None;
        let mut cur_pos: Option<(u16, u16)> = None;
        let (width, height) = (self.frame.width, self.frame.height);

        let needs_full_redraw = self
            .last
            .as_ref()
            .map(|l| l.width != width || l.height != height)
            .unwrap_or(true);

        if needs_full_redraw {
            self.stdout
                .queue(terminal::Clear(terminal::ClearType::All))?;
            self.last = Some(LastFrame::new(width, height));
        }

        let total_cells = width as usize * height as usize;
        let dirty_count = self.frame.dirty_indices().len();
        let dirty_is_large = total_cells > 0 && dirty_count >= (total_cells / 3);
        let do_full_redraw = needs_full_redraw || self.frame.is_dirty_all() || dirty_is_large;

        if do_full_redraw {
            for y in 0..height {
                self.stdout.queue(cursor::MoveTo(0, y))?;
                for x in 0..width {
                    let idx = y as usize * width as usize + x as usize;
                    let cell = self.frame.cell_at_index(idx);
                    if let Some(last) = self.last.as_mut() {
                        last.cells[idx] = cell;
                    }
                    if cell.is_wide_tail() {
                        continue;
                    }
                    self.queue_colors(cell.fg, cell.bg, &mut cur_fg, &mut cur_bg)?;
                    self.stdout.queue(Print(cell.ch))?;
                }
            }

            self.stdout.queue(SetAttribute(Attribute::Reset))?;
            self.stdout.queue(ResetColor)?;
            self.stdout.flush()?;
            self.frame.clear_dirty();
            return Ok(());
        }

        let width_usize = width as usize;
        if self.row_dirty.len() != height as usize {
            self.row_dirty = vec![Vec::new(); height as usize];
        }
        for r in &mut self.row_dirty {
            r.clear();
        }
        self.touched_rows.clear();

        for &idx in self.frame.dirty_indices() {
            let y = (idx / width_usize) as u16;
            if y >= height {
                continue;
            }
            let b = &mut self.row_dirty[y as usize];
            if b.is_empty() {
                self.touched_rows.push(y);
            }
            b.push(idx);
        }
        self.touched_rows.sort_unstable();

        let rows = std::mem::take(&mut self.touched_rows);
        for &y0 in &rows {
            let mut b = std::mem::take(&mut self.row_dirty[y0 as usize]);
            b.sort_unstable();
            let mut i = 0usize;
            while i < b.len() {
                let idx0 = b[i];
                let cell0 = self.frame.cell_at_index(idx0);
                let Some(last) = self.last.as_mut() else {
                    break;
                };
                if last.cells.get(idx0).copied() == Some(cell0) {
                    i += 1;
                    continue;
                }
                last.cells[idx0] = cell0;

                let x0 = (idx0 % width_usize) as u16;
                self.run_buf.clear();
                let mut cols = 0u16;
                if !cell0.is_wide_tail() {
                    self.run_buf.push(cell0.ch);
                }
                cols += advance(cell0.ch);
                let mut last_idx_in_run = idx0;
                let mut j = i + 1;

                while j < b.len() {
                    let idx1 = b[j];
                    if idx1 != last_idx_in_run + 1 {
                        break;
                    }
                    let cell1 = self.frame.cell_at_index(idx1);
                    if last.cells.get(idx1).copied() == Some(cell1) {
                        break;
                    }
                    if cell1.fg != cell0.fg || cell1.bg != cell0.bg {
                        break;
                    }
                    if !cell1.is_wide_tail() {
                        self.run_buf.push(cell1.ch);
                    }
                    cols += advance(cell1.ch);
                    last.cells[idx1] = cell1;
                    last_idx_in_run = idx1;
                    j += 1;
                }
                i = j;

                if self.run_buf.is_empty() {
                    continue;
                }
                if cur_pos != Some((x0, y0)) {
                    self.stdout.queue(cursor::MoveTo(x0, y0))?;
                }
                self.queue_colors(cell0.fg, cell0.bg, &mut cur_fg, &mut cur_bg)?;
                self.stdout.queue(Print(self.run_buf.as_str()))?;
                let next_x = x0.saturating_add(cols);
                cur_pos = (next_x < width).then_some((next_x, y0));
            }
            b.clear();
            self.row_dirty[y0 as usize] = b;
        }
        self.touched_rows = rows;

        self.stdout.queue(SetAttribute(Attribute::Reset))?;
        self.stdout.queue(ResetColor)?;
        self.stdout.flush()?;
        self.frame.clear_dirty();
        Ok(())
    }
}

impl Present for Terminal {
    fn present(&mut self, surface: &Surface) -> Result<()> {
        let (w, h) = self.layout.cells_for(surface.width(), surface.height());
        if w != self.frame.width || h != self.frame.height {
            self.frame = Frame::new(w, h, self.layout.backdrop_bg());
        }
        self.frame.compose(surface, &self.layout);
        if self.frame.is_dirty_all() || !self.frame.dirty_indices().is_empty() {
            self.draw()?;
        }
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        let _ = self.stdout.execute(SetAttribute(Attribute::Reset));
        let _ = self.stdout.execute(ResetColor);
        let _ = self.stdout.execute(cursor::Show);
        let _ = self.stdout.execute(terminal::EnableLineWrap);
        let _ = self.stdout.execute(terminal::LeaveAlternateScreen);
        let _ = terminal::disable_raw_mode();
        let _ = self.stdout.flush();
    }
}

pub fn restore_terminal_best_effort() {
    let mut out = stdout();
    let _ = out.execute(SetAttribute(Attribute::Reset));
    let _ = out.execute(ResetColor);
    let _ = out.execute(cursor::Show);
    let _ = out.execute(terminal::EnableLineWrap);
    let _ = out.execute(terminal::LeaveAlternateScreen);
    let _ = terminal::disable_raw_mode();
    let _ = out.flush();
}
