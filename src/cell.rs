// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

/// Placeholder stored in the cell to the right of a double-width glyph. The
/// presenter never prints it.
pub const WIDE_TAIL: char = '\0';

pub const UPPER_HALF: char = '▀';
pub const LOWER_HALF: char = '▄';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: Option<Color>,
    pub bg: Option<Color>,
}

impl Cell {
    pub fn blank_with_bg(bg: Option<Color>) -> Self {
        Self { ch: ' ', fg: None, bg }
    }

    pub fn is_wide_tail(&self) -> bool {
        self.ch == WIDE_TAIL
    }
}

pub fn glyph_width(ch: char) -> u16 {
    let c = ch as u32;
    let wide = matches!(
        c,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x1F300..=0x1F64F
            | 0x1F900..=0x1F9FF
            | 0x20000..=0x3FFFD
    );
    if wide {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths() {
        assert_eq!(glyph_width('a'), 1);
        assert_eq!(glyph_width('❄'), 1);
        assert_eq!(glyph_width('◆'), 1);
        assert_eq!(glyph_width('雪'), 2);
        assert_eq!(glyph_width('🍁'), 2);
    }
}
