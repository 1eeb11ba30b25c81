// Copyright (c) 2026 rezky_nightky

use crossterm::style::Color;

use crate::runtime::ColorMode;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb`, `#rrggbb` (leading `#` optional) or `rgb(r, g, b)`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(inner) = s
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let mut parts = inner.split(',').map(|p| p.trim().parse::<u8>());
            let (r, g, b) = (parts.next()?, parts.next()?, parts.next()?);
            if parts.next().is_some() {
                return None;
            }
            return Some(Self::new(r.ok()?, g.ok()?, b.ok()?));
        }

        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        match hex.len() {
            3 => {
                let v = u16::from_str_radix(hex, 16).ok()?;
                let expand = |n: u16| ((n & 0xF) as u8) * 17;
                Some(Self::new(expand(v >> 8), expand(v >> 4), expand(v)))
            }
            6 => {
                let v = u32::from_str_radix(hex, 16).ok()?;
                Some(Self::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
            }
            _ => None,
        }
    }

    pub fn parse_or_white(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::WHITE)
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    pub fn to_unit(self) -> [f32; 3] {
        [
            self.r as f32 / 255.0,
            self.g as f32 / 255.0,
            self.b as f32 / 255.0,
        ]
    }

    pub fn from_unit(c: [f32; 3]) -> Self {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(c[0]), q(c[1]), q(c[2]))
    }

    pub fn luma(self) -> f32 {
        (0.2126 * self.r as f32 + 0.7152 * self.g as f32 + 0.0722 * self.b as f32) / 255.0
    }
}

pub const COLOR_CYCLE: [&str; 8] = [
    "#ffffff", "#fff6cc", "#88cc88", "#ffb7b2", "#a8c8ff", "#9fe7ff", "#d6a4ff", "#ffd27f",
];

fn dist2(a: Rgb, b: Rgb) -> i32 {
    let dr = (a.r as i32) - (b.r as i32);
    let dg = (a.g as i32) - (b.g as i32);
    let db = (a.b as i32) - (b.b as i32);
    (dr * dr) + (dg * dg) + (db * db)
}

fn rgb_to_ansi256(c: Rgb) -> u8 {
    const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

    let level = |v: u8| ((v as u16 * 5) + 127) / 255;
    let (r6, g6, b6) = (level(c.r), level(c.g), level(c.b));
    let cube = Rgb::new(
        CUBE_LEVELS[r6 as usize],
        CUBE_LEVELS[g6 as usize],
        CUBE_LEVELS[b6 as usize],
    );
    let cube_idx = 16 + (36 * r6 as u8) + (6 * g6 as u8) + (b6 as u8);

    let avg = ((c.r as u16 + c.g as u16 + c.b as u16) / 3) as u8;
    let (gray_idx, gray) = match avg {
        0..=7 => (16, Rgb::BLACK),
        239..=255 => (231, Rgb::WHITE),
        _ => {
            let idx = 232 + ((avg - 8) / 10);
            let v = 8 + 10 * (idx - 232);
            (idx, Rgb::new(v, v, v))
        }
    };

    if dist2(c, gray) < dist2(c, cube) {
        gray_idx
    } else {
        cube_idx
    }
}

fn rgb_to_color16(c: Rgb) -> Color {
    const TABLE: [(Color, Rgb); 16] = [
        (Color::Black, Rgb::new(0, 0, 0)),
        (Color::DarkGrey, Rgb::new(128, 128, 128)),
        (Color::Grey, Rgb::new(192, 192, 192)),
        (Color::White, Rgb::new(255, 255, 255)),
        (Color::DarkRed, Rgb::new(128, 0, 0)),
        (Color::Red, Rgb::new(255, 0, 0)),
        (Color::DarkGreen, Rgb::new(0, 128, 0)),
        (Color::Green, Rgb::new(0, 255, 0)),
        (Color::DarkBlue, Rgb::new(0, 0, 128)),
        (Color::Blue, Rgb::new(0, 0, 255)),
        (Color::DarkCyan, Rgb::new(0, 128, 128)),
        (Color::Cyan, Rgb::new(0, 255, 255)),
        (Color::DarkMagenta, Rgb::new(128, 0, 128)),
        (Color::Magenta, Rgb::new(255, 0, 255)),
        (Color::DarkYellow, Rgb::new(128, 128, 0)),
        (Color::Yellow, Rgb::new(255, 255, 0)),
    ];

    TABLE
        .iter()
        .min_by_key(|(_, rgb)| dist2(c, *rgb))
        .map(|(color, _)| *color)
        .unwrap_or(Color::White)
}

/// Maps a color onto what the terminal can show. `None` means "default foreground".
pub fn quantize(c: Rgb, mode: ColorMode) -> Option<Color> {
    match mode {
        ColorMode::Mono => None,
        ColorMode::TrueColor => Some(Color::Rgb {
            r: c.r,
            g: c.g,
            b: c.b,
        }),
        ColorMode::Color256 => Some(Color::AnsiValue(rgb_to_ansi256(c))),
        ColorMode::Color16 => Some(rgb_to_color16(c)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_short_and_functional_forms() {
        assert_eq!(Rgb::parse("#ffb7b2"), Some(Rgb::new(0xff, 0xb7, 0xb2)));
        assert_eq!(Rgb::parse("88cc88"), Some(Rgb::new(0x88, 0xcc, 0x88)));
        assert_eq!(Rgb::parse("#fff"), Some(Rgb::WHITE));
        assert_eq!(Rgb::parse("rgb(1, 2, 3)"), Some(Rgb::new(1, 2, 3)));
    }

    #[test]
    fn garbage_falls_back_to_white() {
        assert_eq!(Rgb::parse("#12345"), None);
        assert_eq!(Rgb::parse("rgb(1,2)"), None);
        assert_eq!(Rgb::parse_or_white("teal-ish"), Rgb::WHITE);
    }

    #[test]
    fn hex_round_trips_through_parse() {
        let c = Rgb::new(0x12, 0xab, 0xef);
        assert_eq!(Rgb::parse(&c.to_hex()), Some(c));
    }

    #[test]
    fn quantize_picks_gray_ramp_for_neutral_tones() {
        let gray = quantize(Rgb::new(128, 128, 128), ColorMode::Color256);
        assert_eq!(gray, Some(Color::AnsiValue(244)));
        assert_eq!(quantize(Rgb::WHITE, ColorMode::Mono), None);
        assert_eq!(
            quantize(Rgb::new(250, 10, 10), ColorMode::Color16),
            Some(Color::Red)
        );
    }
}
