// Copyright (c) 2026 rezky_nightky

/// Color capability of the output terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorMode {
    Mono,
    Color16,
    Color256,
    TrueColor,
}

impl ColorMode {
    pub fn label(self) -> &'static str {
        match self {
            ColorMode::TrueColor => "24-bit truecolor",
            ColorMode::Color256 => "8-bit (256-color)",
            ColorMode::Color16 => "16-color",
            ColorMode::Mono => "mono",
        }
    }
}

/// What sits behind the particles.
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backdrop {
    #[value(name = "black")]
    Black,
    #[value(name = "default-background")]
    DefaultBackground,
    #[value(name = "transparent")]
    Transparent,
}
