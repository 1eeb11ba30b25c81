// Copyright (c) 2026 rezky_nightky

use std::io::IsTerminal;
use std::path::PathBuf;
use std::str::FromStr;

use clap::Parser;

use crate::config::{Configuration, ParticleKind};
use crate::error::Result;
use crate::palette::COLOR_CYCLE;
use crate::runtime::Backdrop;

pub const DEFAULT_PARAMS_USAGE: &str = "DEFAULT PARAMS USAGE:\n  driftfall --type snow --speed 2 --size 3 --count 50 --wind 0 --opacity 1 --color #ffffff --fps 60 --cell-size 4,8 --color-bg black";

pub fn color_enabled_stdout() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if matches!(std::env::var("CLICOLOR").ok().as_deref(), Some("0")) {
        return false;
    }
    std::io::stdout().is_terminal()
}

fn colorize_help_detail(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 64);
    for chunk in text.split_inclusive('\n') {
        let (line, nl) = chunk
            .strip_suffix('\n')
            .map(|l| (l, "\n"))
            .unwrap_or((chunk, ""));

        let is_heading =
            !line.starts_with(' ') && line.ends_with(':') && line == line.to_ascii_uppercase();

        if is_heading {
            out.push_str("\x1b[1;36m");
            out.push_str(line);
            out.push_str("\x1b[0m");
        } else if let Some(rest) = line.strip_prefix("      Example:") {
            out.push_str("      \x1b[32mExample:\x1b[0m");
            out.push_str(rest);
        } else if let Some(rest) = line.strip_prefix("  driftfall") {
            out.push_str("  \x1b[1;34mdriftfall\x1b[0m");
            out.push_str(rest);
        } else if let Some(rest) = line.strip_prefix("  -") {
            out.push_str("  \x1b[33m-");
            out.push_str(rest);
            out.push_str("\x1b[0m");
        } else {
            out.push_str(line);
        }
        out.push_str(nl);
    }
    out
}

pub fn default_params_usage_for_help() -> String {
    if color_enabled_stdout() {
        colorize_help_detail(DEFAULT_PARAMS_USAGE)
    } else {
        DEFAULT_PARAMS_USAGE.to_string()
    }
}

/// Logical pixels per terminal cell, given as `W,H`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CellSize {
    pub width: u16,
    pub height: u16,
}

impl CellSize {
    pub const MAX: u16 = 32;
}

impl Default for CellSize {
    fn default() -> Self {
        Self {
            width: 4,
            height: 8,
        }
    }
}

impl FromStr for CellSize {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (a, b) = s
            .split_once(',')
            .ok_or_else(|| "expected: W,H".to_string())?;
        let width: u16 = a
            .trim()
            .parse()
            .map_err(|_| "invalid width".to_string())?;
        let height: u16 = b
            .trim()
            .parse()
            .map_err(|_| "invalid height".to_string())?;
        if !(1..=Self::MAX).contains(&width) || !(1..=Self::MAX).contains(&height) {
            return Err(format!("cell size must be between 1 and {} on each axis", Self::MAX));
        }
        Ok(Self { width, height })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "driftfall", version, disable_version_flag = true)]
pub struct Args {
    #[arg(
        short = 't',
        long = "type",
        help_heading = "PARTICLES",
        help = "Particle type (see --list-types)"
    )]
    pub kind: Option<ParticleKind>,

    #[arg(
        short = 'S',
        long = "speed",
        help_heading = "PARTICLES",
        help = "Fall speed (min 0.1 max 20) [default: 2]"
    )]
    pub speed: Option<f32>,

    #[arg(
        long = "size",
        help_heading = "PARTICLES",
        help = "Particle size (min 0.1 max 20) [default: 3]"
    )]
    pub size: Option<f32>,

    #[arg(
        short = 'n',
        long = "count",
        help_heading = "PARTICLES",
        help = "Number of particles (min 0 max 2000) [default: 50]"
    )]
    pub count: Option<u32>,

    #[arg(
        short = 'w',
        long = "wind",
        allow_negative_numbers = true,
        help_heading = "PARTICLES",
        help = "Horizontal wind (min -10 max 10) [default: 0]"
    )]
    pub wind: Option<f32>,

    #[arg(
        short = 'o',
        long = "opacity",
        help_heading = "PARTICLES",
        help = "Overall opacity (min 0.01 max 1) [default: 1]"
    )]
    pub opacity: Option<f32>,

    #[arg(
        short = 'c',
        long = "color",
        help_heading = "APPEARANCE",
        help = "Particle color: #rgb, #rrggbb or rgb(r,g,b) [default: #ffffff]"
    )]
    pub color: Option<String>,

    #[arg(
        long = "text",
        help_heading = "PARTICLES",
        help = "Glyph for --type custom [default: ❄]"
    )]
    pub text: Option<String>,

    #[arg(
        long = "image",
        help_heading = "PARTICLES",
        help = "Image file for --type image (PNG, JPEG, GIF; file:// allowed)"
    )]
    pub image: Option<String>,

    #[arg(
        long = "config",
        value_name = "FILE",
        help_heading = "GENERAL",
        help = "Load settings from a JSON file; flags override it"
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long = "dump-config",
        help_heading = "GENERAL",
        help = "Print the effective settings as JSON and exit"
    )]
    pub dump_config: bool,

    #[arg(
        long = "start-disabled",
        help_heading = "GENERAL",
        help = "Start with the overlay switched off (space toggles)"
    )]
    pub start_disabled: bool,

    #[arg(
        short = 'f',
        long = "fps",
        default_value_t = 60.0,
        help_heading = "PERFORMANCE",
        help = "Target FPS (min 1 max 240)"
    )]
    pub fps: f64,

    #[arg(
        long = "cell-size",
        default_value = "4,8",
        help_heading = "APPEARANCE",
        help = "Logical pixels per terminal cell: W,H (min 1 max 32 each)"
    )]
    pub cell_size: CellSize,

    #[arg(
        long = "color-bg",
        default_value_t = Backdrop::Black,
        value_enum,
        help_heading = "APPEARANCE",
        help = "Background mode (black, default-background, transparent)"
    )]
    pub color_bg: Backdrop,

    #[arg(
        long = "colormode",
        help_heading = "APPEARANCE",
        help = "Force color mode (allowed: 0,16,8/256,24/32). Default: 24-bit if supported (COLORTERM), else 8-bit (TERM=...256color), else 16-color"
    )]
    pub colormode: Option<u16>,

    #[arg(
        long = "isolated",
        help_heading = "PERFORMANCE",
        help = "Simulate and draw on a dedicated render thread"
    )]
    pub isolated: bool,

    #[arg(
        long = "seed",
        help_heading = "GENERAL",
        help = "Seed the particle RNG for a reproducible run"
    )]
    pub seed: Option<u64>,

    #[arg(
        long = "duration",
        help_heading = "GENERAL",
        help = "Stop after N seconds (min 0.1 max 86400; <=0 disables)"
    )]
    pub duration: Option<f64>,

    #[arg(
        short = 's',
        long = "screensaver",
        help_heading = "GENERAL",
        help = "Screensaver mode (exit on keypress)"
    )]
    pub screensaver: bool,

    #[arg(
        long = "check-bitcolor",
        help_heading = "HELP",
        help = "Print detected terminal color capability and exit"
    )]
    pub check_bitcolor: bool,

    #[arg(
        long = "help-detail",
        help_heading = "HELP",
        help = "Show detailed help for all parameters and exit"
    )]
    pub help_detail: bool,

    #[arg(
        long = "list-types",
        help_heading = "HELP",
        help = "List particle types and exit"
    )]
    pub list_types: bool,

    #[arg(
        long = "list-colors",
        help_heading = "HELP",
        help = "List the colors cycled by the c key and exit"
    )]
    pub list_colors: bool,

    #[arg(
        long = "info",
        short = 'i',
        help_heading = "HELP",
        help = "Print version info and exit"
    )]
    pub info: bool,

    #[arg(
        long = "version",
        short = 'v',
        help_heading = "HELP",
        help = "Print version and exit"
    )]
    pub version: bool,
}

impl Args {
    /// Effective configuration: the `--config` file (or defaults), then any
    /// particle flags on top. Without a file the overlay starts enabled.
    pub fn resolve_config(&self) -> Result<Configuration> {
        let mut cfg = match &self.config {
            Some(path) => Configuration::load(path)?,
            None => Configuration {
                enabled: true,
                ..Configuration::default()
            },
        };
        if let Some(kind) = self.kind {
            cfg.kind = kind;
        }
        if let Some(v) = self.speed {
            cfg.speed = v;
        }
        if let Some(v) = self.size {
            cfg.size = v;
        }
        if let Some(v) = self.count {
            cfg.count = v;
        }
        if let Some(v) = self.wind {
            cfg.wind = v;
        }
        if let Some(v) = self.opacity {
            cfg.opacity = v;
        }
        if let Some(v) = &self.color {
            cfg.color = v.clone();
        }
        if let Some(v) = &self.text {
            cfg.custom_text = Some(v.clone());
        }
        if let Some(v) = &self.image {
            cfg.custom_image = Some(v.clone());
            if self.kind.is_none() {
                cfg.kind = ParticleKind::Image;
            }
        }
        if self.start_disabled {
            cfg.enabled = false;
        }
        Ok(cfg.sanitized())
    }
}

pub fn print_list_types() {
    if color_enabled_stdout() {
        println!("\x1b[1;36mAVAILABLE PARTICLE TYPES:\x1b[0m");
        println!("\x1b[2mNOTE: Use only the VALUE (left side) with --type.\x1b[0m");
    } else {
        println!("AVAILABLE PARTICLE TYPES:");
        println!("NOTE: Use only the VALUE (left side) with --type.");
    }
    println!();
    println!("VALUE        DESCRIPTION");
    for kind in ParticleKind::ALL {
        println!("{:<12} {}", kind.name(), kind.description());
    }
}

pub fn print_list_colors() {
    if color_enabled_stdout() {
        println!("\x1b[1;36mCOLOR CYCLE (c key):\x1b[0m");
    } else {
        println!("COLOR CYCLE (c key):");
    }
    println!();
    for hex in COLOR_CYCLE {
        println!("{hex}");
    }
}

pub fn print_help_detail() {
    let block = format!(
        "{}\n\nUSAGE:\n  driftfall [OPTIONS]\n\nPARTICLES:\n  -t, --type <name>\n      Particle type (see --list-types).\n      Example: driftfall --type rain\n\n  -S, --speed <number>\n      Fall speed (min 0.1 max 20).\n      Example: driftfall --speed 4\n\n  --size <number>\n      Particle size (min 0.1 max 20).\n      Example: driftfall --size 5\n\n  -n, --count <number>\n      Number of particles (min 0 max 2000).\n      Example: driftfall --count 300\n\n  -w, --wind <number>\n      Horizontal wind, negative blows left (min -10 max 10).\n      Example: driftfall --wind -3\n\n  -o, --opacity <number>\n      Overall opacity (min 0.01 max 1).\n      Example: driftfall --opacity 0.6\n\n  --text <glyph>\n      Glyph used by --type custom (first character).\n      Example: driftfall --type custom --text \"*\"\n\n  --image <path>\n      Image used by --type image; a placeholder shows until it loads.\n      Example: driftfall --image petal.png\n\nAPPEARANCE:\n  -c, --color <color>\n      Particle color.\n      Example: driftfall --color #ffb7b2\n\n  --colormode <0|16|8|24>\n      Force color mode; otherwise auto-detected from COLORTERM/TERM.\n      Example: driftfall --colormode 24\n\n  --color-bg <black|default-background|transparent>\n      Background mode.\n      Example: driftfall --color-bg transparent\n\n  --cell-size <w,h>\n      Logical pixels per terminal cell.\n      Example: driftfall --cell-size 2,4\n\nGENERAL:\n  --config <file>\n      Load a JSON settings snapshot; flags override it.\n      Example: driftfall --config overlay.json\n\n  --dump-config\n      Print the effective settings as JSON and exit.\n      Example: driftfall --type leaf --dump-config\n\n  --start-disabled\n      Start switched off; press space to enable.\n\n  --seed <number>\n      Reproducible particle layout.\n      Example: driftfall --seed 42\n\n  --duration <seconds>\n      Stop after N seconds (min 0.1 max 86400).\n      Example: driftfall --duration 10\n\n  -s, --screensaver\n      Screensaver mode (exit on keypress).\n\nPERFORMANCE:\n  -f, --fps <number>\n      Target FPS (min 1 max 240).\n      Example: driftfall --fps 30\n\n  --isolated\n      Run the simulation on a dedicated render thread.\n      Example: driftfall --isolated\n\nKEYS:\n  q, Esc        quit\n  space         toggle the overlay\n  t             next particle type\n  + / -         count +10 / -10\n  Up / Down     speed +0.5 / -0.5\n  Left / Right  wind -0.5 / +0.5\n  [ / ]         size -0.5 / +0.5\n  c             next color\n",
        DEFAULT_PARAMS_USAGE
    );

    if color_enabled_stdout() {
        print!("{}", colorize_help_detail(&block));
    } else {
        print!("{}", block);
    }
    println!();
    print_list_types();
}
