// Copyright (c) 2026 rezky_nightky

mod args;
mod cell;
mod config;
mod engine;
mod error;
mod frame;
mod image_slot;
mod palette;
mod particle;
mod population;
mod render_loop;
mod runtime;
mod scheduler;
mod splash;
mod surface;
mod terminal;
mod texture;
mod worker;

use std::env;
use std::time::{Duration, Instant};

#[cfg(unix)]
use std::thread;

use clap::builder::styling::{AnsiColor as ClapAnsiColor, Color as ClapColor};
use clap::builder::styling::{Effects as ClapEffects, Style as ClapStyle};
use clap::builder::Styles as ClapStyles;
use clap::{CommandFactory, FromArgMatches};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind};

#[cfg(unix)]
use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
#[cfg(unix)]
use signal_hook::iterator::Signals;

use crate::args::{
    color_enabled_stdout, default_params_usage_for_help, print_help_detail, print_list_colors,
    print_list_types, Args,
};
use crate::config::{Configuration, MAX_COUNT};
use crate::engine::Engine;
use crate::error::Result;
use crate::frame::Layout;
use crate::palette::{Rgb, COLOR_CYCLE};
use crate::render_loop::RenderLoop;
use crate::runtime::ColorMode;
use crate::scheduler::FramePacer;
use crate::terminal::{restore_terminal_best_effort, Terminal};
use crate::worker::{SurfaceHandle, WorkerHandle, WorkerOptions};

const HELP_TEMPLATE_PLAIN: &str = "\
{before-help}{about-with-newline}
USAGE:
  {usage}

{all-args}{after-help}";

const HELP_TEMPLATE_COLOR: &str = "\
{before-help}{about-with-newline}
\x1b[1;36mUSAGE:\x1b[0m
  {usage}

{all-args}{after-help}";

const RELAY_POLL: Duration = Duration::from_millis(50);

fn build_info() -> &'static str {
    env!("DRIFTFALL_BUILD")
}

fn git_sha() -> &'static str {
    env!("DRIFTFALL_GIT_SHA")
}

fn clap_styles() -> ClapStyles {
    ClapStyles::styled()
        .header(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Cyan))),
        )
        .usage(
            ClapStyle::new()
                .effects(ClapEffects::BOLD)
                .fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Green))),
        )
        .literal(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Yellow))))
        .placeholder(ClapStyle::new().fg_color(Some(ClapColor::Ansi(ClapAnsiColor::Magenta))))
}

fn require_f64_range(name: &str, v: f64, min: f64, max: f64) -> f64 {
    if !v.is_finite() {
        eprintln!("failed to apply {} {} (must be a finite number)", name, v);
        std::process::exit(1);
    }
    if v < min || v > max {
        eprintln!("failed to apply {} {} (min {} max {})", name, v, min, max);
        std::process::exit(1);
    }
    v
}

fn detect_color_mode_auto() -> ColorMode {
    let colorterm = env::var("COLORTERM")
        .unwrap_or_default()
        .to_ascii_lowercase();
    if colorterm.contains("truecolor") || colorterm.contains("24bit") {
        return ColorMode::TrueColor;
    }

    let term = env::var("TERM").unwrap_or_default().to_ascii_lowercase();
    if term == "dumb" {
        return ColorMode::Mono;
    }
    if term.contains("256color") {
        return ColorMode::Color256;
    }

    ColorMode::Color16
}

fn detect_color_mode(args: &Args) -> ColorMode {
    if let Some(m) = args.colormode {
        return match m {
            0 => ColorMode::Mono,
            16 => ColorMode::Color16,
            8 | 256 => ColorMode::Color256,
            24 | 32 => ColorMode::TrueColor,
            _ => {
                eprintln!("invalid --colormode: {} (allowed: 0,16,8/256,24/32)", m);
                std::process::exit(1);
            }
        };
    }

    detect_color_mode_auto()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum KeyAction {
    Quit,
    Changed,
    Ignored,
}

fn handle_key(cfg: &mut Configuration, key: KeyEvent) -> KeyAction {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => return KeyAction::Quit,
        KeyCode::Char(' ') => cfg.enabled = !cfg.enabled,
        KeyCode::Char('t') => cfg.kind = cfg.kind.next(),
        KeyCode::Char('+') | KeyCode::Char('=') => {
            cfg.count = cfg.count.saturating_add(10).min(MAX_COUNT)
        }
        KeyCode::Char('-') => cfg.count = cfg.count.saturating_sub(10),
        KeyCode::Up => cfg.speed += 0.5,
        KeyCode::Down => cfg.speed -= 0.5,
        KeyCode::Left => cfg.wind -= 0.5,
        KeyCode::Right => cfg.wind += 0.5,
        KeyCode::Char('[') => cfg.size -= 0.5,
        KeyCode::Char(']') => cfg.size += 0.5,
        KeyCode::Char('c') => {
            let current = cfg.rgb();
            let idx = COLOR_CYCLE
                .iter()
                .position(|c| Rgb::parse(c) == Some(current))
                .map_or(0, |i| (i + 1) % COLOR_CYCLE.len());
            cfg.color = COLOR_CYCLE[idx].to_string();
        }
        _ => return KeyAction::Ignored,
    }
    *cfg = cfg.clone().sanitized();
    KeyAction::Changed
}

struct Session {
    layout: Layout,
    config: Configuration,
    fps: f64,
    seed: Option<u64>,
    duration: Option<Duration>,
    screensaver: bool,
}

fn run_inline(mut s: Session, term: Terminal) -> Result<()> {
    let (cols, rows) = Terminal::size()?;
    let viewport = s.layout.viewport_for(cols, rows);
    let engine = match s.seed {
        Some(seed) => Engine::with_seed(s.config.clone(), viewport, seed),
        None => Engine::new(s.config.clone(), viewport),
    };
    let mut rl = RenderLoop::new(engine, term, FramePacer::from_fps(s.fps));

    let start_time = Instant::now();
    let end_time = s.duration.map(|d| start_time + d);
    rl.start(start_time);
    let mut running = true;

    while running {
        if end_time.is_some_and(|end| Instant::now() >= end) {
            break;
        }
        let mut pending_resize: Option<(u16, u16)> = None;

        loop {
            while Terminal::poll_event(Duration::from_millis(0))? {
                match Terminal::read_event()? {
                    Event::Resize(nw, nh) => pending_resize = Some((nw, nh)),
                    Event::Key(k) if k.kind == KeyEventKind::Press => {
                        if s.screensaver {
                            running = false;
                            break;
                        }
                        match handle_key(&mut s.config, k) {
                            KeyAction::Quit => running = false,
                            KeyAction::Changed => rl.apply_config(s.config.clone()),
                            KeyAction::Ignored => {}
                        }
                    }
                    _ => {}
                }
            }

            if !running || pending_resize.is_some() {
                break;
            }

            let now = Instant::now();
            let Some(mut timeout) = rl.until_next(now) else {
                break;
            };
            if timeout.is_zero() {
                break;
            }
            if let Some(end) = end_time {
                if now >= end {
                    break;
                }
                timeout = timeout.min(end - now);
            }
            let _ = Terminal::poll_event(timeout)?;
        }

        if !running {
            break;
        }

        if let Some((nw, nh)) = pending_resize {
            rl.resize(s.layout.viewport_for(nw, nh));
        }

        rl.tick(Instant::now())?;
    }
    rl.stop();
    log::debug!("rendered {} frames", rl.frames());
    Ok(())
}

fn run_isolated(mut s: Session, term: Terminal) -> Result<()> {
    let (cols, rows) = Terminal::size()?;
    let viewport = s.layout.viewport_for(cols, rows);
    let handle = WorkerHandle::spawn(
        SurfaceHandle::new(term),
        viewport,
        s.config.clone(),
        WorkerOptions {
            fps: s.fps,
            seed: s.seed,
            duration: s.duration,
        },
    )?;

    while !handle.is_finished() {
        if !Terminal::poll_event(RELAY_POLL)? {
            continue;
        }
        match Terminal::read_event()? {
            Event::Resize(nw, nh) => handle.resize(s.layout.viewport_for(nw, nh))?,
            Event::Key(k) if k.kind == KeyEventKind::Press => {
                if s.screensaver {
                    break;
                }
                match handle_key(&mut s.config, k) {
                    KeyAction::Quit => break,
                    KeyAction::Changed => handle.update_config(s.config.clone())?,
                    KeyAction::Ignored => {}
                }
            }
            _ => {}
        }
    }
    handle.shutdown()
}

fn install_signal_handlers() {
    #[cfg(unix)]
    {
        if let Ok(mut signals) = Signals::new([SIGINT, SIGTERM, SIGHUP]) {
            thread::spawn(move || {
                if let Some(sig) = signals.forever().next() {
                    restore_terminal_best_effort();
                    std::process::exit(128 + sig);
                }
            });
        }
    }

    #[cfg(windows)]
    {
        if let Err(e) = ctrlc::set_handler(|| {
            restore_terminal_best_effort();
            std::process::exit(130);
        }) {
            eprintln!("failed to install Ctrl-C handler: {}", e);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off")).init();

    std::panic::set_hook(Box::new(|info| {
        restore_terminal_best_effort();
        eprintln!("{}", info);
    }));

    if let Err(e) = run() {
        restore_terminal_best_effort();
        eprintln!("driftfall: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    install_signal_handlers();

    let mut cmd = Args::command();
    cmd = cmd.styles(clap_styles());
    cmd = cmd.before_help(default_params_usage_for_help());
    let help_template = if color_enabled_stdout() {
        HELP_TEMPLATE_COLOR
    } else {
        HELP_TEMPLATE_PLAIN
    };
    cmd = cmd.help_template(help_template);
    cmd.build();

    if cmd.get_arguments().any(|a| a.get_id().as_str() == "help") {
        cmd = cmd.mut_arg("help", |a| a.help_heading("HELP"));
    }
    cmd.build();

    let matches = cmd.get_matches();
    let args = Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    if args.list_types {
        print_list_types();
        return Ok(());
    }

    if args.list_colors {
        print_list_colors();
        return Ok(());
    }

    if args.help_detail {
        print_help_detail();
        return Ok(());
    }

    if args.check_bitcolor {
        let colorterm = env::var("COLORTERM").unwrap_or_default();
        let term = env::var("TERM").unwrap_or_default();
        let auto = detect_color_mode_auto();
        let effective = detect_color_mode(&args);

        println!("BITCOLOR CHECK:");
        println!(
            "  COLORTERM: {}",
            if colorterm.is_empty() {
                "(unset)"
            } else {
                &colorterm
            }
        );
        println!(
            "  TERM: {}",
            if term.is_empty() { "(unset)" } else { &term }
        );
        println!("  auto_detected: {}", auto.label());
        if args.colormode.is_some() {
            println!("  forced: {}", effective.label());
        }
        println!("  effective: {}", effective.label());
        return Ok(());
    }

    if args.version {
        println!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.info {
        println!("Version: v{}", env!("CARGO_PKG_VERSION"));
        println!("Build: {}", build_info());
        println!("Commit: {}", git_sha());
        println!("Copyright: (c) 2026 {}", env!("CARGO_PKG_AUTHORS"));
        println!("License: {}", env!("CARGO_PKG_LICENSE"));
        println!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
        return Ok(());
    }

    let config = args.resolve_config()?;
    if args.dump_config {
        println!("{}", config.to_json_pretty());
        return Ok(());
    }

    let color_mode = detect_color_mode(&args);
    let fps = require_f64_range("--fps", args.fps, 1.0, 240.0);
    let duration = args.duration.and_then(|s| {
        if !s.is_finite() {
            eprintln!("failed to apply --duration {} (must be a finite number)", s);
            std::process::exit(1);
        }
        if s > 0.0 {
            let s = require_f64_range("--duration", s, 0.1, 86400.0);
            return Some(Duration::from_secs_f64(s));
        }
        None
    });

    let layout = Layout {
        cell_w: args.cell_size.width,
        cell_h: args.cell_size.height,
        backdrop: args.color_bg,
        mode: color_mode,
    };
    log::debug!(
        "starting: type={} count={} mode={} isolated={}",
        config.kind,
        config.count,
        color_mode.label(),
        args.isolated
    );

    let session = Session {
        layout,
        config,
        fps,
        seed: args.seed,
        duration,
        screensaver: args.screensaver,
    };
    let term = Terminal::new(layout)?;
    if args.isolated {
        run_isolated(session, term)
    } else {
        run_inline(session, term)
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ParticleKind;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn quit_keys() {
        let mut cfg = Configuration::default();
        assert_eq!(handle_key(&mut cfg, press(KeyCode::Char('q'))), KeyAction::Quit);
        assert_eq!(handle_key(&mut cfg, press(KeyCode::Esc)), KeyAction::Quit);
        assert_eq!(handle_key(&mut cfg, press(KeyCode::Char('z'))), KeyAction::Ignored);
    }

    #[test]
    fn toggles_and_cycles() {
        let mut cfg = Configuration::default();
        handle_key(&mut cfg, press(KeyCode::Char(' ')));
        assert!(cfg.enabled);
        handle_key(&mut cfg, press(KeyCode::Char('t')));
        assert_eq!(cfg.kind, ParticleKind::Star);
        handle_key(&mut cfg, press(KeyCode::Char('c')));
        assert_eq!(cfg.color, COLOR_CYCLE[1]);
    }

    #[test]
    fn adjustments_stay_in_range() {
        let mut cfg = Configuration::default();
        for _ in 0..100 {
            handle_key(&mut cfg, press(KeyCode::Right));
            handle_key(&mut cfg, press(KeyCode::Down));
            handle_key(&mut cfg, press(KeyCode::Char('-')));
        }
        assert_eq!(cfg.wind, 10.0);
        assert_eq!(cfg.speed, 0.1);
        assert_eq!(cfg.count, 0);

        for _ in 0..300 {
            handle_key(&mut cfg, press(KeyCode::Char('+')));
        }
        assert_eq!(cfg.count, MAX_COUNT);
    }

    #[test]
    fn size_keys() {
        let mut cfg = Configuration::default();
        handle_key(&mut cfg, press(KeyCode::Char(']')));
        assert_eq!(cfg.size, 3.5);
        handle_key(&mut cfg, press(KeyCode::Char('[')));
        handle_key(&mut cfg, press(KeyCode::Char('[')));
        assert_eq!(cfg.size, 2.5);
    }
}
