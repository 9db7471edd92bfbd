mod app;
mod config;
mod error;
mod headless;
mod input;
mod model;
mod render;
mod sim;

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs::File, path::PathBuf, sync::Mutex};
use tracing::Level;

#[derive(Parser, Debug, Clone)]
#[command(name = "solarsystem")]
#[command(about = "Animated elliptical orbits with fading trails, in the terminal or as JSON frames")]
struct Cli {
    /// Settings file (JSON). Defaults to settings.json in the user config dir.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override every body's angular speed (radians per frame, e.g. 0.01..0.1)
    #[arg(long, allow_negative_numbers = true)]
    speed: Option<f64>,

    /// Start with trails hidden
    #[arg(long, default_value_t = false)]
    hide_trails: bool,

    /// Marker size multiplier (e.g. 0.5..3.0)
    #[arg(long, allow_negative_numbers = true)]
    size_multiplier: Option<f64>,

    /// Trail length in samples per body
    #[arg(long, allow_negative_numbers = true)]
    max_trail_length: Option<i64>,

    /// Frame index advance per tick
    #[arg(long, allow_negative_numbers = true)]
    frame_step: Option<f64>,

    /// Height of the out-of-plane wobble; 0 keeps orbits flat
    #[arg(long, allow_negative_numbers = true)]
    z_amplitude: Option<f64>,

    /// Camera elevation above the orbital plane (degrees)
    #[arg(long, allow_negative_numbers = true)]
    elevation: Option<f64>,

    /// FPS cap for the interactive view
    #[arg(long)]
    fps: Option<u32>,

    /// Write frames as JSON lines to stdout instead of opening the terminal view
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Number of frames to export in headless mode
    #[arg(long, default_value_t = headless::DEFAULT_FRAMES)]
    frames: usize,

    /// Persist the effective settings to the settings file and continue
    #[arg(long, default_value_t = false)]
    save_settings: bool,

    /// Log file (the interactive view only logs when this is set)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> config::Overrides {
        config::Overrides {
            speed: self.speed,
            hide_trails: self.hide_trails,
            size_multiplier: self.size_multiplier,
            max_trail_length: self.max_trail_length,
            frame_step: self.frame_step,
            z_amplitude: self.z_amplitude,
            fps_cap: self.fps,
            elevation_deg: self.elevation,
        }
    }

    fn level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

fn init_logging(cli: &Cli) -> Result<()> {
    let level = cli.level();
    if let Some(path) = &cli.log_file {
        let file = File::create(path).with_context(|| format!("could not create log file {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
    } else if cli.headless {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let (path, mut settings) = match &cli.config {
        Some(p) => (p.clone(), config::load_settings(p)?),
        None => match config::default_settings_path() {
            Ok(p) => {
                let s = config::load_settings_or_default(&p)?;
                (p, s)
            }
            Err(e) => {
                tracing::warn!(error = %e, "falling back to settings.json in the working directory");
                let p = PathBuf::from("settings.json");
                let s = config::load_settings_or_default(&p)?;
                (p, s)
            }
        },
    };
    settings.apply(&cli.overrides());
    let cfg = settings.validate().context("invalid configuration")?;
    tracing::info!(
        source = %path.display(),
        bodies = cfg.bodies.len(),
        max_trail_length = cfg.knobs.max_trail_length,
        "configuration loaded"
    );

    if cli.save_settings {
        config::save_settings_atomic(&path, &settings)?;
        tracing::info!(path = %path.display(), "settings saved");
    }

    if cli.headless {
        headless::run(&cfg, cli.frames)
    } else {
        app::run(&cfg)
    }
}
