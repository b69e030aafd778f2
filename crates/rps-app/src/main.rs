use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result, ensure};
use clap::{Parser, ValueEnum};
use rps_app::{
    renderer::{HeadlessOptions, Renderer, RendererContext},
    terminal::{DEFAULT_HEADLESS_FRAMES, MAX_HEADLESS_FRAMES, TerminalRenderer},
};
use rps_core::{Polarity, SimulationConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "rps-app",
    version,
    about = "Rock/paper/scissors interaction simulator for the terminal"
)]
struct Cli {
    /// JSON file holding a simulation configuration; flags override it.
    #[arg(long, env = "RPS_CONFIG")]
    config: Option<PathBuf>,

    /// Playfield width in world units.
    #[arg(long, env = "RPS_WIDTH")]
    width: Option<f32>,

    /// Playfield height in world units, HUD strip included.
    #[arg(long, env = "RPS_HEIGHT")]
    height: Option<f32>,

    /// Logical ticks per second.
    #[arg(long, env = "RPS_RATE")]
    rate: Option<f64>,

    #[arg(long, env = "RPS_PIECES")]
    pieces: Option<usize>,

    /// Side length of a piece.
    #[arg(long, env = "RPS_SIZE")]
    size: Option<f32>,

    /// Opponent candidates examined per piece per tick.
    #[arg(long, env = "RPS_SAMPLES")]
    samples: Option<usize>,

    #[arg(long, env = "RPS_SEED")]
    seed: Option<u64>,

    /// Maximum catch-up ticks per frame.
    #[arg(long, env = "RPS_MAX_TICKS")]
    max_ticks: Option<u32>,

    #[arg(long, env = "RPS_POLARITY", value_enum)]
    polarity: Option<PolarityArg>,

    /// Start with the HUD strip hidden.
    #[arg(long, env = "RPS_NO_HUD")]
    no_hud: bool,

    /// Run without a terminal against a simulated clock.
    #[arg(long, env = "RPS_HEADLESS")]
    headless: bool,

    /// Frames to simulate in headless mode.
    #[arg(long, env = "RPS_FRAMES", default_value_t = DEFAULT_HEADLESS_FRAMES)]
    frames: usize,

    /// Simulated milliseconds between headless frames.
    #[arg(long, env = "RPS_FRAME_MS", default_value_t = 16)]
    frame_ms: u64,

    /// Write the headless JSON report here.
    #[arg(long, env = "RPS_REPORT")]
    report: Option<PathBuf>,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PolarityArg {
    /// Move toward the kind that beats you.
    SeekPredator,
    /// Move toward the kind you beat.
    ChasePrey,
}

impl From<PolarityArg> for Polarity {
    fn from(value: PolarityArg) -> Self {
        match value {
            PolarityArg::SeekPredator => Polarity::SeekPredator,
            PolarityArg::ChasePrey => Polarity::ChasePrey,
        }
    }
}

impl Cli {
    fn simulation_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = fs::read_to_string(path)
                    .with_context(|| format!("failed to read config file {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse config file {}", path.display()))?
            }
            None => SimulationConfig::default(),
        };

        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(rate) = self.rate {
            config.simulation_rate = rate;
        }
        if let Some(pieces) = self.pieces {
            config.piece_count = pieces;
        }
        if let Some(size) = self.size {
            config.piece_size = size;
        }
        if let Some(samples) = self.samples {
            config.piece_samples = samples;
        }
        if let Some(seed) = self.seed {
            config.rng_seed = Some(seed);
        }
        if let Some(max_ticks) = self.max_ticks {
            config.max_ticks_per_poll = max_ticks;
        }
        if let Some(polarity) = self.polarity {
            config.polarity = polarity.into();
        }
        if self.no_hud {
            config.hud_visible = false;
        }

        config
            .validate()
            .context("invalid simulation configuration")?;
        Ok(config)
    }

    fn headless_options(&self) -> Result<Option<HeadlessOptions>> {
        if !self.headless {
            return Ok(None);
        }
        ensure!(
            self.frames <= MAX_HEADLESS_FRAMES,
            "--frames must be at most {MAX_HEADLESS_FRAMES}, got {}",
            self.frames
        );
        Ok(Some(HeadlessOptions {
            frames: self.frames,
            frame_duration: Duration::from_millis(self.frame_ms),
            report_path: self.report.clone(),
        }))
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = cli.simulation_config()?;

    if cli.print_config {
        println!(
            "{}",
            serde_json::to_string_pretty(&config).context("failed to serialize configuration")?
        );
        return Ok(());
    }

    let renderer = TerminalRenderer::default();
    let headless = cli.headless_options()?;
    info!(
        renderer = renderer.name(),
        headless = headless.is_some(),
        pieces = config.piece_count,
        rate = config.simulation_rate,
        "Starting rock/paper/scissors simulation"
    );
    renderer.run(RendererContext { config, headless })
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "rps-app",
            "--rate",
            "30",
            "--pieces",
            "12",
            "--polarity",
            "chase-prey",
            "--no-hud",
        ])
        .expect("parse");
        let config = cli.simulation_config().expect("config");
        assert_eq!(config.simulation_rate, 30.0);
        assert_eq!(config.piece_count, 12);
        assert_eq!(config.polarity, Polarity::ChasePrey);
        assert!(!config.hud_visible);
        assert_eq!(config.piece_size, SimulationConfig::default().piece_size);
        assert!(cli.headless_options().expect("options").is_none());
    }

    #[test]
    fn config_file_is_layered_under_flags() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, r#"{{ "piece_count": 40, "piece_size": 20.0, "rng_seed": 3 }}"#)
            .expect("write config");
        let path = file.path().to_str().expect("utf-8 path").to_owned();

        let cli = Cli::try_parse_from(["rps-app", "--config", &path, "--pieces", "7"])
            .expect("parse");
        let config = cli.simulation_config().expect("config");
        assert_eq!(config.piece_count, 7);
        assert_eq!(config.piece_size, 20.0);
        assert_eq!(config.rng_seed, Some(3));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cli = Cli::try_parse_from(["rps-app", "--rate", "0"]).expect("parse");
        assert!(cli.simulation_config().is_err());
    }

    #[test]
    fn headless_flags_build_options() {
        let cli = Cli::try_parse_from([
            "rps-app",
            "--headless",
            "--frames",
            "5",
            "--frame-ms",
            "40",
            "--report",
            "out/report.json",
        ])
        .expect("parse");
        let options = cli
            .headless_options()
            .expect("options")
            .expect("headless");
        assert_eq!(options.frames, 5);
        assert_eq!(options.frame_duration, Duration::from_millis(40));
        assert_eq!(options.report_path, Some(PathBuf::from("out/report.json")));
    }

    #[test]
    fn oversized_frame_budget_is_rejected() {
        let limit = MAX_HEADLESS_FRAMES.to_string();
        let cli = Cli::try_parse_from(["rps-app", "--headless", "--frames", &limit])
            .expect("parse");
        assert!(cli.headless_options().expect("options").is_some());

        let over = (MAX_HEADLESS_FRAMES + 1).to_string();
        let cli = Cli::try_parse_from(["rps-app", "--headless", "--frames", &over])
            .expect("parse");
        let err = cli.headless_options().expect_err("too many frames");
        assert!(err.to_string().contains("--frames"));

        let cli = Cli::try_parse_from(["rps-app", "--frames", &over]).expect("parse");
        assert!(cli.headless_options().expect("options").is_none());
    }
}
