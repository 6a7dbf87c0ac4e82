//! palm_light — command-line entry point.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use palm_core::GestureConfig;

use palm_light::app::{run, AppConfig, InputKind, NoHandPolicy, TransportKind};
use palm_light::source::DEFAULT_MIN_SCORE;

/// Hand-gesture RGB light controller.
#[derive(Parser, Debug)]
#[command(name = "palm_light", version, about)]
struct Args {
    /// Serial port of the light controller (e.g. /dev/ttyUSB0, COM5).
    /// Without it, command lines go to stdout.
    #[arg(short, long)]
    port: Option<String>,

    /// Serial baud rate.
    #[arg(short, long, default_value_t = 9600)]
    baud: u32,

    /// Seconds to wait after opening the port while the board resets.
    #[arg(long, default_value_t = 2.0)]
    settle: f64,

    /// Discard commands instead of writing them anywhere.
    #[arg(long, conflicts_with = "port")]
    dry_run: bool,

    /// Read JSON landmark lines from stdin.
    #[arg(long, group = "input")]
    stdin: bool,

    /// Replay JSON landmark lines from a file.
    #[arg(long, group = "input", value_name = "FILE")]
    replay: Option<PathBuf>,

    /// Run an estimator and read JSON landmark lines from its stdout.
    /// Takes the rest of the command line, so give it last.
    #[arg(long, group = "input", num_args = 1.., allow_hyphen_values = true, value_name = "CMD")]
    estimator: Option<Vec<String>>,

    /// Ignore hands the estimator scores below this.
    #[arg(long, default_value_t = DEFAULT_MIN_SCORE)]
    min_score: f32,

    /// Re-send the last command on frames without a hand.
    #[arg(long)]
    repeat_on_no_hand: bool,

    /// Gesture configuration file (JSON); flags below override it.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long)]
    fist_threshold: Option<f32>,

    /// Lock debounce in seconds.
    #[arg(long)]
    lock_debounce: Option<f64>,

    /// Color debounce in seconds.
    #[arg(long)]
    color_debounce: Option<f64>,

    #[arg(long)]
    color_step: Option<f32>,

    /// Debug logging (same as RUST_LOG=debug).
    #[arg(short, long)]
    verbose: bool,
}

fn load_gesture_config(args: &Args) -> Result<GestureConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Failed to parse {}", path.display()))?
        }
        None => GestureConfig::default(),
    };

    if let Some(v) = args.fist_threshold { cfg.fist_threshold = v; }
    if let Some(v) = args.color_step     { cfg.color_step     = v; }
    if let Some(v) = args.lock_debounce {
        cfg.lock_debounce = Duration::try_from_secs_f64(v).context("--lock-debounce")?;
    }
    if let Some(v) = args.color_debounce {
        cfg.color_debounce = Duration::try_from_secs_f64(v).context("--color-debounce")?;
    }
    Ok(cfg)
}

fn app_config(args: Args) -> Result<AppConfig> {
    let gesture = load_gesture_config(&args)?;

    let input = if args.stdin {
        InputKind::Stdin
    } else if let Some(path) = args.replay {
        InputKind::File(path)
    } else if let Some(mut cmd) = args.estimator {
        let program = cmd.remove(0);
        InputKind::Estimator { program, args: cmd }
    } else {
        InputKind::Sim
    };

    let transport = match args.port {
        Some(port) => TransportKind::Serial {
            port,
            baud:   args.baud,
            settle: Duration::try_from_secs_f64(args.settle).context("--settle")?,
        },
        None if args.dry_run => TransportKind::Null,
        None => TransportKind::Stdout,
    };

    Ok(AppConfig {
        gesture,
        input,
        transport,
        no_hand: if args.repeat_on_no_hand { NoHandPolicy::Repeat } else { NoHandPolicy::Silent },
        min_score: args.min_score,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let cfg = app_config(args)?;

    if cfg.input == InputKind::Sim {
        log::info!("Mode: simulation window (mouse = palm, F = fist, Q = quit)");
    }
    if cfg.transport == TransportKind::Stdout {
        log::info!("No --port given; writing commands to stdout");
    }

    run(cfg)?;
    Ok(())
}
