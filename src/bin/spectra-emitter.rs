use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info, warn};

use spectra_emitter::config::EmitterConfig;
use spectra_emitter::logging::init_logging;
use spectra_emitter::plan::EmitPlan;
use spectra_emitter::preset;
use spectra_emitter::prompt::{stdin_line, wait_for_enter};
use spectra_emitter::{emit, EmitError, LoggingObserver};

#[derive(Parser)]
#[command(name = "spectra-emitter")]
#[command(version, about = "Send numbered uint64 UDP packets to SpectraDAQ", long_about = None)]
pub struct Cli {
    /// Enables debug mode (repeat for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    debug: u8,

    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write the log to a file in the data directory
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Send a fixed number of packets with a fixed delay between them
    Fixed {
        /// Target host (defaults to the configured target)
        host: Option<String>,

        /// Target port (defaults to the configured target)
        port: Option<u16>,

        /// Number of packets to send
        #[arg(short, long, default_value = "100")]
        count: u64,

        /// Delay between packets in milliseconds
        #[arg(short, long, default_value = "100")]
        interval_ms: f64,

        /// Print a progress line every N packets (0 disables)
        #[arg(long, default_value = "1")]
        progress_every: u64,
    },

    /// Send packets paced to a target bitrate for a fixed duration
    Rate {
        /// Target data rate in Mbps
        #[arg(default_value = "1")]
        rate_mbps: f64,

        /// Test duration in seconds
        #[arg(default_value = "10")]
        duration_secs: f64,

        /// Target host (defaults to the configured target)
        #[arg(long)]
        host: Option<String>,

        /// Target port (defaults to the configured target)
        #[arg(short, long)]
        port: Option<u16>,

        /// Print a progress line every N packets (0 disables)
        #[arg(long, default_value = "1000")]
        progress_every: u64,
    },

    /// Run a named preset
    Preset {
        /// Preset name (see `presets`)
        name: String,

        /// Target host (defaults to the configured target)
        #[arg(long)]
        host: Option<String>,

        /// Target port (defaults to the configured target)
        #[arg(short, long)]
        port: Option<u16>,

        /// Start sending immediately even if the preset waits for Enter
        #[arg(long)]
        no_wait: bool,
    },

    /// List available presets
    Presets,

    /// Write a default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl Command {
    /// Name for this run's log file
    fn log_name(&self) -> String {
        match self {
            Command::Fixed { .. } => "fixed".to_string(),
            Command::Rate { .. } => "rate".to_string(),
            Command::Preset { name, .. } => format!("preset-{}", name),
            Command::Presets => "presets".to_string(),
            Command::InitConfig { .. } => "init-config".to_string(),
        }
    }
}

fn duration_from_secs(what: &str, secs: f64) -> Result<Duration, EmitError> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| EmitError::InvalidPlan(format!("{} must be a non-negative number, got {}", what, secs)))
}

/// Exit status for a forced second Ctrl+C (128 + SIGINT)
const FORCED_EXIT_CODE: i32 = 130;

/// Flip the shutdown flag on the first Ctrl+C; exit immediately on the second
fn spawn_interrupt_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        info!("Received Ctrl+C, stopping... (press again to force exit)");
        let _ = shutdown_tx.send(true);

        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Second Ctrl+C, exiting now");
            std::process::exit(FORCED_EXIT_CODE);
        }
    });
}

async fn run_plan(plan: EmitPlan, shutdown_rx: watch::Receiver<bool>) -> Result<(), Box<dyn Error>> {
    let mut observer = LoggingObserver::new();
    emit(plan, Some(shutdown_rx), &mut observer).await?;
    info!("UDP sender closed");
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let _log_guard = init_logging(&cli.command.log_name(), cli.log_file, cli.debug)?;

    let config = match cli.command {
        // The file being initialized may not exist yet
        Command::InitConfig { .. } => EmitterConfig::default(),
        _ => EmitterConfig::load(cli.config.as_deref())?,
    };
    let target = &config.target;

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    match cli.command {
        Command::Fixed {
            host,
            port,
            count,
            interval_ms,
            progress_every,
        } => {
            let interval = duration_from_secs("interval_ms", interval_ms / 1000.0)?;
            let target = target.resolve(host, port);
            let plan = EmitPlan::fixed(target.host, target.port, count, interval)
                .with_progress_every(progress_every);

            spawn_interrupt_handler(shutdown_tx);
            run_plan(plan, shutdown_rx).await?;
        }
        Command::Rate {
            rate_mbps,
            duration_secs,
            host,
            port,
            progress_every,
        } => {
            info!("SpectraDAQ High-Rate Test Sender");
            info!("{}", "=".repeat(40));
            info!("Testing {} Mbps data rate", rate_mbps);

            let duration = duration_from_secs("duration", duration_secs)?;
            let target = target.resolve(host, port);
            let plan = EmitPlan::bitrate(target.host, target.port, rate_mbps, duration)
                .with_progress_every(progress_every);

            spawn_interrupt_handler(shutdown_tx);
            run_plan(plan, shutdown_rx).await?;
        }
        Command::Preset {
            name,
            host,
            port,
            no_wait,
        } => {
            let presets = config.presets()?;
            let Some(preset) = preset::find(&presets, &name) else {
                let known: Vec<&str> = presets.iter().map(|p| p.name.as_str()).collect();
                return Err(format!("Unknown preset '{}' (known: {})", name, known.join(", ")).into());
            };

            info!("Preset {}: {}", preset.name, preset.description);
            for step in &preset.instructions {
                info!("{}", step);
            }

            let target = target.resolve(host, port);
            let plan = preset.to_plan(target.host, target.port);
            plan.validate()?;

            spawn_interrupt_handler(shutdown_tx);

            if preset.wait_for_enter
                && !no_wait
                && !wait_for_enter(stdin_line()?, &mut shutdown_rx).await?
            {
                warn!("Stopped by user before sending");
                return Ok(());
            }

            run_plan(plan, shutdown_rx).await?;
        }
        Command::Presets => {
            for preset in config.presets()? {
                println!("{}", preset);
                if !preset.description.is_empty() {
                    println!("{:<16} {}", "", preset.description);
                }
            }
        }
        Command::InitConfig { force } => {
            let path = match cli.config {
                Some(path) => path,
                None => EmitterConfig::config_path().ok_or("Failed to determine config directory")?,
            };
            if path.exists() && !force {
                return Err(format!("{} already exists (use --force to overwrite)", path.display()).into());
            }
            config.save(&path)?;
        }
    }

    Ok(())
}
