// Muzak - Background music for terminal sessions
// Started as a tiny wrapper around the OS audio player, grew modes for
// wrapped commands and host lifecycle hooks

use anyhow::Result;
use clap::{Parser, Subcommand};
use muzak::{Config, Muzak, ShutdownSignals};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "muzak")]
#[command(about = "Random background music while you work", version)]
struct Cli {
    /// Play from this directory instead of the configured library
    #[arg(long, value_name = "DIR", global = true)]
    music_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a random track until ESC, q or Ctrl+C
    Start,
    /// Stop the running session, if any
    Stop,
    /// Play music while a command runs, passing its exit status through
    Run {
        /// Command line to execute
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
    /// Non-blocking start/stop for an external host's task lifecycle
    Hook {
        #[command(subcommand)]
        action: HookAction,
    },
}

#[derive(Subcommand)]
enum HookAction {
    /// Begin playback and return immediately
    Start,
    /// End playback and return immediately
    Stop,
}

fn init_logging() -> Result<()> {
    // Keep logs out of the terminal; hook mode needs stdout clean for the
    // host and interactive mode owns the screen.
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("muzak")
        .join("logs");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(&log_dir, "muzak.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Base filter: info level for general logs, debug for muzak
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,muzak=debug"));

    let subscriber = tracing_subscriber::fmt()
        .with_writer(file_writer)
        .with_target(true)
        .with_level(true)
        .with_ansi(false)
        .with_env_filter(filter)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    // Prevent the guard from being dropped, or the writer thread stops
    std::mem::forget(guard);

    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging() {
        // An unwritable data dir should not take the music down with it
        eprintln!("⚠️  Logging disabled: {e:#}");
    }

    match dispatch(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn dispatch(cli: Cli) -> Result<ExitCode> {
    // Load config - falls back to defaults if missing
    let mut config = Config::load()?;
    if let Some(dir) = cli.music_dir {
        config.music_dir = dir;
    }

    let session = Muzak::new(config);

    match cli.command {
        Commands::Start => {
            // Register before playback begins so an early Ctrl+C still
            // cleans up.
            let signals = ShutdownSignals::register()?;
            info!("interactive session requested");
            session.start_interactive(&signals)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Stop => {
            // Stop is a promise, not a query: it exits 0 even when there
            // was nothing to do or the marker was half-broken.
            if let Err(e) = session.stop(false) {
                warn!("stop failed: {e:#}");
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { command } => {
            let signals = ShutdownSignals::register()?;
            let code = session.run_with_music(&command, &signals)?;
            Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
        }
        Commands::Hook { action } => {
            match action {
                HookAction::Start => session.hook_start()?,
                HookAction::Stop => session.hook_stop()?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
