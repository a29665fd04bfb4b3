mod app;
mod backend;
mod headless;
mod logging;
mod panels;
mod tui;
mod ui;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::runtime::Handle;
use tracing::{error, info};

use focusdeck_core::config::{ConfigError, FocusdeckConfig};
use focusdeck_core::keys::Key;
use focusdeck_core::result::{IntegrationResult, result_path_from_env};

use app::App;
use backend::{DemoBackend, GitBackend, RepoBackend};
use logging::LogTarget;

#[derive(Parser)]
#[command(name = "focusdeck")]
#[command(about = "Browse git worktrees and stash entries in a panel-based TUI", long_about = None)]
struct Cli {
    /// Use canned data instead of the git repository in the current directory
    #[arg(long, global = true)]
    demo: bool,

    /// Log file for interactive sessions
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Config file (skips discovery)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    Tui,
    /// Replay a key sequence without a terminal and write a result file
    Headless {
        /// Comma-separated key specs, e.g. "j,j,<enter>"
        #[arg(long)]
        keys: String,
        /// Result file path; defaults to $FOCUSDECK_RESULT_PATH
        #[arg(long)]
        result: Option<PathBuf>,
    },
}

fn load_config(explicit: Option<&Path>) -> Result<FocusdeckConfig, ConfigError> {
    if let Some(path) = explicit {
        return FocusdeckConfig::load(path);
    }
    let cwd = std::env::current_dir()?;
    match FocusdeckConfig::discover(&cwd) {
        Ok((path, config)) => {
            info!(path = %path.display(), "loaded config");
            Ok(config)
        }
        Err(ConfigError::NotFound { .. }) => Ok(FocusdeckConfig::default()),
        Err(e) => Err(e),
    }
}

fn open_backend(demo: bool) -> io::Result<Arc<dyn RepoBackend>> {
    if demo {
        return Ok(Arc::new(DemoBackend::new()));
    }
    let cwd = std::env::current_dir()?;
    GitBackend::discover(&cwd)
        .map(|b| Arc::new(b) as Arc<dyn RepoBackend>)
        .map_err(|e| io::Error::other(format!("{e} (try --demo)")))
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let cli = Cli::parse();

    let log_target = match &cli.command {
        Some(Commands::Headless { .. }) => LogTarget::Stderr,
        _ => LogTarget::File(cli.log_file.clone().unwrap_or_else(logging::default_log_file)),
    };
    if let Err(e) = logging::init(&log_target) {
        eprintln!("Error: cannot initialise logging: {}", e);
    }

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let backend = match open_backend(cli.demo) {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut app = match App::new(config, backend, Handle::current()) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Headless { keys, result }) => run_headless(&mut app, &keys, result).await,
        Some(Commands::Tui) | None => tui::run(&mut app).await,
    }
}

async fn run_headless(app: &mut App, keys: &str, result: Option<PathBuf>) -> io::Result<()> {
    let result_path = result.or_else(result_path_from_env);

    let outcome = match Key::parse_sequence(keys) {
        Ok(keys) => headless::run(app, &keys, result_path.as_deref()).await,
        Err(message) => {
            let failure = IntegrationResult::failure(message);
            match &result_path {
                Some(path) => failure.write(path).map(|_| failure),
                None => Ok(failure),
            }
        }
    };

    match outcome {
        Ok(result) if result.success => {
            println!("{}", result.message);
            Ok(())
        }
        Ok(result) => {
            eprintln!("Failed: {}", result.message);
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "headless run failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
