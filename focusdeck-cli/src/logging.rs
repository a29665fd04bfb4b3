//! Tracing setup. The TUI owns stdout, so interactive sessions log to a
//! file; headless runs log to stderr.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "FOCUSDECK_LOG";
const DEFAULT_FILTER: &str = "focusdeck=info";

#[derive(Clone, Debug)]
pub enum LogTarget {
    File(PathBuf),
    Stderr,
}

pub fn default_log_file() -> PathBuf {
    std::env::temp_dir().join("focusdeck.log")
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

pub fn init(target: &LogTarget) -> io::Result<()> {
    let registry = tracing_subscriber::registry().with(env_filter());
    let installed = match target {
        LogTarget::File(path) => {
            let file = open_log_file(path)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()
        }
        LogTarget::Stderr => registry
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .try_init(),
    };
    installed.map_err(|e| io::Error::other(e.to_string()))
}

fn open_log_file(path: &Path) -> io::Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::OpenOptions::new().create(true).append(true).open(path)
}
