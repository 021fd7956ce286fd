use std::fs;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SHELLMATE_LOG";
const LOG_FILE: &str = "shellmate.log";
const QUIET_CRATES: &[&str] = &["hyper", "hyper_util", "reqwest", "rustls", "h2"];

pub enum LogTarget {
    Stderr,
    /// Terminal UI mode; the terminal is owned by the renderer.
    File,
}

fn build_filter(debug: bool) -> EnvFilter {
    let fallback = if debug { "debug" } else { "info" };
    let mut filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));
    for name in QUIET_CRATES {
        if let Ok(directive) = format!("{name}=warn").parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

pub fn log_file_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|dir| dir.join("shellmate").join(LOG_FILE))
}

/// Installs the global subscriber. Returns the log file path in file mode.
pub fn init(target: LogTarget, debug: bool) -> anyhow::Result<Option<PathBuf>> {
    let filter = build_filter(debug);
    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false),
                )
                .try_init()
                .context("failed to install log subscriber")?;
            Ok(None)
        }
        LogTarget::File => {
            let Some(path) = log_file_path() else {
                return Ok(None);
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create log dir {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("failed to open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(Mutex::new(file))
                        .with_ansi(false),
                )
                .try_init()
                .context("failed to install log subscriber")?;
            Ok(Some(path))
        }
    }
}
