/// Tracing setup.
///
/// The terminal belongs to the UI, so events go to `<data_dir>/snakehost.log`
/// (appended, no ANSI colors). The filter comes from `SNAKEHOST_LOG`, then
/// `[general] log_filter`, then `info`.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_ENV: &str = "SNAKEHOST_LOG";
pub const LOG_FILE: &str = "snakehost.log";

pub fn init(data_dir: &Path, configured: &str) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data directory {}", data_dir.display()))?;
    let path = data_dir.join(LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("opening log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
        .with(filter(configured))
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(path)
}

fn filter(configured: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

