//! Diagnostic logging to an append-only file.
//!
//! Retry warnings and other diagnostics go to the configured log file as
//! `timestamp : level : target : message` lines. Stdout stays clean for the
//! query output. `RUST_LOG` overrides the configured level.

use std::fs::OpenOptions;
use std::sync::{Arc, Once};

use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogConfig;
use crate::error::Result;

static INIT: Once = Once::new();

/// Full datetime for a log file: YYYY-MM-DD HH:MM:SS.mmm
struct FileTime;

impl FormatTime for FileTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Initialize logging once. Safe to call multiple times; only the first call
/// takes effect. Opens the log file in append mode so runs accumulate.
pub fn init(config: &LogConfig) -> Result<()> {
    if let Some(parent) = config.path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.path)?;

    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(&config.level)
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_timer(FileTime)
            .with_level(true)
            .with_writer(Arc::new(file))
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });

    Ok(())
}
