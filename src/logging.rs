//! File-based logging module for jukebox-rs
//!
//! This module sets up tracing-based logging that writes to a file instead of stdout,
//! since stdout belongs to the interactive command prompt.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

const LOG_DIR: &str = ".logs";
const LOG_FILE_PREFIX: &str = "jukebox-rs";

/// Initialize the logging system.
///
/// Logs are written to `.logs/jukebox-rs.YYYY-MM-DD.log` with daily rotation.
/// The log level can be controlled via the `RUST_LOG` environment variable.
///
/// Default log levels:
/// - `jukebox_rs` modules: DEBUG
/// - `tokio_tungstenite` and `reqwest`: INFO
/// - Other crates: WARN
pub fn init_logging() -> anyhow::Result<()> {
    let log_dir = Path::new(LOG_DIR);
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir)?;
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, LOG_DIR, LOG_FILE_PREFIX);

    // Non-blocking so log writes never stall the runtime
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The guard flushes on drop; it has to live as long as the process
    Box::leak(Box::new(guard));

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("jukebox_rs=debug,tokio_tungstenite=info,reqwest=info,warn")
    });

    let fmt_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!("Logging initialized - logs written to {}/", LOG_DIR);

    Ok(())
}

/// Log the result of a dispatched command
#[macro_export]
macro_rules! log_command_result {
    ($route:expr, $result:expr) => {
        match &$result {
            Ok(_) => tracing::info!(route = $route, "Command accepted"),
            Err(e) => tracing::error!(route = $route, error = %e, "Command failed"),
        }
    };
}
