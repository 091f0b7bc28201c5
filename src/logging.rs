use tracing_subscriber::EnvFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Env var naming the log file. Logging is off when unset.
pub const LOG_ENV: &str = "SCREENLETS_LOG";

/// Initialize tracing with optional file output.
///
/// Stdout carries the JSON events of the CLI, so logs only ever go to a
/// file: `{path}.{timestamp}.{pid}` when `SCREENLETS_LOG` is set.
pub fn init_tracing() {
    let Ok(log_path) = std::env::var(LOG_ENV) else {
        return;
    };

    let Some(path) = unique_log_path(&log_path) else {
        return;
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let Ok(file) = std::fs::File::create(&path) else {
        eprintln!("Warning: Failed to create log file: {}", path);
        return;
    };

    let file_layer = fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_level(true);

    if tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing already initialized");
    }
}

fn unique_log_path(base: &str) -> Option<String> {
    if base.trim().is_empty() {
        return None;
    }
    let pid = std::process::id();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Some(format!("{}.{}.{}", base, timestamp, pid))
}
