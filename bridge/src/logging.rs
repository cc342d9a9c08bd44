use std::{path::Path, sync::Mutex};

use file_rotate::{compression::Compression, suffix::AppendCount, ContentLimit, FileRotate};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_MAX_BYTES: usize = 200_000;
pub const LOG_BACKUPS: usize = 9;

pub fn log_file_name(project: &str) -> String {
    format!("{project}.log")
}

fn rotating_file(path: impl AsRef<Path>) -> FileRotate<AppendCount> {
    #[cfg(unix)]
    let file = FileRotate::new(
        path,
        AppendCount::new(LOG_BACKUPS),
        ContentLimit::Bytes(LOG_MAX_BYTES),
        Compression::None,
        None,
    );
    #[cfg(not(unix))]
    let file = FileRotate::new(
        path,
        AppendCount::new(LOG_BACKUPS),
        ContentLimit::Bytes(LOG_MAX_BYTES),
        Compression::None,
    );
    file
}

/// Console plus size-rotated `<project>.log`. `RUST_LOG` overrides the
/// default `debug` filter.
pub fn init(project: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let file = rotating_file(log_file_name(project));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()?;
    Ok(())
}
