use anyhow::Context;
use std::{
    fs,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};
use tokio::task;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Keeps the non-blocking file writer alive; drop it last.
#[allow(dead_code)]
pub struct LoggerGuard(WorkerGuard);

/// Normalise a configured level name, falling back to `info`.
pub fn normalize_level(level: &str) -> &str {
    match level {
        "trace" | "debug" | "info" | "warn" | "error" => level,
        _ => "info",
    }
}

pub fn init_logging(log_dir: impl AsRef<Path>, prefix: &str, level: &str) -> anyhow::Result<LoggerGuard> {
    let log_dir = log_dir.as_ref().to_path_buf();

    let normalized = normalize_level(level);
    let directive: Directive = normalized
        .parse()
        .with_context(|| format!("Invalid log level '{}'", normalized))?;
    let builder = EnvFilter::builder().with_default_directive(directive);

    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(&log_dir)
        .with_context(|| format!("Failed to create file appender in {:?}", log_dir))?;
    let (non_blocking, guard) = NonBlocking::new(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(file_filter);
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if normalized != level {
        tracing::warn!("Invalid log level '{}', defaulting to 'info'", level);
    }

    start_log_cleanup_task(log_dir, prefix.to_string());

    Ok(LoggerGuard(guard))
}

fn start_log_cleanup_task(log_dir: PathBuf, prefix: String) {
    const MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 3);
    const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

    task::spawn(async move {
        loop {
            if let Err(e) = cleanup_old_logs(&log_dir, &prefix, MAX_AGE) {
                tracing::warn!("Failed to delete old log file: {}", e);
            }
            tokio::time::sleep(CLEANUP_INTERVAL).await;
        }
    });
}

fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_age: Duration) -> std::io::Result<usize> {
    let now = SystemTime::now();
    let mut removed = 0;

    for entry in fs::read_dir(log_dir)? {
        let entry = entry?;
        let path = entry.path();

        if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
            if file_name.starts_with(prefix) && file_name.ends_with(".log") {
                let metadata = fs::metadata(&path)?;
                if let Ok(modified) = metadata.modified() {
                    if now.duration_since(modified).unwrap_or_default() > max_age {
                        fs::remove_file(&path)?;
                        removed += 1;
                        tracing::info!("Old log file deleted: {}", file_name);
                    }
                }
            }
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::{FileTime, set_file_mtime};
    use tempfile::TempDir;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level("debug"), "debug");
        assert_eq!(normalize_level("verbose"), "info");
    }

    #[test]
    fn test_cleanup_only_removes_old_prefixed_logs() {
        let temp_dir = TempDir::new().unwrap();
        let old_log = temp_dir.path().join("orbwatch.2026-01-01.log");
        let new_log = temp_dir.path().join("orbwatch.2026-10-16.log");
        let other = temp_dir.path().join("other.2026-01-01.log");
        for p in [&old_log, &new_log, &other] {
            fs::write(p, "x").unwrap();
        }

        let week_ago = SystemTime::now() - Duration::from_secs(7 * 24 * 3600);
        set_file_mtime(&old_log, FileTime::from_system_time(week_ago)).unwrap();
        set_file_mtime(&other, FileTime::from_system_time(week_ago)).unwrap();

        let removed = cleanup_old_logs(temp_dir.path(), "orbwatch", Duration::from_secs(3 * 24 * 3600)).unwrap();
        assert_eq!(removed, 1);
        assert!(!old_log.exists());
        assert!(new_log.exists());
        assert!(other.exists());
    }
}
