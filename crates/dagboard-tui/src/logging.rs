//! Tracing subscriber setup.
//!
//! The interactive screen owns stdout and stderr, so it logs to a daily file
//! under the configured log dir. Snapshot mode logs to stderr. `RUST_LOG`
//! overrides the configured level in both.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

use crate::config::Config;

pub const LOG_FILE_NAME: &str = "dagboard.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File,
}

/// Keeps the background file writer alive; drop flushes it.
#[derive(Debug, Default)]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Filter directive used when `RUST_LOG` is unset.
pub fn default_directive(level: &str) -> String {
    format!("warn,dagboard_core={level},dagboard_tui={level}")
}

pub fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive(level)))
}

pub fn init(config: &Config, target: LogTarget) -> Result<LoggingGuard, String> {
    let json = config.logging.format == "json";
    let filter = env_filter(&config.logging.level);

    let (layer, guard) = match target {
        LogTarget::Stderr => (stderr_layer(json, filter), None),
        LogTarget::File => {
            let (layer, guard) = file_layer(&config.log_dir(), json, filter)?;
            (layer, Some(guard))
        }
    };

    tracing_subscriber::registry()
        .with(vec![layer])
        .try_init()
        .map_err(|err| format!("init logging: {err}"))?;

    tracing::debug!(?target, format = %config.logging.format, "logging initialised");
    Ok(LoggingGuard { _file: guard })
}

fn stderr_layer(json: bool, filter: EnvFilter) -> BoxedLayer {
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);
    if json {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.with_filter(filter).boxed()
    }
}

fn file_layer(
    log_dir: &Path,
    json: bool,
    filter: EnvFilter,
) -> Result<(BoxedLayer, WorkerGuard), String> {
    std::fs::create_dir_all(log_dir)
        .map_err(|err| format!("create log dir {}: {err}", log_dir.display()))?;
    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_names(true);
    let layer = if json {
        layer.json().with_filter(filter).boxed()
    } else {
        layer.with_filter(filter).boxed()
    };
    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::default_directive;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn default_directive_scopes_our_crates() {
        let directive = default_directive("debug");
        assert!(directive.starts_with("warn,"));
        assert!(directive.contains("dagboard_core=debug"));
        assert!(directive.contains("dagboard_tui=debug"));
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
