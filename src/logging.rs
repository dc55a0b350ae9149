// Logging setup: tracing-subscriber with a console layer and an optional file layer.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::BootstrapError;

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable text: timestamp LEVEL target: message
    #[default]
    Text,
    /// JSON Lines for log shippers
    Json,
}

impl LogFormat {
    pub fn from_name(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" | "jsonl" => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

// Gateway and HTTP internals are chatty at info.
const NOISY: &[(&str, &str)] = &[
    ("serenity", "warn"),
    ("tungstenite", "warn"),
    ("tokio_tungstenite", "warn"),
    ("hyper", "warn"),
    ("h2", "warn"),
    ("rustls", "warn"),
    ("sqlx", "warn"),
];

/// Build the filter from `RUST_LOG`, or `info` with noisy crates quieted when unset.
fn build_env_filter(rust_log: Option<&str>) -> Result<EnvFilter, BootstrapError> {
    let filter_str = match rust_log.map(str::trim).filter(|s| !s.is_empty()) {
        Some(directives) => directives.to_string(),
        None => {
            let mut directives = vec!["info".to_string()];
            for (target, lvl) in NOISY {
                directives.push(format!("{target}={lvl}"));
            }
            directives.join(",")
        }
    };
    EnvFilter::try_new(&filter_str)
        .map_err(|e| BootstrapError::Logging(format!("invalid filter '{filter_str}': {e}")))
}

/// Install the global subscriber.
///
/// Console output always goes to stdout; when `file_path` is set, the same
/// events are appended to that file without ANSI colours.
pub fn init_logging(format: LogFormat, file_path: Option<&Path>) -> Result<(), BootstrapError> {
    let rust_log = std::env::var("RUST_LOG").ok();

    let console_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(build_env_filter(rust_log.as_deref())?)
            .boxed(),
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(build_env_filter(rust_log.as_deref())?)
            .boxed(),
    };

    let file_layer = match file_path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let writer = Mutex::new(file);
            let layer = match format {
                LogFormat::Json => tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(writer)
                    .with_target(true)
                    .with_filter(build_env_filter(rust_log.as_deref())?)
                    .boxed(),
                LogFormat::Text => tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .with_target(true)
                    .with_filter(build_env_filter(rust_log.as_deref())?)
                    .boxed(),
            };
            Some(layer)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| BootstrapError::Logging(e.to_string()))?;

    tracing::debug!(?format, file = ?file_path, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_name() {
        assert_eq!(LogFormat::from_name("json"), LogFormat::Json);
        assert_eq!(LogFormat::from_name(" JSONL "), LogFormat::Json);
        assert_eq!(LogFormat::from_name("text"), LogFormat::Text);
        assert_eq!(LogFormat::from_name("anything"), LogFormat::Text);
    }

    #[test]
    fn test_default_filter_quiets_noisy_crates() {
        let filter = build_env_filter(None).unwrap().to_string();
        assert!(filter.contains("serenity=warn"));
        assert!(filter.contains("sqlx=warn"));
    }

    #[test]
    fn test_rust_log_is_used_verbatim() {
        let filter = build_env_filter(Some("debug,ratbot=trace")).unwrap().to_string();
        assert!(filter.contains("ratbot=trace"));
        assert!(!filter.contains("serenity"));
    }

    #[test]
    fn test_invalid_filter_is_error() {
        assert!(matches!(
            build_env_filter(Some("ratbot=notalevel")),
            Err(BootstrapError::Logging(_))
        ));
    }
}
