//! Tracing subscriber setup.
//!
//! The filter is read from `STRATA_LOG`, falling back to `RUST_LOG`, with the
//! usual directive syntax (`debug`, `strata_incremental=trace`). The output
//! format is chosen by `STRATA_LOG_FORMAT`: `text` (default) or `json`.
//!
//! Nothing is installed when neither variable is set and `--verbose` was not
//! given. Log lines always go to stderr; stdout is reserved for command
//! output.

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Log line format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    fn from_env() -> Self {
        Self::parse(&std::env::var("STRATA_LOG_FORMAT").unwrap_or_default())
    }
}

fn build_filter(verbose: bool) -> Option<EnvFilter> {
    if verbose {
        return Some(EnvFilter::new("debug"));
    }
    if let Ok(value) = std::env::var("STRATA_LOG") {
        return Some(EnvFilter::builder().parse_lossy(value));
    }
    if std::env::var("RUST_LOG").is_ok() {
        return Some(EnvFilter::from_default_env());
    }
    None
}

/// Installs the global subscriber, if logging was asked for.
pub fn init_tracing(verbose: bool) {
    let Some(filter) = build_filter(verbose) else {
        return;
    };
    // A second installation fails harmlessly; the first subscriber stays.
    let _ = match LogFormat::from_env() {
        LogFormat::Json => Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_names() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("text"), LogFormat::Text);
        assert_eq!(LogFormat::parse(""), LogFormat::Text);
    }

    #[test]
    fn verbose_always_filters() {
        assert!(build_filter(true).is_some());
    }
}
