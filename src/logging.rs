//! Stderr logging for the sidecar.
//!
//! Stdout carries the JSON-line protocol, so every log line goes to stderr.
//! The filter comes from `ROSTERD_LOG`, then `RUST_LOG`, then `info`.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub const ENV_LOG: &str = "ROSTERD_LOG";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("failed to install global tracing subscriber: {0}")]
    SetGlobal(#[from] tracing_subscriber::util::TryInitError),
}

fn filter_directive() -> String {
    std::env::var(ENV_LOG)
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string())
}

/// Installs the global subscriber. Callers may ignore the error and run
/// without logs.
pub fn init() -> Result<(), LoggingError> {
    let directive = filter_directive();
    let filter = EnvFilter::try_new(&directive).map_err(|source| LoggingError::Filter {
        directive: directive.clone(),
        source,
    })?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(false),
        )
        .try_init()?;
    Ok(())
}
