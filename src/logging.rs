//! Logging initialisation via tracing-subscriber.
//!
//! Call [`init`] once at startup, after configuration is resolved.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::{BridgeError, Result};

/// Install the global subscriber, writing to stderr.
///
/// `level` is an `EnvFilter` directive such as `"info"` or
/// `"hostbridge=debug,warn"`. With `prefer_level`, `level` wins and
/// `RUST_LOG` is only the fallback for an invalid `level`; without it,
/// `RUST_LOG` wins and `level` is the fallback.
pub fn init(level: &str, prefer_level: bool) -> Result<()> {
    let filter = if prefer_level {
        match EnvFilter::try_new(level) {
            Ok(filter) => filter,
            Err(level_err) => EnvFilter::try_from_default_env().map_err(|env_err| {
                BridgeError::Logger(format!(
                    "invalid log level '{level}': {level_err}; RUST_LOG parse failed: {env_err}"
                ))
            })?,
        }
    } else {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level))
            .map_err(|e| BridgeError::Logger(format!("invalid log level '{level}': {e}")))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| BridgeError::Logger(format!("failed to set subscriber: {e}")))
}

/// Parse a plain level name.
pub fn parse_level(level: &str) -> Result<LevelFilter> {
    if level.is_empty() {
        return Err(BridgeError::Logger("log level must not be empty".into()));
    }
    level
        .parse::<LevelFilter>()
        .map_err(|_| BridgeError::Logger(format!("unrecognised log level: '{level}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_levels_parse() {
        for l in ["error", "warn", "info", "debug", "trace", "off"] {
            assert!(parse_level(l).is_ok(), "expected '{l}' to be valid");
        }
    }

    #[test]
    fn test_invalid_levels() {
        assert!(parse_level("verbose").is_err());
        assert!(parse_level("").is_err());
    }

    #[test]
    fn test_init_succeeds_or_already_set() {
        // Another test may have installed a subscriber first
        match init("info", true) {
            Ok(()) => {}
            Err(BridgeError::Logger(msg)) if msg.contains("set subscriber") => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
