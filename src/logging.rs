//! Tracing setup. The terminal belongs to the ui, so log records only go to a
//! file and only when one is requested.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing::{Level, debug};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::domain::DirectoryError;

/// Maps the number of `-v` flags to a level.
pub fn verbosity_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `verbose`.
/// Returns false when a subscriber was already in place.
pub fn init_logging(log_file: Option<&Path>, verbose: u8) -> Result<bool, DirectoryError> {
    let default_filter = format!("stafftravel={}", verbosity_level(verbose));
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let file_layer = match log_file {
        Some(path) => {
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false)
                    .with_target(true),
            )
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(ErrorLayer::default())
        .try_init();
    match installed {
        Ok(()) => Ok(true),
        Err(e) => {
            debug!("Keeping the existing subscriber: {e}");
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(verbosity_level(0), Level::WARN);
        assert_eq!(verbosity_level(1), Level::INFO);
        assert_eq!(verbosity_level(2), Level::DEBUG);
        assert_eq!(verbosity_level(7), Level::TRACE);
    }

    #[test]
    fn init_without_file_does_not_fail() {
        assert!(init_logging(None, 0).is_ok());
        assert!(init_logging(None, 3).is_ok());
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        init_logging(None, 1).unwrap();
        assert!(!init_logging(None, 1).unwrap());
    }
}
