use crate::config::LookupConfig;
use crate::lookup::{LookupOutcome, LookupRequest};
use env_logger::{Builder, Target};
use log::{LevelFilter, SetLoggerError, debug};
use std::env;

/// Level used when neither a flag, `RUST_LOG` nor the config asks for one.
pub const DEFAULT_LEVEL: LevelFilter = LevelFilter::Warn;

/// Level implied by the `--verbose` / `--quiet` flags, if any.
pub fn flag_level(verbose: bool, quiet: bool) -> Option<LevelFilter> {
    match (verbose, quiet) {
        (true, _) => Some(LevelFilter::Debug),
        (false, true) => Some(LevelFilter::Error),
        (false, false) => None,
    }
}

/// Builds the stderr logger from the single highest-priority source.
///
/// Flags win over `RUST_LOG`, which wins over the config file's `log_level`.
/// Only the winning source is applied, so module filters from a lower
/// source never leak through. Blank filter strings count as unset.
pub fn logger_builder(
    verbose: bool,
    quiet: bool,
    rust_log: Option<&str>,
    config_level: Option<&str>,
) -> Builder {
    let mut builder = Builder::new();
    builder.filter_level(DEFAULT_LEVEL);

    let filters = [rust_log, config_level]
        .into_iter()
        .flatten()
        .find(|filters| !filters.trim().is_empty());
    match (flag_level(verbose, quiet), filters) {
        (Some(level), _) => {
            builder.filter_level(level);
        }
        (None, Some(filters)) => {
            builder.parse_filters(filters);
        }
        (None, None) => {}
    }

    builder
        .target(Target::Stderr)
        .format_timestamp(None)
        .format_module_path(false);
    builder
}

/// Installs the stderr logger, reading `RUST_LOG` from the environment.
pub fn init_logging(
    verbose: bool,
    quiet: bool,
    config_level: Option<&str>,
) -> Result<(), SetLoggerError> {
    let rust_log = env::var("RUST_LOG").ok();
    logger_builder(verbose, quiet, rust_log.as_deref(), config_level).try_init()
}

pub fn request_echo(file: &str, request: &LookupRequest, config: &LookupConfig) {
    debug!("Dataset: {}", file);
    debug!("  Latitude: {}", request.latitude);
    debug!("  Longitude: {}", request.longitude);
    for (i, variable) in request.variables.iter().enumerate() {
        debug!("  Variable {}: {}", i + 1, variable);
    }
    debug!("  Target: {}, {}", request.target_lat, request.target_lon);
    debug!(
        "  Max distance: {} km, integer indexing: {}",
        config.max_distance_km, config.integer_indexing
    );
}

pub fn outcome_echo(outcome: &LookupOutcome) {
    match outcome {
        LookupOutcome::Match(record) => debug!(
            "Matched cell [{}, {}] with {} value(s)",
            record.row,
            record.col,
            record.values.len()
        ),
        LookupOutcome::NoMatch => debug!("No valid coordinate in dataset"),
        LookupOutcome::TooFar { cell, distance_km } => debug!(
            "Nearest cell [{}, {}] is {:.4} km away, no output",
            cell.row, cell.col, distance_km
        ),
    }
}
