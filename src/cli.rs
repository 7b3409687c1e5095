//! # CLI Module
//!
//! Command-line interface for h5lookup:
//! - Argument parsing with clap, including negative coordinates as positionals
//! - Configuration file loading (JSON/YAML) and `H5LOOKUP_` environment overrides
//! - Subcommands for lookups, dataset inspection and shell completions

use crate::config::{ConfigError, IndexingMode, LookupConfig};
use crate::info::{
    format_info_csv, format_info_human, format_info_json, format_info_yaml, get_dataset_info,
};
use crate::log::{outcome_echo, request_echo};
use crate::lookup::{LookupOutcome, LookupRequest, run_lookup};
use crate::reader::NetcdfReader;
use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

/// Nearest-neighbor geolocation lookup for HDF5 / netCDF-4 datasets
#[derive(Parser, Debug)]
#[command(name = "h5lookup")]
#[command(about = "Read dataset variables at the grid cell nearest to a latitude/longitude")]
#[command(version)]
#[command(long_about = "
h5lookup finds the cell of a satellite swath or model grid whose recorded
latitude and longitude are closest to a target point, then reads one or more
variables at that cell. Variables on coarser or finer grids than the
coordinates are read at the proportionally rescaled index.

OUTPUT:
  One line per match on stdout:
    target_lat target_lon distance_km cell_lat cell_lon value1 [value2 ...]
  Nothing is printed when the nearest cell is too far away or no cell is valid.

EXAMPLES:
  # Satellite zenith angle at Tucson
  h5lookup lookup GDNBO_npp_d20180101.h5 \\
    /All_Data/VIIRS-DNB-GEO_All/SatelliteZenithAngle \\
    /All_Data/VIIRS-DNB-GEO_All/Latitude /All_Data/VIIRS-DNB-GEO_All/Longitude \\
    32.13 -111.09

  # List the variables of a file
  h5lookup info GDNBO_npp_d20180101.h5

  # Generate completions
  h5lookup completions bash > ~/.bash_completion.d/h5lookup
")]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet mode - suppress all diagnostics except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file path (JSON or YAML)
    #[arg(short, long, global = true, env = "H5LOOKUP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Read variables at the cell nearest to a target point
    #[command(long_about = "
Read one or more variables at the grid cell nearest to a target point.

Arguments, in order:
  FILE            dataset to open
  VARIABLE...     one or more variable paths, e.g. /All_Data/Group/Name
  LATITUDE        latitude variable path
  LONGITUDE       longitude variable path
  TARGET_LAT      target latitude in degrees
  TARGET_LON      target longitude in degrees

Each path is split at its last '/' into group and variable name. Coordinates
at or below -9999 are treated as fill and skipped.

EXAMPLES:
  # Two variables, western hemisphere target
  h5lookup lookup swath.h5 /Data/Radiance /Data/QF /Geo/Latitude /Geo/Longitude 32.13 -111.09

  # Accept matches up to 40 km away
  h5lookup lookup swath.h5 /Data/Radiance /Geo/Latitude /Geo/Longitude 32.13 -111.09 \\
    --max-distance-km 40
")]
    Lookup {
        /// Dataset file path
        #[arg(value_name = "FILE")]
        file: String,

        /// VARIABLE... LATITUDE LONGITUDE TARGET_LAT TARGET_LON
        #[arg(
            value_name = "ARGS",
            num_args = 5..,
            required = true,
            allow_negative_numbers = true
        )]
        args: Vec<String>,

        /// Maximum accepted distance to the nearest cell, in kilometers
        #[arg(long, value_parser = parse_distance_km)]
        max_distance_km: Option<f64>,

        /// How integer variables are indexed at the matched cell
        #[arg(long, value_enum)]
        integer_indexing: Option<IndexingMode>,
    },

    /// Show the variables of a dataset
    #[command(long_about = "
Inspect a dataset and list its variables with element kind, byte width and shape.

EXAMPLES:
  # All variables
  h5lookup info swath.h5

  # One variable, by full path or bare name
  h5lookup info swath.h5 -n /All_Data/VIIRS-DNB-GEO_All/Latitude

  # Global attributes too, as JSON
  h5lookup info swath.h5 --detailed --format json
")]
    Info {
        /// Dataset file path
        file: String,

        /// Include global attributes
        #[arg(long)]
        detailed: bool,

        /// Show only this variable
        #[arg(short = 'n', long)]
        variable: Option<String>,

        /// Output format for file information
        #[arg(long, value_enum, default_value_t = OutputFormat::Human)]
        format: OutputFormat,
    },

    /// Generate shell completions
    #[command(long_about = "
Generate shell completion scripts for bash, zsh, fish, elvish and PowerShell.

INSTALLATION:
  # Bash
  h5lookup completions bash > ~/.bash_completion.d/h5lookup

  # Zsh
  h5lookup completions zsh > ~/.zsh/completions/_h5lookup

  # Fish
  h5lookup completions fish > ~/.config/fish/completions/h5lookup.fish
")]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,

        /// Output file path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON structured output
    Json,
    /// YAML structured output
    Yaml,
    /// CSV output, variables only
    Csv,
}

/// Parse a positive, finite distance in kilometers
fn parse_distance_km(s: &str) -> Result<f64, String> {
    let distance: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid distance: '{}'", s))?;
    if !distance.is_finite() || distance <= 0.0 {
        return Err(format!("Distance must be positive: '{}'", s));
    }
    Ok(distance)
}

fn parse_coordinate(name: &str, s: &str) -> Result<f64, String> {
    let value: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid {}: '{}'", name, s))?;
    if !value.is_finite() {
        return Err(format!("Invalid {}: '{}'", name, s));
    }
    Ok(value)
}

/// Splits `VARIABLE... LATITUDE LONGITUDE TARGET_LAT TARGET_LON` into a request.
pub fn parse_lookup_args(args: &[String]) -> Result<LookupRequest, String> {
    let [variables @ .., latitude, longitude, target_lat, target_lon] = args else {
        return Err(format!(
            "Expected VARIABLE... LATITUDE LONGITUDE TARGET_LAT TARGET_LON, got {} value(s)",
            args.len()
        ));
    };
    if variables.is_empty() {
        return Err("At least one variable path is required".to_string());
    }

    let target_lat = parse_coordinate("target latitude", target_lat)?;
    let target_lon = parse_coordinate("target longitude", target_lon)?;

    Ok(LookupRequest::new(
        variables.to_vec(),
        latitude.as_str(),
        longitude.as_str(),
        target_lat,
        target_lon,
    ))
}

/// Defaults, then the `--config` file, then the environment.
pub fn load_config(cli: &Cli) -> Result<LookupConfig, ConfigError> {
    LookupConfig::load(cli.config.as_deref())
}

/// Runs the parsed command, writing results to `out`.
pub fn execute<W: Write>(cli: &Cli, config: LookupConfig, out: &mut W) -> Result<()> {
    match &cli.command {
        Commands::Lookup {
            file,
            args,
            max_distance_km,
            integer_indexing,
        } => {
            let config = config.with_overrides(*max_distance_km, *integer_indexing);
            config.validate().context("Invalid lookup configuration")?;
            let request = parse_lookup_args(args).map_err(anyhow::Error::msg)?;
            request_echo(file, &request, &config);

            let reader = NetcdfReader::open(file)
                .with_context(|| format!("Failed to open dataset: {}", file))?;
            let outcome = run_lookup(&reader, &request, &config)
                .with_context(|| format!("Lookup failed in {}", file))?;
            outcome_echo(&outcome);

            if let LookupOutcome::Match(record) = &outcome {
                writeln!(out, "{}", record.format_line())?;
            }
            reader.close().context("Failed to close dataset")?;
        }
        Commands::Info {
            file,
            detailed,
            variable,
            format,
        } => {
            let info = get_dataset_info(file, variable.as_deref(), *detailed)?;
            let rendered = match format {
                OutputFormat::Human => format_info_human(&info),
                OutputFormat::Json => format_info_json(&info)? + "\n",
                OutputFormat::Yaml => format_info_yaml(&info)?,
                OutputFormat::Csv => format_info_csv(&info),
            };
            out.write_all(rendered.as_bytes())?;
        }
        Commands::Completions { shell, output } => {
            let mut command = Cli::command();
            match output {
                Some(path) => {
                    let mut file = File::create(path).with_context(|| {
                        format!("Failed to create completions file: {}", path.display())
                    })?;
                    clap_complete::generate(*shell, &mut command, "h5lookup", &mut file);
                }
                None => clap_complete::generate(*shell, &mut command, "h5lookup", out),
            }
        }
    }
    Ok(())
}
