//! # h5lookup
//!
//! Nearest-neighbor geolocation lookup for HDF5-based satellite and model
//! datasets.
//!
//! Given a target latitude/longitude, the crate finds the grid cell whose
//! recorded coordinates are closest on the sphere, then reads one or more
//! variables at that cell. Variables stored on a grid of a different
//! resolution than the coordinates are read at the proportionally rescaled
//! index.
//!
//! ## Features
//!
//! - **Typed N-dimensional arrays**: 1 to 3 dimensional arrays over a closed set of
//!   element kinds, with lossless conversion to and from flat row-major buffers
//! - **Great-circle search**: full-grid nearest cell search that skips fill values
//! - **Resolution rescaling**: proportional index mapping between grids
//! - **Pluggable readers**: netCDF-4 / HDF5 files or in-memory buffers
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use h5lookup::config::LookupConfig;
//! use h5lookup::lookup::{run_lookup, LookupOutcome, LookupRequest};
//! use h5lookup::reader::NetcdfReader;
//!
//! let reader = NetcdfReader::open("GDNBO_npp_d20180101_t0859256.h5")?;
//! let request = LookupRequest::new(
//!     vec!["/All_Data/VIIRS-DNB-GEO_All/SatelliteZenithAngle".to_string()],
//!     "/All_Data/VIIRS-DNB-GEO_All/Latitude",
//!     "/All_Data/VIIRS-DNB-GEO_All/Longitude",
//!     32.13,
//!     -111.09,
//! );
//!
//! if let LookupOutcome::Match(record) = run_lookup(&reader, &request, &LookupConfig::default())? {
//!     println!("{}", record);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! max_distance_km: 15.0
//! integer_indexing: grid
//! log_level: h5lookup=debug
//! ```

pub mod array;
pub mod cli;
pub mod config;
pub mod geo;
pub mod info;
pub mod kind;
pub mod log;
pub mod lookup;
pub mod reader;

#[cfg(test)]
mod tests;
