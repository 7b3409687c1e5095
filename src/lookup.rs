//! # Lookup Driver
//!
//! Ties the pieces together for one target point:
//!
//! 1. read the latitude and longitude variables into a [`CoordinateGrid`]
//! 2. find the nearest valid cell
//! 3. accept it only when it lies closer than the configured radius
//! 4. rescale the cell index onto each requested variable's grid and read the
//!    value there
//!
//! The result is a [`LookupOutcome`]. Only a [`LookupOutcome::Match`] produces
//! an output line; a missing or distant cell is not an error.
//!
//! ## Example
//!
//! ```rust
//! use h5lookup::config::LookupConfig;
//! use h5lookup::lookup::{run_lookup, LookupOutcome, LookupRequest};
//! use h5lookup::reader::MemoryReader;
//!
//! let reader = MemoryReader::new()
//!     .with_values("/geo/lat", &[2, 2], &[10.0f32, 10.0, 10.1, 10.1])?
//!     .with_values("/geo/lon", &[2, 2], &[20.0f32, 20.1, 20.0, 20.1])?
//!     .with_values("/data/count", &[2, 2], &[1u16, 2, 3, 4])?;
//!
//! let request = LookupRequest::new(vec!["/data/count".into()], "/geo/lat", "/geo/lon", 10.1, 20.1);
//! match run_lookup(&reader, &request, &LookupConfig::default())? {
//!     LookupOutcome::Match(record) => assert!(record.format_line().ends_with(" 4")),
//!     other => panic!("unexpected outcome {:?}", other),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::array::{ArrayError, Shape};
use crate::config::{IndexingMode, LookupConfig};
use crate::geo::{CoordinateGrid, GeoCell, GeoError, distance_km, find_nearest, rescale_index};
use crate::kind::{ElementKind, Scalar};
use crate::reader::{DatasetReader, ReaderError, VariablePath};
use log::debug;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error(transparent)]
    Reader(#[from] ReaderError),

    #[error(transparent)]
    Array(#[from] ArrayError),

    #[error(transparent)]
    Geo(#[from] GeoError),

    #[error("Variable '{variable}' of kind {kind} has no printable representation")]
    Unrenderable { variable: String, kind: ElementKind },

    #[error("Index {index:?} is outside variable '{variable}' with shape {shape}")]
    IndexOutOfRange {
        variable: String,
        index: Vec<usize>,
        shape: Shape,
    },
}

/// One lookup: which variables to read, where the coordinates live, and the
/// target point in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRequest {
    pub variables: Vec<String>,
    pub latitude: String,
    pub longitude: String,
    pub target_lat: f64,
    pub target_lon: f64,
}

impl LookupRequest {
    pub fn new(
        variables: Vec<String>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
        target_lat: f64,
        target_lon: f64,
    ) -> Self {
        LookupRequest {
            variables,
            latitude: latitude.into(),
            longitude: longitude.into(),
            target_lat,
            target_lon,
        }
    }
}

/// A variable value read at the rescaled cell.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupValue {
    pub variable: String,
    pub kind: ElementKind,
    /// Nested index read, or a single flat offset for flat reads.
    pub index: Vec<usize>,
    pub value: Scalar,
}

/// A successful match and the values read at it.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRecord {
    pub target_lat: f64,
    pub target_lon: f64,
    pub distance_km: f64,
    pub cell_lat: f64,
    pub cell_lon: f64,
    pub row: usize,
    pub col: usize,
    pub values: Vec<LookupValue>,
}

impl LookupRecord {
    /// The whitespace separated result line, without a trailing newline.
    pub fn format_line(&self) -> String {
        let mut line = format!(
            "{:10.6} {:10.6} {:6.4} {:10.6} {:10.6}",
            self.target_lat, self.target_lon, self.distance_km, self.cell_lat, self.cell_lon
        );
        for value in &self.values {
            line.push(' ');
            line.push_str(&value.value.to_string());
        }
        line
    }
}

impl fmt::Display for LookupRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format_line())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Match(LookupRecord),
    /// Every coordinate cell was fill, or the coordinates hold no records.
    NoMatch,
    /// The nearest cell lies at or beyond the acceptance radius.
    TooFar { cell: GeoCell, distance_km: f64 },
}

/// Runs one lookup against `reader`.
pub fn run_lookup<R: DatasetReader + ?Sized>(
    reader: &R,
    request: &LookupRequest,
    config: &LookupConfig,
) -> Result<LookupOutcome, LookupError> {
    let lat_path = VariablePath::parse(&request.latitude)?;
    let lon_path = VariablePath::parse(&request.longitude)?;
    let variable_paths = request
        .variables
        .iter()
        .map(|path| VariablePath::parse(path))
        .collect::<Result<Vec<_>, _>>()?;

    for path in [&lat_path, &lon_path] {
        if reader.variable_shape(path)?.has_zero_extent() {
            debug!("{} holds no records", path);
            return Ok(LookupOutcome::NoMatch);
        }
    }

    debug!("lat group: {} name: {}", lat_path.group(), lat_path.name());
    let lat = reader.read_variable(&lat_path)?;
    debug!("lon group: {} name: {}", lon_path.group(), lon_path.name());
    let lon = reader.read_variable(&lon_path)?;

    let grid = CoordinateGrid::new(lat, lon)?;
    let (rows, cols) = grid.dimensions();
    debug!(
        "Finding target {}, {} in {} x {} coordinate grid",
        request.target_lat, request.target_lon, rows, cols
    );

    let cell = find_nearest(&grid, request.target_lat, request.target_lon);
    let Some((row, col)) = cell.index_within(rows, cols) else {
        debug!("No valid coordinate cell");
        return Ok(LookupOutcome::NoMatch);
    };
    let Some((cell_lat, cell_lon)) = grid.coordinate(row, col) else {
        return Ok(LookupOutcome::NoMatch);
    };

    let distance = distance_km(cell_lat, cell_lon, request.target_lat, request.target_lon);
    debug!("Nearest cell [{}, {}] at {} {} is {} km away", row, col, cell_lat, cell_lon, distance);

    if !(distance < config.max_distance_km) {
        debug!(
            "Rejecting match: {} km is not within {} km",
            distance, config.max_distance_km
        );
        return Ok(LookupOutcome::TooFar {
            cell,
            distance_km: distance,
        });
    }

    let mut values = Vec::with_capacity(variable_paths.len());
    for path in &variable_paths {
        values.push(read_value_at(
            reader,
            path,
            (row, col),
            (rows, cols),
            config.integer_indexing,
        )?);
    }

    Ok(LookupOutcome::Match(LookupRecord {
        target_lat: request.target_lat,
        target_lon: request.target_lon,
        distance_km: distance,
        cell_lat,
        cell_lon,
        row,
        col,
        values,
    }))
}

/// Reads `path` at the coordinate cell `(row, col)` rescaled onto its grid.
fn read_value_at<R: DatasetReader + ?Sized>(
    reader: &R,
    path: &VariablePath,
    (row, col): (usize, usize),
    (rows, cols): (usize, usize),
    mode: IndexingMode,
) -> Result<LookupValue, LookupError> {
    debug!("dat group: {} name: {}", path.group(), path.name());
    let kind = reader.variable_kind(path)?;
    let shape = reader.variable_shape(path)?;
    let (var_rows, var_cols) = shape.rows_cols();
    debug!("{} is {} with shape {} (r c = {} {})", path, kind, shape, var_rows, var_cols);

    let (new_row, new_col) = rescale_index(row, col, rows, cols, var_rows, var_cols);
    debug!("Rescaled [{}, {}] to [{}, {}]", row, col, new_row, new_col);

    let out_of_range = |index: Vec<usize>| LookupError::IndexOutOfRange {
        variable: path.to_string(),
        index,
        shape: shape.clone(),
    };

    let legacy_row = mode == IndexingMode::LegacyRow && kind.is_integer();
    let (index, bytes) = match cell_index(&shape, new_row, new_col, legacy_row) {
        CellIndex::Flat(offset) => {
            let flat = reader.read_variable_flat(path)?;
            let bytes = flat
                .element(offset)
                .ok_or_else(|| out_of_range(vec![offset]))?
                .to_vec();
            (vec![offset], bytes)
        }
        CellIndex::Nested(index) => {
            let array = reader.read_variable(path)?;
            let bytes = match array.get_bytes(&index) {
                Ok(bytes) => bytes.to_vec(),
                Err(ArrayError::IndexOutOfBounds { .. }) => return Err(out_of_range(index)),
                Err(e) => return Err(e.into()),
            };
            (index, bytes)
        }
    };

    let value = kind.decode(&bytes).ok_or_else(|| LookupError::Unrenderable {
        variable: path.to_string(),
        kind,
    })?;

    Ok(LookupValue {
        variable: path.to_string(),
        kind,
        index,
        value,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CellIndex {
    Flat(usize),
    Nested(Vec<usize>),
}

/// Where a rescaled `(row, col)` lands in a variable of `shape`.
///
/// Rank-3 variables are addressed as a `d0 × d1` grid over the start of
/// their flat buffer, at `row × d1 + col`.
fn cell_index(shape: &Shape, row: usize, col: usize, legacy_row: bool) -> CellIndex {
    if legacy_row {
        return CellIndex::Flat(row);
    }
    match shape.rank() {
        1 => CellIndex::Nested(vec![row]),
        2 => CellIndex::Nested(vec![row, col]),
        _ => CellIndex::Flat(row * shape.rows_cols().1 + col),
    }
}
