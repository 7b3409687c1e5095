//! # Geolocation Search
//!
//! Great-circle distance and the brute-force nearest-cell search over a pair of
//! co-indexed latitude/longitude grids.
//!
//! The search rescans the whole grid on every pass and stops once a pass ends
//! on the cell it started from, so the result is the global minimum over valid
//! cells. Ties go to the cell met first in row-major order.
//!
//! ```rust
//! use h5lookup::array::{DimArray, Shape};
//! use h5lookup::geo::{find_nearest, CoordinateGrid};
//!
//! let shape = Shape::new(&[2, 2])?;
//! let lat = DimArray::from_values(shape.clone(), &[10.0f32, 10.0, 11.0, 11.0])?;
//! let lon = DimArray::from_values(shape, &[20.0f32, 21.0, 20.0, 21.0])?;
//! let grid = CoordinateGrid::new(lat, lon)?;
//!
//! let cell = find_nearest(&grid, 10.9, 20.1);
//! assert_eq!((cell.row, cell.col), (1, 0));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::array::{
    ArrayError, DimArray, FlatBuffer, Shape, flatten_to_buffer, unflatten_from_buffer,
};
use crate::kind::ElementKind;
use log::trace;
use thiserror::Error;

/// Earth radius used by [`distance_km`].
pub const EARTH_RADIUS_KM: f64 = 6367.0;

/// Coordinates at or below this value are fill, not sensor readings.
pub const FILL_SENTINEL: f64 = -9999.0;

/// Row and column reported when no valid cell exists.
pub const NOT_FOUND_INDEX: i64 = -9999;

/// Distance reported when no valid cell exists.
pub const NOT_FOUND_DISTANCE: f64 = 99999.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("Latitude grid {lat} and longitude grid {lon} differ in shape")]
    ShapeMismatch { lat: Shape, lon: Shape },

    #[error("Coordinate grids must be 1- or 2-dimensional, got {0}")]
    GridRank(Shape),

    #[error("Coordinate grids must hold floating point values, got {0}")]
    NotFloat(ElementKind),

    #[error(transparent)]
    Array(#[from] ArrayError),
}

/// Great-circle distance in kilometers between two points given in degrees.
pub fn distance_km(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> f64 {
    let lat_s = lat0.to_radians();
    let lon_s = lon0.to_radians();
    let lat_e = lat1.to_radians();
    let lon_e = lon1.to_radians();
    let d_lat = lat_e - lat_s;
    let d_lon = lon_e - lon_s;
    let a = (d_lat / 2.0).sin().powi(2) + lat_s.cos() * lat_e.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * a.sqrt().asin() * EARTH_RADIUS_KM
}

/// True when neither coordinate is a fill value.
pub fn is_valid(lat: f64, lon: f64) -> bool {
    lat > FILL_SENTINEL && lon > FILL_SENTINEL
}

/// A grid cell and its distance to the search target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoCell {
    pub row: i64,
    pub col: i64,
    pub distance_km: f64,
}

impl GeoCell {
    pub const NOT_FOUND: GeoCell = GeoCell {
        row: NOT_FOUND_INDEX,
        col: NOT_FOUND_INDEX,
        distance_km: NOT_FOUND_DISTANCE,
    };

    /// The cell's index if it lies inside a `rows × cols` grid.
    pub fn index_within(&self, rows: usize, cols: usize) -> Option<(usize, usize)> {
        let row = usize::try_from(self.row).ok()?;
        let col = usize::try_from(self.col).ok()?;
        (row < rows && col < cols).then_some((row, col))
    }

    pub fn is_found(&self) -> bool {
        self.row >= 0 && self.col >= 0
    }
}

/// Co-indexed latitude and longitude grids.
#[derive(Debug, Clone)]
pub struct CoordinateGrid {
    lat: DimArray,
    lon: DimArray,
}

impl CoordinateGrid {
    /// Pairs two same-shape floating point grids.
    ///
    /// One-dimensional coordinate lists are reshaped to `n × 1` grids.
    pub fn new(lat: DimArray, lon: DimArray) -> Result<Self, GeoError> {
        if lat.shape() != lon.shape() {
            return Err(GeoError::ShapeMismatch {
                lat: lat.shape().clone(),
                lon: lon.shape().clone(),
            });
        }
        for kind in [lat.kind(), lon.kind()] {
            if !kind.is_float() {
                return Err(GeoError::NotFloat(kind));
            }
        }
        match lat.rank() {
            2 => Ok(CoordinateGrid { lat, lon }),
            1 => Ok(CoordinateGrid {
                lat: as_column(lat)?,
                lon: as_column(lon)?,
            }),
            _ => Err(GeoError::GridRank(lat.shape().clone())),
        }
    }

    /// `(rows, cols)` of the grid.
    pub fn dimensions(&self) -> (usize, usize) {
        self.lat.shape().rows_cols()
    }

    pub fn shape(&self) -> &Shape {
        self.lat.shape()
    }

    /// `(lat, lon)` at a cell, or `None` outside the grid.
    pub fn coordinate(&self, row: usize, col: usize) -> Option<(f64, f64)> {
        let lat = self.lat.get_f64(&[row, col])?;
        let lon = self.lon.get_f64(&[row, col])?;
        Some((lat, lon))
    }
}

fn as_column(array: DimArray) -> Result<DimArray, ArrayError> {
    let flat = flatten_to_buffer(array)?;
    let rows = flat.shape().element_count();
    let reshaped = FlatBuffer::new(flat.kind(), Shape::new(&[rows, 1])?, flat.into_bytes())?;
    unflatten_from_buffer(reshaped)
}

/// Finds the valid cell closest to `(target_lat, target_lon)`.
///
/// Returns [`GeoCell::NOT_FOUND`] when every cell is fill.
pub fn find_nearest(grid: &CoordinateGrid, target_lat: f64, target_lon: f64) -> GeoCell {
    let (rows, cols) = grid.dimensions();

    let mut closest = NOT_FOUND_DISTANCE;
    let mut closest_row = NOT_FOUND_INDEX;
    let mut closest_col = NOT_FOUND_INDEX;

    loop {
        let mut pass_row = closest_row;
        let mut pass_col = closest_col;

        for row in 0..rows {
            for col in 0..cols {
                let Some((lat, lon)) = grid.coordinate(row, col) else {
                    continue;
                };
                if !is_valid(lat, lon) {
                    continue;
                }

                let distance = distance_km(lat, lon, target_lat, target_lon);
                if distance < closest {
                    trace!(
                        "{:10} {:11.4} {:11.4} {:4} {:4} {:8.3e}",
                        row * cols + col,
                        lat,
                        lon,
                        row,
                        col,
                        distance
                    );
                    pass_row = row as i64;
                    pass_col = col as i64;
                    closest = distance;
                }
            }
        }

        if pass_row == closest_row && pass_col == closest_col {
            break;
        }
        closest_row = pass_row;
        closest_col = pass_col;
    }

    GeoCell {
        row: closest_row,
        col: closest_col,
        distance_km: closest,
    }
}

/// Maps an index on a `source_rows × source_cols` grid onto a
/// `target_rows × target_cols` grid by proportional floor scaling.
///
/// A zero source extent is treated as 1.
pub fn rescale_index(
    source_row: usize,
    source_col: usize,
    source_rows: usize,
    source_cols: usize,
    target_rows: usize,
    target_cols: usize,
) -> (usize, usize) {
    (
        scale(source_row, source_rows, target_rows),
        scale(source_col, source_cols, target_cols),
    )
}

fn scale(index: usize, from: usize, to: usize) -> usize {
    let scaled = index as u128 * to as u128 / from.max(1) as u128;
    scaled as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: usize, cols: usize, lat: &[f32], lon: &[f32]) -> CoordinateGrid {
        let shape = Shape::new(&[rows, cols]).unwrap();
        CoordinateGrid::new(
            DimArray::from_values(shape.clone(), lat).unwrap(),
            DimArray::from_values(shape, lon).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_distance_identity() {
        for &(lat, lon) in &[(0.0, 0.0), (32.13, -111.09), (-89.5, 179.9), (45.0, -45.0)] {
            assert_eq!(distance_km(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn test_distance_symmetry() {
        let a = distance_km(32.13, -111.09, 40.7128, -74.006);
        let b = distance_km(40.7128, -74.006, 32.13, -111.09);
        assert!((a - b).abs() < 1e-9);
    }

    #[test]
    fn test_distance_one_degree_latitude() {
        let d = distance_km(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111.0).abs() < 1.0, "got {}", d);
    }

    #[test]
    fn test_find_nearest_unique_cell() {
        let lat = [10.0, 10.0, 10.0, 11.0, 11.0, 11.0, 12.0, 12.0, 12.0];
        let lon = [20.0, 21.0, 22.0, 20.0, 21.0, 22.0, 20.0, 21.0, 22.0];
        let grid = grid(3, 3, &lat, &lon);

        let cell = find_nearest(&grid, 11.1, 21.9);
        assert_eq!((cell.row, cell.col), (1, 2));
        assert_eq!(cell.distance_km, distance_km(11.0, 22.0, 11.1, 21.9));
        assert_eq!(cell.index_within(3, 3), Some((1, 2)));
    }

    #[test]
    fn test_find_nearest_all_fill() {
        let fill = [-9999.0f32; 9];
        let grid = grid(3, 3, &fill, &fill);

        let cell = find_nearest(&grid, 0.0, 0.0);
        assert_eq!(cell, GeoCell::NOT_FOUND);
        assert!(!cell.is_found());
        assert_eq!(cell.index_within(3, 3), None);
    }

    #[test]
    fn test_find_nearest_skips_partial_fill() {
        // The exact target is present but its longitude is fill.
        let lat = [5.0, 6.0, 7.0, 8.0];
        let lon = [-9999.0, 6.0, 7.0, 8.0];
        let grid = grid(2, 2, &lat, &lon);

        let cell = find_nearest(&grid, 5.0, 5.0);
        assert_eq!((cell.row, cell.col), (0, 1));
    }

    #[test]
    fn test_find_nearest_tie_keeps_first_in_row_major_order() {
        // (0,0) and (1,1) are both 1 degree of latitude from the target.
        let lat = [1.0, 50.0, 50.0, -1.0];
        let lon = [0.0, 50.0, 50.0, 0.0];
        let grid = grid(2, 2, &lat, &lon);

        let cell = find_nearest(&grid, 0.0, 0.0);
        assert_eq!((cell.row, cell.col), (0, 0));
    }

    #[test]
    fn test_coordinate_grid_rejects_mismatched_shapes() {
        let lat = DimArray::from_values(Shape::new(&[2, 2]).unwrap(), &[0.0f32; 4]).unwrap();
        let lon = DimArray::from_values(Shape::new(&[4, 1]).unwrap(), &[0.0f32; 4]).unwrap();
        assert!(matches!(
            CoordinateGrid::new(lat, lon),
            Err(GeoError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_coordinate_grid_rejects_integer_kind() {
        let shape = Shape::new(&[2, 2]).unwrap();
        let lat = DimArray::from_values(shape.clone(), &[0i32; 4]).unwrap();
        let lon = DimArray::from_values(shape, &[0i32; 4]).unwrap();
        assert_eq!(
            CoordinateGrid::new(lat, lon).unwrap_err(),
            GeoError::NotFloat(ElementKind::Int)
        );
    }

    #[test]
    fn test_coordinate_list_becomes_column() {
        let shape = Shape::new(&[3]).unwrap();
        let lat = DimArray::from_values(shape.clone(), &[0.0f64, 1.0, 2.0]).unwrap();
        let lon = DimArray::from_values(shape, &[0.0f64, 0.0, 0.0]).unwrap();
        let grid = CoordinateGrid::new(lat, lon).unwrap();

        assert_eq!(grid.dimensions(), (3, 1));
        let cell = find_nearest(&grid, 1.9, 0.0);
        assert_eq!((cell.row, cell.col), (2, 0));
    }

    #[test]
    fn test_rescale_index() {
        assert_eq!(rescale_index(2, 3, 4, 6, 2, 3), (1, 1));
        assert_eq!(rescale_index(5, 7, 10, 10, 10, 10), (5, 7));
        // Finer target grid
        assert_eq!(rescale_index(3, 1, 4, 2, 16, 8), (12, 4));
        // Exact multiples stay exact
        assert_eq!(rescale_index(3, 0, 30, 1, 10, 1), (1, 0));
        assert_eq!(rescale_index(1, 1, 0, 0, 5, 5), (5, 5));
    }
}
