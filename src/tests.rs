use crate::array::{flatten_to_buffer, unflatten_from_buffer};
use crate::cli::{Cli, execute};
use crate::config::{IndexingMode, LookupConfig};
use crate::kind::{ElementKind, Scalar};
use crate::lookup::*;
use crate::reader::*;
use clap::Parser;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

const LAT: &str = "/All_Data/Geo/Latitude";
const LON: &str = "/All_Data/Geo/Longitude";
const ZENITH: &str = "/All_Data/Geo/SatelliteZenithAngle";
const QF: &str = "/All_Data/Geo/QF";
const COARSE: &str = "/All_Data/Data/Coarse";
const COUNTS: &str = "/All_Data/Data/Counts";
const LAYERS: &str = "/All_Data/Data/Layers";
const EMPTY: &str = "/Pending";

/// Writes a small netCDF-4 swath: a 4 x 6 coordinate grid at 0.01 degree
/// spacing near Tucson, same-resolution float and integer variables, 2 x 3
/// coarse variables, a 2 x 3 x 2 layered variable, a 1-D root variable, an
/// empty record variable and a 4-D variable.
fn write_swath(path: &Path) -> Result<(), netcdf::Error> {
    let mut lat = Vec::new();
    let mut lon = Vec::new();
    for row in 0..4 {
        for col in 0..6 {
            lat.push(32.0f32 + row as f32 * 0.01);
            lon.push(-111.0f32 + col as f32 * 0.01);
        }
    }
    let zenith: Vec<f32> = (0..24).map(|i| i as f32 * 0.5).collect();
    let qf: Vec<u16> = (0..24).collect();
    let coarse: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let counts: Vec<i32> = vec![10, 20, 30, 40, 50, 60];
    let layers: Vec<f32> = (0..12).map(|i| i as f32).collect();

    let mut file = netcdf::create(path)?;
    file.add_dimension("scans", 4)?;
    file.add_variable::<u32>("ScanTime", &["scans"])?
        .put_values(&[100u32, 200, 300, 400], ..)?;
    file.add_dimension("a", 1)?;
    file.add_dimension("b", 1)?;
    file.add_dimension("c", 1)?;
    file.add_dimension("d", 2)?;
    file.add_variable::<f32>("Cube4", &["a", "b", "c", "d"])?
        .put_values(&[0.0f32, 1.0], ..)?;
    file.add_unlimited_dimension("records")?;
    file.add_variable::<f32>("Pending", &["records"])?;

    {
        let mut all = file.add_group("All_Data")?;
        {
            let mut geo = all.add_group("Geo")?;
            geo.add_dimension("rows", 4)?;
            geo.add_dimension("cols", 6)?;
            geo.add_variable::<f32>("Latitude", &["rows", "cols"])?
                .put_values(&lat, ..)?;
            geo.add_variable::<f32>("Longitude", &["rows", "cols"])?
                .put_values(&lon, ..)?;
            geo.add_variable::<f32>("SatelliteZenithAngle", &["rows", "cols"])?
                .put_values(&zenith, ..)?;
            geo.add_variable::<u16>("QF", &["rows", "cols"])?
                .put_values(&qf, ..)?;
        }
        {
            let mut data = all.add_group("Data")?;
            data.add_dimension("coarse_rows", 2)?;
            data.add_dimension("coarse_cols", 3)?;
            data.add_variable::<f64>("Coarse", &["coarse_rows", "coarse_cols"])?
                .put_values(&coarse, ..)?;
            data.add_variable::<i32>("Counts", &["coarse_rows", "coarse_cols"])?
                .put_values(&counts, ..)?;
            data.add_dimension("levels", 2)?;
            data.add_variable::<f32>("Layers", &["coarse_rows", "coarse_cols", "levels"])?
                .put_values(&layers, ..)?;
        }
    }
    drop(file);
    Ok(())
}

fn swath() -> (TempDir, PathBuf) {
    let dir = tempdir().unwrap();
    let path = dir.path().join("swath.h5");
    write_swath(&path).unwrap();
    (dir, path)
}

fn request(variables: &[&str], target_lat: f64, target_lon: f64) -> LookupRequest {
    LookupRequest::new(
        variables.iter().map(|v| v.to_string()).collect(),
        LAT,
        LON,
        target_lat,
        target_lon,
    )
}

#[cfg(test)]
mod reader_tests {
    use super::*;

    #[test]
    fn test_netcdf_shape_and_kind() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();

        let lat = VariablePath::parse(LAT).unwrap();
        assert_eq!(reader.variable_shape(&lat).unwrap().extents(), &[4, 6]);
        assert_eq!(reader.variable_kind(&lat).unwrap(), ElementKind::Float);

        let qf = VariablePath::parse(QF).unwrap();
        assert_eq!(reader.variable_kind(&qf).unwrap(), ElementKind::UnsignedShort);

        let counts = VariablePath::parse(COUNTS).unwrap();
        assert_eq!(reader.variable_kind(&counts).unwrap(), ElementKind::Int);
        assert_eq!(reader.variable_shape(&counts).unwrap().padded(), [2, 3, 1]);

        reader.close().unwrap();
    }

    #[test]
    fn test_netcdf_read_flat_and_nested() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();

        let coarse = VariablePath::parse(COARSE).unwrap();
        let flat = reader.read_variable_flat(&coarse).unwrap();
        assert_eq!(flat.len(), 6);
        assert_eq!(flat.value_at(4), Some(Scalar::Float(5.0)));

        let nested = unflatten_from_buffer(flat.clone()).unwrap();
        assert_eq!(nested.get::<f64>(&[1, 1]).unwrap(), 5.0);
        assert_eq!(nested.slab(1).unwrap().len(), 3);

        // Flattening again reproduces the bytes read from the file
        let again = flatten_to_buffer(nested).unwrap();
        assert_eq!(again, flat);
    }

    #[test]
    fn test_netcdf_root_variable() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();

        let scan_time = VariablePath::parse("ScanTime").unwrap();
        let array = reader.read_variable(&scan_time).unwrap();
        assert_eq!(array.rank(), 1);
        assert_eq!(array.get::<u32>(&[3]).unwrap(), 400);
    }

    #[test]
    fn test_netcdf_errors() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();

        let missing = VariablePath::parse("/All_Data/Geo/Radiance").unwrap();
        assert!(matches!(
            reader.read_variable_flat(&missing),
            Err(ReaderError::VariableNotFound(_))
        ));

        let missing_group = VariablePath::parse("/No_Data/Latitude").unwrap();
        assert!(matches!(
            reader.variable_kind(&missing_group),
            Err(ReaderError::VariableNotFound(_))
        ));

        let cube = VariablePath::parse("/Cube4").unwrap();
        assert!(matches!(
            reader.variable_shape(&cube),
            Err(ReaderError::TooManyDimensions { rank: 4, .. })
        ));

        assert!(matches!(
            NetcdfReader::open(path.with_file_name("absent.h5")),
            Err(ReaderError::Open { .. })
        ));
    }

    #[test]
    fn test_netcdf_variables_listing() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();
        let variables = reader.variables().unwrap();

        let paths: Vec<&str> = variables.iter().map(|v| v.path.as_str()).collect();
        assert!(paths.contains(&LAT));
        assert!(paths.contains(&COUNTS));
        assert!(paths.contains(&"/ScanTime"));

        let qf = variables.iter().find(|v| v.path == QF).unwrap();
        assert_eq!(qf.kind, Some(ElementKind::UnsignedShort));
        assert_eq!(qf.byte_width, Some(2));
        assert_eq!(qf.shape, vec![4, 6]);
        assert_eq!(qf.dimensions, vec!["rows".to_string(), "cols".to_string()]);
    }
}

#[cfg(test)]
mod lookup_tests {
    use super::*;

    #[test]
    fn test_lookup_matching_resolution() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();

        let outcome = run_lookup(
            &reader,
            &request(&[ZENITH, QF], 32.02, -110.97),
            &LookupConfig::default(),
        )
        .unwrap();
        let LookupOutcome::Match(record) = outcome else {
            panic!("expected a match");
        };

        assert_eq!((record.row, record.col), (2, 3));
        assert_eq!(record.values[0].value, Scalar::Float(7.5));
        assert_eq!(record.values[1].value, Scalar::Unsigned(15));

        let line = record.format_line();
        assert!(line.starts_with(" 32.020000 -110.970000 0.000"));
        assert!(line.ends_with(" 7.500000 15"));
    }

    #[test]
    fn test_lookup_mismatched_resolution() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();

        let outcome = run_lookup(
            &reader,
            &request(&[COARSE, COUNTS], 32.02, -110.97),
            &LookupConfig::default(),
        )
        .unwrap();
        let LookupOutcome::Match(record) = outcome else {
            panic!("expected a match");
        };

        assert_eq!(record.values[0].index, vec![1, 1]);
        assert_eq!(record.values[0].value, Scalar::Float(5.0));
        assert_eq!(record.values[1].value, Scalar::Signed(50));
        assert!(record.format_line().ends_with(" 5.000000 50"));
    }

    #[test]
    fn test_lookup_legacy_row_indexing() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();
        let config = LookupConfig {
            integer_indexing: IndexingMode::LegacyRow,
            ..LookupConfig::default()
        };

        let outcome = run_lookup(&reader, &request(&[COARSE, COUNTS], 32.02, -110.97), &config)
            .unwrap();
        let LookupOutcome::Match(record) = outcome else {
            panic!("expected a match");
        };

        // Floats keep the 2-D index, integers use the rescaled row as a flat offset
        assert_eq!(record.values[0].value, Scalar::Float(5.0));
        assert_eq!(record.values[1].value, Scalar::Signed(20));
    }

    #[test]
    fn test_lookup_layered_variable() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();

        let outcome = run_lookup(
            &reader,
            &request(&[LAYERS], 32.02, -110.97),
            &LookupConfig::default(),
        )
        .unwrap();
        let LookupOutcome::Match(record) = outcome else {
            panic!("expected a match");
        };

        // Cell (1, 1) of the 2 x 3 grid, read at flat offset 1 * 3 + 1
        assert_eq!(record.values[0].index, vec![4]);
        assert_eq!(record.values[0].value, Scalar::Float(4.0));
    }

    #[test]
    fn test_lookup_empty_coordinates() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();
        let request = LookupRequest::new(vec![ZENITH.to_string()], EMPTY, EMPTY, 32.0, -111.0);

        assert_eq!(
            run_lookup(&reader, &request, &LookupConfig::default()).unwrap(),
            LookupOutcome::NoMatch
        );

        let empty = VariablePath::parse(EMPTY).unwrap();
        assert!(matches!(
            reader.read_variable_flat(&empty),
            Err(ReaderError::EmptyVariable(_))
        ));
    }

    #[test]
    fn test_lookup_threshold() {
        let (_dir, path) = swath();
        let reader = NetcdfReader::open(&path).unwrap();

        let far = request(&[ZENITH], 32.23, -110.98);
        assert!(matches!(
            run_lookup(&reader, &far, &LookupConfig::default()).unwrap(),
            LookupOutcome::TooFar { .. }
        ));

        let wide = LookupConfig::default().with_overrides(Some(25.0), None);
        assert!(matches!(
            run_lookup(&reader, &far, &wide).unwrap(),
            LookupOutcome::Match(_)
        ));
    }
}

#[cfg(test)]
mod command_tests {
    use super::*;

    fn run(args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(args)?;
        let mut out = Vec::new();
        execute(&cli, LookupConfig::default(), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_lookup_command_prints_line() {
        let (_dir, path) = swath();
        let file = path.to_str().unwrap();

        let output = run(&["h5lookup", "lookup", file, ZENITH, QF, LAT, LON, "32.02", "-110.97"])
            .unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 1);

        let fields: Vec<&str> = lines[0].split_whitespace().collect();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields[0], "32.020000");
        assert_eq!(fields[1], "-110.970000");
        assert_eq!(fields[5], "7.500000");
        assert_eq!(fields[6], "15");
    }

    #[test]
    fn test_lookup_command_too_far_prints_nothing() {
        let (_dir, path) = swath();
        let file = path.to_str().unwrap();

        let output =
            run(&["h5lookup", "lookup", file, ZENITH, LAT, LON, "40.0", "-100.0"]).unwrap();
        assert!(output.is_empty());

        let output = run(&[
            "h5lookup",
            "lookup",
            file,
            ZENITH,
            LAT,
            LON,
            "32.23",
            "-110.98",
            "--max-distance-km",
            "25",
        ])
        .unwrap();
        assert_eq!(output.lines().count(), 1);
    }

    #[test]
    fn test_lookup_command_missing_variable() {
        let (_dir, path) = swath();
        let file = path.to_str().unwrap();

        let missing = "/All_Data/Geo/Radiance";
        let err =
            run(&["h5lookup", "lookup", file, missing, LAT, LON, "32.0", "-111.0"]).unwrap_err();
        assert!(format!("{:#}", err).contains("/All_Data/Geo/Radiance"));
    }

    #[test]
    fn test_info_command_formats() {
        let (_dir, path) = swath();
        let file = path.to_str().unwrap();

        let human = run(&["h5lookup", "info", file]).unwrap();
        assert!(human.contains("/All_Data/Geo/Latitude (float, 4 bytes) - shape: [4, 6]"));

        let csv = run(&["h5lookup", "info", file, "--format", "csv", "-n", "Counts"]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("/All_Data/Data/Counts,int,4,"));

        let json = run(&["h5lookup", "info", file, "--format", "json", "-n", QF]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["variables"][0]["kind"], "unsigned_short");
        assert!(value["file_size"].as_u64().unwrap() > 0);
    }
}
