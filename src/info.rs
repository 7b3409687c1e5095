//! # Dataset Information
//!
//! Lists the variables of a dataset with their element kind, byte width and
//! shape, so that lookup paths can be found without external tools.

use crate::reader::{DatasetReader, NetcdfReader, VariableInfo};
use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Everything `info` reports about one dataset.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetInfo {
    pub path: String,
    pub file_size: Option<u64>,
    pub total_variables: usize,
    pub variables: Vec<VariableInfo>,
    pub global_attributes: BTreeMap<String, String>,
}

/// Collects variable metadata from any reader.
///
/// `variable` narrows the listing to one variable, given either as its full
/// path or its bare name.
pub fn collect_info<R: DatasetReader + ?Sized>(
    reader: &R,
    path: &str,
    variable: Option<&str>,
) -> Result<DatasetInfo> {
    let mut variables = reader
        .variables()
        .with_context(|| format!("Failed to list variables of {}", path))?;

    if let Some(wanted) = variable {
        let wanted_path = format!("/{}", wanted.trim_start_matches('/'));
        variables.retain(|var| {
            var.path == wanted_path || var.path.rsplit('/').next() == Some(wanted)
        });
        if variables.is_empty() {
            anyhow::bail!("Variable '{}' not found in {}", wanted, path);
        }
    }

    Ok(DatasetInfo {
        path: path.to_string(),
        file_size: None,
        total_variables: variables.len(),
        variables,
        global_attributes: BTreeMap::new(),
    })
}

/// Opens `file_path` and collects its metadata, global attributes included
/// when `detailed` is set.
pub fn get_dataset_info(
    file_path: &str,
    variable: Option<&str>,
    detailed: bool,
) -> Result<DatasetInfo> {
    debug!("Inspecting dataset: {}", file_path);
    let reader = NetcdfReader::open(file_path)
        .with_context(|| format!("Failed to open dataset: {}", file_path))?;

    let mut info = collect_info(&reader, file_path, variable)?;
    info.file_size = std::fs::metadata(file_path).ok().map(|m| m.len());
    if detailed {
        info.global_attributes = reader.global_attributes();
    }

    reader.close().context("Failed to close dataset")?;
    Ok(info)
}

fn kind_label(var: &VariableInfo) -> String {
    match (var.kind, var.byte_width) {
        (Some(kind), Some(width)) => format!("{}, {} bytes", kind, width),
        _ => format!("unsupported: {}", var.type_name),
    }
}

fn join<T: ToString>(items: &[T], separator: &str) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn format_info_human(info: &DatasetInfo) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Dataset Information:");
    let _ = writeln!(out, "  Path: {}", info.path);
    if let Some(size) = info.file_size {
        let _ = writeln!(out, "  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    let _ = writeln!(out, "  Variables: {} total", info.total_variables);
    for var in &info.variables {
        let _ = writeln!(
            out,
            "    {} ({}) - shape: [{}]",
            var.path,
            kind_label(var),
            join(&var.shape, ", ")
        );
        if !var.dimensions.is_empty() {
            let _ = writeln!(out, "      dimensions: [{}]", var.dimensions.join(", "));
        }
    }
    if !info.global_attributes.is_empty() {
        let _ = writeln!(out, "  Global Attributes:");
        for (name, value) in &info.global_attributes {
            let _ = writeln!(out, "    @{}: {}", name, value);
        }
    }
    out
}

pub fn format_info_json(info: &DatasetInfo) -> Result<String> {
    serde_json::to_string_pretty(info).context("Failed to serialize dataset info to JSON")
}

pub fn format_info_yaml(info: &DatasetInfo) -> Result<String> {
    serde_yaml::to_string(info).context("Failed to serialize dataset info to YAML")
}

/// Variables only, one row each.
pub fn format_info_csv(info: &DatasetInfo) -> String {
    let mut out = String::from("variable_path,kind,byte_width,dimensions,shape\n");
    for var in &info.variables {
        let _ = writeln!(
            out,
            "{},{},{},\"{}\",\"{}\"",
            var.path,
            var.kind.map(|k| k.to_string()).unwrap_or_default(),
            var.byte_width.map(|w| w.to_string()).unwrap_or_default(),
            var.dimensions.join(";"),
            join(&var.shape, ";")
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::MemoryReader;

    fn reader() -> MemoryReader {
        MemoryReader::new()
            .with_values("/All_Data/Geo/Latitude", &[2, 3], &[0.0f32; 6])
            .unwrap()
            .with_values("/All_Data/Geo/Longitude", &[2, 3], &[0.0f32; 6])
            .unwrap()
            .with_values("/QF", &[4], &[0u8; 4])
            .unwrap()
    }

    #[test]
    fn test_collect_all() {
        let info = collect_info(&reader(), "mem", None).unwrap();
        assert_eq!(info.total_variables, 3);
        let paths: Vec<&str> = info.variables.iter().map(|v| v.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["/All_Data/Geo/Latitude", "/All_Data/Geo/Longitude", "/QF"]
        );
    }

    #[test]
    fn test_collect_single_variable() {
        let by_path = collect_info(&reader(), "mem", Some("/All_Data/Geo/Longitude")).unwrap();
        assert_eq!(by_path.total_variables, 1);

        let by_name = collect_info(&reader(), "mem", Some("Latitude")).unwrap();
        assert_eq!(by_name.variables[0].path, "/All_Data/Geo/Latitude");

        assert!(collect_info(&reader(), "mem", Some("Radiance")).is_err());
    }

    #[test]
    fn test_formats() {
        let info = collect_info(&reader(), "mem", None).unwrap();

        let human = format_info_human(&info);
        assert!(human.contains("/All_Data/Geo/Latitude (float, 4 bytes) - shape: [2, 3]"));
        assert!(human.contains("Variables: 3 total"));

        let csv = format_info_csv(&info);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "/QF,unsigned_char,1,\"\",\"4\"");

        let json: serde_json::Value =
            serde_json::from_str(&format_info_json(&info).unwrap()).unwrap();
        assert_eq!(json["total_variables"], 3);
        assert_eq!(json["variables"][0]["kind"], "float");

        let yaml = format_info_yaml(&info).unwrap();
        assert!(yaml.contains("path: mem"));
    }
}
