//! # Dataset Readers
//!
//! The seam between the lookup core and the file-access library. A
//! [`DatasetReader`] resolves `/group/subgroup/name` paths and hands back shape,
//! element kind and a flat row-major copy of a variable's data.
//!
//! - [`NetcdfReader`] reads HDF5-based netCDF-4 files through the `netcdf`
//!   crate.
//! - [`MemoryReader`] serves buffers registered in memory, for tests and for
//!   callers that already hold the data.

use crate::array::{ArrayError, DimArray, FlatBuffer, MAX_DIMS, Shape, unflatten_from_buffer};
use crate::kind::{Element, ElementKind};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while resolving or reading dataset variables.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("Failed to open dataset '{path}': {source}")]
    Open {
        path: String,
        #[source]
        source: netcdf::Error,
    },

    #[error("Invalid variable path '{0}'")]
    InvalidPath(String),

    #[error("Variable '{0}' not found in dataset")]
    VariableNotFound(String),

    #[error("Variable '{variable}' has unsupported type {type_name}")]
    UnsupportedType { variable: String, type_name: String },

    #[error("Variable '{variable}' has {rank} dimensions, at most {max} are supported", max = MAX_DIMS)]
    TooManyDimensions { variable: String, rank: usize },

    #[error("Variable '{0}' has a zero-length dimension and holds no values")]
    EmptyVariable(String),

    #[error("NetCDF error: {0}")]
    Netcdf(#[from] netcdf::Error),

    #[error(transparent)]
    Array(#[from] ArrayError),
}

/// A variable path split at its last `/` into group and variable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VariablePath {
    group: String,
    name: String,
}

impl VariablePath {
    /// Splits `/group/subgroup/.../Name`. A path without `/` names a variable
    /// in the root group.
    pub fn parse(path: &str) -> Result<Self, ReaderError> {
        let (group, name) = match path.rfind('/') {
            Some(split) => (&path[..split], &path[split + 1..]),
            None => ("", path),
        };
        if name.is_empty() {
            return Err(ReaderError::InvalidPath(path.to_string()));
        }

        let group = group.trim_matches('/');
        Ok(VariablePath {
            group: format!("/{}", group),
            name: name.to_string(),
        })
    }

    /// Group path, always starting with `/`; the root group is `/`.
    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.group == "/"
    }

    /// The path relative to the root group, e.g. `All_Data/Geo/Latitude`.
    pub fn relative(&self) -> String {
        if self.is_root() {
            self.name.clone()
        } else {
            format!("{}/{}", &self.group[1..], self.name)
        }
    }
}

impl fmt::Display for VariablePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}", self.relative())
    }
}

/// Metadata of one variable, as listed by [`DatasetReader::variables`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariableInfo {
    pub path: String,
    pub type_name: String,
    pub kind: Option<ElementKind>,
    pub byte_width: Option<usize>,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
}

/// Access to shape, kind and data of dataset variables.
pub trait DatasetReader {
    fn variable_shape(&self, path: &VariablePath) -> Result<Shape, ReaderError>;

    fn variable_kind(&self, path: &VariablePath) -> Result<ElementKind, ReaderError>;

    /// Reads the whole variable as a row-major buffer in native byte order.
    fn read_variable_flat(&self, path: &VariablePath) -> Result<FlatBuffer, ReaderError>;

    /// Every variable the reader can see, in path order.
    fn variables(&self) -> Result<Vec<VariableInfo>, ReaderError>;

    /// Reads the whole variable as a nested array.
    fn read_variable(&self, path: &VariablePath) -> Result<DimArray, ReaderError> {
        let flat = self.read_variable_flat(path)?;
        Ok(unflatten_from_buffer(flat)?)
    }
}

/// Reader backed by a netCDF-4 / HDF5 file, open for its whole lifetime.
pub struct NetcdfReader {
    path: PathBuf,
    file: netcdf::File,
}

impl NetcdfReader {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReaderError> {
        let path = path.as_ref().to_path_buf();
        debug!("Opening dataset: {}", path.display());
        let file = netcdf::open(&path).map_err(|source| ReaderError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(NetcdfReader { path, file })
    }

    /// Global attributes, values rendered with their netCDF type.
    pub fn global_attributes(&self) -> BTreeMap<String, String> {
        self.file
            .attributes()
            .filter_map(|attr| {
                let value = attr.value().ok()?;
                Some((attr.name().to_string(), format!("{:?}", value)))
            })
            .collect()
    }

    pub fn close(self) -> Result<(), ReaderError> {
        debug!("Closing dataset: {}", self.path.display());
        self.file.close()?;
        Ok(())
    }

    fn variable(&self, path: &VariablePath) -> Result<netcdf::Variable<'_>, ReaderError> {
        debug!("Resolving group '{}' name '{}'", path.group(), path.name());
        self.file
            .variable(&path.relative())
            .ok_or_else(|| ReaderError::VariableNotFound(path.to_string()))
    }
}

/// Maps a netCDF variable type onto the kind registry.
pub fn kind_for_vartype(vartype: &netcdf::types::NcVariableType) -> Option<ElementKind> {
    use netcdf::types::{FloatType, IntType, NcVariableType};

    match vartype {
        NcVariableType::Int(IntType::I8) => Some(ElementKind::SignedChar),
        NcVariableType::Int(IntType::U8) => Some(ElementKind::UnsignedChar),
        NcVariableType::Int(IntType::I16) => Some(ElementKind::Short),
        NcVariableType::Int(IntType::U16) => Some(ElementKind::UnsignedShort),
        NcVariableType::Int(IntType::I32) => Some(ElementKind::Int),
        NcVariableType::Int(IntType::U32) => Some(ElementKind::UnsignedInt),
        NcVariableType::Int(IntType::I64) => Some(ElementKind::LongLong),
        NcVariableType::Int(IntType::U64) => Some(ElementKind::UnsignedLongLong),
        NcVariableType::Float(FloatType::F32) => Some(ElementKind::Float),
        NcVariableType::Float(FloatType::F64) => Some(ElementKind::Double),
        _ => None,
    }
}

fn shape_of(variable: &netcdf::Variable<'_>, path: &VariablePath) -> Result<Shape, ReaderError> {
    let extents: Vec<usize> = variable.dimensions().iter().map(|d| d.len()).collect();
    if extents.len() > MAX_DIMS {
        return Err(ReaderError::TooManyDimensions {
            variable: path.to_string(),
            rank: extents.len(),
        });
    }
    if extents.is_empty() {
        return Ok(Shape::new(&[1])?);
    }
    Ok(Shape::new(&extents)?)
}

fn kind_of(
    variable: &netcdf::Variable<'_>,
    path: &VariablePath,
) -> Result<ElementKind, ReaderError> {
    let vartype = variable.vartype();
    kind_for_vartype(&vartype).ok_or_else(|| ReaderError::UnsupportedType {
        variable: path.to_string(),
        type_name: format!("{:?}", vartype),
    })
}

fn read_as<T>(variable: &netcdf::Variable<'_>, shape: Shape) -> Result<FlatBuffer, ReaderError>
where
    T: Element + netcdf::types::NcTypeDescriptor,
{
    let values: Vec<T> = variable.get_values::<T, _>(..)?;
    Ok(FlatBuffer::from_values(shape, &values)?)
}

impl DatasetReader for NetcdfReader {
    fn variable_shape(&self, path: &VariablePath) -> Result<Shape, ReaderError> {
        let variable = self.variable(path)?;
        shape_of(&variable, path)
    }

    fn variable_kind(&self, path: &VariablePath) -> Result<ElementKind, ReaderError> {
        let variable = self.variable(path)?;
        kind_of(&variable, path)
    }

    fn read_variable_flat(&self, path: &VariablePath) -> Result<FlatBuffer, ReaderError> {
        let variable = self.variable(path)?;
        let shape = shape_of(&variable, path)?;
        if shape.has_zero_extent() {
            return Err(ReaderError::EmptyVariable(path.to_string()));
        }
        let kind = kind_of(&variable, path)?;
        debug!("Reading {} as {} with shape {}", path, kind, shape);

        match kind {
            ElementKind::SignedChar => read_as::<i8>(&variable, shape),
            ElementKind::UnsignedChar => read_as::<u8>(&variable, shape),
            ElementKind::Short => read_as::<i16>(&variable, shape),
            ElementKind::UnsignedShort => read_as::<u16>(&variable, shape),
            ElementKind::Int => read_as::<i32>(&variable, shape),
            ElementKind::UnsignedInt => read_as::<u32>(&variable, shape),
            ElementKind::LongLong => read_as::<i64>(&variable, shape),
            ElementKind::UnsignedLongLong => read_as::<u64>(&variable, shape),
            ElementKind::Float => read_as::<f32>(&variable, shape),
            ElementKind::Double => read_as::<f64>(&variable, shape),
            other => Err(ReaderError::UnsupportedType {
                variable: path.to_string(),
                type_name: other.to_string(),
            }),
        }
    }

    fn variables(&self) -> Result<Vec<VariableInfo>, ReaderError> {
        let mut infos = Vec::new();
        match self.file.root() {
            Some(root) => collect_group(&root, "", &mut infos),
            None => {
                for variable in self.file.variables() {
                    infos.push(describe(&variable, ""));
                }
            }
        }
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(infos)
    }
}

fn collect_group(group: &netcdf::Group<'_>, prefix: &str, infos: &mut Vec<VariableInfo>) {
    for variable in group.variables() {
        infos.push(describe(&variable, prefix));
    }
    for child in group.groups() {
        let child_prefix = format!("{}/{}", prefix, child.name());
        collect_group(&child, &child_prefix, infos);
    }
}

fn describe(variable: &netcdf::Variable<'_>, prefix: &str) -> VariableInfo {
    let vartype = variable.vartype();
    let kind = kind_for_vartype(&vartype);
    VariableInfo {
        path: format!("{}/{}", prefix, variable.name()),
        type_name: format!("{:?}", vartype),
        kind,
        byte_width: kind.map(ElementKind::byte_width),
        dimensions: variable
            .dimensions()
            .iter()
            .map(|d| d.name().to_string())
            .collect(),
        shape: variable.dimensions().iter().map(|d| d.len()).collect(),
    }
}

/// Reader over buffers registered in memory, keyed by variable path.
#[derive(Debug, Clone, Default)]
pub struct MemoryReader {
    variables: BTreeMap<VariablePath, FlatBuffer>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, buffer: FlatBuffer) -> Result<(), ReaderError> {
        self.variables.insert(VariablePath::parse(path)?, buffer);
        Ok(())
    }

    /// Builder-style [`MemoryReader::insert`] for typed values.
    pub fn with_values<T: Element>(
        mut self,
        path: &str,
        extents: &[usize],
        values: &[T],
    ) -> Result<Self, ReaderError> {
        let buffer = FlatBuffer::from_values(Shape::new(extents)?, values)?;
        self.insert(path, buffer)?;
        Ok(self)
    }

    fn buffer(&self, path: &VariablePath) -> Result<&FlatBuffer, ReaderError> {
        self.variables
            .get(path)
            .ok_or_else(|| ReaderError::VariableNotFound(path.to_string()))
    }
}

impl DatasetReader for MemoryReader {
    fn variable_shape(&self, path: &VariablePath) -> Result<Shape, ReaderError> {
        Ok(self.buffer(path)?.shape().clone())
    }

    fn variable_kind(&self, path: &VariablePath) -> Result<ElementKind, ReaderError> {
        Ok(self.buffer(path)?.kind())
    }

    fn read_variable_flat(&self, path: &VariablePath) -> Result<FlatBuffer, ReaderError> {
        Ok(self.buffer(path)?.clone())
    }

    fn variables(&self) -> Result<Vec<VariableInfo>, ReaderError> {
        let mut infos: Vec<VariableInfo> = self
            .variables
            .iter()
            .map(|(path, buffer)| VariableInfo {
                path: path.to_string(),
                type_name: buffer.kind().to_string(),
                kind: Some(buffer.kind()),
                byte_width: Some(buffer.kind().byte_width()),
                dimensions: Vec::new(),
                shape: buffer.shape().extents().to_vec(),
            })
            .collect();
        infos.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(infos)
    }
}
