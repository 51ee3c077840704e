use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::error::{ProcessingError, Result};
use crate::readers::cf_time;
use crate::utils::constants::{LATITUDE_ALIASES, LONGITUDE_ALIASES};

/// Outcome of a name lookup against a dataset's variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    Found(String),
    /// Nothing matched; carries the names that were searched
    NotFound(Vec<String>),
}

impl Lookup {
    pub fn found(&self) -> Option<&str> {
        match self {
            Lookup::Found(name) => Some(name),
            Lookup::NotFound(_) => None,
        }
    }
}

/// First name containing `pattern`, case-insensitive
pub fn find_containing(pattern: &str, names: &[String]) -> Lookup {
    let pattern = pattern.to_lowercase();
    names
        .iter()
        .find(|name| name.to_lowercase().contains(&pattern))
        .map(|name| Lookup::Found(name.clone()))
        .unwrap_or_else(|| Lookup::NotFound(names.to_vec()))
}

/// First alias present in `names`, in alias order
pub fn find_alias(aliases: &[&str], names: &[String]) -> Lookup {
    aliases
        .iter()
        .find_map(|alias| names.iter().find(|name| name.eq_ignore_ascii_case(alias)))
        .map(|name| Lookup::Found(name.clone()))
        .unwrap_or_else(|| Lookup::NotFound(names.to_vec()))
}

/// Geographic axis of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Axis::Latitude => LATITUDE_ALIASES,
            Axis::Longitude => LONGITUDE_ALIASES,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }
}

/// Read access to a gridded file, enough to pull one point out of it
pub trait GriddedDataset {
    /// All variable names, coordinates included, in file order
    fn variable_names(&self) -> Vec<String>;

    /// Dimension names and lengths of a variable
    fn dimensions(&self, variable: &str) -> Result<Vec<(String, usize)>>;

    /// Whole 1-D variable as `f64`
    fn read_axis(&self, variable: &str) -> Result<Vec<f64>>;

    /// Single element, `None` when masked as fill or missing
    fn read_value(&self, variable: &str, index: &[usize]) -> Result<Option<f64>>;

    /// Text attribute of a variable
    fn attribute_text(&self, variable: &str, attribute: &str) -> Option<String>;

    /// Variables indexed solely by a dimension of their own name
    fn coordinate_names(&self) -> Vec<String> {
        self.variable_names()
            .into_iter()
            .filter(|name| {
                self.dimensions(name)
                    .map(|dims| dims.len() == 1 && dims[0].0 == *name)
                    .unwrap_or(false)
            })
            .collect()
    }

    fn data_variable_names(&self) -> Vec<String> {
        let coordinates = self.coordinate_names();
        self.variable_names()
            .into_iter()
            .filter(|name| !coordinates.contains(name))
            .collect()
    }

    /// Coordinate for `axis`, checking coordinates before other variables
    fn locate_axis(&self, axis: Axis) -> Lookup {
        let coordinates = self.coordinate_names();
        if let Lookup::Found(name) = find_alias(axis.aliases(), &coordinates) {
            return Lookup::Found(name);
        }
        let variables = self.variable_names();
        match find_alias(axis.aliases(), &variables) {
            Lookup::Found(name) => Lookup::Found(name),
            Lookup::NotFound(_) => {
                let extra: Vec<String> = variables
                    .into_iter()
                    .filter(|v| !coordinates.contains(v))
                    .collect();
                let mut searched = coordinates;
                searched.extend(extra);
                Lookup::NotFound(searched)
            }
        }
    }

    /// Time axis decoded from its CF `units`, if the file has one
    fn decode_time(&self, variable: &str) -> Result<Vec<NaiveDateTime>> {
        let units = self.attribute_text(variable, "units").ok_or_else(|| {
            ProcessingError::InvalidFormat(format!("Time variable '{}' has no units", variable))
        })?;
        let raw = self.read_axis(variable)?;
        cf_time::decode_axis(&raw, &units)
    }
}

/// A NetCDF granule on disk
pub struct NetcdfGranule {
    file: netcdf::File,
    path: PathBuf,
}

impl NetcdfGranule {
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::open(path)?;
        debug!(path = %path.display(), "opened granule");
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn variable(&self, name: &str) -> Result<netcdf::Variable<'_>> {
        self.file.variable(name).ok_or_else(|| ProcessingError::VariableNotFound {
            pattern: name.to_string(),
            available: self.variable_names(),
        })
    }
}

impl GriddedDataset for NetcdfGranule {
    fn variable_names(&self) -> Vec<String> {
        self.file.variables().map(|var| var.name()).collect()
    }

    fn dimensions(&self, variable: &str) -> Result<Vec<(String, usize)>> {
        let var = self.variable(variable)?;
        Ok(var
            .dimensions()
            .iter()
            .map(|dim| (dim.name(), dim.len()))
            .collect())
    }

    fn read_axis(&self, variable: &str) -> Result<Vec<f64>> {
        let var = self.variable(variable)?;
        let raw: Vec<f64> = var.get_values(..)?;
        let packing = Packing::of(&var);
        Ok(raw.into_iter().map(|v| packing.unpack(v)).collect())
    }

    fn read_value(&self, variable: &str, index: &[usize]) -> Result<Option<f64>> {
        let var = self.variable(variable)?;
        let raw = var.get_value::<f64, _>(index)?;
        Ok(Packing::of(&var).unpack_masked(raw))
    }

    fn attribute_text(&self, variable: &str, attribute: &str) -> Option<String> {
        let var = self.file.variable(variable)?;
        match var.attribute_value(attribute)?.ok()? {
            netcdf::AttributeValue::Str(text) => Some(text),
            _ => None,
        }
    }
}

/// Masking and `scale_factor`/`add_offset` of one variable
#[derive(Debug, Clone, Copy, PartialEq)]
struct Packing {
    fill_value: Option<f64>,
    missing_value: Option<f64>,
    scale_factor: f64,
    add_offset: f64,
}

impl Packing {
    fn of(var: &netcdf::Variable<'_>) -> Self {
        Self {
            fill_value: attribute_f64(var, "_FillValue"),
            missing_value: attribute_f64(var, "missing_value"),
            scale_factor: attribute_f64(var, "scale_factor").unwrap_or(1.0),
            add_offset: attribute_f64(var, "add_offset").unwrap_or(0.0),
        }
    }

    fn unpack(&self, raw: f64) -> f64 {
        raw * self.scale_factor + self.add_offset
    }

    /// Fill, missing and NaN compare against the packed value
    fn unpack_masked(&self, raw: f64) -> Option<f64> {
        if raw.is_nan() || Some(raw) == self.fill_value || Some(raw) == self.missing_value {
            None
        } else {
            Some(self.unpack(raw))
        }
    }
}

fn attribute_f64(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    var.attribute_value(name)
        .and_then(|r| r.ok())
        .and_then(|v| match v {
            netcdf::AttributeValue::Double(d) => Some(d),
            netcdf::AttributeValue::Float(f) => Some(f as f64),
            netcdf::AttributeValue::Short(s) => Some(s as f64),
            netcdf::AttributeValue::Int(i) => Some(i as f64),
            netcdf::AttributeValue::Schar(b) => Some(b as f64),
            netcdf::AttributeValue::Uchar(b) => Some(b as f64),
            netcdf::AttributeValue::Ushort(s) => Some(s as f64),
            netcdf::AttributeValue::Uint(i) => Some(i as f64),
            _ => None,
        })
}

/// A grid held in memory, row-major like NetCDF
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    variables: Vec<(String, MemoryVariable)>,
}

#[derive(Debug, Clone, Default)]
struct MemoryVariable {
    dimensions: Vec<(String, usize)>,
    data: Vec<f64>,
    attributes: HashMap<String, String>,
    fill_value: Option<f64>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Coordinate variable indexed by its own dimension
    pub fn with_axis(mut self, name: &str, values: Vec<f64>) -> Self {
        let dims = vec![(name.to_string(), values.len())];
        self.insert(name, dims, values);
        self
    }

    pub fn with_variable(mut self, name: &str, dimensions: &[(&str, usize)], data: Vec<f64>) -> Self {
        let dims = dimensions
            .iter()
            .map(|(dim, len)| (dim.to_string(), *len))
            .collect();
        self.insert(name, dims, data);
        self
    }

    pub fn with_attribute(mut self, variable: &str, attribute: &str, value: &str) -> Self {
        if let Some(var) = self.get_mut(variable) {
            var.attributes.insert(attribute.to_string(), value.to_string());
        }
        self
    }

    pub fn with_fill_value(mut self, variable: &str, fill_value: f64) -> Self {
        if let Some(var) = self.get_mut(variable) {
            var.fill_value = Some(fill_value);
        }
        self
    }

    fn insert(&mut self, name: &str, dimensions: Vec<(String, usize)>, data: Vec<f64>) {
        self.variables.retain(|(existing, _)| existing != name);
        self.variables.push((
            name.to_string(),
            MemoryVariable {
                dimensions,
                data,
                ..MemoryVariable::default()
            },
        ));
    }

    fn get(&self, name: &str) -> Result<&MemoryVariable> {
        self.variables
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, var)| var)
            .ok_or_else(|| ProcessingError::VariableNotFound {
                pattern: name.to_string(),
                available: self.variable_names(),
            })
    }

    fn get_mut(&mut self, name: &str) -> Option<&mut MemoryVariable> {
        self.variables
            .iter_mut()
            .find(|(existing, _)| existing == name)
            .map(|(_, var)| var)
    }
}

impl GriddedDataset for MemoryDataset {
    fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|(name, _)| name.clone()).collect()
    }

    fn dimensions(&self, variable: &str) -> Result<Vec<(String, usize)>> {
        Ok(self.get(variable)?.dimensions.clone())
    }

    fn read_axis(&self, variable: &str) -> Result<Vec<f64>> {
        Ok(self.get(variable)?.data.clone())
    }

    fn read_value(&self, variable: &str, index: &[usize]) -> Result<Option<f64>> {
        let var = self.get(variable)?;
        if index.len() != var.dimensions.len() {
            return Err(ProcessingError::InvalidFormat(format!(
                "Index of rank {} for '{}' of rank {}",
                index.len(),
                variable,
                var.dimensions.len()
            )));
        }

        let mut flat = 0;
        for (idx, (_, len)) in index.iter().zip(&var.dimensions) {
            if idx >= len {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Index {:?} out of bounds for '{}'",
                    index, variable
                )));
            }
            flat = flat * len + idx;
        }

        let raw = var.data.get(flat).copied().ok_or_else(|| {
            ProcessingError::MissingData(format!("'{}' holds no element {}", variable, flat))
        })?;
        if raw.is_nan() || Some(raw) == var.fill_value {
            Ok(None)
        } else {
            Ok(Some(raw))
        }
    }

    fn attribute_text(&self, variable: &str, attribute: &str) -> Option<String> {
        self.get(variable).ok()?.attributes.get(attribute).cloned()
    }
}
