//! # Dataset Access
//!
//! Opens an ADCP NetCDF dataset and reads the pieces the plot needs: the
//! measurement, its quality-control flags, the depth and time axes, and the
//! global attributes.
//!
//! Three kinds of source are supported:
//!
//! - local files, opened in place;
//! - OPeNDAP URLs, handed to libnetcdf which streams them itself;
//! - other `http(s)://` and `s3://` objects, downloaded through
//!   [`crate::storage`] into a temporary file that lives as long as the
//!   dataset handle.

use crate::error::{QcPlotError, QcPlotResult};
use crate::model::{MeasurementVariable, QualityFlagVariable, ValidRange};
use crate::storage::{StorageBackend, StorageFactory};
use crate::time::CfTimeUnits;
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, info};
use netcdf::AttributeValue;
use std::collections::BTreeMap;
use std::time::Duration;
use tempfile::NamedTempFile;

/// libnetcdf's default fill for `float` variables without `_FillValue`.
pub const NC_FILL_FLOAT: f32 = 9.969_21e36;

/// How a dataset path is reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Local(String),
    OpenDap(String),
    Remote(String),
}

impl DatasetSource {
    pub fn classify(path: &str) -> Self {
        if StorageFactory::is_opendap_url(path) {
            DatasetSource::OpenDap(path.to_string())
        } else if StorageFactory::is_local_path(path) {
            DatasetSource::Local(path.to_string())
        } else {
            DatasetSource::Remote(path.to_string())
        }
    }

    pub fn path(&self) -> &str {
        match self {
            DatasetSource::Local(p) | DatasetSource::OpenDap(p) | DatasetSource::Remote(p) => p,
        }
    }
}

/// An open ADCP dataset.
pub struct AdcpDataset {
    // Declared before `staged` so the NetCDF handle closes before the
    // temporary file is removed.
    file: netcdf::File,
    source: DatasetSource,
    staged: Option<NamedTempFile>,
}

impl std::fmt::Debug for AdcpDataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdcpDataset")
            .field("source", &self.source)
            .field("staged", &self.staged.as_ref().map(|t| t.path().to_path_buf()))
            .finish()
    }
}

impl AdcpDataset {
    /// Opens `path`, downloading it first when it is a non-OPeNDAP remote.
    pub async fn open(path: &str, show_progress: bool) -> QcPlotResult<Self> {
        match DatasetSource::classify(path) {
            DatasetSource::Remote(url) => {
                let spinner = if show_progress {
                    let spinner = ProgressBar::new_spinner();
                    spinner.set_style(
                        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
                    );
                    spinner.set_message(format!("Fetching {}", url));
                    spinner.enable_steady_tick(Duration::from_millis(120));
                    Some(spinner)
                } else {
                    None
                };

                let storage = StorageFactory::from_path(&url).await?;
                let data = storage.read(&url).await;
                if let Some(spinner) = spinner {
                    spinner.finish_and_clear();
                }
                let data = data?;

                let staged = tempfile::Builder::new()
                    .prefix("adcp-qcplot-")
                    .suffix(".nc")
                    .tempfile()?;
                debug!(
                    "Staging {} bytes from {} at {:?}",
                    data.len(),
                    url,
                    staged.path()
                );
                tokio::fs::write(staged.path(), &data).await?;

                let file = netcdf::open(staged.path())?;
                Ok(AdcpDataset {
                    file,
                    source: DatasetSource::Remote(url),
                    staged: Some(staged),
                })
            }
            source => {
                info!("Opening dataset {}", source.path());
                let file = netcdf::open(source.path())?;
                Ok(AdcpDataset {
                    file,
                    source,
                    staged: None,
                })
            }
        }
    }

    /// Opens a local file or OPeNDAP URL synchronously.
    pub fn open_direct(path: &str) -> QcPlotResult<Self> {
        let file = netcdf::open(path)?;
        Ok(AdcpDataset {
            file,
            source: DatasetSource::classify(path),
            staged: None,
        })
    }

    pub fn source(&self) -> &DatasetSource {
        &self.source
    }

    pub fn file(&self) -> &netcdf::File {
        &self.file
    }

    fn variable(&self, name: &str) -> QcPlotResult<netcdf::Variable<'_>> {
        self.file
            .variable(name)
            .ok_or_else(|| QcPlotError::VariableNotFound(name.to_string()))
    }

    /// Global attributes rendered as strings, keyed by name.
    pub fn global_attributes(&self) -> BTreeMap<String, String> {
        self.file
            .attributes()
            .filter_map(|attr| {
                let value = attr.value().ok()?;
                Some((attr.name().to_string(), attribute_to_string(&value)))
            })
            .collect()
    }

    /// The global `title`, if any.
    pub fn title(&self) -> Option<String> {
        self.global_attributes().remove("title")
    }

    pub fn read_measurement(&self, name: &str) -> QcPlotResult<MeasurementVariable> {
        let var = self.variable(name)?;
        let data = var.get::<f32, _>(..)?;

        let fill_value = optional_attribute(&var, "_FillValue")?
            .map(|value| attribute_to_f64(name, "_FillValue", &value))
            .transpose()?
            .map(|v| v as f32)
            .unwrap_or(NC_FILL_FLOAT);

        let units = optional_attribute(&var, "units")?
            .map(|v| attribute_to_string(&v))
            .unwrap_or_default();
        let long_name = optional_attribute(&var, "long_name")?
            .map(|v| attribute_to_string(&v))
            .unwrap_or_else(|| name.to_string());

        let valid_min = optional_attribute(&var, "valid_min")?
            .map(|v| attribute_to_f64(name, "valid_min", &v))
            .transpose()?;
        let valid_max = optional_attribute(&var, "valid_max")?
            .map(|v| attribute_to_f64(name, "valid_max", &v))
            .transpose()?;
        let valid_range = match (valid_min, valid_max) {
            (Some(min), Some(max)) => ValidRange::new(min, max),
            _ => {
                debug!("{} has no valid_min/valid_max, using a symmetric data range", name);
                ValidRange::symmetric_from_data(&data, fill_value)
            }
        };

        debug!(
            "Read {} shape {:?}, fill {}, valid range [{}, {}]",
            name,
            data.shape(),
            fill_value,
            valid_range.min,
            valid_range.max
        );

        Ok(MeasurementVariable {
            name: name.to_string(),
            data,
            fill_value,
            units,
            long_name,
            valid_range,
        })
    }

    pub fn read_flags(&self, name: &str) -> QcPlotResult<QualityFlagVariable> {
        let var = self.variable(name)?;
        let data = var.get::<i32, _>(..)?;

        let meanings = optional_attribute(&var, "flag_meanings")?.ok_or_else(|| {
            QcPlotError::AttributeNotFound {
                variable: name.to_string(),
                attribute: "flag_meanings".to_string(),
            }
        })?;
        let flag_meanings = QualityFlagVariable::parse_flag_meanings(&attribute_to_string(&meanings));

        let flag_values = optional_attribute(&var, "flag_values")?
            .map(|v| attribute_to_i32s(name, "flag_values", &v))
            .transpose()?;

        debug!(
            "Read {} shape {:?} with {} flag meanings",
            name,
            data.shape(),
            flag_meanings.len()
        );

        Ok(QualityFlagVariable {
            name: name.to_string(),
            data,
            flag_meanings,
            flag_values,
        })
    }

    /// A 1D coordinate variable as `f64`.
    pub fn read_axis(&self, name: &str) -> QcPlotResult<Vec<f64>> {
        let var = self.variable(name)?;
        let values = var.get::<f64, _>(..)?;
        Ok(values.iter().copied().collect())
    }

    /// A CF time variable decoded to UTC.
    pub fn read_time_axis(&self, name: &str) -> QcPlotResult<Vec<DateTime<Utc>>> {
        let raw = self.read_axis(name)?;
        let units = self.attribute_string(name, "units")?;
        CfTimeUnits::parse(&units)?.decode_all(&raw)
    }

    pub fn attribute_string(&self, variable: &str, attribute: &str) -> QcPlotResult<String> {
        let var = self.variable(variable)?;
        optional_attribute(&var, attribute)?
            .map(|v| attribute_to_string(&v))
            .ok_or_else(|| QcPlotError::AttributeNotFound {
                variable: variable.to_string(),
                attribute: attribute.to_string(),
            })
    }

    /// `"<long_name> in <units>"` for any variable, falling back to its name.
    pub fn axis_label(&self, variable: &str) -> String {
        let long_name = self
            .attribute_string(variable, "long_name")
            .unwrap_or_else(|_| variable.to_string());
        match self.attribute_string(variable, "units") {
            Ok(units) => format!("{} in {}", long_name, units),
            Err(_) => long_name,
        }
    }
}

fn optional_attribute(var: &netcdf::Variable<'_>, name: &str) -> QcPlotResult<Option<AttributeValue>> {
    match var.attribute(name) {
        Some(attr) => Ok(Some(attr.value()?)),
        None => Ok(None),
    }
}

fn type_error(variable: &str, attribute: &str, value: &AttributeValue) -> QcPlotError {
    QcPlotError::AttributeType {
        variable: variable.to_string(),
        attribute: attribute.to_string(),
        found: format!("{:?}", value),
    }
}

/// Scalar numeric attribute (or the first element of a numeric array).
pub fn attribute_to_f64(variable: &str, attribute: &str, value: &AttributeValue) -> QcPlotResult<f64> {
    let number = match value {
        AttributeValue::Uchar(v) => Some(*v as f64),
        AttributeValue::Schar(v) => Some(*v as f64),
        AttributeValue::Ushort(v) => Some(*v as f64),
        AttributeValue::Short(v) => Some(*v as f64),
        AttributeValue::Uint(v) => Some(*v as f64),
        AttributeValue::Int(v) => Some(*v as f64),
        AttributeValue::Ulonglong(v) => Some(*v as f64),
        AttributeValue::Longlong(v) => Some(*v as f64),
        AttributeValue::Float(v) => Some(*v as f64),
        AttributeValue::Double(v) => Some(*v),
        AttributeValue::Floats(v) => v.first().map(|x| *x as f64),
        AttributeValue::Doubles(v) => v.first().copied(),
        AttributeValue::Str(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| type_error(variable, attribute, value))
}

/// Integer list attribute such as `flag_values`.
pub fn attribute_to_i32s(variable: &str, attribute: &str, value: &AttributeValue) -> QcPlotResult<Vec<i32>> {
    let values = match value {
        AttributeValue::Uchars(v) => v.iter().map(|x| *x as i32).collect(),
        AttributeValue::Schars(v) => v.iter().map(|x| *x as i32).collect(),
        AttributeValue::Shorts(v) => v.iter().map(|x| *x as i32).collect(),
        AttributeValue::Ushorts(v) => v.iter().map(|x| *x as i32).collect(),
        AttributeValue::Ints(v) => v.clone(),
        AttributeValue::Uchar(v) => vec![*v as i32],
        AttributeValue::Schar(v) => vec![*v as i32],
        AttributeValue::Short(v) => vec![*v as i32],
        AttributeValue::Int(v) => vec![*v],
        _ => return Err(type_error(variable, attribute, value)),
    };
    Ok(values)
}

/// Text form of an attribute; strings are returned verbatim.
pub fn attribute_to_string(value: &AttributeValue) -> String {
    match value {
        AttributeValue::Str(s) => s.clone(),
        AttributeValue::Strs(v) => v.join(" "),
        AttributeValue::Float(v) => v.to_string(),
        AttributeValue::Double(v) => v.to_string(),
        AttributeValue::Int(v) => v.to_string(),
        AttributeValue::Short(v) => v.to_string(),
        AttributeValue::Schar(v) => v.to_string(),
        other => format!("{:?}", other),
    }
}
