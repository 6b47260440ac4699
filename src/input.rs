//! # Job Configuration
//!
//! A plot job names the dataset to read, the variables to plot, the accepted
//! quality-control codes and where to write the figure. Jobs are loaded from
//! JSON or YAML; every field has a default, so an empty document describes the
//! WATR50 mooring demo.
//!
//! ## Example
//!
//! ```rust
//! use adcp_qcplot::input::JobConfig;
//!
//! let json = r#"
//! {
//!   "input": "adcp.nc",
//!   "output": "ucur.png",
//!   "variable_name": "VCUR",
//!   "accepted_flags": [1]
//! }"#;
//! let config = JobConfig::from_json(json)?;
//! assert_eq!(config.flag_variable(), "VCUR_quality_control");
//! assert_eq!(config.levels, 64);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::colormap::DEFAULT_LEVELS;
use crate::error::{QcPlotError, QcPlotResult};
use crate::filters::AcceptedFlagSet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Current-velocity record from the WATR50 mooring, served over OPeNDAP.
pub const DEFAULT_INPUT: &str = "http://thredds.aodn.org.au/thredds/dodsC/IMOS/eMII/demos/ANMN/WA/WATR50/Velocity/IMOS_ANMN-WA_VATPE_20120516T040000Z_WATR50_FV01_WATR50-1205-Workhorse-ADCP-498_END-20121204T021500Z_C-20121207T023956Z.nc";
pub const DEFAULT_OUTPUT: &str = "anmn_adcp_ucur.png";
pub const DEFAULT_VARIABLE: &str = "UCUR";
pub const DEFAULT_DEPTH_VARIABLE: &str = "HEIGHT_ABOVE_SENSOR";
pub const DEFAULT_TIME_VARIABLE: &str = "TIME";
pub const DEFAULT_WIDTH: u32 = 1040;
pub const DEFAULT_HEIGHT: u32 = 1440;

/// Configuration for one plot job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Dataset path: local file, OPeNDAP URL, `http(s)://` or `s3://` object
    #[serde(default = "default_input")]
    pub input: String,
    /// Figure destination, local or `s3://`
    #[serde(default = "default_output")]
    pub output: String,
    /// Measurement to plot
    #[serde(default = "default_variable")]
    pub variable_name: String,
    #[serde(default = "default_depth_variable")]
    pub depth_variable: String,
    #[serde(default = "default_time_variable")]
    pub time_variable: String,
    /// Defaults to `<variable_name>_quality_control`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag_variable: Option<String>,
    #[serde(default)]
    pub accepted_flags: AcceptedFlagSet,
    /// Colormap level count (even)
    #[serde(default = "default_levels")]
    pub levels: usize,
    #[serde(default)]
    pub figure: FigureConfig,
}

/// Figure size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FigureConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_input() -> String {
    DEFAULT_INPUT.to_string()
}

fn default_output() -> String {
    DEFAULT_OUTPUT.to_string()
}

fn default_variable() -> String {
    DEFAULT_VARIABLE.to_string()
}

fn default_depth_variable() -> String {
    DEFAULT_DEPTH_VARIABLE.to_string()
}

fn default_time_variable() -> String {
    DEFAULT_TIME_VARIABLE.to_string()
}

fn default_levels() -> usize {
    DEFAULT_LEVELS
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

impl Default for FigureConfig {
    fn default() -> Self {
        FigureConfig {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

impl FigureConfig {
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        JobConfig {
            input: default_input(),
            output: default_output(),
            variable_name: default_variable(),
            depth_variable: default_depth_variable(),
            time_variable: default_time_variable(),
            flag_variable: None,
            accepted_flags: AcceptedFlagSet::default(),
            levels: DEFAULT_LEVELS,
            figure: FigureConfig::default(),
        }
    }
}

impl JobConfig {
    /// Loads a job from a JSON or YAML file, see [`load_document`].
    pub fn from_file<P: AsRef<Path>>(path: P) -> QcPlotResult<Self> {
        load_document(path.as_ref())
    }

    pub fn from_json(json_str: &str) -> QcPlotResult<Self> {
        parse_json(json_str)
    }

    pub fn from_yaml(yaml_str: &str) -> QcPlotResult<Self> {
        parse_yaml(yaml_str)
    }

    pub fn to_json(&self) -> QcPlotResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| QcPlotError::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> QcPlotResult<String> {
        serde_yaml::to_string(self).map_err(|e| QcPlotError::Config(e.to_string()))
    }

    /// Name of the quality-control variable paired with `variable_name`.
    pub fn flag_variable(&self) -> String {
        self.flag_variable
            .clone()
            .unwrap_or_else(|| format!("{}_quality_control", self.variable_name))
    }

    /// Checks the job without touching the dataset.
    pub fn validate(&self) -> QcPlotResult<()> {
        let names = [
            ("input", self.input.as_str()),
            ("output", self.output.as_str()),
            ("variable_name", self.variable_name.as_str()),
            ("depth_variable", self.depth_variable.as_str()),
            ("time_variable", self.time_variable.as_str()),
        ];
        for (field, value) in names {
            if value.trim().is_empty() {
                return Err(QcPlotError::Config(format!("'{}' must not be empty", field)));
            }
        }
        if let Some(flag_variable) = &self.flag_variable
            && flag_variable.trim().is_empty()
        {
            return Err(QcPlotError::Config("'flag_variable' must not be empty".to_string()));
        }
        if self.accepted_flags.codes().is_empty() {
            return Err(QcPlotError::Config("'accepted_flags' must not be empty".to_string()));
        }
        if self.levels == 0 || self.levels % 2 != 0 {
            return Err(QcPlotError::OddLevelCount(self.levels));
        }
        if self.figure.width == 0 || self.figure.height == 0 {
            return Err(QcPlotError::Config(format!(
                "figure size must be non-zero, got {}x{}",
                self.figure.width, self.figure.height
            )));
        }
        if let Some(path) = self.output.strip_prefix("s3://")
            && !path.contains('/')
        {
            return Err(QcPlotError::Config(format!(
                "S3 output '{}' must include a key after the bucket",
                self.output
            )));
        }
        Ok(())
    }
}

/// Reads a JSON or YAML document.
///
/// The format follows the extension (`.json`, `.yaml`, `.yml`); other
/// extensions are tried as JSON first, then YAML.
pub fn load_document<T: DeserializeOwned>(path: &Path) -> QcPlotResult<T> {
    let content = fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    let parsed = match extension.as_deref() {
        Some("json") => parse_json(&content),
        Some("yaml") | Some("yml") => parse_yaml(&content),
        _ => parse_json(&content).or_else(|_| parse_yaml(&content)),
    };
    parsed.map_err(|e| QcPlotError::Config(format!("{:?}: {}", path, e)))
}

fn parse_json<T: DeserializeOwned>(text: &str) -> QcPlotResult<T> {
    serde_json::from_str(text).map_err(|e| QcPlotError::Config(format!("invalid JSON job: {}", e)))
}

fn parse_yaml<T: DeserializeOwned>(text: &str) -> QcPlotResult<T> {
    serde_yaml::from_str(text).map_err(|e| QcPlotError::Config(format!("invalid YAML job: {}", e)))
}
