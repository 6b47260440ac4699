//! # Error Types
//!
//! Errors raised while loading, filtering and plotting an ADCP dataset.
//! Storage failures keep their own [`StorageError`] type and are wrapped here
//! so the whole pipeline can be driven with `?`.

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while producing a quality-controlled plot
#[derive(Error, Debug)]
pub enum QcPlotError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    #[error("Variable '{0}' not found in dataset")]
    VariableNotFound(String),

    #[error("Attribute '{attribute}' not found on variable '{variable}'")]
    AttributeNotFound { variable: String, attribute: String },

    #[error("Attribute '{attribute}' on '{variable}' has an unexpected type: {found}")]
    AttributeType {
        variable: String,
        attribute: String,
        found: String,
    },

    #[error("Flag shape {flags:?} cannot be broadcast to measurement shape {measurement:?}")]
    ShapeMismatch {
        flags: Vec<usize>,
        measurement: Vec<usize>,
    },

    #[error("Cannot take a (time, depth) plane at {index:?} of an array shaped {shape:?}")]
    PlaneIndex { index: Vec<usize>, shape: Vec<usize> },

    #[error("Colormap level count must be even and positive, got {0}")]
    OddLevelCount(usize),

    #[error("Flag code {code} has no meaning in '{variable}' (known: {known})")]
    UnknownFlagCode {
        variable: String,
        code: i32,
        known: String,
    },

    #[error("Invalid time axis: {0}")]
    Time(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Rendering error: {0}")]
    Render(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for the plotting pipeline
pub type QcPlotResult<T> = Result<T, QcPlotError>;
