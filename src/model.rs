//! # Data Model
//!
//! In-memory representations of the variables read from an ADCP dataset.
//! They are built once by [`crate::dataset`] and never mutated afterwards.

use crate::error::{QcPlotError, QcPlotResult};
use ndarray::ArrayD;
use serde::{Deserialize, Serialize};

/// Documented `[valid_min, valid_max]` bounds of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidRange {
    pub min: f64,
    pub max: f64,
}

impl ValidRange {
    pub fn new(min: f64, max: f64) -> Self {
        ValidRange { min, max }
    }

    /// Symmetric range around zero that covers every finite, non-fill value.
    ///
    /// Falls back to `[-1, 1]` when there is nothing to cover.
    pub fn symmetric_from_data(data: &ArrayD<f32>, fill_value: f32) -> Self {
        let max_abs = data
            .iter()
            .filter(|v| v.is_finite() && **v != fill_value)
            .fold(0.0_f64, |acc, v| acc.max((*v as f64).abs()));
        if max_abs > 0.0 {
            ValidRange::new(-max_abs, max_abs)
        } else {
            ValidRange::new(-1.0, 1.0)
        }
    }
}

/// A physical quantity sampled on (time, depth, cell, record).
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementVariable {
    pub name: String,
    pub data: ArrayD<f32>,
    pub fill_value: f32,
    pub units: String,
    pub long_name: String,
    pub valid_range: ValidRange,
}

impl MeasurementVariable {
    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Axis label in the "<long name> in <units>" style used on the figure.
    pub fn axis_label(&self) -> String {
        format!("{} in {}", self.long_name, self.units)
    }

    /// True when the stored value is the fill sentinel (or not a number).
    pub fn is_missing(&self, value: f32) -> bool {
        value.is_nan() || value == self.fill_value
    }
}

/// Integer-coded quality-control flags with their meanings.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityFlagVariable {
    pub name: String,
    pub data: ArrayD<i32>,
    pub flag_meanings: Vec<String>,
    pub flag_values: Option<Vec<i32>>,
}

impl QualityFlagVariable {
    /// Splits a CF `flag_meanings` attribute on whitespace.
    pub fn parse_flag_meanings(attribute: &str) -> Vec<String> {
        attribute.split_whitespace().map(str::to_string).collect()
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Meaning of a flag code.
    ///
    /// Uses the position of `code` in `flag_values` when that attribute was
    /// present, otherwise treats the code as an index into `flag_meanings`.
    pub fn label(&self, code: i32) -> Option<&str> {
        let position = match &self.flag_values {
            Some(values) => values.iter().position(|v| *v == code)?,
            None => usize::try_from(code).ok()?,
        };
        self.flag_meanings.get(position).map(String::as_str)
    }

    pub fn label_or_err(&self, code: i32) -> QcPlotResult<&str> {
        self.label(code).ok_or_else(|| QcPlotError::UnknownFlagCode {
            variable: self.name.clone(),
            code,
            known: self.flag_meanings.join(" "),
        })
    }
}
