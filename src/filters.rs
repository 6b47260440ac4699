//! # Quality-Control Filtering
//!
//! Applies a set of accepted quality-control codes to a measurement array.
//! Samples whose flag is not accepted are rewritten to the variable's fill
//! value and marked invalid in an explicit mask, so nothing downstream has to
//! recognise the sentinel.
//!
//! ## Broadcasting
//!
//! Flags may have fewer dimensions than the measurement. The rule is checked
//! up front rather than left to the array library:
//!
//! - the flag rank must not exceed the measurement rank;
//! - each flag dimension must equal the matching leading measurement
//!   dimension, or be 1;
//! - missing trailing dimensions are broadcast.
//!
//! ## Example
//!
//! ```rust
//! use adcp_qcplot::filters::{AcceptedFlagSet, QualityFilter};
//! use adcp_qcplot::model::{MeasurementVariable, QualityFlagVariable, ValidRange};
//! use ndarray::{ArrayD, IxDyn};
//!
//! let fill = 999999.0_f32;
//! let ucur = MeasurementVariable {
//!     name: "UCUR".to_string(),
//!     data: ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![5.0, -3.0, fill, 7.0]).unwrap(),
//!     fill_value: fill,
//!     units: "m s-1".to_string(),
//!     long_name: "eastward_sea_water_velocity".to_string(),
//!     valid_range: ValidRange::new(-10.0, 10.0),
//! };
//! let flags = QualityFlagVariable {
//!     name: "UCUR_quality_control".to_string(),
//!     data: ArrayD::from_shape_vec(IxDyn(&[2, 2]), vec![1, 3, 2, 1]).unwrap(),
//!     flag_meanings: vec![],
//!     flag_values: None,
//! };
//!
//! let filter = QualityFilter::new(AcceptedFlagSet::default());
//! let filtered = filter.apply(&ucur, &flags).unwrap();
//! assert_eq!(filtered.get(&[0, 0]), Some(5.0));
//! assert_eq!(filtered.get(&[0, 1]), None);
//! ```

use crate::error::{QcPlotError, QcPlotResult};
use crate::model::{MeasurementVariable, QualityFlagVariable};
use ndarray::{Array2, ArrayD, Axis, Ix2, IxDyn, Zip};
use serde::{Deserialize, Serialize};

/// IMOS "good" flag code.
pub const FLAG_GOOD: i32 = 1;
/// IMOS "probably good" flag code.
pub const FLAG_PROBABLY_GOOD: i32 = 2;

/// Ordered set of quality-control codes considered trustworthy.
///
/// Order only affects labelling. Duplicates are dropped, keeping the first
/// occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<i32>", into = "Vec<i32>")]
pub struct AcceptedFlagSet {
    codes: Vec<i32>,
}

impl AcceptedFlagSet {
    pub fn new(codes: Vec<i32>) -> QcPlotResult<Self> {
        let mut unique = Vec::with_capacity(codes.len());
        for code in codes {
            if !unique.contains(&code) {
                unique.push(code);
            }
        }
        if unique.is_empty() {
            return Err(QcPlotError::Config(
                "accepted flag set must contain at least one code".to_string(),
            ));
        }
        Ok(AcceptedFlagSet { codes: unique })
    }

    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    pub fn contains(&self, code: i32) -> bool {
        self.codes.contains(&code)
    }

    /// Checks that every accepted code has a meaning in `flags`.
    pub fn validate_against(&self, flags: &QualityFlagVariable) -> QcPlotResult<()> {
        for code in &self.codes {
            flags.label_or_err(*code)?;
        }
        Ok(())
    }

    /// Flag meanings of the accepted codes, in set order.
    pub fn labels<'a>(&self, flags: &'a QualityFlagVariable) -> QcPlotResult<Vec<&'a str>> {
        self.codes.iter().map(|code| flags.label_or_err(*code)).collect()
    }

    /// Human-readable list such as `"Good_data and Probably_good_data"`.
    pub fn describe(&self, flags: &QualityFlagVariable) -> QcPlotResult<String> {
        let labels = self.labels(flags)?;
        Ok(match labels.split_last() {
            Some((last, rest)) if !rest.is_empty() => format!("{} and {}", rest.join(", "), last),
            Some((last, _)) => last.to_string(),
            None => String::new(),
        })
    }
}

impl Default for AcceptedFlagSet {
    fn default() -> Self {
        AcceptedFlagSet {
            codes: vec![FLAG_GOOD, FLAG_PROBABLY_GOOD],
        }
    }
}

impl TryFrom<Vec<i32>> for AcceptedFlagSet {
    type Error = QcPlotError;

    fn try_from(codes: Vec<i32>) -> Result<Self, Self::Error> {
        AcceptedFlagSet::new(codes)
    }
}

impl From<AcceptedFlagSet> for Vec<i32> {
    fn from(set: AcceptedFlagSet) -> Self {
        set.codes
    }
}

/// Sample counts produced by one filtering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct FilterSummary {
    pub total: usize,
    /// Valid after filtering
    pub accepted: usize,
    /// Present in the source but carrying an unaccepted flag
    pub rejected: usize,
    /// Already fill-valued (or NaN) in the source
    pub missing: usize,
}

/// A measurement after quality-control masking.
///
/// `values` has the source shape; rejected samples hold the fill value and
/// are `false` in `valid`.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredMeasurement {
    pub name: String,
    values: ArrayD<f32>,
    valid: ArrayD<bool>,
    fill_value: f32,
    summary: FilterSummary,
}

impl FilteredMeasurement {
    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn values(&self) -> &ArrayD<f32> {
        &self.values
    }

    pub fn valid_mask(&self) -> &ArrayD<bool> {
        &self.valid
    }

    pub fn fill_value(&self) -> f32 {
        self.fill_value
    }

    pub fn summary(&self) -> FilterSummary {
        self.summary
    }

    /// The sample at `index`, or `None` when it is missing or was rejected.
    pub fn get(&self, index: &[usize]) -> Option<f32> {
        match (self.valid.get(index), self.values.get(index)) {
            (Some(true), Some(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }

    pub fn is_all_missing(&self) -> bool {
        self.valid_count() == 0
    }

    /// The (time, depth) plane at the given indices of the remaining
    /// dimensions, e.g. `&[0, 0]` for a 4D (time, depth, cell, record) array.
    pub fn plane(&self, extra: &[usize]) -> QcPlotResult<Array2<Option<f32>>> {
        let shape = self.shape();
        let in_bounds = shape.len() == extra.len() + 2
            && extra.iter().zip(&shape[2..]).all(|(index, len)| index < len);
        if !in_bounds {
            return Err(QcPlotError::PlaneIndex {
                index: extra.to_vec(),
                shape: shape.to_vec(),
            });
        }

        let mut values = self.values.view();
        let mut valid = self.valid.view();
        // Peel trailing axes first so the remaining axis numbers stay put.
        for (offset, index) in extra.iter().enumerate().rev() {
            values = values.index_axis_move(Axis(offset + 2), *index);
            valid = valid.index_axis_move(Axis(offset + 2), *index);
        }
        let values = values
            .into_dimensionality::<Ix2>()
            .map_err(|_| QcPlotError::PlaneIndex {
                index: extra.to_vec(),
                shape: shape.to_vec(),
            })?;
        let valid = valid
            .into_dimensionality::<Ix2>()
            .map_err(|_| QcPlotError::PlaneIndex {
                index: extra.to_vec(),
                shape: shape.to_vec(),
            })?;

        Ok(Zip::from(&values)
            .and(&valid)
            .map_collect(|value, ok| ok.then_some(*value)))
    }

    /// Rebuilds a measurement from the filtered values, carrying over the
    /// metadata of `source`. Filtering the result again with the same flags
    /// reproduces `self`.
    pub fn to_measurement(&self, source: &MeasurementVariable) -> MeasurementVariable {
        MeasurementVariable {
            name: self.name.clone(),
            data: self.values.clone(),
            fill_value: self.fill_value,
            units: source.units.clone(),
            long_name: source.long_name.clone(),
            valid_range: source.valid_range,
        }
    }
}

/// Checks the broadcast rule described in the module docs.
pub fn check_broadcast(flag_shape: &[usize], measurement_shape: &[usize]) -> QcPlotResult<()> {
    let compatible = flag_shape.len() <= measurement_shape.len()
        && flag_shape
            .iter()
            .zip(measurement_shape)
            .all(|(f, m)| f == m || *f == 1);
    if compatible {
        Ok(())
    } else {
        Err(QcPlotError::ShapeMismatch {
            flags: flag_shape.to_vec(),
            measurement: measurement_shape.to_vec(),
        })
    }
}

/// Quality filter for one accepted flag set.
#[derive(Debug, Clone, Default)]
pub struct QualityFilter {
    accepted: AcceptedFlagSet,
}

impl QualityFilter {
    pub fn new(accepted: AcceptedFlagSet) -> Self {
        QualityFilter { accepted }
    }

    pub fn accepted(&self) -> &AcceptedFlagSet {
        &self.accepted
    }

    /// Masks `measurement` with `flags`.
    ///
    /// Missing source samples stay missing whatever their flag. A set that
    /// selects nothing yields an all-missing result, not an error.
    pub fn apply(
        &self,
        measurement: &MeasurementVariable,
        flags: &QualityFlagVariable,
    ) -> QcPlotResult<FilteredMeasurement> {
        let shape = measurement.shape().to_vec();
        check_broadcast(flags.shape(), &shape)?;

        let mut padded = flags.data.view();
        while padded.ndim() < shape.len() {
            let axis = Axis(padded.ndim());
            padded = padded.insert_axis(axis);
        }
        let broadcast = padded
            .broadcast(IxDyn(&shape))
            .ok_or_else(|| QcPlotError::ShapeMismatch {
                flags: flags.shape().to_vec(),
                measurement: shape.clone(),
            })?;

        let fill_value = measurement.fill_value;
        let mut values = ArrayD::from_elem(IxDyn(&shape), fill_value);
        let mut valid = ArrayD::from_elem(IxDyn(&shape), false);
        let mut summary = FilterSummary {
            total: measurement.data.len(),
            ..FilterSummary::default()
        };

        Zip::from(&mut values)
            .and(&mut valid)
            .and(&measurement.data)
            .and(broadcast)
            .for_each(|out, ok, source, flag| {
                if measurement.is_missing(*source) {
                    summary.missing += 1;
                } else if self.accepted.contains(*flag) {
                    *out = *source;
                    *ok = true;
                    summary.accepted += 1;
                } else {
                    summary.rejected += 1;
                }
            });

        Ok(FilteredMeasurement {
            name: measurement.name.clone(),
            values,
            valid,
            fill_value,
            summary,
        })
    }
}

/// Shorthand for `QualityFilter::new(accepted.clone()).apply(measurement, flags)`.
pub fn filter(
    measurement: &MeasurementVariable,
    flags: &QualityFlagVariable,
    accepted: &AcceptedFlagSet,
) -> QcPlotResult<FilteredMeasurement> {
    QualityFilter::new(accepted.clone()).apply(measurement, flags)
}
