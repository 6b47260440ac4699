//! Synthetic IMOS-style ADCP files for tests.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Serialises every test that reads or writes process environment variables.
pub fn env_lock() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub const FILL: f32 = 999999.0;

pub const IMOS_FLAG_MEANINGS: &str = "No_QC_performed Good_data Probably_good_data \
    Bad_data_that_are_potentially_correctable Bad_data Value_changed Not_used \
    Not_used Interpolated_values Missing_values";

/// A (TIME, HEIGHT_ABOVE_SENSOR, LATITUDE, LONGITUDE) current-velocity file.
#[derive(Debug, Clone)]
pub struct AdcpFixture {
    pub times: Vec<f64>,
    pub heights: Vec<f64>,
    pub ucur: Vec<f32>,
    pub flags: Vec<i8>,
    pub valid_range: Option<(f32, f32)>,
}

impl AdcpFixture {
    pub const TITLE: &'static str = "Test mooring ADCP deployment";

    /// Four hourly profiles over three bins starting 2012-05-16T04:00Z.
    ///
    /// With flags {1, 2} accepted: 7 accepted, 4 rejected, 1 missing.
    pub fn small() -> Self {
        AdcpFixture {
            times: (0..4).map(|k| 22781.0 + (4.0 + k as f64) / 24.0).collect(),
            heights: vec![4.0, 8.0, 12.0],
            ucur: vec![
                0.1, -0.2, 0.3, //
                0.4, -0.5, FILL, //
                0.7, 0.8, -0.9, //
                1.0, 1.1, 1.2,
            ],
            flags: vec![
                1, 2, 4, //
                1, 1, 9, //
                3, 1, 2, //
                0, 4, 1,
            ],
            valid_range: Some((-10.0, 10.0)),
        }
    }

    /// Profiles spread over several months, one per ten days.
    pub fn seasonal(profiles: usize) -> Self {
        let heights = vec![2.0, 6.0, 10.0, 14.0];
        let cells = profiles * heights.len();
        AdcpFixture {
            times: (0..profiles).map(|k| 22781.0 + 10.0 * k as f64).collect(),
            ucur: (0..cells).map(|k| ((k % 7) as f32 - 3.0) / 10.0).collect(),
            flags: (0..cells).map(|k| if k % 5 == 0 { 4 } else { 1 }).collect(),
            heights,
            valid_range: Some((-10.0, 10.0)),
        }
    }

    pub fn with_flags(mut self, flags: Vec<i8>) -> Self {
        self.flags = flags;
        self
    }

    pub fn without_valid_range(mut self) -> Self {
        self.valid_range = None;
        self
    }

    pub fn write(&self, path: &Path) -> netcdf::Result<()> {
        let mut file = netcdf::create(path)?;
        file.add_attribute("title", Self::TITLE)?;
        file.add_attribute("site_code", "TEST50")?;

        file.add_dimension("TIME", self.times.len())?;
        file.add_dimension("HEIGHT_ABOVE_SENSOR", self.heights.len())?;
        file.add_dimension("LATITUDE", 1)?;
        file.add_dimension("LONGITUDE", 1)?;

        {
            let mut time = file.add_variable::<f64>("TIME", &["TIME"])?;
            time.put_attribute("long_name", "time")?;
            time.put_attribute("units", "days since 1950-01-01 00:00:00 UTC")?;
            time.put_values(&self.times, ..)?;
        }
        {
            let mut height = file.add_variable::<f64>("HEIGHT_ABOVE_SENSOR", &["HEIGHT_ABOVE_SENSOR"])?;
            height.put_attribute("long_name", "height_above_sensor")?;
            height.put_attribute("units", "m")?;
            height.put_values(&self.heights, ..)?;
        }

        let dims = ["TIME", "HEIGHT_ABOVE_SENSOR", "LATITUDE", "LONGITUDE"];
        {
            let mut ucur = file.add_variable::<f32>("UCUR", &dims)?;
            ucur.put_attribute("_FillValue", FILL)?;
            ucur.put_attribute("long_name", "eastward_sea_water_velocity")?;
            ucur.put_attribute("units", "m s-1")?;
            if let Some((min, max)) = self.valid_range {
                ucur.put_attribute("valid_min", min)?;
                ucur.put_attribute("valid_max", max)?;
            }
            ucur.put_values(&self.ucur, ..)?;
        }
        {
            let mut qc = file.add_variable::<i8>("UCUR_quality_control", &dims)?;
            qc.put_attribute("long_name", "quality flag for eastward_sea_water_velocity")?;
            qc.put_attribute("flag_values", (0..10).collect::<Vec<i8>>())?;
            qc.put_attribute("flag_meanings", IMOS_FLAG_MEANINGS)?;
            qc.put_values(&self.flags, ..)?;
        }
        Ok(())
    }
}
