//! # adcp-qcplot
//!
//! A Rust library and CLI for plotting quality-controlled ADCP (acoustic
//! Doppler current profiler) velocity records stored as NetCDF.
//!
//! ## Features
//!
//! - **Quality-control filtering**: keep only samples whose flag is in an
//!   accepted set, with validated broadcasting of flags over the measurement
//! - **Profile-index grid**: time replaced by profile number so the record
//!   can be drawn as a depth vs profile heatmap
//! - **Diverging colormap**: blue-white-red palette centred exactly on zero
//! - **Remote data**: local files, OPeNDAP endpoints, HTTP(S) and S3 objects
//! - **Figure output**: PNG or SVG, written locally or uploaded to S3
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use adcp_qcplot::{RunOptions, process_plot_job, input::JobConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = JobConfig::from_file("watr50.yaml")?;
//! process_plot_job(&config, &RunOptions::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration Example
//!
//! ```yaml
//! input: data/IMOS_ANMN-WA_VATPE_WATR50.nc
//! output: figures/watr50_ucur.png
//! variable_name: UCUR
//! accepted_flags: [1, 2]
//! levels: 64
//! figure:
//!   width: 1040
//!   height: 1440
//! ```

pub mod cli;
pub mod colormap;
pub mod dataset;
pub mod error;
pub mod filters;
pub mod grid;
pub mod info;
pub mod input;
pub mod log;
pub mod model;
pub mod output;
pub mod render;
pub mod storage;
pub mod time;

#[cfg(test)]
mod cli_tests;
#[cfg(test)]
mod testing;

use crate::colormap::build_colormap;
use crate::dataset::AdcpDataset;
use crate::error::QcPlotResult;
use crate::filters::{FilterSummary, QualityFilter};
use crate::grid::synthesize_grid;
use crate::input::JobConfig;
use crate::log::{show_filter_summary, show_variable_info};
use crate::output::{check_overwrite, write_figure_async};
use crate::render::{PlotBundle, plot_title, time_axis_label};
use ::log::{debug, info, warn};

/// Switches that change how a job runs but not what it plots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Overwrite an existing local figure
    pub force: bool,
    /// Stop after validating the configuration
    pub dry_run: bool,
    /// Suppress console banners and progress spinners
    pub quiet: bool,
}

/// What a finished plot job produced.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// Dry run: configuration checked, nothing read or written
    Validated,
    Plotted(PlotReport),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlotReport {
    pub output: String,
    pub profiles: usize,
    pub depths: usize,
    pub summary: FilterSummary,
}

/// Builds the figure contents from an open dataset.
///
/// Reads the measurement, its flags and both axes, checks that every accepted
/// code has a meaning, filters, and assembles everything the renderer needs.
/// Only the first cell/record plane of the measurement is plotted.
pub fn build_plot_bundle(
    dataset: &AdcpDataset,
    config: &JobConfig,
    quiet: bool,
) -> QcPlotResult<(PlotBundle, FilterSummary)> {
    let measurement = dataset.read_measurement(&config.variable_name)?;
    let flags = dataset.read_flags(&config.flag_variable())?;
    let depths = dataset.read_axis(&config.depth_variable)?;
    let times = dataset.read_time_axis(&config.time_variable)?;
    show_variable_info(&measurement, &flags, quiet);

    config.accepted_flags.validate_against(&flags)?;
    let accepted = config.accepted_flags.describe(&flags)?;

    let filtered = QualityFilter::new(config.accepted_flags.clone()).apply(&measurement, &flags)?;
    let summary = filtered.summary();
    show_filter_summary(&summary, &accepted, quiet);
    if filtered.is_all_missing() {
        warn!(
            "No {} samples carry an accepted flag; the heatmap will be empty",
            measurement.name
        );
    }

    let extra = vec![0; measurement.shape().len().saturating_sub(2)];
    let plane = filtered.plane(&extra)?;
    let grid = synthesize_grid(&times, &depths);
    let colormap = build_colormap(config.levels)?;
    debug!(
        "Plane {:?}, grid {:?}, {} colours",
        plane.dim(),
        grid.dim(),
        colormap.len()
    );

    let title = dataset.title().unwrap_or_else(|| config.input.clone());
    let time_long_name = dataset
        .attribute_string(&config.time_variable, "long_name")
        .unwrap_or_else(|_| config.time_variable.clone());

    let bundle = PlotBundle {
        title: plot_title(&title, &accepted),
        plane,
        grid,
        colormap,
        color_range: measurement.valid_range,
        times,
        colorbar_label: measurement.axis_label(),
        depth_label: dataset.axis_label(&config.depth_variable),
        time_label: time_axis_label(&time_long_name),
    };
    bundle.validate()?;
    Ok((bundle, summary))
}

/// Runs a plot job end to end.
///
/// 1. Validates the configuration (and stops there on a dry run)
/// 2. Refuses to replace an existing local figure unless forced
/// 3. Opens the dataset, staging remote objects in a temporary file
/// 4. Filters, grids and colours the data
/// 5. Renders the figure and writes it to its destination
///
/// # Examples
///
/// ```rust,no_run
/// use adcp_qcplot::{RunOptions, process_plot_job, input::JobConfig};
///
/// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
/// let mut config = JobConfig::default();
/// config.output = "watr50.svg".to_string();
/// let options = RunOptions { force: true, ..RunOptions::default() };
/// process_plot_job(&config, &options).await?;
/// # Ok(())
/// # }
/// ```
pub async fn process_plot_job(config: &JobConfig, options: &RunOptions) -> QcPlotResult<JobOutcome> {
    config.validate()?;
    if options.dry_run {
        info!("Dry run: configuration is valid, nothing was plotted");
        return Ok(JobOutcome::Validated);
    }
    check_overwrite(&config.output, options.force)?;

    let dataset = AdcpDataset::open(&config.input, !options.quiet).await?;
    let (bundle, summary) = build_plot_bundle(&dataset, config, options.quiet)?;
    let (profiles, depths) = bundle.grid.dim();

    write_figure_async(&bundle, &config.output, config.figure.size()).await?;
    info!("Figure written to {}", config.output);

    Ok(JobOutcome::Plotted(PlotReport {
        output: config.output.clone(),
        profiles,
        depths,
        summary,
    }))
}
