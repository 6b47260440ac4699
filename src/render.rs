//! # Figure Rendering
//!
//! Draws the two-panel diagnostic figure with plotters:
//!
//! 1. the filtered measurement as a depth vs profile-index heatmap with a
//!    colour bar, under a two-line title naming the accepted flags;
//! 2. profile index against calendar time, with a tick on the first of every
//!    month.
//!
//! Invalid samples are not drawn, leaving the white background. The output
//! format follows the file extension: `.svg` gives SVG, anything else PNG.

use crate::colormap::{DivergingColormap, Rgb};
use crate::error::{QcPlotError, QcPlotResult};
use crate::grid::ProfileGrid;
use crate::model::ValidRange;
use crate::time::{format_tick, monthly_ticks};
use chrono::{DateTime, Duration, Utc};
use log::debug;
use ndarray::Array2;
use plotters::coord::Shift;
use plotters::coord::ranged1d::{KeyPointHint, NoDefaultFormatting, Ranged, ValueFormatter};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::ops::Range;
use std::path::Path;

const TITLE_HEIGHT: u32 = 90;
const COLORBAR_WIDTH: u32 = 150;
const FONT: &str = "sans-serif";
/// plotters only rotates text by right angles
const TICK_LABEL_ROTATION: FontTransform = FontTransform::Rotate90;

/// Image encoding, chosen from the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Svg,
}

impl ImageFormat {
    pub fn from_path(path: &str) -> Self {
        if path.to_lowercase().ends_with(".svg") {
            ImageFormat::Svg
        } else {
            ImageFormat::Png
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

/// Everything needed to draw the figure.
#[derive(Debug, Clone)]
pub struct PlotBundle {
    pub title: String,
    /// (time, depth) plane of the filtered measurement, `None` where invalid.
    pub plane: Array2<Option<f32>>,
    pub grid: ProfileGrid,
    pub colormap: DivergingColormap,
    pub color_range: ValidRange,
    pub times: Vec<DateTime<Utc>>,
    pub colorbar_label: String,
    pub depth_label: String,
    pub time_label: String,
}

/// `"<dataset title>\nplot of <labels> only"`.
pub fn plot_title(dataset_title: &str, accepted_labels: &str) -> String {
    format!("{}\nplot of {} only", dataset_title, accepted_labels)
}

/// `"<time long name> in DD/MM/YY"`.
pub fn time_axis_label(long_name: &str) -> String {
    format!("{} in DD/MM/YY", long_name)
}

impl PlotBundle {
    pub fn validate(&self) -> QcPlotResult<()> {
        if self.plane.dim() != self.grid.dim() {
            return Err(QcPlotError::Render(format!(
                "data plane {:?} does not match the profile grid {:?}",
                self.plane.dim(),
                self.grid.dim()
            )));
        }
        if self.times.len() != self.grid.dim().0 {
            return Err(QcPlotError::Render(format!(
                "{} timestamps for {} profiles",
                self.times.len(),
                self.grid.dim().0
            )));
        }
        if self.colormap.is_empty() {
            return Err(QcPlotError::Render("empty colormap".to_string()));
        }
        Ok(())
    }

    /// Number of cells that will be coloured.
    pub fn drawn_cells(&self) -> usize {
        self.plane.iter().filter(|v| v.is_some()).count()
    }

    /// Heatmap axis limits as `(profile range, depth range)`.
    pub fn heatmap_bounds(&self) -> (Range<f64>, Range<f64>) {
        match self.grid.bounds() {
            Some(((x0, x1), (y0, y1))) => (x0..x1, padded(y0, y1)),
            None => (0.0..1.0, 0.0..1.0),
        }
    }

    /// Colour bar limits; a degenerate range is widened so the axis can be drawn.
    pub fn colorbar_bounds(&self) -> Range<f64> {
        padded(self.color_range.min, self.color_range.max)
    }
}

fn padded(min: f64, max: f64) -> Range<f64> {
    if max > min {
        min..max
    } else {
        (min - 0.5)..(max + 0.5)
    }
}

/// Calendar axis whose key points are the first of each month.
#[derive(Debug, Clone)]
pub struct MonthlyAxis {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ticks: Vec<DateTime<Utc>>,
}

impl MonthlyAxis {
    pub fn new(times: &[DateTime<Utc>]) -> Self {
        let start = times.iter().min().copied().unwrap_or(DateTime::<Utc>::UNIX_EPOCH);
        let end = times.iter().max().copied().unwrap_or(start);
        let end = if end > start { end } else { start + Duration::days(1) };
        MonthlyAxis {
            start,
            end,
            ticks: monthly_ticks(start, end),
        }
    }

    pub fn ticks(&self) -> &[DateTime<Utc>] {
        &self.ticks
    }
}

impl Ranged for MonthlyAxis {
    type FormatOption = NoDefaultFormatting;
    type ValueType = DateTime<Utc>;

    fn map(&self, value: &DateTime<Utc>, limit: (i32, i32)) -> i32 {
        let span = (self.end - self.start).num_milliseconds().max(1) as f64;
        let offset = (*value - self.start).num_milliseconds() as f64;
        limit.0 + ((limit.1 - limit.0) as f64 * offset / span).round() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, hint: Hint) -> Vec<DateTime<Utc>> {
        if hint.weight().allow_light_points() {
            return Vec::new();
        }
        let stride = self.ticks.len().div_ceil(hint.max_num_points().max(1)).max(1);
        self.ticks.iter().step_by(stride).copied().collect()
    }

    fn range(&self) -> Range<DateTime<Utc>> {
        self.start..self.end
    }
}

impl ValueFormatter<DateTime<Utc>> for MonthlyAxis {
    fn format(value: &DateTime<Utc>) -> String {
        format_tick(value)
    }
}

fn plot_color(color: Rgb) -> RGBColor {
    let (r, g, b) = color.to_rgb8();
    RGBColor(r, g, b)
}

fn render_err<E: std::fmt::Display>(err: E) -> QcPlotError {
    QcPlotError::Render(err.to_string())
}

/// Draws the figure into `path`.
pub fn render_to_file(bundle: &PlotBundle, path: &Path, size: (u32, u32)) -> QcPlotResult<()> {
    bundle.validate()?;
    let format = ImageFormat::from_path(&path.to_string_lossy());
    debug!(
        "Rendering {}x{} {:?} figure with {} coloured cells to {:?}",
        size.0,
        size.1,
        format,
        bundle.drawn_cells(),
        path
    );

    match format {
        ImageFormat::Png => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_figure(&root, bundle)?;
            root.present().map_err(render_err)
        }
        ImageFormat::Svg => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_figure(&root, bundle)?;
            root.present().map_err(render_err)
        }
    }
}

fn draw_figure<DB: DrawingBackend>(root: &DrawingArea<DB, Shift>, bundle: &PlotBundle) -> QcPlotResult<()> {
    root.fill(&WHITE).map_err(render_err)?;
    let (_, height) = root.dim_in_pixel();

    let (title_area, body) = root.split_vertically(TITLE_HEIGHT);
    draw_title(&title_area, &bundle.title)?;

    let (upper, lower) = body.split_vertically((height.saturating_sub(TITLE_HEIGHT)) / 2);
    let (upper_width, _) = upper.dim_in_pixel();
    let (heatmap_area, colorbar_area) = upper.split_horizontally(upper_width.saturating_sub(COLORBAR_WIDTH));

    draw_heatmap(&heatmap_area, bundle)?;
    draw_colorbar(&colorbar_area, bundle)?;
    draw_time_panel(&lower, bundle)?;
    Ok(())
}

fn draw_title<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, title: &str) -> QcPlotResult<()> {
    let (width, _) = area.dim_in_pixel();
    let style = TextStyle::from((FONT, 24).into_font())
        .color(&BLACK)
        .pos(Pos::new(HPos::Center, VPos::Top));
    for (line_number, line) in title.lines().enumerate() {
        area.draw(&Text::new(
            line.to_string(),
            ((width / 2) as i32, 15 + 32 * line_number as i32),
            style.clone(),
        ))
        .map_err(render_err)?;
    }
    Ok(())
}

fn draw_heatmap<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, bundle: &PlotBundle) -> QcPlotResult<()> {
    let (x_range, y_range) = bundle.heatmap_bounds();
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .x_label_area_size(55)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range, y_range)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("Profile Index")
        .y_desc(bundle.depth_label.as_str())
        .label_style((FONT, 16))
        .x_label_formatter(&|v| format!("{:.0}", v))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .draw()
        .map_err(render_err)?;

    let edges = bundle.grid.depth_edges();
    chart
        .draw_series(bundle.plane.indexed_iter().filter_map(|((i, j), value)| {
            let value = (*value)?;
            let color = plot_color(bundle.colormap.color_for(value as f64, bundle.color_range));
            Some(Rectangle::new(
                [(i as f64, edges[j]), (i as f64 + 1.0, edges[j + 1])],
                color.filled(),
            ))
        }))
        .map_err(render_err)?;
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, bundle: &PlotBundle) -> QcPlotResult<()> {
    let range = bundle.colorbar_bounds();
    let mut colorbar = ChartBuilder::on(area)
        .margin_top(20)
        .margin_bottom(75)
        .margin_right(10)
        .y_label_area_size(110)
        .x_label_area_size(0)
        .build_cartesian_2d(0.0..1.0, range.clone())
        .map_err(render_err)?;

    let steps = bundle.colormap.len();
    let step = (range.end - range.start) / steps as f64;
    colorbar
        .draw_series(bundle.colormap.colors().iter().enumerate().map(|(k, color)| {
            let low = range.start + step * k as f64;
            Rectangle::new([(0.0, low), (1.0, low + step)], plot_color(*color).filled())
        }))
        .map_err(render_err)?;

    colorbar
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .disable_x_axis()
        .y_labels(9)
        .y_desc(bundle.colorbar_label.as_str())
        .y_label_style((FONT, 14))
        .y_label_formatter(&|v| format!("{:.1}", v))
        .draw()
        .map_err(render_err)?;
    Ok(())
}

fn draw_time_panel<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, bundle: &PlotBundle) -> QcPlotResult<()> {
    let axis = MonthlyAxis::new(&bundle.times);
    let profiles = bundle.times.len().max(1) as f64;
    let mut chart = ChartBuilder::on(area)
        .margin(20)
        .margin_right(COLORBAR_WIDTH as i32)
        .x_label_area_size(80)
        .y_label_area_size(90)
        .build_cartesian_2d(axis, 0.0..profiles)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc(bundle.time_label.as_str())
        .y_desc("Profile Index")
        .x_label_style(
            (FONT, 14)
                .into_font()
                .transform(TICK_LABEL_ROTATION),
        )
        .y_label_style((FONT, 16))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(LineSeries::new(
            bundle.times.iter().enumerate().map(|(i, t)| (*t, i as f64)),
            &BLUE,
        ))
        .map_err(render_err)?;
    Ok(())
}
