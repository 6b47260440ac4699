//! # Diverging Colormap
//!
//! Signed velocities are drawn on a blue-white-red scale: negative values
//! blue, zero white, positive red. The palette is a pure function of the
//! level count.

use crate::error::{QcPlotError, QcPlotResult};
use crate::model::ValidRange;
use serde::Serialize;

/// Default number of levels; yields a 63-colour palette.
pub const DEFAULT_LEVELS: usize = 64;

/// An RGB triple with components in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLUE: Rgb = Rgb::new(0.0, 0.0, 1.0);
    pub const WHITE: Rgb = Rgb::new(1.0, 1.0, 1.0);
    pub const RED: Rgb = Rgb::new(1.0, 0.0, 0.0);

    pub const fn new(r: f64, g: f64, b: f64) -> Self {
        Rgb { r, g, b }
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        Rgb::new(
            self.r + (other.r - self.r) * t,
            self.g + (other.g - self.g) * t,
            self.b + (other.b - self.b) * t,
        )
    }

    /// 8-bit channels, rounded.
    pub fn to_rgb8(self) -> (u8, u8, u8) {
        let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        (channel(self.r), channel(self.g), channel(self.b))
    }
}

/// Ordered palette from blue through white to red.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DivergingColormap {
    colors: Vec<Rgb>,
}

/// Builds a palette of `level_count - 1` colours.
///
/// `level_count` must be even and non-zero so that the middle colour lands
/// exactly on white.
pub fn build_colormap(level_count: usize) -> QcPlotResult<DivergingColormap> {
    if level_count == 0 || level_count % 2 != 0 {
        return Err(QcPlotError::OddLevelCount(level_count));
    }

    let n = level_count - 1;
    let colors = (0..n)
        .map(|k| {
            let position = if n == 1 { 0.5 } else { k as f64 / (n - 1) as f64 };
            anchor_color(position)
        })
        .collect();

    Ok(DivergingColormap { colors })
}

// Exact anchors at 0, 0.5 and 1 avoid rounding drift at the ends and middle.
fn anchor_color(position: f64) -> Rgb {
    if position <= 0.0 {
        Rgb::BLUE
    } else if position >= 1.0 {
        Rgb::RED
    } else if position == 0.5 {
        Rgb::WHITE
    } else if position < 0.5 {
        Rgb::BLUE.lerp(Rgb::WHITE, position / 0.5)
    } else {
        Rgb::WHITE.lerp(Rgb::RED, (position - 0.5) / 0.5)
    }
}

impl DivergingColormap {
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    pub fn middle(&self) -> Rgb {
        self.colors[self.colors.len() / 2]
    }

    /// Colour for `value` on a scale spanning `range`.
    ///
    /// Values outside the range clamp to the end colours. A degenerate range
    /// maps everything to the middle colour.
    pub fn color_for(&self, value: f64, range: ValidRange) -> Rgb {
        let span = range.max - range.min;
        if !(span > 0.0) || !value.is_finite() {
            return self.middle();
        }
        let x = ((value - range.min) / span).clamp(0.0, 1.0);
        let index = ((x * self.colors.len() as f64).floor() as usize).min(self.colors.len() - 1);
        self.colors[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_palette() {
        let cmap = build_colormap(DEFAULT_LEVELS).unwrap();
        assert_eq!(cmap.len(), 63);
        assert_eq!(cmap.colors()[0], Rgb::BLUE);
        assert_eq!(cmap.colors()[31], Rgb::WHITE);
        assert_eq!(cmap.middle(), Rgb::WHITE);
        assert_eq!(cmap.colors()[62], Rgb::RED);
    }

    #[test]
    fn test_palette_is_monotonic_and_symmetric() {
        let cmap = build_colormap(16).unwrap();
        let colors = cmap.colors();
        let mid = colors.len() / 2;
        for k in 0..mid {
            // blue half: red and green rise together, blue stays saturated
            assert_eq!(colors[k].b, 1.0);
            assert!(colors[k].r <= colors[k + 1].r);
            // mirror colour swaps the red and blue channels
            let mirror = colors[colors.len() - 1 - k];
            assert!((colors[k].r - mirror.b).abs() < 1e-12);
            assert!((colors[k].g - mirror.g).abs() < 1e-12);
        }
    }

    #[test]
    fn test_smallest_palette() {
        let cmap = build_colormap(2).unwrap();
        assert_eq!(cmap.colors(), &[Rgb::WHITE]);
    }

    #[test]
    fn test_odd_or_zero_levels_fail() {
        assert!(matches!(build_colormap(63), Err(QcPlotError::OddLevelCount(63))));
        assert!(matches!(build_colormap(1), Err(QcPlotError::OddLevelCount(1))));
        assert!(matches!(build_colormap(0), Err(QcPlotError::OddLevelCount(0))));
    }

    #[test]
    fn test_color_lookup_is_centred_on_zero() {
        let cmap = build_colormap(DEFAULT_LEVELS).unwrap();
        let range = ValidRange::new(-10.0, 10.0);

        assert_eq!(cmap.color_for(0.0, range), Rgb::WHITE);
        assert_eq!(cmap.color_for(-10.0, range), Rgb::BLUE);
        assert_eq!(cmap.color_for(10.0, range), Rgb::RED);
        assert_eq!(cmap.color_for(-50.0, range), Rgb::BLUE);
        assert_eq!(cmap.color_for(50.0, range), Rgb::RED);
        assert_eq!(cmap.color_for(1.0, ValidRange::new(2.0, 2.0)), Rgb::WHITE);
        assert_eq!(cmap.color_for(f64::NAN, range), Rgb::WHITE);

        let slightly_negative = cmap.color_for(-0.5, range);
        assert!(slightly_negative.b >= slightly_negative.r);
    }

    #[test]
    fn test_rgb8() {
        assert_eq!(Rgb::BLUE.to_rgb8(), (0, 0, 255));
        assert_eq!(Rgb::new(0.5, 1.2, -0.1).to_rgb8(), (128, 255, 0));
    }
}
