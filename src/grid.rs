//! # Profile-Index Grid
//!
//! Heatmap renderers draw on a rectangular numeric grid and cannot take a
//! calendar axis directly. Each timestamp is therefore replaced by its profile
//! index, and both axes are expanded into co-indexed 2D coordinate grids:
//!
//! ```text
//! profile_index[i][j] = i
//! depth[i][j]         = depth_axis[j]
//! ```

use ndarray::Array2;

/// Co-indexed (profile, depth) coordinate grids, both shaped (N, M).
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileGrid {
    pub profile_index: Array2<usize>,
    pub depth: Array2<f64>,
}

/// Expands a time axis of length N and a depth axis of length M into two
/// (N, M) grids. Only the length of `time_axis` matters. Empty axes give an
/// empty grid.
pub fn synthesize_grid<T>(time_axis: &[T], depth_axis: &[f64]) -> ProfileGrid {
    let shape = (time_axis.len(), depth_axis.len());
    ProfileGrid {
        profile_index: Array2::from_shape_fn(shape, |(i, _)| i),
        depth: Array2::from_shape_fn(shape, |(_, j)| depth_axis[j]),
    }
}

impl ProfileGrid {
    /// (profiles, depths)
    pub fn dim(&self) -> (usize, usize) {
        self.profile_index.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.profile_index.is_empty()
    }

    /// The 1D depth axis recovered from the first row.
    pub fn depth_axis(&self) -> Vec<f64> {
        if self.is_empty() {
            return Vec::new();
        }
        self.depth.row(0).to_vec()
    }

    /// Cell boundaries along depth, one more than the number of depths.
    ///
    /// Interior edges sit halfway between neighbouring depths; the outer edges
    /// are pushed out by half the adjacent step. A single depth gets `+-0.5`.
    pub fn depth_edges(&self) -> Vec<f64> {
        depth_edges(&self.depth_axis())
    }

    /// Extent of the grid as `(index_range, depth_range)` for axis limits.
    pub fn bounds(&self) -> Option<((f64, f64), (f64, f64))> {
        let (profiles, _) = self.dim();
        let edges = self.depth_edges();
        let (first, last) = (edges.first()?, edges.last()?);
        if profiles == 0 {
            return None;
        }
        Some((
            (0.0, profiles as f64),
            (first.min(*last), first.max(*last)),
        ))
    }
}

fn depth_edges(depths: &[f64]) -> Vec<f64> {
    match depths {
        [] => Vec::new(),
        [only] => vec![only - 0.5, only + 0.5],
        _ => {
            let mut edges = Vec::with_capacity(depths.len() + 1);
            edges.push(depths[0] - (depths[1] - depths[0]) / 2.0);
            for pair in depths.windows(2) {
                edges.push((pair[0] + pair[1]) / 2.0);
            }
            let n = depths.len();
            edges.push(depths[n - 1] + (depths[n - 1] - depths[n - 2]) / 2.0);
            edges
        }
    }
}
