//! Contracts for the gridded model datasets transects are cut from.
//!
//! Reading model files is out of this crate's hands; backends
//! implement [GriddedDataset] and hand out instances through a
//! [DatasetSource]. An opened dataset is released when dropped.

use crate::{
    grid::{Grid, MaskedGrid},
    TransectError, C,
};
use chrono::{DateTime, Utc};
use geo::Point;

/// Metadata of one dataset variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    /// Key the dataset knows this variable by.
    pub name: String,

    /// Human readable name.
    pub display_name: String,

    pub unit: String,

    /// Dimension names, outermost first.
    pub dimensions: Vec<String>,

    pub shape: Vec<usize>,

    /// Multiplier applied to raw values.
    pub scale_factor: C,
}

impl Variable {
    pub fn new(name: &str, display_name: &str, unit: &str, dimensions: &[&str], shape: &[usize]) -> Self {
        Self {
            name: name.to_owned(),
            display_name: display_name.to_owned(),
            unit: unit.to_owned(),
            dimensions: dimensions.iter().map(|d| (*d).to_owned()).collect(),
            shape: shape.to_vec(),
            scale_factor: 1.0,
        }
    }

    #[must_use]
    pub fn scale_factor(mut self, factor: C) -> Self {
        self.scale_factor = factor;
        self
    }
}

/// Values along a path at every depth level.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    /// Sample locations (`x` is longitude, `y` is latitude).
    pub points: Vec<Point<C>>,

    /// Cumulative distance of each sample, km.
    pub distances_km: Vec<C>,

    /// `[depth level × sample]`.
    pub values: MaskedGrid,

    /// `[sample × depth level]`, meters. Levels can differ per sample.
    pub depths_m: Grid<C>,
}

impl Profile {
    pub fn samples(&self) -> usize {
        self.values.shape().1
    }

    /// Checks every member is aligned with `samples` columns of
    /// `values`.
    pub fn check_shape(&self, samples: usize) -> Result<(), TransectError> {
        let (levels, cols) = self.values.shape();
        let mismatch = |expected: usize, actual: usize| {
            (expected != actual).then_some(TransectError::ShapeMismatch { expected, actual })
        };
        let (depth_rows, depth_cols) = self.depths_m.shape();
        mismatch(samples, cols)
            .or_else(|| mismatch(samples, self.points.len()))
            .or_else(|| mismatch(samples, self.distances_km.len()))
            .or_else(|| mismatch(samples, depth_rows))
            .or_else(|| mismatch(levels, depth_cols))
            .map_or(Ok(()), Err)
    }
}

/// Values along a path at a single depth level.
#[derive(Debug, Clone, PartialEq)]
pub struct PathSlice {
    pub points: Vec<Point<C>>,
    pub distances_km: Vec<C>,
    pub timestamp: DateTime<Utc>,
    pub values: Vec<Option<C>>,
}

pub trait GriddedDataset {
    /// Variables in declaration order.
    fn variables(&self) -> &[Variable];

    fn timestamps(&self) -> &[DateTime<Utc>];

    /// Names of dimensions that denote depth.
    fn depth_dimensions(&self) -> &[String];

    /// Extracts every depth level at `samples` points along the
    /// path through `waypoints` (dataset default when `None`).
    fn path_profile(
        &self,
        waypoints: &[Point<C>],
        time: usize,
        variable: &str,
        samples: Option<usize>,
    ) -> Result<Profile, TransectError>;

    /// Extracts a single depth level along the path through
    /// `waypoints`.
    fn path(
        &self,
        waypoints: &[Point<C>],
        depth: usize,
        time: usize,
        variable: &str,
    ) -> Result<PathSlice, TransectError>;

    fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables().iter().find(|v| v.name == name)
    }

    fn has_depth(&self, variable: &Variable) -> bool {
        variable
            .dimensions
            .iter()
            .any(|d| self.depth_dimensions().contains(d))
    }
}

/// Opens datasets by URL or identifier.
///
/// Backends should report open failures as
/// [TransectError::DataUnavailable].
pub trait DatasetSource: Send + Sync {
    fn open(&self, url: &str) -> Result<Box<dyn GriddedDataset>, TransectError>;
}

/// Opens `url`, reporting any failure as [TransectError::DataUnavailable].
pub(crate) fn open_dataset(
    source: &dyn DatasetSource,
    url: &str,
) -> Result<Box<dyn GriddedDataset>, TransectError> {
    source.open(url).map_err(|e| match e {
        TransectError::DataUnavailable(..) => e,
        other => TransectError::DataUnavailable(url.to_owned(), other.to_string()),
    })
}

/// Resolves a possibly negative time index against `len` timestamps.
///
/// Negative indices count from the end; the result is clamped into
/// range. Returns `None` if there are no timestamps.
pub fn resolve_time(time: i64, len: usize) -> Option<usize> {
    let last = i64::try_from(len).ok()?.checked_sub(1).filter(|l| *l >= 0)?;
    let time = if time < 0 { time + last + 1 } else { time };
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    Some(time.clamp(0, last) as usize)
}

#[cfg(test)]
mod tests {
    use super::resolve_time;

    #[test]
    fn test_resolve_time() {
        assert_eq!(resolve_time(0, 5), Some(0));
        assert_eq!(resolve_time(-1, 5), Some(4));
        assert_eq!(resolve_time(-5, 5), Some(0));
        assert_eq!(resolve_time(-9, 5), Some(0));
        assert_eq!(resolve_time(7, 5), Some(4));
        assert_eq!(resolve_time(0, 0), None);
    }
}
