use crate::{
    math::{linspace, wrap_bearing, wrap_lon},
    TransectError, C,
};
use geo::{GeodesicBearing, GeodesicDistance, Point};
use log::debug;

/// Samples along a path when the caller doesn't say.
pub const DEFAULT_SAMPLES: usize = 100;

/// Evenly spaced samples along a multi-segment geodesic path.
///
/// All per-sample vectors have the same length.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplePath {
    /// Sample locations (`x` is longitude, `y` is latitude).
    pub points: Vec<Point<C>>,

    /// Cumulative distance from the first waypoint, km.
    pub distances_km: Vec<C>,

    /// Initial bearing of the segment each sample lies on, degrees
    /// clockwise from north in [0, 360).
    pub bearings_deg: Vec<C>,

    /// Cumulative distance of every input waypoint, km.
    pub stations_km: Vec<C>,
}

impl SamplePath {
    pub fn builder() -> SamplePathBuilder {
        SamplePathBuilder {
            waypoints: Vec::new(),
            samples: DEFAULT_SAMPLES,
        }
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn latitudes(&self) -> Vec<C> {
        self.points.iter().map(|p| p.y()).collect()
    }

    pub fn longitudes(&self) -> Vec<C> {
        self.points.iter().map(|p| p.x()).collect()
    }

    /// Total geodesic length of the path, km.
    pub fn total_km(&self) -> C {
        self.stations_km.last().copied().unwrap_or_default()
    }
}

pub struct SamplePathBuilder {
    waypoints: Vec<Point<C>>,
    samples: usize,
}

impl SamplePathBuilder {
    /// Append a waypoint (`x` is longitude, `y` is latitude).
    #[must_use]
    pub fn waypoint(mut self, point: Point<C>) -> Self {
        self.waypoints.push(point);
        self
    }

    #[must_use]
    pub fn waypoints<I: IntoIterator<Item = Point<C>>>(mut self, points: I) -> Self {
        self.waypoints.extend(points);
        self
    }

    /// Number of output samples (defaults to 100, at least 2).
    #[must_use]
    pub fn samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn build(&self) -> Result<SamplePath, TransectError> {
        validate(&self.waypoints)?;
        if self.samples < 2 {
            return Err(TransectError::InvalidPath("fewer than 2 samples"));
        }

        let now = std::time::Instant::now();

        let segments: Vec<Segment> = self
            .waypoints
            .windows(2)
            .map(|pair| Segment::new(pair[0], pair[1]))
            .collect();
        let bearings = fill_degenerate_bearings(&segments);

        let mut stations_km = Vec::with_capacity(self.waypoints.len());
        stations_km.push(0.0);
        for seg in &segments {
            stations_km.push(stations_km[stations_km.len() - 1] + seg.length_km);
        }
        let total_km = stations_km[stations_km.len() - 1];

        let mut points = Vec::with_capacity(self.samples);
        let mut distances_km = Vec::with_capacity(self.samples);
        let mut bearings_deg = Vec::with_capacity(self.samples);
        let mut idx = 0;
        for target in linspace(0.0, total_km, self.samples) {
            // Skip past finished and zero-length segments.
            while idx + 1 < segments.len()
                && (target > stations_km[idx + 1] || segments[idx].length_km == 0.0)
            {
                idx += 1;
            }
            let seg = &segments[idx];
            let frac = if seg.length_km > 0.0 {
                ((target - stations_km[idx]) / seg.length_km).clamp(0.0, 1.0)
            } else {
                0.0
            };
            points.push(seg.interpolate(frac));
            distances_km.push(target);
            bearings_deg.push(bearings[idx]);
        }

        debug!(
            "sample path; waypoints: {}, samples: {}, length: {total_km:.1} km, exec: {:?}",
            self.waypoints.len(),
            self.samples,
            now.elapsed()
        );

        Ok(SamplePath {
            points,
            distances_km,
            bearings_deg,
            stations_km,
        })
    }
}

struct Segment {
    start: Point<C>,
    end: Point<C>,
    length_km: C,
    /// `None` for zero-length segments.
    bearing_deg: Option<C>,
}

impl Segment {
    fn new(start: Point<C>, end: Point<C>) -> Self {
        let length_km = start.geodesic_distance(&end) / 1000.0;
        let bearing_deg = (length_km > 0.0).then(|| wrap_bearing(start.geodesic_bearing(end)));
        Self {
            start,
            end,
            length_km,
            bearing_deg,
        }
    }

    /// Linear interpolation in lat/lon, crossing the antimeridian
    /// the short way.
    fn interpolate(&self, frac: C) -> Point<C> {
        let lat = self.start.y() + frac * (self.end.y() - self.start.y());
        let mut dlon = self.end.x() - self.start.x();
        if dlon > 180.0 {
            dlon -= 360.0;
        } else if dlon < -180.0 {
            dlon += 360.0;
        }
        Point::new(wrap_lon(self.start.x() + frac * dlon), lat)
    }
}

/// Per-segment bearings where zero-length segments borrow from the
/// nearest non-degenerate neighbour, preferring the earlier one.
fn fill_degenerate_bearings(segments: &[Segment]) -> Vec<C> {
    (0..segments.len())
        .map(|i| {
            (0..segments.len())
                .find_map(|k| {
                    let before = i.checked_sub(k).and_then(|j| segments[j].bearing_deg);
                    let after = segments.get(i + k).and_then(|s| s.bearing_deg);
                    before.or(after)
                })
                .unwrap_or(0.0)
        })
        .collect()
}

fn validate(waypoints: &[Point<C>]) -> Result<(), TransectError> {
    if waypoints.len() < 2 {
        return Err(TransectError::InvalidPath("fewer than 2 waypoints"));
    }
    for p in waypoints {
        if !(p.y().is_finite() && (-90.0..=90.0).contains(&p.y())) {
            return Err(TransectError::InvalidPath("latitude out of range"));
        }
        if !(p.x().is_finite() && (-180.0..=180.0).contains(&p.x())) {
            return Err(TransectError::InvalidPath("longitude out of range"));
        }
    }
    Ok(())
}
