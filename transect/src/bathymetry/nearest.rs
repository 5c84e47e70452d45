//! Nearest neighbour resampling of a raster onto scattered points.

use crate::C;
use etopo::Raster;
use geo::{HaversineDistance, Point};
use rayon::prelude::*;

const MEAN_EARTH_RADIUS_M: C = 6_371_008.8;

/// Inclusive index window of raster cells, rows counted from the south.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Window {
    pub x0: usize,
    pub x1: usize,
    pub y0: usize,
    pub y1: usize,
}

impl Window {
    /// The cells covering the bounding box of `points`, clamped to the
    /// raster.
    pub fn bounding(raster: &Raster, points: &[Point<C>]) -> Self {
        let (ncols, nrows) = raster.dimensions();
        let sw = raster.sw_corner_center();
        let res = raster.resolution();
        let (mut min_x, mut max_x) = (C::INFINITY, C::NEG_INFINITY);
        let (mut min_y, mut max_y) = (C::INFINITY, C::NEG_INFINITY);
        for p in points {
            min_x = min_x.min(p.x());
            max_x = max_x.max(p.x());
            min_y = min_y.min(p.y());
            max_y = max_y.max(p.y());
        }
        let index = |v: C, origin: C, n: usize| -> usize {
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]
            let i = ((v - origin) / res).round().clamp(0.0, (n - 1) as C) as usize;
            i
        };
        Self {
            x0: index(min_x, sw.x, ncols),
            x1: index(max_x, sw.x, ncols),
            y0: index(min_y, sw.y, nrows),
            y1: index(max_y, sw.y, nrows),
        }
    }

    fn contains(&self, x: isize, y: isize) -> bool {
        #[allow(clippy::cast_possible_wrap)]
        let inside = (self.x0 as isize..=self.x1 as isize).contains(&x)
            && (self.y0 as isize..=self.y1 as isize).contains(&y);
        inside
    }

    fn clamp(&self, x: isize, y: isize) -> (isize, isize) {
        #[allow(clippy::cast_possible_wrap)]
        let clamped = (
            x.clamp(self.x0 as isize, self.x1 as isize),
            y.clamp(self.y0 as isize, self.y1 as isize),
        );
        clamped
    }

    /// Number of rings around any cell needed to cover the window.
    fn span(&self) -> usize {
        (self.x1 - self.x0).max(self.y1 - self.y0)
    }
}

/// Returns, for every target, the value of the closest valid raster
/// cell within the window and within `radius_m`, or `None`.
pub(crate) fn resample(raster: &Raster, window: Window, targets: &[Point<C>], radius_m: C) -> Vec<Option<f32>> {
    let res = raster.resolution();
    #[allow(clippy::cast_precision_loss)]
    let max_lat = [window.y0, window.y1]
        .iter()
        .map(|y| (raster.sw_corner_center().y + *y as C * res).abs())
        .fold(0.0, C::max)
        .min(90.0);
    // Half the shortest cell side inside the window bounds how close a
    // cell `r` rings out can be.
    let ring_step_m = MEAN_EARTH_RADIUS_M * res.to_radians() * max_lat.to_radians().cos() / 2.0;

    targets
        .par_iter()
        .map(|target| nearest(raster, window, *target, radius_m, ring_step_m))
        .collect()
}

fn nearest(raster: &Raster, window: Window, target: Point<C>, radius_m: C, ring_step_m: C) -> Option<f32> {
    let res = raster.resolution();
    let sw = raster.sw_corner_center();
    #[allow(clippy::cast_possible_truncation)]
    let (cx, cy) = window.clamp(
        ((target.x() - sw.x) / res).round() as isize,
        ((target.y() - sw.y) / res).round() as isize,
    );

    let mut best: Option<(C, f32)> = None;
    for r in 0..=window.span() {
        #[allow(clippy::cast_precision_loss)]
        let floor_m = r.saturating_sub(1) as C * ring_step_m;
        if floor_m > radius_m || best.is_some_and(|(d, _)| floor_m > d) {
            break;
        }
        for (x, y) in ring(cx, cy, r) {
            if !window.contains(x, y) {
                continue;
            }
            #[allow(clippy::cast_sign_loss)]
            let (x, y) = (x as usize, y as usize);
            let Some(z) = raster.get_xy((x, y)) else {
                continue;
            };
            #[allow(clippy::cast_precision_loss)]
            let cell = Point::new(sw.x + x as C * res, sw.y + y as C * res);
            let d = target.haversine_distance(&cell);
            if d <= radius_m && best.map_or(true, |(b, _)| d < b) {
                best = Some((d, z));
            }
        }
    }
    best.map(|(_, z)| z)
}

/// Cells on the square ring `r` steps out from (`cx`, `cy`).
fn ring(cx: isize, cy: isize, r: usize) -> Box<dyn Iterator<Item = (isize, isize)>> {
    #[allow(clippy::cast_possible_wrap)]
    let r = r as isize;
    if r == 0 {
        return Box::new(std::iter::once((cx, cy)));
    }
    let horizontal = (cx - r..=cx + r).flat_map(move |x| [(x, cy - r), (x, cy + r)]);
    let vertical = (cy - r + 1..cy + r).flat_map(move |y| [(cx - r, y), (cx + r, y)]);
    Box::new(horizontal.chain(vertical))
}

#[cfg(test)]
mod tests {
    use super::{resample, ring, Window};
    use etopo::{Header, Raster};
    use geo::point;

    /// 0.1° grid over 40..41N, 60..59W. Elevation is `-100 * col`,
    /// except a NODATA hole at the south west corner.
    fn raster() -> Raster {
        let header = Header::parse(
            "ncols 11\nnrows 11\nxllcenter -60\nyllcenter 40\ncellsize 0.1\nnodata_value -32768\n",
        )
        .unwrap();
        let mut samples = Vec::new();
        for row in (0..11).rev() {
            for col in 0..11 {
                #[allow(clippy::cast_precision_loss)]
                let z = if row < 3 && col < 3 { -32768.0 } else { -100.0 * col as f32 };
                samples.push(z);
            }
        }
        Raster::from_samples(header, samples)
    }

    #[test]
    fn test_ring_cells() {
        assert_eq!(ring(0, 0, 0).count(), 1);
        assert_eq!(ring(0, 0, 1).count(), 8);
        assert_eq!(ring(5, 5, 3).count(), 24);
        assert!(ring(0, 0, 2).all(|(x, y)| x.abs() == 2 || y.abs() == 2));
    }

    #[test]
    fn test_bounding_window() {
        let raster = raster();
        let window = Window::bounding(&raster, &[point!(x: -59.82, y: 40.26), point!(x: -59.5, y: 45.0)]);
        assert_eq!(window, Window { x0: 2, x1: 5, y0: 3, y1: 10 });
    }

    #[test]
    fn test_nearest_cell() {
        let raster = raster();
        let targets = [point!(x: -59.52, y: 40.5), point!(x: -59.0, y: 41.0)];
        let window = Window::bounding(&raster, &targets);
        let z = resample(&raster, window, &targets, 500_000.0);
        assert_eq!(z, vec![Some(-500.0), Some(-1000.0)]);
    }

    #[test]
    fn test_skips_nodata() {
        let raster = raster();
        // Nearest cell is NODATA.
        let targets = [point!(x: -60.0, y: 40.0), point!(x: -59.9, y: 40.1)];
        let window = Window::bounding(&raster, &[point!(x: -60.0, y: 40.0), point!(x: -59.0, y: 41.0)]);
        let z = resample(&raster, window, &targets, 500_000.0);
        assert!(z.iter().all(Option::is_some));
        // Three columns east (~26 km) beats three rows north (~33 km).
        assert_eq!(z[0], Some(-300.0));
    }

    #[test]
    fn test_out_of_radius_is_missing() {
        let raster = raster();
        let targets = [point!(x: -60.0, y: 40.0)];
        let window = Window::bounding(&raster, &[point!(x: -60.0, y: 40.0), point!(x: -59.0, y: 41.0)]);
        // Closest valid cell is ~26 km away.
        let z = resample(&raster, window, &targets, 10_000.0);
        assert_eq!(z, vec![None]);
    }
}
