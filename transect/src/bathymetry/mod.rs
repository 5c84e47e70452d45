//! Sea floor elevation beneath a transect.
//!
//! A global raster is resampled onto the transect's sample points once
//! and the result is kept in a [CacheStore]. Lookups go memory, then
//! disk, then a full resample; fresh results are written to disk in the
//! background.

mod nearest;

use crate::{
    cache::{cache_key, CacheStore, Curve, PersistHandle},
    math::gaussian_filter,
    path::SamplePath,
    Config, TransectError, C,
};
use etopo::{Raster, RasterMode};
use log::{debug, warn};
use serde::Serialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Instant,
};

/// Provides the bathymetry raster.
pub trait RasterSource: Send + Sync {
    /// Stable identifier, part of every cache key.
    fn id(&self) -> &str;

    /// Opens the raster. It is dropped as soon as resampling is done.
    fn open(&self) -> Result<Raster, TransectError>;
}

/// A raster on the local file system.
#[derive(Debug, Clone)]
pub struct RasterFile {
    id: String,
    path: PathBuf,
    mode: RasterMode,
}

impl RasterFile {
    pub fn new<P: AsRef<Path>>(path: P, mode: RasterMode) -> Self {
        let path = path.as_ref().to_path_buf();
        let id = path
            .file_name()
            .map_or_else(|| path.to_string_lossy(), |name| name.to_string_lossy())
            .into_owned();
        Self { id, path, mode }
    }
}

impl RasterSource for RasterFile {
    fn id(&self) -> &str {
        &self.id
    }

    fn open(&self) -> Result<Raster, TransectError> {
        Ok(Raster::open(&self.path, self.mode)?)
    }
}

/// Elevation curve aligned with a transect's samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bathymetry {
    pub distances_km: Vec<C>,

    /// Meters, positive up. `None` where no raster cell was in range.
    pub elevation_m: Vec<Option<f32>>,
}

impl Bathymetry {
    /// Meters below the surface, positive down.
    pub fn depth_m(&self) -> Vec<Option<f32>> {
        self.elevation_m.iter().map(|z| z.map(|z| -z)).collect()
    }
}

pub struct Resampled {
    pub bathymetry: Bathymetry,

    /// Pending disk write when the curve was freshly computed.
    pub persist: Option<PersistHandle>,
}

pub struct BathymetryResampler {
    source: Arc<dyn RasterSource>,
    cache: Arc<CacheStore>,
    radius_m: C,
    resolution_deg: C,
}

impl BathymetryResampler {
    pub fn new(source: Arc<dyn RasterSource>, cache: Arc<CacheStore>, radius_m: C, resolution_deg: C) -> Self {
        Self {
            source,
            cache,
            radius_m,
            resolution_deg,
        }
    }

    /// A resampler over the configured raster file, if there is one.
    pub fn from_config(config: &Config, cache: Arc<CacheStore>) -> Option<Self> {
        let path = config.bathymetry.as_ref()?;
        Some(Self::new(
            Arc::new(RasterFile::new(path, RasterMode::MemMap)),
            cache,
            config.radius_of_influence_m,
            config.grid_resolution_deg,
        ))
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Returns the elevation under every sample of `path`, optionally
    /// smoothed with a Gaussian of standard deviation `blur` (in
    /// samples).
    ///
    /// Smoothing is applied after caching, so curves are cached
    /// unsmoothed.
    pub fn resample(&self, path: &SamplePath, blur: Option<&str>) -> Result<Resampled, TransectError> {
        let key = cache_key(self.source.id(), &path.points);
        let (curve, persist) = match self.cache.get(&key) {
            Some(curve) => (curve, None),
            None => {
                let curve = self.compute(path)?;
                self.cache.insert(&key, Arc::clone(&curve));
                let handle = self.cache.persist(&key, Arc::clone(&curve));
                (curve, Some(handle))
            }
        };
        let elevation_m = match blur {
            Some(blur) => smooth(&curve, blur),
            None => curve.as_ref().clone(),
        };
        Ok(Resampled {
            bathymetry: Bathymetry {
                distances_km: path.distances_km.clone(),
                elevation_m,
            },
            persist,
        })
    }
}

/// Private API
impl BathymetryResampler {
    fn compute(&self, path: &SamplePath) -> Result<Curve, TransectError> {
        let now = Instant::now();
        let raster = self.source.open()?;
        if (raster.resolution() - self.resolution_deg).abs() > 1e-9 {
            warn!(
                "{} has {}° cells, expected {}°",
                self.source.id(),
                raster.resolution(),
                self.resolution_deg
            );
        }
        let window = nearest::Window::bounding(&raster, &path.points);
        let curve = nearest::resample(&raster, window, &path.points, self.radius_m);
        debug!(
            "resampled {} onto {} points in {:?}; window: {:?}",
            self.source.id(),
            path.len(),
            now.elapsed(),
            window
        );
        Ok(Arc::new(curve))
    }
}

/// Gaussian smoothing with `sigma` given as text; returns `data`
/// unchanged if `sigma` doesn't parse or is unusable.
pub fn smooth(data: &[Option<f32>], sigma: &str) -> Vec<Option<f32>> {
    sigma
        .trim()
        .parse::<f64>()
        .ok()
        .and_then(|sigma| gaussian_filter(data, sigma))
        .unwrap_or_else(|| {
            debug!("not smoothing with sigma '{sigma}'");
            data.to_vec()
        })
}
