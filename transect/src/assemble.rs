use crate::{
    anomaly::AnomalyCombiner,
    bathymetry::{Bathymetry, BathymetryResampler},
    cache::{CacheStore, PersistHandle},
    dataset::{open_dataset, DatasetSource, GriddedDataset},
    extract::{kelvin_to_celsius, Extraction, ProfileData, ProfileExtractor, Variables},
    fill::fill_depth_gaps,
    grid::Grid,
    path::SamplePath,
    Config, TransectError, C,
};
use chrono::{DateTime, Utc};
use geo::Point;
use log::debug;
use std::{sync::Arc, time::Instant};

/// What to cut a transect from.
#[derive(Debug, Clone, PartialEq)]
pub struct TransectRequest {
    /// Dataset identifier, handed to the [DatasetSource].
    pub dataset: String,

    /// `x` is longitude, `y` is latitude.
    pub waypoints: Vec<Point<C>>,

    pub variables: Variables,

    /// Time index; negative counts from the end.
    pub time: i64,

    /// Variable to extract at the surface, shown above the section.
    pub surface: Option<String>,

    /// Bathymetry smoothing sigma, in samples.
    pub blur: Option<String>,
}

impl TransectRequest {
    pub fn new(dataset: &str, waypoints: Vec<Point<C>>, variables: Variables) -> Self {
        Self {
            dataset: dataset.to_owned(),
            waypoints,
            variables,
            time: -1,
            surface: None,
            blur: None,
        }
    }
}

/// A single depth level along the path.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceLayer {
    pub name: String,
    pub unit: String,
    pub distances_km: Vec<C>,
    pub values: Vec<Option<C>>,
}

/// Everything needed to draw or export a transect.
#[derive(Debug)]
pub struct Transect {
    pub dataset: String,
    pub timestamp: DateTime<Utc>,

    /// Sampling of the requested waypoints.
    pub path: SamplePath,

    pub points: Vec<Point<C>>,
    pub distances_km: Vec<C>,

    /// `[sample × depth level]`, meters.
    pub depths_m: Grid<C>,

    /// `[depth level × sample]`, gap filled.
    pub data: ProfileData,

    pub requested: Variables,
    pub effective: Variables,
    pub name: String,
    pub unit: String,

    /// True if `data` is relative to a climatology.
    pub anomaly: bool,

    pub surface: Option<SurfaceLayer>,
    pub bathymetry: Option<Bathymetry>,

    /// Pending write of a freshly resampled bathymetry curve.
    pub persist: Option<PersistHandle>,
}

pub struct TransectAssembler {
    source: Arc<dyn DatasetSource>,
    extractor: ProfileExtractor,
    anomaly: AnomalyCombiner,
    bathymetry: Option<BathymetryResampler>,
    config: Config,
}

impl TransectAssembler {
    pub fn new(
        source: Arc<dyn DatasetSource>,
        extractor: ProfileExtractor,
        anomaly: AnomalyCombiner,
        bathymetry: Option<BathymetryResampler>,
        config: Config,
    ) -> Self {
        Self {
            source,
            extractor,
            anomaly,
            bathymetry,
            config,
        }
    }

    /// Wires every stage from `config`, with a cache store of its own.
    pub fn from_config(source: Arc<dyn DatasetSource>, config: Config) -> Self {
        let cache = Arc::new(CacheStore::from_config(&config));
        Self::new(
            source,
            ProfileExtractor::new(config.default_samples),
            AnomalyCombiner::new(config.default_samples),
            BathymetryResampler::from_config(&config, cache),
            config,
        )
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn assemble(&self, request: &TransectRequest) -> Result<Transect, TransectError> {
        let now = Instant::now();
        let path = SamplePath::builder()
            .waypoints(request.waypoints.iter().copied())
            .samples(self.extractor.samples())
            .build()?;

        let (mut extraction, surface) = {
            let dataset = open_dataset(self.source.as_ref(), &request.dataset)?;
            let extraction = self.extractor.extract(
                dataset.as_ref(),
                &request.waypoints,
                &request.variables,
                request.time,
            )?;
            let surface = match &request.surface {
                Some(variable) => Some(surface_layer(
                    dataset.as_ref(),
                    &request.waypoints,
                    extraction.time_index,
                    variable,
                )?),
                None => None,
            };
            (extraction, surface)
        };

        let anomaly = self.anomaly.apply(
            self.source.as_ref(),
            self.config.climatology_for(&request.dataset),
            &request.waypoints,
            &mut extraction,
        )?;

        for grid in extraction.data.grids_mut() {
            fill_depth_gaps(grid);
        }

        let (bathymetry, persist) = match &self.bathymetry {
            Some(resampler) => {
                let resampled = resampler.resample(&path, request.blur.as_deref())?;
                (Some(resampled.bathymetry), resampled.persist)
            }
            None => (None, None),
        };

        let Extraction {
            requested,
            effective,
            timestamp,
            points,
            distances_km,
            depths_m,
            data,
            name,
            unit,
            ..
        } = extraction;
        let name = if anomaly { format!("{name} Anomaly") } else { name };

        debug!(
            "assembled '{name}' transect of {}; samples: {}, exec: {:?}",
            request.dataset,
            path.len(),
            now.elapsed()
        );

        Ok(Transect {
            dataset: request.dataset.clone(),
            timestamp,
            path,
            points,
            distances_km,
            depths_m,
            data,
            requested,
            effective,
            name,
            unit,
            anomaly,
            surface,
            bathymetry,
            persist,
        })
    }
}

fn surface_layer(
    dataset: &dyn GriddedDataset,
    waypoints: &[Point<C>],
    time: usize,
    variable: &str,
) -> Result<SurfaceLayer, TransectError> {
    let meta = dataset
        .variable(variable)
        .ok_or_else(|| TransectError::InvalidVariable(variable.to_owned()))?;
    let slice = dataset.path(waypoints, 0, time, variable)?;
    let factor = meta.scale_factor;
    let (unit, offset) = kelvin_to_celsius(&meta.unit);
    Ok(SurfaceLayer {
        name: meta.display_name.clone(),
        unit,
        distances_km: slice.distances_km,
        values: slice
            .values
            .into_iter()
            .map(|v| v.map(|v| v * factor + offset))
            .collect(),
    })
}
