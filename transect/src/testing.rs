//! In-memory datasets for tests.

use crate::{
    dataset::{DatasetSource, GriddedDataset, PathSlice, Profile, Variable},
    grid::{Grid, MaskedGrid},
    path::SamplePath,
    TransectError, C,
};
use chrono::{DateTime, TimeZone, Utc};
use geo::Point;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

pub const LEVELS_M: [C; 6] = [0.5, 10.0, 50.0, 100.0, 200.0, 500.0];

/// Raw value of a field at (time, lat, lon, level).
type Field = fn(usize, C, C, usize) -> C;

pub struct MemoryDataset {
    variables: Vec<Variable>,
    timestamps: Vec<DateTime<Utc>>,
    depth_dimensions: Vec<String>,
    fields: HashMap<String, Field>,
    closed: Option<Arc<AtomicUsize>>,
}

impl Drop for MemoryDataset {
    fn drop(&mut self) {
        if let Some(closed) = &self.closed {
            closed.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Number of valid depth levels; the sea floor deepens eastward.
fn bottom_levels(lon: C) -> usize {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let step = ((lon + 60.0) * 2.0).floor().clamp(0.0, 3.0) as usize;
    3 + step
}

fn temperature(time: usize, lat: C, lon: C, level: usize) -> C {
    #[allow(clippy::cast_precision_loss)]
    let t = time as C;
    290.0 - 0.3 * lat - 0.1 * lon - 2.0 * level as C + 0.5 * t
}

fn salinity(_time: usize, lat: C, _lon: C, level: usize) -> C {
    #[allow(clippy::cast_precision_loss)]
    let level = level as C;
    35_000.0 - 10.0 * lat + 50.0 * level
}

fn eastward(time: usize, lat: C, lon: C, level: usize) -> C {
    #[allow(clippy::cast_precision_loss)]
    let t = time as C;
    (lat * 0.7 + lon * 0.1).sin() * 0.4 / (1.0 + level as C) + 0.01 * t
}

fn northward(_time: usize, lat: C, lon: C, level: usize) -> C {
    #[allow(clippy::cast_precision_loss)]
    let level = level as C;
    (lon * 0.5 - lat * 0.2).cos() * 0.3 / (1.0 + level)
}

fn sea_surface_height(time: usize, lat: C, lon: C, _level: usize) -> C {
    #[allow(clippy::cast_precision_loss)]
    let t = time as C;
    0.01 * lat - 0.02 * lon + t
}

fn climate_temperature(month: usize, lat: C, _lon: C, level: usize) -> C {
    #[allow(clippy::cast_precision_loss)]
    let (month, level) = (month as C, level as C);
    285.0 - 0.25 * lat - level + month
}

fn climate_eastward(month: usize, _lat: C, lon: C, _level: usize) -> C {
    #[allow(clippy::cast_precision_loss)]
    let month = month as C;
    0.05 * month + 0.001 * lon
}

fn climate_northward(_month: usize, lat: C, _lon: C, level: usize) -> C {
    #[allow(clippy::cast_precision_loss)]
    let level = level as C;
    0.02 * lat / (1.0 + level)
}

impl MemoryDataset {
    /// A two-timestamp ocean model in March 2017.
    pub fn ocean() -> Self {
        let dims4 = ["time_counter", "depth", "y", "x"];
        let shape4 = [2, LEVELS_M.len(), 100, 100];
        let variables = vec![
            Variable::new("sossheig", "Sea Surface Height", "m", &["time_counter", "y", "x"], &[2, 100, 100]),
            Variable::new("stationid", "Station", "1", &["station"], &[5]),
            Variable::new("votemper", "Sea Water Potential Temperature", "Kelvin", &dims4, &shape4),
            Variable::new("vosaline", "Sea Water Salinity", "PSU", &dims4, &shape4).scale_factor(0.001),
            Variable::new("vozocrtx", "Eastward Sea Water Velocity", "m/s", &dims4, &shape4),
            Variable::new("vomecrty", "Northward Sea Water Velocity", "m/s", &dims4, &shape4),
        ];
        let fields: HashMap<String, Field> = [
            ("sossheig", sea_surface_height as Field),
            ("votemper", temperature as Field),
            ("vosaline", salinity as Field),
            ("vozocrtx", eastward as Field),
            ("vomecrty", northward as Field),
        ]
        .into_iter()
        .map(|(k, f)| (k.to_owned(), f))
        .collect();
        Self {
            variables,
            timestamps: vec![
                Utc.with_ymd_and_hms(2017, 3, 3, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2017, 3, 4, 0, 0, 0).unwrap(),
            ],
            depth_dimensions: vec!["depth".to_owned()],
            fields,
            closed: None,
        }
    }

    /// Monthly means of the ocean model's temperature and currents.
    pub fn climatology() -> Self {
        let dims4 = ["time", "deptht", "y", "x"];
        let shape4 = [12, LEVELS_M.len(), 100, 100];
        let variables = vec![
            Variable::new("votemper", "Sea Water Potential Temperature", "Kelvin", &dims4, &shape4),
            Variable::new("vozocrtx", "Eastward Sea Water Velocity", "m/s", &dims4, &shape4),
            Variable::new("vomecrty", "Northward Sea Water Velocity", "m/s", &dims4, &shape4),
        ];
        let fields: HashMap<String, Field> = [
            ("votemper", climate_temperature as Field),
            ("vozocrtx", climate_eastward as Field),
            ("vomecrty", climate_northward as Field),
        ]
        .into_iter()
        .map(|(k, f)| (k.to_owned(), f))
        .collect();
        Self {
            variables,
            timestamps: (1..=12)
                .map(|m| Utc.with_ymd_and_hms(1990, m, 15, 0, 0, 0).unwrap())
                .collect(),
            depth_dimensions: vec!["deptht".to_owned()],
            fields,
            closed: None,
        }
    }

    /// Surface-only eastward stress declared ahead of a full-depth
    /// northward current.
    pub fn mixed_currents() -> Self {
        let dims4 = ["time_counter", "depth", "y", "x"];
        let shape4 = [2, LEVELS_M.len(), 100, 100];
        let variables = vec![
            Variable::new("sozotaux", "Eastward Wind Stress", "N/m2", &["time_counter", "y", "x"], &[2, 100, 100]),
            Variable::new("vomecrty", "Northward Sea Water Velocity", "m/s", &dims4, &shape4),
            Variable::new("votemper", "Sea Water Potential Temperature", "Kelvin", &dims4, &shape4),
        ];
        let fields: HashMap<String, Field> = [
            ("sozotaux", sea_surface_height as Field),
            ("vomecrty", northward as Field),
            ("votemper", temperature as Field),
        ]
        .into_iter()
        .map(|(k, f)| (k.to_owned(), f))
        .collect();
        Self {
            variables,
            timestamps: vec![
                Utc.with_ymd_and_hms(2017, 3, 3, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2017, 3, 4, 0, 0, 0).unwrap(),
            ],
            depth_dimensions: vec!["depth".to_owned()],
            fields,
            closed: None,
        }
    }

    pub fn timestamps_len(&self) -> usize {
        self.timestamps.len()
    }

    /// The value the dataset stores for `variable` at `point`, before
    /// scaling, or `None` below the sea floor.
    pub fn raw_value(&self, variable: &str, time: usize, point: Point<C>, level: usize) -> Option<C> {
        let field = self.fields.get(variable)?;
        let meta = self.variable(variable)?;
        if self.has_depth(meta) && level >= bottom_levels(point.x()) {
            return None;
        }
        Some(field(time, point.y(), point.x(), level))
    }

    fn field(&self, variable: &str) -> Result<Field, TransectError> {
        self.fields
            .get(variable)
            .copied()
            .ok_or_else(|| TransectError::InvalidVariable(variable.to_owned()))
    }
}

impl GriddedDataset for MemoryDataset {
    fn variables(&self) -> &[Variable] {
        &self.variables
    }

    fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    fn depth_dimensions(&self) -> &[String] {
        &self.depth_dimensions
    }

    fn path_profile(
        &self,
        waypoints: &[Point<C>],
        time: usize,
        variable: &str,
        samples: Option<usize>,
    ) -> Result<Profile, TransectError> {
        self.field(variable)?;
        let path = SamplePath::builder()
            .waypoints(waypoints.iter().copied())
            .samples(samples.unwrap_or(100))
            .build()?;
        let cols = path.len();
        let mut cells = Vec::with_capacity(LEVELS_M.len() * cols);
        for level in 0..LEVELS_M.len() {
            for point in &path.points {
                cells.push(self.raw_value(variable, time, *point, level));
            }
        }
        let depths: Vec<Vec<C>> = vec![LEVELS_M.to_vec(); cols];
        Ok(Profile {
            points: path.points,
            distances_km: path.distances_km,
            values: MaskedGrid::from_options(LEVELS_M.len(), cols, cells)?,
            depths_m: Grid::from_rows(&depths)?,
        })
    }

    fn path(
        &self,
        waypoints: &[Point<C>],
        depth: usize,
        time: usize,
        variable: &str,
    ) -> Result<PathSlice, TransectError> {
        self.field(variable)?;
        let path = SamplePath::builder()
            .waypoints(waypoints.iter().copied())
            .build()?;
        let values = path
            .points
            .iter()
            .map(|p| self.raw_value(variable, time, *p, depth))
            .collect();
        Ok(PathSlice {
            points: path.points,
            distances_km: path.distances_km,
            timestamp: self.timestamps[time],
            values,
        })
    }
}

/// Opens fresh [MemoryDataset]s by name and counts opens and closes.
#[derive(Default)]
pub struct MemorySource {
    datasets: HashMap<String, fn() -> MemoryDataset>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl MemorySource {
    pub fn new() -> Self {
        let mut source = Self::default();
        source.datasets.insert("giops_day".to_owned(), MemoryDataset::ocean);
        source
            .datasets
            .insert("giops_climatology".to_owned(), MemoryDataset::climatology);
        source
    }
}

impl DatasetSource for MemorySource {
    fn open(&self, url: &str) -> Result<Box<dyn GriddedDataset>, TransectError> {
        let make = self
            .datasets
            .get(url)
            .ok_or_else(|| TransectError::DataUnavailable(url.to_owned(), "not found".into()))?;
        let mut dataset = make();
        dataset.closed = Some(Arc::clone(&self.closed));
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(dataset))
    }
}
