use crate::{
    dataset::{resolve_time, GriddedDataset, Profile},
    grid::{Grid, MaskedGrid},
    path::SamplePath,
    TransectError, C,
};
use chrono::{DateTime, Utc};
use geo::Point;
use log::debug;

const KELVIN_OFFSET: C = 273.15;

/// One scalar variable, or the eastward and northward components of a
/// vector field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variables {
    Scalar(String),
    Vector { east: String, north: String },
}

impl Variables {
    pub fn scalar(name: &str) -> Self {
        Self::Scalar(name.to_owned())
    }

    pub fn vector(east: &str, north: &str) -> Self {
        Self::Vector {
            east: east.to_owned(),
            north: north.to_owned(),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Scalar(name) => vec![name.as_str()],
            Self::Vector { east, north } => vec![east.as_str(), north.as_str()],
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProfileData {
    Scalar(MaskedGrid),

    /// Along-track and cross-track components.
    Vector {
        parallel: MaskedGrid,
        perpendicular: MaskedGrid,
    },
}

impl ProfileData {
    pub fn grids_mut(&mut self) -> Vec<&mut MaskedGrid> {
        match self {
            Self::Scalar(grid) => vec![grid],
            Self::Vector {
                parallel,
                perpendicular,
            } => vec![parallel, perpendicular],
        }
    }
}

/// A profile pulled from a dataset, scaled and in display units.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// What the caller asked for.
    pub requested: Variables,

    /// What was actually read, after depth proxy substitution.
    pub effective: Variables,

    pub time_index: usize,
    pub timestamp: DateTime<Utc>,

    /// Sampling used for bearings; aligned with `data` columns.
    pub path: SamplePath,

    pub points: Vec<Point<C>>,
    pub distances_km: Vec<C>,

    /// `[sample × depth level]`, meters.
    pub depths_m: Grid<C>,

    /// `[depth level × sample]`.
    pub data: ProfileData,

    pub name: String,
    pub unit: String,
}

impl Extraction {
    /// True when a depth proxy stood in for a requested variable.
    pub fn substituted(&self) -> bool {
        self.requested != self.effective
    }
}

/// Pulls per-depth profiles of one or two variables along a path.
#[derive(Debug, Clone, Copy)]
pub struct ProfileExtractor {
    samples: usize,
}

impl ProfileExtractor {
    pub fn new(samples: usize) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn extract(
        &self,
        dataset: &dyn GriddedDataset,
        waypoints: &[Point<C>],
        variables: &Variables,
        time: i64,
    ) -> Result<Extraction, TransectError> {
        let time_index = resolve_time(time, dataset.timestamps().len()).ok_or_else(|| {
            TransectError::DataUnavailable(variables.names().join(","), "no timestamps".into())
        })?;
        let timestamp = dataset.timestamps()[time_index];

        let requested = variables.names();
        let effective = match variables {
            Variables::Scalar(name) => Variables::Scalar(depth_variable(dataset, name, &requested)?),
            Variables::Vector { east, north } => Variables::Vector {
                east: depth_variable(dataset, east, &requested)?,
                north: depth_variable(dataset, north, &requested)?,
            },
        };

        let path = SamplePath::builder()
            .waypoints(waypoints.iter().copied())
            .samples(self.samples)
            .build()?;

        let (profile, data, name, unit) = match &effective {
            Variables::Scalar(name) => {
                let (profile, unit) = scaled_profile(dataset, waypoints, time_index, name, self.samples)?;
                let display_name = display_name(dataset, name);
                let data = ProfileData::Scalar(profile.values.clone());
                (profile, data, display_name, unit)
            }
            Variables::Vector { east, north } => {
                let (u, unit) = scaled_profile(dataset, waypoints, time_index, east, self.samples)?;
                let (v, _) = scaled_profile(dataset, waypoints, time_index, north, self.samples)?;
                let (parallel, perpendicular) = decompose(&u.values, &v.values, &path.bearings_deg)?;
                let data = ProfileData::Vector {
                    parallel,
                    perpendicular,
                };
                (u, data, vector_name(&display_name(dataset, east)), unit)
            }
        };

        debug!(
            "extracted {:?} as {:?}; time: {time_index}, shape: {:?}",
            variables,
            effective,
            profile.values.shape()
        );

        Ok(Extraction {
            requested: variables.clone(),
            effective,
            time_index,
            timestamp,
            path,
            points: profile.points,
            distances_km: profile.distances_km,
            depths_m: profile.depths_m,
            data,
            name,
            unit,
        })
    }
}

/// Picks a variable to stand in for `requested` when it has no depth
/// axis: the first variable, in declaration order, that has a depth
/// dimension, at least 4 dimensions, and every non-depth dimension of
/// `requested`.
pub fn select_depth_proxy(dataset: &dyn GriddedDataset, requested: &str) -> Option<String> {
    proxy_excluding(dataset, requested, &[requested])
}

/// [select_depth_proxy], never picking a name in `excluded`.
fn proxy_excluding(dataset: &dyn GriddedDataset, requested: &str, excluded: &[&str]) -> Option<String> {
    let target = dataset.variable(requested)?;
    let depth_dims = dataset.depth_dimensions();
    let shared: Vec<&String> = target
        .dimensions
        .iter()
        .filter(|d| !depth_dims.contains(d))
        .collect();
    dataset
        .variables()
        .iter()
        .filter(|candidate| !excluded.contains(&candidate.name.as_str()))
        .find(|candidate| {
            dataset.has_depth(candidate)
                && candidate.dimensions.len() >= 4
                && shared.iter().all(|d| candidate.dimensions.contains(d))
        })
        .map(|candidate| candidate.name.clone())
}

/// Returns `name`, or its depth proxy if it has no depth axis. The
/// proxy is never one of the `requested` names.
fn depth_variable(dataset: &dyn GriddedDataset, name: &str, requested: &[&str]) -> Result<String, TransectError> {
    let variable = dataset
        .variable(name)
        .ok_or_else(|| TransectError::InvalidVariable(name.to_owned()))?;
    if dataset.has_depth(variable) {
        return Ok(name.to_owned());
    }
    let proxy = proxy_excluding(dataset, name, requested)
        .ok_or_else(|| TransectError::DepthUnavailable(name.to_owned()))?;
    debug!("'{name}' has no depth axis, substituting '{proxy}'");
    Ok(proxy)
}

fn display_name(dataset: &dyn GriddedDataset, name: &str) -> String {
    dataset
        .variable(name)
        .map_or_else(|| name.to_owned(), |v| v.display_name.clone())
}

/// Reads a profile of `variable` at exactly `samples` points, applies
/// its scale factor and converts Kelvin to Celsius.
///
/// Returns the profile and the unit of its values.
pub(crate) fn scaled_profile(
    dataset: &dyn GriddedDataset,
    waypoints: &[Point<C>],
    time: usize,
    variable: &str,
    samples: usize,
) -> Result<(Profile, String), TransectError> {
    let meta = dataset
        .variable(variable)
        .ok_or_else(|| TransectError::InvalidVariable(variable.to_owned()))?;
    let mut profile = dataset.path_profile(waypoints, time, variable, Some(samples))?;
    profile.check_shape(samples)?;
    let factor = meta.scale_factor;
    let (unit, offset) = kelvin_to_celsius(&meta.unit);
    profile.values = profile.values.map_valid(|v| v * factor + offset);
    Ok((profile, unit))
}

/// Returns the display unit and the additive offset that converts
/// values of `unit` into it.
pub(crate) fn kelvin_to_celsius(unit: &str) -> (String, C) {
    match unit.trim().to_ascii_lowercase().as_str() {
        "k" | "kelvin" | "kelvins" | "degk" | "degree_kelvin" | "degrees_k" => {
            ("Celsius".to_owned(), -KELVIN_OFFSET)
        }
        _ => (unit.to_owned(), 0.0),
    }
}

/// Rotates eastward (`u`) and northward (`v`) components into
/// components parallel and perpendicular to the path, using the
/// bearing of each sample column.
///
/// A cell is masked if either component is.
pub fn decompose(
    u: &MaskedGrid,
    v: &MaskedGrid,
    bearings_deg: &[C],
) -> Result<(MaskedGrid, MaskedGrid), TransectError> {
    let (rows, cols) = u.shape();
    if v.shape() != u.shape() || bearings_deg.len() != cols {
        return Err(TransectError::ShapeMismatch {
            expected: cols,
            actual: bearings_deg.len().min(v.shape().1),
        });
    }
    let mut parallel = u.clone();
    let mut perpendicular = u.clone();
    for col in 0..cols {
        let r = (90.0 - bearings_deg[col]).to_radians();
        for row in 0..rows {
            let (par, perp) = match (u.get(row, col), v.get(row, col)) {
                (Some(x), Some(y)) => {
                    let theta = y.atan2(x) - r;
                    let mag = x.hypot(y);
                    (Some(mag * theta.cos()), Some(mag * theta.sin()))
                }
                _ => (None, None),
            };
            parallel.set(row, col, par);
            perpendicular.set(row, col, perp);
        }
    }
    Ok((parallel, perpendicular))
}

/// Strips directional qualifiers from a vector component's name, e.g.
/// "Eastward Sea Water Velocity" becomes "Sea Water Velocity".
pub fn vector_name(name: &str) -> String {
    const QUALIFIERS: [&str; 6] = ["x", "y", "zonal", "meridional", "northward", "eastward"];
    name.split_whitespace()
        .filter(|word| !QUALIFIERS.contains(&word.to_ascii_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(" ")
}
