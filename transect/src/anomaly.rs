use crate::{
    dataset::{open_dataset, resolve_time, DatasetSource, GriddedDataset},
    extract::{decompose, scaled_profile, Extraction, ProfileData, Variables},
    TransectError, C,
};
use chrono::Datelike;
use geo::Point;
use log::debug;

/// Subtracts a monthly climatology from extractions whose variable was
/// replaced by a depth proxy.
#[derive(Debug, Clone, Copy)]
pub struct AnomalyCombiner {
    samples: usize,
}

impl AnomalyCombiner {
    /// `samples` must match the sampling of the extractions this is
    /// applied to.
    pub fn new(samples: usize) -> Self {
        Self { samples }
    }

    /// True if `extraction` substituted a variable and a climatology
    /// dataset is configured.
    pub fn applies(extraction: &Extraction, climatology_url: Option<&str>) -> bool {
        extraction.substituted() && climatology_url.is_some()
    }

    /// Opens the climatology at `url` for the duration of the call and
    /// combines it into `extraction`.
    ///
    /// Returns `true` if `extraction` now holds an anomaly.
    pub fn apply(
        &self,
        source: &dyn DatasetSource,
        url: Option<&str>,
        waypoints: &[Point<C>],
        extraction: &mut Extraction,
    ) -> Result<bool, TransectError> {
        let Some(url) = url.filter(|_| Self::applies(extraction, url)) else {
            return Ok(false);
        };
        let climatology = open_dataset(source, url)?;
        self.combine(climatology.as_ref(), waypoints, extraction)
    }

    /// Replaces the values of `extraction` with `value - climatology`
    /// for the extraction's calendar month.
    ///
    /// Variables the climatology lacks are left untouched.
    pub fn combine(
        &self,
        climatology: &dyn GriddedDataset,
        waypoints: &[Point<C>],
        extraction: &mut Extraction,
    ) -> Result<bool, TransectError> {
        let month = i64::from(extraction.timestamp.month0());
        let Some(time) = resolve_time(month, climatology.timestamps().len()) else {
            debug!("climatology has no timestamps");
            return Ok(false);
        };
        if let Some(missing) = extraction
            .effective
            .names()
            .into_iter()
            .find(|name| climatology.variable(name).is_none())
        {
            debug!("climatology has no '{missing}', skipping anomaly");
            return Ok(false);
        }

        match (&extraction.effective, &mut extraction.data) {
            (Variables::Scalar(name), ProfileData::Scalar(values)) => {
                let (baseline, _) = scaled_profile(climatology, waypoints, time, name, self.samples)?;
                *values = values.zip_with(&baseline.values, |v, c| v - c)?;
            }
            (
                Variables::Vector { east, north },
                ProfileData::Vector {
                    parallel,
                    perpendicular,
                },
            ) => {
                let (u, _) = scaled_profile(climatology, waypoints, time, east, self.samples)?;
                let (v, _) = scaled_profile(climatology, waypoints, time, north, self.samples)?;
                let (par, perp) = decompose(&u.values, &v.values, &extraction.path.bearings_deg)?;
                *parallel = parallel.zip_with(&par, |v, c| v - c)?;
                *perpendicular = perpendicular.zip_with(&perp, |v, c| v - c)?;
            }
            (effective, _) => {
                return Err(TransectError::InvalidVariable(format!("{effective:?}")));
            }
        }
        debug!("subtracted climatology month {time} from {:?}", extraction.effective);
        Ok(true)
    }
}
