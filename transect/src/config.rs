use crate::{TransectError, C};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, path::PathBuf};

/// Default in-memory bathymetry cache bound, 256 MiB.
pub const DEFAULT_CACHE_BYTES: usize = 256 * 1024 * 1024;

/// Service level settings shared by every transect request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding persisted bathymetry artifacts.
    pub cache_dir: PathBuf,

    /// Upper bound on the serialized size of in-memory cache entries.
    pub cache_bytes: usize,

    /// Bathymetry raster sample file (`.bin`/`.flt` with an `.hdr`
    /// sidecar).
    pub bathymetry: Option<PathBuf>,

    /// Nearest neighbour search limit, meters.
    pub radius_of_influence_m: C,

    /// Bathymetry grid spacing, degrees.
    pub grid_resolution_deg: C,

    /// Samples along a path when the request doesn't say.
    pub default_samples: usize,

    /// Dataset identifier to climatology dataset URL.
    pub climatology: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: std::env::temp_dir().join("transect-cache"),
            cache_bytes: DEFAULT_CACHE_BYTES,
            bathymetry: None,
            radius_of_influence_m: 500_000.0,
            grid_resolution_deg: 1.0 / 60.0,
            default_samples: 100,
            climatology: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, TransectError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn climatology_for(&self, dataset: &str) -> Option<&str> {
        self.climatology.get(dataset).map(String::as_str)
    }
}
