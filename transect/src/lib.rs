//! Vertical sections of gridded ocean model output along arbitrary
//! paths, with the sea floor resampled beneath them.
//!
//! ```text
//! waypoints ─► SamplePath ─► ProfileExtractor ─► AnomalyCombiner ─► fill_depth_gaps ─┐
//!                   │                                                                ├─► Transect
//!                   └────────► BathymetryResampler ◄─► CacheStore ───────────────────┘
//! ```
//!
//! Reading model files is left to implementors of [GriddedDataset] and
//! [DatasetSource].

mod anomaly;
mod assemble;
mod bathymetry;
mod cache;
mod config;
mod dataset;
mod error;
mod export;
mod extract;
mod fill;
mod grid;
mod math;
mod path;
#[cfg(test)]
mod testing;

pub use crate::{
    anomaly::AnomalyCombiner,
    assemble::{SurfaceLayer, Transect, TransectAssembler, TransectRequest},
    bathymetry::{smooth, Bathymetry, BathymetryResampler, RasterFile, RasterSource, Resampled},
    cache::{cache_key, CacheStats, CacheStore, Curve, PersistHandle},
    config::{Config, DEFAULT_CACHE_BYTES},
    dataset::{resolve_time, DatasetSource, GriddedDataset, PathSlice, Profile, Variable},
    error::TransectError,
    export::{write_csv, write_odv},
    extract::{decompose, select_depth_proxy, vector_name, Extraction, ProfileData, ProfileExtractor, Variables},
    fill::fill_depth_gaps,
    grid::{Grid, MaskedGrid},
    path::{SamplePath, SamplePathBuilder, DEFAULT_SAMPLES},
};
pub use etopo;
pub use geo;

/// Base floating point type used for coordinates and values.
pub type C = f64;
