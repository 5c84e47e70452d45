use anyhow::{anyhow, Error as AnyError};
use clap::{Parser, Subcommand};
use std::{path::PathBuf, str::FromStr};
use transect::geo::Point;

/// Sample a path of waypoints and the sea floor beneath it.
#[derive(Parser, Debug, Clone)]
pub struct Cli {
    /// JSON config file; flags override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Bathymetry raster sample file, with an `.hdr` alongside.
    #[arg(short, long)]
    pub raster: Option<PathBuf>,

    /// Read the whole raster into memory instead of memory mapping it.
    #[arg(long, default_value_t = false)]
    pub in_mem: bool,

    /// Number of samples along the path.
    #[arg(short = 'n', long)]
    pub samples: Option<usize>,

    /// Directory for persisted bathymetry curves.
    #[arg(long)]
    pub cache_dir: Option<PathBuf>,

    /// Nearest neighbour search radius, in meters.
    #[arg(long)]
    pub radius: Option<f64>,

    /// Gaussian smoothing sigma, in samples.
    #[arg(short, long)]
    pub blur: Option<String>,

    /// Waypoint "lat,lon"; repeat in path order.
    #[arg(short, long = "waypoint", required = true)]
    pub waypoints: Vec<LatLon>,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Clone, Debug, Copy)]
pub struct LatLon(pub Point<f64>);

impl FromStr for LatLon {
    type Err = AnyError;
    fn from_str(s: &str) -> Result<Self, AnyError> {
        let (lat_str, lon_str) = s
            .split_once(',')
            .ok_or_else(|| anyhow!("not a valid lat,lon"))?;
        let lat = f64::from_str(lat_str.trim())?;
        let lon = f64::from_str(lon_str.trim())?;
        Ok(Self(Point::new(lon, lat)))
    }
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print samples to stdout.
    Csv,

    /// Print samples to stdout as JSON.
    Json,

    /// Plot elevation to terminal.
    Plot,

    /// Look the path up twice and print cache statistics.
    Stats,
}
