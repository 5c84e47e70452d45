mod options;

use anyhow::{anyhow, Error as AnyError};
use clap::Parser;
use options::{Cli, Command as CliCmd, LatLon};
use serde::Serialize;
use std::{io::Write, sync::Arc};
use textplots::{Chart, Plot, Shape};
use transect::{
    etopo::RasterMode, Bathymetry, BathymetryResampler, CacheStore, Config, RasterFile, SamplePath,
};

fn main() -> Result<(), AnyError> {
    let cli = Cli::parse();
    env_logger::init();

    let Cli {
        config,
        raster,
        in_mem,
        samples,
        cache_dir,
        radius,
        blur,
        waypoints,
        cmd,
    } = cli;

    let mut config = match config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(raster) = raster {
        config.bathymetry = Some(raster);
    }
    if let Some(samples) = samples {
        config.default_samples = samples;
    }
    if let Some(cache_dir) = cache_dir {
        config.cache_dir = cache_dir;
    }
    if let Some(radius) = radius {
        config.radius_of_influence_m = radius;
    }
    let raster = config
        .bathymetry
        .clone()
        .ok_or_else(|| anyhow!("no bathymetry raster given"))?;

    let path = SamplePath::builder()
        .waypoints(waypoints.into_iter().map(|LatLon(p)| p))
        .samples(config.default_samples)
        .build()?;

    let mode = if in_mem { RasterMode::InMem } else { RasterMode::MemMap };
    let cache = Arc::new(CacheStore::from_config(&config));
    let resampler = BathymetryResampler::new(
        Arc::new(RasterFile::new(raster, mode)),
        Arc::clone(&cache),
        config.radius_of_influence_m,
        config.grid_resolution_deg,
    );

    let resampled = resampler.resample(&path, blur.as_deref())?;
    let bathymetry = resampled.bathymetry;

    match cmd {
        CliCmd::Csv => print_csv(&path, &bathymetry)?,
        CliCmd::Json => print_json(&path, &bathymetry)?,
        CliCmd::Plot => plot_ascii(&bathymetry),
        CliCmd::Stats => {
            resampler.resample(&path, blur.as_deref())?;
            println!("{:#?}", cache.stats());
        }
    }

    // Let a fresh curve reach the disk before exiting.
    if let Some(handle) = resampled.persist {
        if let Err(e) = handle.join() {
            log::warn!("bathymetry not cached: {e}");
        }
    }
    Ok(())
}

fn print_csv(path: &SamplePath, bathymetry: &Bathymetry) -> Result<(), AnyError> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "Latitude,Longitude,Distance (km),Bearing,Depth (m)")?;
    for (((point, distance), bearing), depth) in path
        .points
        .iter()
        .zip(path.distances_km.iter())
        .zip(path.bearings_deg.iter())
        .zip(bathymetry.depth_m())
    {
        let depth = depth.map_or_else(|| "nan".to_owned(), |d| format!("{d:.1}"));
        writeln!(
            stdout,
            "{:.4},{:.4},{distance:.1},{bearing:.1},{depth}",
            point.y(),
            point.x()
        )?;
    }
    Ok(())
}

fn print_json(path: &SamplePath, bathymetry: &Bathymetry) -> Result<(), AnyError> {
    #[derive(Serialize)]
    struct JsonEntry {
        location: [f64; 2],
        distance_km: f64,
        bearing_deg: f64,
        elevation_m: Option<f32>,
    }

    #[derive(Serialize)]
    struct JsonPath {
        stations_km: Vec<f64>,
        samples: Vec<JsonEntry>,
    }

    let samples = path
        .points
        .iter()
        .zip(path.distances_km.iter())
        .zip(path.bearings_deg.iter())
        .zip(bathymetry.elevation_m.iter())
        .map(|(((point, distance), bearing), elevation)| JsonEntry {
            location: [point.x(), point.y()],
            distance_km: *distance,
            bearing_deg: *bearing,
            elevation_m: *elevation,
        })
        .collect();
    let json = serde_json::to_string(&JsonPath {
        stations_km: path.stations_km.clone(),
        samples,
    })?;
    println!("{json}");
    Ok(())
}

fn plot_ascii(bathymetry: &Bathymetry) {
    #[allow(clippy::cast_possible_truncation)]
    let plot_data: Vec<(f32, f32)> = bathymetry
        .distances_km
        .iter()
        .zip(bathymetry.elevation_m.iter())
        .filter_map(|(distance, elevation)| elevation.map(|z| (*distance as f32, z)))
        .collect();
    #[allow(clippy::cast_possible_truncation)]
    let xmax = bathymetry.distances_km.last().copied().unwrap_or_default() as f32;
    Chart::new(300, 150, 0.0, xmax.max(1.0))
        .lineplot(&Shape::Lines(&plot_data))
        .display();
}
