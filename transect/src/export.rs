//! Text exports of assembled transects.

use crate::{assemble::Transect, extract::ProfileData, grid::MaskedGrid, TransectError, C};
use std::io::Write;

/// Writes `transect` as CSV, one row per sample and depth level.
///
/// Samples repeating the previous sample's distance are skipped, as are
/// rows whose last value is missing.
pub fn write_csv<W: Write>(transect: &Transect, mut out: W) -> Result<(), TransectError> {
    writeln!(out, "// Dataset: {}", transect.dataset)?;
    writeln!(out, "// Timestamp: {}", transect.timestamp.to_rfc3339())?;

    let mut columns = vec![
        "Latitude".to_owned(),
        "Longitude".to_owned(),
        "Distance (km)".to_owned(),
        "Depth (m)".to_owned(),
    ];
    if let Some(surface) = &transect.surface {
        columns.push(format!("{} ({})", surface.name, surface.unit));
    }
    let grids = value_grids(&transect.data);
    columns.extend(
        grids
            .iter()
            .map(|(prefix, _)| format!("{prefix}{} ({})", transect.name, transect.unit)),
    );
    writeln!(out, "{}", columns.join(","))?;

    for (idx, distance) in transect.distances_km.iter().enumerate() {
        if idx > 0 && *distance == transect.distances_km[idx - 1] {
            continue;
        }
        let point = transect.points[idx];
        for level in 0..transect.depths_m.cols() {
            let mut row = vec![
                format!("{:.4}", point.y()),
                format!("{:.4}", point.x()),
                format!("{distance:.1}"),
                format!("{:.1}", transect.depths_m.get(idx, level)),
            ];
            if let Some(surface) = &transect.surface {
                row.push(if level == 0 {
                    fmt_value(surface_at(&surface.distances_km, &surface.values, *distance), 4)
                } else {
                    "-".to_owned()
                });
            }
            let values: Vec<Option<C>> = grids.iter().map(|(_, g)| finite(g.get(level, idx))).collect();
            if values.last().copied().flatten().is_none() {
                continue;
            }
            row.extend(values.into_iter().map(|v| fmt_value(v, 4)));
            writeln!(out, "{}", row.join(","))?;
        }
    }
    Ok(())
}

/// Writes `transect` as an Ocean Data View generic spreadsheet, one
/// station per distinct sample.
pub fn write_odv<W: Write>(transect: &Transect, mut out: W) -> Result<(), TransectError> {
    writeln!(out, "//<Encoding>UTF-8</Encoding>")?;
    writeln!(out, "//<DataField>Ocean</DataField>")?;
    writeln!(out, "//<DataType>Profiles</DataType>")?;

    let grids = value_grids(&transect.data);
    let mut columns = vec![
        "Cruise".to_owned(),
        "Station".to_owned(),
        "Type".to_owned(),
        "yyyy-mm-ddThh:mm:ss.sss".to_owned(),
        "Longitude [degrees_east]".to_owned(),
        "Latitude [degrees_north]".to_owned(),
        "Depth [m]".to_owned(),
    ];
    columns.extend(grids.iter().map(|(prefix, _)| {
        let qualifier = prefix.trim();
        let name = if qualifier.is_empty() {
            transect.name.clone()
        } else {
            format!("{} {qualifier}", transect.name)
        };
        format!("{name} [{}]", transect.unit)
    }));
    writeln!(out, "{}", columns.join("\t"))?;

    let time = transect.timestamp.format("%Y-%m-%dT%H:%M:%S%.3f").to_string();
    let mut station = 0;
    for (idx, distance) in transect.distances_km.iter().enumerate() {
        if idx > 0 && *distance == transect.distances_km[idx - 1] {
            continue;
        }
        station += 1;
        let point = transect.points[idx];
        for level in 0..transect.depths_m.cols() {
            let mut row = if level == 0 {
                vec![
                    transect.dataset.clone(),
                    format!("{station:03}"),
                    "C".to_owned(),
                    time.clone(),
                    format!("{:.4}", point.x()),
                    format!("{:.4}", point.y()),
                ]
            } else {
                vec![String::new(); 6]
            };
            row.push(format!("{:.3}", transect.depths_m.get(idx, level)));
            row.extend(grids.iter().map(|(_, g)| {
                finite(g.get(level, idx))
                    .map(|v| format!("{v:.3}"))
                    .unwrap_or_default()
            }));
            writeln!(out, "{}", row.join("\t"))?;
        }
    }
    Ok(())
}

fn value_grids(data: &ProfileData) -> Vec<(&'static str, &MaskedGrid)> {
    match data {
        ProfileData::Scalar(grid) => vec![("", grid)],
        ProfileData::Vector {
            parallel,
            perpendicular,
        } => vec![("Parallel ", parallel), ("Perpendicular ", perpendicular)],
    }
}

/// Non-finite values are written as missing.
fn finite(value: Option<C>) -> Option<C> {
    value.filter(|v| v.is_finite())
}

fn fmt_value(value: Option<C>, decimals: usize) -> String {
    finite(value).map_or_else(|| "nan".to_owned(), |v| format!("{v:.decimals$}"))
}

/// Value of the sample nearest `distance` on another sampling of the
/// same path.
fn surface_at(distances_km: &[C], values: &[Option<C>], distance: C) -> Option<C> {
    distances_km
        .iter()
        .zip(values)
        .min_by(|(a, _), (b, _)| (*a - distance).abs().total_cmp(&(*b - distance).abs()))
        .and_then(|(_, v)| *v)
}
