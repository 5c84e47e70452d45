mod gaussian;
mod linspace;

pub(crate) use {gaussian::gaussian_filter, linspace::linspace};

/// Wraps a longitude into [-180, 180].
pub(crate) fn wrap_lon(lon: f64) -> f64 {
    if (-180.0..=180.0).contains(&lon) {
        lon
    } else {
        (lon + 180.0).rem_euclid(360.0) - 180.0
    }
}

/// Normalizes a bearing into [0, 360).
pub(crate) fn wrap_bearing(deg: f64) -> f64 {
    let deg = deg.rem_euclid(360.0);
    // rem_euclid can round up to the modulus itself.
    if deg >= 360.0 {
        0.0
    } else {
        deg
    }
}

#[cfg(test)]
mod tests {
    use super::{wrap_bearing, wrap_lon};

    #[test]
    fn test_wrap_lon() {
        assert_eq!(wrap_lon(-180.0), -180.0);
        assert_eq!(wrap_lon(179.5), 179.5);
        assert_eq!(wrap_lon(181.0), -179.0);
        assert_eq!(wrap_lon(-190.0), 170.0);
    }

    #[test]
    fn test_wrap_bearing() {
        assert_eq!(wrap_bearing(-90.0), 270.0);
        assert_eq!(wrap_bearing(360.0), 0.0);
        assert_eq!(wrap_bearing(45.0), 45.0);
    }
}
