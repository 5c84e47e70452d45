/// Kernel half-width, in standard deviations.
const TRUNCATE: f64 = 4.0;

/// One dimensional Gaussian smoothing with reflected edges
/// (`d c b a | a b c d | d c b a`).
///
/// Missing samples neither contribute nor get filled; weights are
/// renormalized over the samples present. Returns `None` when `sigma`
/// is negative or not finite.
pub fn gaussian_filter(data: &[Option<f32>], sigma: f64) -> Option<Vec<Option<f32>>> {
    if !sigma.is_finite() || sigma < 0.0 {
        return None;
    }
    if sigma == 0.0 || data.is_empty() {
        return Some(data.to_vec());
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let radius = (TRUNCATE * sigma + 0.5) as isize;
    #[allow(clippy::cast_precision_loss)]
    let kernel: Vec<f64> = (-radius..=radius)
        .map(|x| (-0.5 * (x as f64 / sigma).powi(2)).exp())
        .collect();

    #[allow(clippy::cast_possible_wrap)]
    let n = data.len() as isize;
    let smoothed = (0..n)
        .map(|i| {
            data[i as usize]?;
            let (mut acc, mut norm) = (0.0, 0.0);
            for (k, weight) in (-radius..=radius).zip(&kernel) {
                if let Some(v) = data[reflect(i + k, n)] {
                    acc += weight * f64::from(v);
                    norm += weight;
                }
            }
            #[allow(clippy::cast_possible_truncation)]
            Some((acc / norm) as f32)
        })
        .collect();
    Some(smoothed)
}

#[allow(clippy::cast_sign_loss)]
fn reflect(i: isize, n: isize) -> usize {
    let j = i.rem_euclid(2 * n);
    (if j >= n { 2 * n - j - 1 } else { j }) as usize
}

#[cfg(test)]
mod tests {
    use super::{gaussian_filter, reflect};
    use approx::assert_relative_eq;

    #[test]
    fn test_reflect() {
        assert_eq!(reflect(-1, 4), 0);
        assert_eq!(reflect(-2, 4), 1);
        assert_eq!(reflect(4, 4), 3);
        assert_eq!(reflect(5, 4), 2);
        assert_eq!(reflect(9, 4), 1);
    }

    #[test]
    fn test_constant_is_unchanged() {
        let data = vec![Some(-120.0_f32); 16];
        let smoothed = gaussian_filter(&data, 2.5).unwrap();
        for v in smoothed {
            assert_relative_eq!(v.unwrap(), -120.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_spike_is_spread_and_mass_preserved() {
        let mut data = vec![Some(0.0_f32); 21];
        data[10] = Some(1.0);
        let smoothed = gaussian_filter(&data, 1.0).unwrap();
        let peak = smoothed[10].unwrap();
        assert!(peak < 1.0 && peak > 0.3);
        assert_relative_eq!(smoothed[9].unwrap(), smoothed[11].unwrap());
        let sum: f32 = smoothed.iter().flatten().sum();
        assert_relative_eq!(sum, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_missing_stays_missing() {
        let data = vec![Some(1.0), None, Some(3.0)];
        let smoothed = gaussian_filter(&data, 1.0).unwrap();
        assert!(smoothed[1].is_none());
        assert!(smoothed[0].is_some() && smoothed[2].is_some());
    }

    #[test]
    fn test_invalid_sigma() {
        let data = vec![Some(1.0), Some(2.0)];
        assert!(gaussian_filter(&data, f64::NAN).is_none());
        assert!(gaussian_filter(&data, -1.0).is_none());
        assert_eq!(gaussian_filter(&data, 0.0).unwrap(), data);
    }
}
