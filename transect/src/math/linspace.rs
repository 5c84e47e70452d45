use num_traits::{Float, FromPrimitive};

/// `n` evenly spaced values from `y_start` to `y_end`, inclusive.
///
/// The final value is exactly `y_end`.
pub fn linspace<T>(y_start: T, y_end: T, n: usize) -> impl Iterator<Item = T>
where
    T: Float + FromPrimitive,
{
    let dy = (y_end - y_start) / T::from(n - 1).unwrap_or_else(T::nan);
    (0..n).map(move |x| {
        if x + 1 == n {
            y_end
        } else {
            y_start + T::from(x).unwrap_or_else(T::nan) * dy
        }
    })
}
