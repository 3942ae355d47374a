//! Centered moving average over observed ages

/// Smooth `(age, value)` pairs sorted by age with a centered window of `window` ages.
///
/// The window spans `window / 2` ages below and `(window - 1) / 2` ages above
/// the target (symmetric for odd widths). Only ages present in the series are
/// averaged, so near the ends of the observed range the window shrinks instead
/// of reaching outside it.
pub fn centered_moving_average(series: &[(u32, f64)], window: usize) -> Vec<f64> {
    if window <= 1 {
        return series.iter().map(|&(_, v)| v).collect();
    }

    let below = (window / 2) as u32;
    let above = ((window - 1) / 2) as u32;

    series
        .iter()
        .map(|&(age, _)| {
            let lo = age.saturating_sub(below);
            let hi = age.saturating_add(above);
            let (sum, n) = series
                .iter()
                .filter(|(a, _)| (lo..=hi).contains(a))
                .fold((0.0, 0usize), |(sum, n), &(_, v)| (sum + v, n + 1));
            sum / n as f64
        })
        .collect()
}
