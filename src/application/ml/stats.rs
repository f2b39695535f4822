use statrs::statistics::Statistics;

/// Arithmetic mean. NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    values.iter().mean()
}

/// Population standard deviation (divides by n), two-pass so a constant
/// series yields exactly 0.
pub fn population_std_dev(values: &[f64]) -> f64 {
    let avg = mean(values);
    values.iter().map(|v| (v - avg).powi(2)).mean().sqrt()
}

/// Simple return from `from` to `to`.
pub fn simple_return(from: f64, to: f64) -> f64 {
    (to - from) / from
}
