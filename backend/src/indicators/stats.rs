// =============================================================================
// Window statistics shared by the calculators
// =============================================================================

/// Mean of the trailing `period` values, or of the whole slice when it is
/// shorter than `period`. `None` for an empty slice or `period == 0`.
pub fn trailing_mean(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.is_empty() {
        return None;
    }
    let window = &values[values.len().saturating_sub(period)..];
    let mean = window.iter().sum::<f64>() / window.len() as f64;
    mean.is_finite().then_some(mean)
}

/// Population standard deviation (divides by N). Empty slice => 0.0.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

/// Every `step`-th element starting at index 0 (daily -> weekly resampling).
pub fn every_nth(values: &[f64], step: usize) -> Vec<f64> {
    if step == 0 {
        return Vec::new();
    }
    values.iter().step_by(step).copied().collect()
}
