//! Missing-value-aware descriptive statistics
//!
//! Both statistics skip NaN inputs and answer `NaN` when nothing is left to
//! summarize, so degenerate groups never abort a run.

/// Median of the non-NaN values
///
/// Even counts average the two middle values. Returns `NaN` for no values.
///
/// # Examples
/// ```
/// use xplor_distros::summary::stats::nan_median;
/// assert_eq!(nan_median(&[3.0, f64::NAN, 1.0, 2.0]), 2.0);
/// assert!(nan_median(&[f64::NAN]).is_nan());
/// ```
#[must_use]
pub fn nan_median(data: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = data.iter().copied().filter(|x| !x.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_unstable_by(f64::total_cmp);

    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Population skewness of the non-NaN values
///
/// # Formula
/// ```text
/// g₁ = m₃ / m₂^{3/2}
/// ```
/// where `m₂`, `m₃` are the biased second and third central moments.
///
/// Returns `NaN` for no values or zero variance.
///
/// # Examples
/// ```
/// use xplor_distros::summary::stats::nan_skewness;
/// assert!(nan_skewness(&[1.0, 2.0, 3.0]).abs() < 1e-12);
/// assert!(nan_skewness(&[1.0, 2.0, 3.0, 4.0, 50.0]) > 0.0);
/// assert!(nan_skewness(&[5.0, 5.0, 5.0]).is_nan());
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn nan_skewness(data: &[f64]) -> f64 {
    let values: Vec<f64> = data.iter().copied().filter(|x| !x.is_nan()).collect();
    if values.is_empty() {
        return f64::NAN;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let mut sum2 = 0.0;
    let mut sum3 = 0.0;
    for &x in &values {
        let d = x - mean;
        let d2 = d * d;
        sum2 += d2;
        sum3 += d2 * d;
    }

    let m2 = sum2 / n;
    if m2 == 0.0 {
        return f64::NAN;
    }
    let m3 = sum3 / n;
    m3 / m2.powf(1.5)
}
