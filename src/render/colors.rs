//! Per-variable color palette
//!
//! Colors are sampled evenly from the `rainbow` colormap over the sorted
//! distinct variable names, so the same variable set always maps to the
//! same colors.

use std::f64::consts::PI;

/// RGB components of the `rainbow` colormap at `x` in `[0, 1]`
#[must_use]
pub fn rainbow(x: f64) -> [f64; 3] {
    let x = x.clamp(0.0, 1.0);
    [
        (2.0 * x - 0.5).abs().clamp(0.0, 1.0),
        (PI * x).sin().clamp(0.0, 1.0),
        (PI * x / 2.0).cos().clamp(0.0, 1.0),
    ]
}

/// `#rrggbb` form of RGB components in `[0, 1]`
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn to_hex(rgb: [f64; 3]) -> String {
    let [r, g, b] = rgb.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    format!("#{r:02x}{g:02x}{b:02x}")
}

/// Sorted distinct variable names and one color per name
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn palette<'a>(variables: impl IntoIterator<Item = &'a str>) -> (Vec<String>, Vec<String>) {
    let mut domain: Vec<String> = variables.into_iter().map(str::to_string).collect();
    domain.sort_unstable();
    domain.dedup();

    let steps = domain.len().saturating_sub(1);
    let range = (0..domain.len())
        .map(|i| {
            let x = if steps == 0 { 0.0 } else { i as f64 / steps as f64 };
            to_hex(rainbow(x))
        })
        .collect();
    (domain, range)
}
