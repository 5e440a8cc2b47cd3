// window.rs - Moving-average smoothing of per-column statistics

use crate::error::{Result, TrimError};

/// Replace every value with the mean of `[i - half_width, i + half_width]`
/// clipped to the valid range. Boundary windows are narrower; nothing is
/// padded or mirrored. A half-width of zero returns the input unchanged.
pub fn apply_window(values: &[f64], half_width: usize) -> Vec<f64> {
    if half_width == 0 || values.is_empty() {
        return values.to_vec();
    }

    let mut prefix = Vec::with_capacity(values.len() + 1);
    prefix.push(0.0);
    for value in values {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + value);
    }

    let last_index = values.len() - 1;
    (0..values.len())
        .map(|i| {
            let lo = i.saturating_sub(half_width);
            let hi = (i + half_width).min(last_index);
            (prefix[hi + 1] - prefix[lo]) / (hi - lo + 1) as f64
        })
        .collect()
}

/// Reject windows wider than a quarter of the columns
pub fn check_half_width(half_width: usize, columns: usize) -> Result<()> {
    if half_width > columns / 4 {
        return Err(TrimError::InfeasibleConfig(format!(
            "window half-width {} exceeds a quarter of the {} columns",
            half_width, columns
        )));
    }
    Ok(())
}
