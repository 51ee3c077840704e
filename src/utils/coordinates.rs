use crate::error::{ProcessingError, Result};

/// Index of the axis value closest to `target`
///
/// Ties resolve to the lower index. NaN axis values are never selected.
///
/// # Examples
/// ```
/// use ocean_series::utils::nearest_index;
///
/// let axis = [20.125, 20.375, 20.625, 20.875, 21.125];
/// assert_eq!(nearest_index(&axis, 20.9).unwrap(), 3);
/// ```
pub fn nearest_index(axis: &[f64], target: f64) -> Result<usize> {
    if !target.is_finite() {
        return Err(ProcessingError::InvalidFormat(format!(
            "Target coordinate must be finite, got: {}",
            target
        )));
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, value) in axis.iter().enumerate() {
        if value.is_nan() {
            continue;
        }
        let distance = (value - target).abs();
        match best {
            Some((_, best_distance)) if distance >= best_distance => {}
            _ => best = Some((idx, distance)),
        }
    }

    best.map(|(idx, _)| idx).ok_or_else(|| {
        ProcessingError::MissingData("Coordinate axis has no usable values".to_string())
    })
}

/// Express a target longitude in the convention used by `axis`
///
/// Grids stored as 0..360 receive negative targets shifted by +360; grids stored
/// as -180..180 receive targets above 180 shifted by -360.
pub fn normalize_longitude(target: f64, axis: &[f64]) -> f64 {
    let max = axis.iter().copied().filter(|v| !v.is_nan()).fold(f64::NEG_INFINITY, f64::max);
    let min = axis.iter().copied().filter(|v| !v.is_nan()).fold(f64::INFINITY, f64::min);

    if max > 180.0 && target < 0.0 {
        target + 360.0
    } else if min < 0.0 && target > 180.0 {
        target - 360.0
    } else {
        target
    }
}
