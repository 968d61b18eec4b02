//! Windowed normalized cross-correlation.
//!
//! Pure functions with no I/O. Each lag is scored independently by a
//! Pearson correlation over the overlapping part of the two windows, with
//! both sides mean-centered on that overlap only.

/// Denominators below this are treated as a silent (zero-variance) overlap.
const MIN_DENOMINATOR: f64 = 1e-12;

/// Overlapping sub-ranges for `lag`, pairing `reference[i]` with `target[i - lag]`.
///
/// Both inputs are expected to have the same length (the analysis window).
/// Positive lags mean the target has to be delayed to line up.
pub fn overlap_at_lag<'a>(
    reference: &'a [f32],
    target: &'a [f32],
    lag: isize,
) -> (&'a [f32], &'a [f32]) {
    let window = reference.len().min(target.len());
    let shift = lag.unsigned_abs();
    if shift >= window {
        return (&[], &[]);
    }
    let n = window - shift;
    if lag >= 0 {
        (&reference[shift..shift + n], &target[..n])
    } else {
        (&reference[..n], &target[shift..shift + n])
    }
}

/// Pearson correlation of two equally long slices.
///
/// Returns 0 for empty inputs and for overlaps where either side has no
/// variance, so the result is never NaN.
pub fn pearson(a: &[f32], b: &[f32]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let (a, b) = (&a[..n], &b[..n]);

    let mean_a = a.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let mean_b = b.iter().map(|&x| x as f64).sum::<f64>() / n as f64;

    let mut dot = 0.0f64;
    let mut energy_a = 0.0f64;
    let mut energy_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        dot += dx * dy;
        energy_a += dx * dx;
        energy_b += dy * dy;
    }

    let denom = (energy_a * energy_b).sqrt();
    if !(denom > MIN_DENOMINATOR) {
        return 0.0;
    }
    (dot / denom).clamp(-1.0, 1.0)
}

/// Correlation value for every lag in `[-max_lag, max_lag]`.
///
/// The returned vector is indexed by `lag + max_lag`. Lags whose overlap is
/// shorter than `min_overlap` samples (or empty) score 0.
pub fn correlation_curve(
    reference: &[f32],
    target: &[f32],
    max_lag: usize,
    min_overlap: usize,
) -> Vec<f64> {
    let max_lag = max_lag as isize;
    let min_overlap = min_overlap.max(1);

    (-max_lag..=max_lag)
        .map(|lag| {
            let (r, t) = overlap_at_lag(reference, target, lag);
            if r.len() < min_overlap {
                0.0
            } else {
                pearson(r, t)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_for_positive_lag_skips_reference_head() {
        let reference = [0.0f32, 1.0, 2.0, 3.0, 4.0];
        let target = [10.0f32, 11.0, 12.0, 13.0, 14.0];
        let (r, t) = overlap_at_lag(&reference, &target, 2);
        assert_eq!(r, &[2.0f32, 3.0, 4.0]);
        assert_eq!(t, &[10.0f32, 11.0, 12.0]);
    }

    #[test]
    fn overlap_for_negative_lag_skips_target_head() {
        let reference = [0.0f32, 1.0, 2.0, 3.0, 4.0];
        let target = [10.0f32, 11.0, 12.0, 13.0, 14.0];
        let (r, t) = overlap_at_lag(&reference, &target, -1);
        assert_eq!(r, &[0.0f32, 1.0, 2.0, 3.0]);
        assert_eq!(t, &[11.0f32, 12.0, 13.0, 14.0]);
    }

    #[test]
    fn overlap_is_empty_beyond_window() {
        let data = [0.5f32; 4];
        let (r, t) = overlap_at_lag(&data, &data, 4);
        assert!(r.is_empty() && t.is_empty());
        let (r, _) = overlap_at_lag(&data, &data, -7);
        assert!(r.is_empty());
    }

    #[test]
    fn pearson_of_identical_signals_is_one() {
        let a: Vec<f32> = (0..200).map(|i| (i as f32 * 0.3).sin()).collect();
        assert!((pearson(&a, &a) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_ignores_dc_offset_and_gain() {
        let a: Vec<f32> = (0..200).map(|i| (i as f32 * 0.3).sin() * 0.4).collect();
        let b: Vec<f32> = a.iter().map(|x| x * 2.0 + 0.1).collect();
        assert!((pearson(&a, &b) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn pearson_of_inverted_signal_is_negative() {
        let a: Vec<f32> = (0..200).map(|i| (i as f32 * 0.3).sin()).collect();
        let b: Vec<f32> = a.iter().map(|x| -x).collect();
        assert!((pearson(&a, &b) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn pearson_of_silence_is_zero_not_nan() {
        let silence = vec![0.0f32; 128];
        let value = pearson(&silence, &silence);
        assert_eq!(value, 0.0);
        assert_eq!(pearson(&[], &[]), 0.0);
    }

    #[test]
    fn curve_has_one_value_per_lag() {
        let a: Vec<f32> = (0..100).map(|i| (i as f32 * 0.7).cos()).collect();
        let curve = correlation_curve(&a, &a, 10, 1);
        assert_eq!(curve.len(), 21);
        // Zero lag sits in the middle
        assert!((curve[10] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn short_overlaps_score_zero() {
        let a: Vec<f32> = (0..10).map(|i| i as f32 / 10.0).collect();
        let curve = correlation_curve(&a, &a, 9, 5);
        // Lag 9 leaves a single-sample overlap
        assert_eq!(curve[18], 0.0);
        assert_eq!(curve[0], 0.0);
    }
}
