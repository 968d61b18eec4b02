//! Peak fitting for sub-sample accuracy.
//!
//! Uses quadratic (parabolic) interpolation around the discrete peak of a
//! correlation curve to find the true peak position between samples.

/// Largest correction, in samples, that the fit may apply.
const MAX_DELTA: f64 = 0.5;

/// Curvature below which the three points are treated as collinear.
const MIN_CURVATURE: f64 = 1e-12;

/// Outcome of refining a discrete peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakFit {
    /// Index of the discrete maximum.
    pub index: usize,
    /// Fractional correction relative to `index`, in `[-0.5, 0.5]`.
    pub delta: f64,
    /// Correlation value at the discrete maximum.
    pub value: f64,
    /// Whether interpolation was applied.
    pub interpolated: bool,
}

impl PeakFit {
    /// Refined peak position in index units.
    pub fn position(&self) -> f64 {
        self.index as f64 + self.delta
    }
}

/// Index of the first maximum; `None` for an empty slice.
///
/// NaN values never win.
pub fn find_peak(correlation: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in correlation.iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Apply quadratic peak fitting around `peak_index`.
///
/// Falls back to the discrete peak at either boundary of the curve or when
/// the neighbourhood is flat. `None` when `peak_index` is out of range.
pub fn fit_peak(correlation: &[f64], peak_index: usize) -> Option<PeakFit> {
    let value = *correlation.get(peak_index)?;
    let discrete = PeakFit {
        index: peak_index,
        delta: 0.0,
        value,
        interpolated: false,
    };

    // Need neighbors for interpolation
    if peak_index == 0 || peak_index + 1 >= correlation.len() {
        return Some(discrete);
    }

    let y0 = correlation[peak_index - 1];
    let y1 = value;
    let y2 = correlation[peak_index + 1];

    // y = ax^2 + bx + c through x = -1, 0, 1:
    //   a = (y0 + y2)/2 - y1, b = (y2 - y0)/2, vertex at -b/(2a)
    let a = (y0 + y2) / 2.0 - y1;
    let b = (y2 - y0) / 2.0;

    if a.abs() < MIN_CURVATURE || !a.is_finite() || !b.is_finite() {
        return Some(discrete);
    }

    let delta = (-b / (2.0 * a)).clamp(-MAX_DELTA, MAX_DELTA);

    Some(PeakFit {
        delta,
        interpolated: true,
        ..discrete
    })
}

/// Find the peak in a correlation curve and refine it.
pub fn find_and_fit_peak(correlation: &[f64]) -> Option<PeakFit> {
    find_peak(correlation).and_then(|idx| fit_peak(correlation, idx))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peak_fit_on_perfect_parabola() {
        // y = 1 - (x - 5.3)^2 has its vertex 0.3 samples right of index 5
        let correlation: Vec<f64> = (0..11)
            .map(|i| {
                let x = i as f64 - 5.3;
                1.0 - x * x
            })
            .collect();

        let fit = find_and_fit_peak(&correlation).unwrap();

        assert_eq!(fit.index, 5);
        assert!(
            (fit.position() - 5.3).abs() < 1e-9,
            "Expected 5.3, got {}",
            fit.position()
        );
        assert!(fit.interpolated);
    }

    #[test]
    fn peak_fit_symmetric_peak() {
        let correlation = vec![0.5, 0.8, 1.0, 0.8, 0.5];
        let fit = fit_peak(&correlation, 2).unwrap();
        assert!(fit.delta.abs() < 1e-12);
    }

    #[test]
    fn peak_fit_asymmetric_peak() {
        // a = (0.6 + 0.8)/2 - 1.0 = -0.3, b = 0.1, delta = 0.1/0.6
        let correlation = vec![0.3, 0.6, 1.0, 0.8, 0.4];
        let fit = fit_peak(&correlation, 2).unwrap();
        assert!((fit.delta - 1.0 / 6.0).abs() < 1e-9);
    }

    #[test]
    fn peak_fit_at_edge_returns_discrete() {
        let correlation = vec![1.0, 0.8, 0.5, 0.3];
        let fit = fit_peak(&correlation, 0).unwrap();
        assert_eq!(fit.index, 0);
        assert_eq!(fit.delta, 0.0);
        assert!(!fit.interpolated);

        let rising = vec![0.1, 0.2, 0.3];
        assert!(!fit_peak(&rising, 2).unwrap().interpolated);
    }

    #[test]
    fn collinear_neighbourhood_skips_interpolation() {
        let flat = vec![0.7, 0.7, 0.7];
        let fit = fit_peak(&flat, 1).unwrap();
        assert!(!fit.interpolated);
        assert_eq!(fit.position(), 1.0);
    }

    #[test]
    fn correction_is_clamped() {
        // Peak index forced onto a point that is not the true maximum
        let correlation = vec![0.0, 0.1, 1.0];
        let fit = fit_peak(&correlation, 1).unwrap();
        assert!(fit.delta <= 0.5 && fit.delta >= -0.5);
    }

    #[test]
    fn out_of_range_index_has_no_fit() {
        assert_eq!(fit_peak(&[0.2, 0.9, 0.4], 3), None);
        assert_eq!(fit_peak(&[], 0), None);
    }

    #[test]
    fn find_peak_prefers_first_maximum() {
        assert_eq!(find_peak(&[0.2, 0.9, 0.4, 0.9]), Some(1));
        assert_eq!(find_peak(&[0.0, 0.0, 0.0]), Some(0));
        assert_eq!(find_peak(&[f64::NAN, 0.1]), Some(1));
        assert_eq!(find_peak(&[]), None);
    }
}
