//! Local weighted regression on an evenly spaced grid
//!
//! Tricube neighbourhood weights, optionally multiplied by robustness
//! weights, with a local constant (degree 0) or local linear (degree 1)
//! fit. Positions are sample indices, so a fit may be evaluated just
//! outside the data (used to extend cycle-subseries by one period).

/// Evaluate the local fit at position `xs` using points `left..=right`.
///
/// `span` is the nominal neighbourhood size; when it exceeds the number of
/// points the bandwidth is widened accordingly. Returns `None` when every
/// neighbour has zero weight.
pub(crate) fn local_fit(
    y: &[f64],
    span: usize,
    degree: usize,
    xs: f64,
    left: usize,
    right: usize,
    robustness: Option<&[f64]>,
) -> Option<f64> {
    let n = y.len();
    let range = (right - left) as f64;

    let mut h = (xs - left as f64).max(right as f64 - xs);
    if span > n {
        h += ((span - n) / 2) as f64;
    }
    let h9 = 0.999 * h;
    let h1 = 0.001 * h;

    let mut weights = Vec::with_capacity(right - left + 1);
    let mut total = 0.0;
    for j in left..=right {
        let r = (j as f64 - xs).abs();
        let w = if r <= h9 {
            let w = if r <= h1 {
                1.0
            } else {
                (1.0 - (r / h).powi(3)).powi(3)
            };
            let w = match robustness {
                Some(rw) => w * rw[j],
                None => w,
            };
            total += w;
            w
        } else {
            0.0
        };
        weights.push(w);
    }

    if total <= 0.0 {
        return None;
    }

    for w in weights.iter_mut() {
        *w /= total;
    }

    if h > 0.0 && degree > 0 {
        let center: f64 = weights
            .iter()
            .enumerate()
            .map(|(k, w)| w * (left + k) as f64)
            .sum();
        let spread: f64 = weights
            .iter()
            .enumerate()
            .map(|(k, w)| w * ((left + k) as f64 - center).powi(2))
            .sum();

        if spread.sqrt() > 0.001 * range {
            let slope = (xs - center) / spread;
            for (k, w) in weights.iter_mut().enumerate() {
                *w *= slope * ((left + k) as f64 - center) + 1.0;
            }
        }
    }

    Some(
        weights
            .iter()
            .zip(&y[left..=right])
            .map(|(w, v)| w * v)
            .sum(),
    )
}

/// Smooth every point of `y` with a sliding neighbourhood of `span` points.
///
/// Points whose neighbourhood carries no weight keep their input value.
pub(crate) fn smooth(y: &[f64], span: usize, degree: usize, robustness: Option<&[f64]>) -> Vec<f64> {
    let n = y.len();
    if n < 2 {
        return y.to_vec();
    }

    let mut out = Vec::with_capacity(n);

    if span >= n {
        for i in 0..n {
            let fit = local_fit(y, span, degree, i as f64, 0, n - 1, robustness);
            out.push(fit.unwrap_or(y[i]));
        }
        return out;
    }

    let half = (span + 1) / 2;
    let mut left = 0;
    let mut right = span - 1;

    for i in 0..n {
        if i + 1 > half && right != n - 1 {
            left += 1;
            right += 1;
        }
        let fit = local_fit(y, span, degree, i as f64, left, right, robustness);
        out.push(fit.unwrap_or(y[i]));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_linear_data_is_reproduced() {
        let y: Vec<f64> = (0..30).map(|i| 2.0 + 0.5 * i as f64).collect();
        let smoothed = smooth(&y, 7, 1, None);
        for (a, b) in y.iter().zip(&smoothed) {
            assert_abs_diff_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_constant_with_degree_zero() {
        let y = vec![3.0; 10];
        let smoothed = smooth(&y, 5, 0, None);
        assert!(smoothed.iter().all(|v| (v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn test_extrapolation_outside_grid() {
        let y: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let before = local_fit(&y, 7, 1, -1.0, 0, 5, None).unwrap();
        let after = local_fit(&y, 7, 1, 6.0, 0, 5, None).unwrap();
        assert_abs_diff_eq!(before, -1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(after, 6.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_robustness_weights_fall_back() {
        let y = vec![1.0, 2.0, 3.0];
        let rw = vec![0.0; 3];
        assert!(local_fit(&y, 3, 1, 1.0, 0, 2, Some(&rw)).is_none());
        assert_eq!(smooth(&y, 3, 1, Some(&rw)), y);
    }

    #[test]
    fn test_downweighted_outlier_is_ignored() {
        let mut y = vec![1.0; 9];
        y[4] = 100.0;
        let mut rw = vec![1.0; 9];
        rw[4] = 0.0;
        let fit = local_fit(&y, 9, 1, 4.0, 0, 8, Some(&rw)).unwrap();
        assert_abs_diff_eq!(fit, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_nan_propagates() {
        let mut y = vec![1.0; 9];
        y[4] = f64::NAN;
        let smoothed = smooth(&y, 3, 1, None);
        assert!(smoothed[4].is_nan());
        assert!(!smoothed[0].is_nan());
    }
}
