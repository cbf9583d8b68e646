//! Summary and rolling statistics
//!
//! Standard deviations are population standard deviations (divide by `n`).
//! NaN readings are not skipped: any window containing a NaN yields NaN.

/// Arithmetic mean; NaN for an empty slice
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Population standard deviation; NaN for an empty slice
pub fn std_dev(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let m = mean(data);
    let variance = data.iter().map(|x| (x - m).powi(2)).sum::<f64>() / data.len() as f64;
    variance.sqrt()
}

/// Median using a total order, so NaN sorts last instead of panicking
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return f64::NAN;
    }
    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Trailing rolling mean; the first `window - 1` entries are NaN
pub fn rolling_mean(data: &[f64], window: usize) -> Vec<f64> {
    rolling(data, window, mean)
}

/// Trailing rolling standard deviation; the first `window - 1` entries are NaN
pub fn rolling_std(data: &[f64], window: usize) -> Vec<f64> {
    rolling(data, window, std_dev)
}

fn rolling(data: &[f64], window: usize, stat: fn(&[f64]) -> f64) -> Vec<f64> {
    if window == 0 || data.len() < window {
        return vec![f64::NAN; data.len()];
    }

    let mut result = vec![f64::NAN; window - 1];
    result.extend(data.windows(window).map(stat));
    result
}

/// Simple moving average of length `window`; output has
/// `data.len() - window + 1` entries (empty if the data is shorter).
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || data.len() < window {
        return Vec::new();
    }
    data.windows(window).map(mean).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_rolling_mean() {
        let data = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let result = rolling_mean(&data, 3);

        assert!(result[0].is_nan());
        assert!(result[1].is_nan());
        assert_abs_diff_eq!(result[2], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(result[3], 3.0, epsilon = 1e-10);
        assert_abs_diff_eq!(result[4], 4.0, epsilon = 1e-10);
    }

    #[test]
    fn test_rolling_std_matches_population_std() {
        let data = vec![2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let result = rolling_std(&data, 8);
        assert_abs_diff_eq!(result[7], 2.0, epsilon = 1e-10);
        assert_abs_diff_eq!(std_dev(&data), 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_nan_leaves_the_window() {
        let data = vec![1.0, f64::NAN, 3.0, 4.0, 5.0];
        let result = rolling_mean(&data, 2);
        assert!(result[1].is_nan());
        assert!(result[2].is_nan());
        assert_abs_diff_eq!(result[3], 3.5, epsilon = 1e-10);
    }

    #[test]
    fn test_window_longer_than_data() {
        let result = rolling_std(&[1.0, 2.0], 5);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_median_even_and_odd() {
        assert_abs_diff_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
        assert_abs_diff_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
        assert!(median(&[]).is_nan());
    }

    #[test]
    fn test_moving_average_length() {
        let ma = moving_average(&[1.0, 2.0, 3.0, 4.0], 2);
        assert_eq!(ma, vec![1.5, 2.5, 3.5]);
        assert!(moving_average(&[1.0], 2).is_empty());
    }
}
