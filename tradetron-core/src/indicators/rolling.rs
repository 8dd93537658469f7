//! Trailing-window and exponential smoothing primitives over `f64` columns.
//!
//! Conventions shared by every helper:
//! - Output has the same length as the input.
//! - A window that is not yet full, or that contains a NaN, yields NaN.
//! - Output at index `i` only reads inputs at `0..=i`.

/// Apply `f` to every full trailing window of `window` values.
pub fn rolling_apply(values: &[f64], window: usize, f: impl Fn(&[f64]) -> f64) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if window == 0 || n < window {
        return result;
    }

    for i in (window - 1)..n {
        let slice = &values[(i + 1 - window)..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        result[i] = f(slice);
    }
    result
}

pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().sum())
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().sum::<f64>() / w.len() as f64)
}

pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        w.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Population standard deviation (divide by N).
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling_apply(values, window, |w| {
        let mean = w.iter().sum::<f64>() / w.len() as f64;
        let variance = w.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / w.len() as f64;
        variance.sqrt()
    })
}

/// Recursive exponential smoothing `y[t] = alpha * x[t] + (1 - alpha) * y[t-1]`.
///
/// Leading NaNs are skipped and the first finite input seeds the recursion.
/// Output is NaN until `min_periods` inputs have been observed. A NaN after
/// the seed yields NaN at that row and leaves the state unchanged.
pub fn ewm(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    let mut state: Option<f64> = None;
    let mut observed = 0usize;

    for (i, &x) in values.iter().enumerate() {
        if x.is_nan() {
            continue;
        }
        let next = match state {
            None => x,
            Some(prev) => alpha * x + (1.0 - alpha) * prev,
        };
        state = Some(next);
        observed += 1;
        if observed >= min_periods.max(1) {
            result[i] = next;
        }
    }
    result
}

/// Smoothing factor for a span: `2 / (span + 1)`.
pub fn span_alpha(span: usize) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// `values[t] - values[t-1]`; NaN at index 0.
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut result = vec![f64::NAN; values.len()];
    for i in 1..values.len() {
        result[i] = values[i] - values[i - 1];
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, DEFAULT_EPSILON};

    #[test]
    fn rolling_mean_warmup_and_values() {
        let r = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 3);
        assert!(r[0].is_nan() && r[1].is_nan());
        assert_approx(r[2], 2.0, DEFAULT_EPSILON);
        assert_approx(r[3], 3.0, DEFAULT_EPSILON);
    }

    #[test]
    fn nan_in_window_poisons_only_that_window() {
        let r = rolling_sum(&[1.0, f64::NAN, 3.0, 4.0, 5.0], 2);
        assert!(r[1].is_nan());
        assert!(r[2].is_nan());
        assert_approx(r[3], 7.0, DEFAULT_EPSILON);
        assert_approx(r[4], 9.0, DEFAULT_EPSILON);
    }

    #[test]
    fn rolling_extremes() {
        let v = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert_eq!(rolling_min(&v, 3)[2..], [1.0, 1.0, 1.0]);
        assert_eq!(rolling_max(&v, 3)[2..], [4.0, 4.0, 5.0]);
    }

    #[test]
    fn population_std() {
        // mean 5, squared deviations 9,1,1,1,0,0,4,16 → var 4
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_approx(rolling_std(&v, 8)[7], 2.0, DEFAULT_EPSILON);
    }

    #[test]
    fn ewm_seeds_with_first_value() {
        let r = ewm(&[10.0, 20.0, 30.0], 0.5, 1);
        assert_approx(r[0], 10.0, DEFAULT_EPSILON);
        assert_approx(r[1], 15.0, DEFAULT_EPSILON);
        assert_approx(r[2], 22.5, DEFAULT_EPSILON);
    }

    #[test]
    fn ewm_skips_leading_nan_and_honours_min_periods() {
        let r = ewm(&[f64::NAN, f64::NAN, 10.0, 20.0, 30.0], 0.5, 2);
        assert!(r[..3].iter().all(|v| v.is_nan()));
        assert_approx(r[3], 15.0, DEFAULT_EPSILON);
        assert_approx(r[4], 22.5, DEFAULT_EPSILON);
    }

    #[test]
    fn diff_first_is_nan() {
        let d = diff(&[1.0, 4.0, 2.0]);
        assert!(d[0].is_nan());
        assert_eq!(d[1..], [3.0, -2.0]);
    }
}
