//! Simple Moving Average (SMA).
//!
//! Rolling mean over a lookback window.
//! Lookback: period - 1 (first valid value at index period-1).

use crate::data::DataError;

#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    name: String,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, DataError> {
        if period == 0 {
            return Err(DataError::InvalidInput("SMA period must be >= 1".into()));
        }
        Ok(Self {
            period,
            name: format!("SMA{period}"),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    /// One value per input; NaN until the window fills and wherever the
    /// window holds a NaN.
    pub fn compute(&self, values: &[f64]) -> Vec<f64> {
        let n = values.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        let mut sum: f64 = values[..self.period].iter().sum();
        let mut nan_in_window = values[..self.period].iter().any(|v| v.is_nan());
        if !nan_in_window {
            result[self.period - 1] = sum / self.period as f64;
        }

        for i in self.period..n {
            let leaving = values[i - self.period];
            let entering = values[i];
            sum = sum - leaving + entering;

            // A NaN poisons the running sum; rescan the window instead.
            if entering.is_nan() || leaving.is_nan() || nan_in_window {
                let window = &values[(i + 1 - self.period)..=i];
                nan_in_window = window.iter().any(|v| v.is_nan());
                sum = window.iter().sum();
                if nan_in_window {
                    continue;
                }
            }

            result[i] = sum / self.period as f64;
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-10,
            "actual={actual}, expected={expected}"
        );
    }

    #[test]
    fn sma_5_basic() {
        let result = Sma::new(5)
            .unwrap()
            .compute(&[10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);

        assert_eq!(result.len(), 7);
        for (i, v) in result.iter().enumerate().take(4) {
            assert!(v.is_nan(), "expected NaN at index {i}");
        }
        assert_approx(result[4], 12.0);
        assert_approx(result[5], 13.0);
        assert_approx(result[6], 14.0);
    }

    #[test]
    fn sma_1_is_identity() {
        let result = Sma::new(1).unwrap().compute(&[100.0, 200.0, 300.0]);
        assert_eq!(result, vec![100.0, 200.0, 300.0]);
    }

    #[test]
    fn sma_nan_propagation() {
        let result = Sma::new(3)
            .unwrap()
            .compute(&[10.0, 11.0, f64::NAN, 13.0, 14.0, 15.0]);
        assert!(result[2].is_nan());
        assert!(result[3].is_nan());
        assert!(result[4].is_nan());
        assert_approx(result[5], 14.0);
    }

    #[test]
    fn sma_lookback_and_name() {
        let sma = Sma::new(20).unwrap();
        assert_eq!(sma.lookback(), 19);
        assert_eq!(sma.name(), "SMA20");
        assert!(Sma::new(0).is_err());
    }

    #[test]
    fn sma_too_few_values() {
        let result = Sma::new(5).unwrap().compute(&[10.0, 11.0]);
        assert!(result.iter().all(|v| v.is_nan()));
    }
}
