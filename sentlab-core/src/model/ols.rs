//! Ordinary least squares with inference statistics.
//!
//! The design matrix is `[1, x_1, ..., x_k]`. Coefficients come from an SVD
//! solve (tall matrices are the normal case); standard errors use
//! `σ² (XᵀX)⁻¹`. Rank deficiency is detected on the singular values before
//! anything is solved, so a collinear design fails as `DegenerateModel`
//! instead of producing meaningless numbers.

use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};
use std::fmt::Write as _;

use crate::align::MIN_USABLE_ROWS;
use crate::data::DataError;

/// Name of the intercept term.
pub const INTERCEPT: &str = "const";

/// Singular values below this fraction of the largest count as zero.
const RANK_TOLERANCE: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub struct Coefficient {
    pub name: String,
    pub estimate: f64,
    pub std_error: f64,
    pub t_value: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    pub response: String,
    /// Intercept first, then predictors in the order given.
    pub coefficients: Vec<Coefficient>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub n_obs: usize,
    pub df_model: usize,
    pub df_resid: usize,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    pub f_p_value: f64,
}

impl OlsFit {
    pub fn coefficient(&self, name: &str) -> Option<&Coefficient> {
        self.coefficients.iter().find(|c| c.name == name)
    }

    /// Plain-text regression report.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(72);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "{:^72}", "OLS Regression Results");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(
            out,
            "Dep. Variable: {:<20} R-squared:          {:>10.4}",
            self.response, self.r_squared
        );
        let _ = writeln!(
            out,
            "No. Observations: {:<17} Adj. R-squared:     {:>10.4}",
            self.n_obs, self.adj_r_squared
        );
        let _ = writeln!(
            out,
            "Df Residuals: {:<21} F-statistic:        {:>10.4}",
            self.df_resid, self.f_statistic
        );
        let _ = writeln!(
            out,
            "Df Model: {:<25} Prob (F-statistic): {:>10.4}",
            self.df_model, self.f_p_value
        );
        let _ = writeln!(out, "{}", "-".repeat(72));
        let _ = writeln!(
            out,
            "{:<16}{:>14}{:>14}{:>14}{:>14}",
            "", "coef", "std err", "t", "P>|t|"
        );
        let _ = writeln!(out, "{}", "-".repeat(72));
        for c in &self.coefficients {
            let _ = writeln!(
                out,
                "{:<16}{:>14.4}{:>14.4}{:>14.3}{:>14.3}",
                c.name, c.estimate, c.std_error, c.t_value, c.p_value
            );
        }
        let _ = write!(out, "{rule}");
        out
    }
}

/// Fit `response ~ const + predictors`.
///
/// Rows with a non-finite value in any used column are dropped first. Fewer
/// than [`MIN_USABLE_ROWS`] remaining rows, or no more rows than parameters,
/// is `InsufficientData`.
pub fn fit_ols(
    predictors: &[(&str, &[f64])],
    response: (&str, &[f64]),
) -> Result<OlsFit, DataError> {
    let (response_name, y_all) = response;
    if predictors.is_empty() {
        return Err(DataError::InvalidInput("at least one predictor is required".into()));
    }
    if let Some((name, _)) = predictors.iter().find(|(_, x)| x.len() != y_all.len()) {
        return Err(DataError::InvalidInput(format!(
            "predictor '{name}' has a different length than '{response_name}'"
        )));
    }

    let keep: Vec<usize> = (0..y_all.len())
        .filter(|&i| y_all[i].is_finite() && predictors.iter().all(|(_, x)| x[i].is_finite()))
        .collect();

    let n = keep.len();
    let p = predictors.len() + 1;
    let required = MIN_USABLE_ROWS.max(p + 1);
    if n < required {
        return Err(DataError::InsufficientData { rows: n, required });
    }

    let x = DMatrix::from_fn(n, p, |r, c| {
        if c == 0 {
            1.0
        } else {
            predictors[c - 1].1[keep[r]]
        }
    });
    let y = DVector::from_iterator(n, keep.iter().map(|&i| y_all[i]));

    let svd = x.clone().svd(true, true);
    let max_sv = svd.singular_values.iter().copied().fold(0.0, f64::max);
    let tol = max_sv * RANK_TOLERANCE;
    if svd.rank(tol) < p {
        return Err(DataError::DegenerateModel(
            "predictors are collinear or constant".into(),
        ));
    }
    let beta = svd
        .solve(&y, tol)
        .map_err(|e| DataError::DegenerateModel(e.to_string()))?;
    let xtx_inv = (x.transpose() * &x)
        .try_inverse()
        .ok_or_else(|| DataError::DegenerateModel("XᵀX is not invertible".into()))?;

    let fitted = &x * &beta;
    let residuals = &y - &fitted;
    let ssr = residuals.norm_squared();
    let y_mean = y.mean();
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();

    let df_model = p - 1;
    let df_resid = n - p;
    let sigma2 = ssr / df_resid as f64;

    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { f64::NAN };
    let adj_r_squared = 1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64;

    let t_dist = StudentsT::new(0.0, 1.0, df_resid as f64)
        .map_err(|e| DataError::DegenerateModel(e.to_string()))?;
    let names = std::iter::once(INTERCEPT).chain(predictors.iter().map(|(name, _)| *name));
    let coefficients = names
        .enumerate()
        .map(|(j, name)| {
            let estimate = beta[j];
            let std_error = (sigma2 * xtx_inv[(j, j)]).sqrt();
            let t_value = estimate / std_error;
            let p_value = if t_value.is_nan() {
                f64::NAN
            } else {
                2.0 * (1.0 - t_dist.cdf(t_value.abs()))
            };
            Coefficient {
                name: name.to_string(),
                estimate,
                std_error,
                t_value,
                p_value,
            }
        })
        .collect();

    let f_statistic = ((sst - ssr) / df_model as f64) / sigma2;
    let f_p_value = FisherSnedecor::new(df_model as f64, df_resid as f64)
        .map(|f| {
            if f_statistic.is_nan() {
                f64::NAN
            } else {
                1.0 - f.cdf(f_statistic)
            }
        })
        .map_err(|e| DataError::DegenerateModel(e.to_string()))?;

    Ok(OlsFit {
        response: response_name.to_string(),
        coefficients,
        fitted: fitted.iter().copied().collect(),
        residuals: residuals.iter().copied().collect(),
        n_obs: n,
        df_model,
        df_resid,
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_exact_linear_relation() {
        // y = 2 + 3x with a tiny wobble so sigma is non-zero.
        let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        let y: Vec<f64> = x
            .iter()
            .enumerate()
            .map(|(i, v)| 2.0 + 3.0 * v + if i % 2 == 0 { 0.01 } else { -0.01 })
            .collect();
        let fit = fit_ols(&[("x", &x[..])], ("y", &y[..])).unwrap();

        let c = fit.coefficient(INTERCEPT).unwrap();
        assert!((c.estimate - 2.0).abs() < 0.05);
        let slope = fit.coefficient("x").unwrap();
        assert!((slope.estimate - 3.0).abs() < 0.01);
        assert!(slope.p_value < 1e-6);
        assert!(fit.r_squared > 0.999);
        assert!(fit.f_p_value < 1e-6);
        assert_eq!((fit.n_obs, fit.df_model, fit.df_resid), (6, 1, 4));
        assert_eq!(fit.residuals.len(), 6);
    }

    #[test]
    fn matches_hand_computed_statistics() {
        // x = [1,2,3,4], y = [1,3,2,4]: slope 0.8, intercept 0.5, R² 0.64.
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 4.0];
        let fit = fit_ols(&[("x", &x[..])], ("y", &y[..])).unwrap();
        assert!((fit.coefficients[0].estimate - 0.5).abs() < 1e-10);
        assert!((fit.coefficients[1].estimate - 0.8).abs() < 1e-10);
        assert!((fit.r_squared - 0.64).abs() < 1e-10);
        // SSR = 1.8, sigma² = 0.9, Sxx = 5 -> se(slope) = sqrt(0.18).
        assert!((fit.coefficients[1].std_error - 0.18f64.sqrt()).abs() < 1e-10);
        // F = 3.2 / 0.9
        assert!((fit.f_statistic - 3.2 / 0.9).abs() < 1e-9);
    }

    #[test]
    fn three_rows_is_insufficient() {
        let x = [1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 4.0];
        assert!(matches!(
            fit_ols(&[("x", &x[..])], ("y", &y[..])),
            Err(DataError::InsufficientData { rows: 3, .. })
        ));
    }

    #[test]
    fn non_finite_rows_are_dropped_before_counting() {
        let x = [1.0, 2.0, f64::NAN, 4.0, 5.0];
        let y = [1.0, 2.0, 3.0, f64::INFINITY, 5.0];
        assert!(matches!(
            fit_ols(&[("x", &x[..])], ("y", &y[..])),
            Err(DataError::InsufficientData { rows: 3, .. })
        ));
    }

    #[test]
    fn rows_must_exceed_parameters() {
        let a = [1.0, 2.0, 3.0, 4.0];
        let b = [4.0, 1.0, 3.0, 2.0];
        let c = [0.5, 0.1, 0.9, 0.3];
        let y = [1.0, 2.0, 3.0, 5.0];
        assert!(matches!(
            fit_ols(&[("a", &a[..]), ("b", &b[..]), ("c", &c[..])], ("y", &y[..])),
            Err(DataError::InsufficientData { rows: 4, required: 5 })
        ));
    }

    #[test]
    fn collinear_design_is_degenerate() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let twice: Vec<f64> = x.iter().map(|v| v * 2.0).collect();
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        assert!(matches!(
            fit_ols(&[("x", &x[..]), ("twice", &twice[..])], ("y", &y[..])),
            Err(DataError::DegenerateModel(_))
        ));

        let constant = [7.0; 5];
        assert!(matches!(
            fit_ols(&[("k", &constant[..])], ("y", &y[..])),
            Err(DataError::DegenerateModel(_))
        ));
    }

    #[test]
    fn summary_lists_every_term() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [1.0, 3.0, 2.0, 5.0, 4.0];
        let summary = fit_ols(&[("Open", &x[..])], ("AdjClose", &y[..])).unwrap().summary();
        assert!(summary.contains("OLS Regression Results"));
        assert!(summary.contains("AdjClose"));
        assert!(summary.contains("const"));
        assert!(summary.contains("Open"));
    }
}
