//! Preset regressions of price on sentiment.

use super::ols::{fit_ols, OlsFit};
use crate::align::AlignedDataset;
use crate::data::DataError;

/// Response and predictor columns of a regression over an aligned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub response: &'static str,
    pub predictors: &'static [&'static str],
}

/// `AdjClose ~ const + Open + Compound + Polarity`
pub const NEWS_MODEL: ModelSpec = ModelSpec {
    response: "AdjClose",
    predictors: &["Open", "Compound", "Polarity"],
};

/// `AdjClose ~ const + Open + Compound`
pub const SOCIAL_MODEL: ModelSpec = ModelSpec {
    response: "AdjClose",
    predictors: &["Open", "Compound"],
};

/// Fit `spec` on an aligned table that has at least the usable row count.
pub fn fit_aligned(aligned: &AlignedDataset, spec: &ModelSpec) -> Result<OlsFit, DataError> {
    aligned.ensure_usable()?;
    let y = aligned.column(spec.response)?;
    let xs = spec
        .predictors
        .iter()
        .map(|name| aligned.column(name))
        .collect::<Result<Vec<_>, _>>()?;
    let predictors: Vec<(&str, &[f64])> = spec
        .predictors
        .iter()
        .zip(&xs)
        .map(|(name, x)| (*name, x.as_slice()))
        .collect();
    fit_ols(&predictors, (spec.response, y.as_slice()))
}

pub fn news_model(aligned: &AlignedDataset) -> Result<OlsFit, DataError> {
    fit_aligned(aligned, &NEWS_MODEL)
}

pub fn social_model(aligned: &AlignedDataset) -> Result<OlsFit, DataError> {
    fit_aligned(aligned, &SOCIAL_MODEL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{align, DailyTable};
    use chrono::NaiveDate;

    fn table(columns: &[&str], rows: &[Vec<f64>]) -> DailyTable {
        let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        DailyTable::from_rows(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .enumerate()
                .map(|(i, r)| (start + chrono::Duration::days(i as i64), r.clone()))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn social_model_on_aligned_table() {
        let price = table(
            &["Open", "AdjClose"],
            &[
                vec![10.0, 10.5],
                vec![11.0, 11.2],
                vec![10.5, 10.4],
                vec![12.0, 12.6],
                vec![12.5, 12.4],
                vec![13.0, 13.3],
            ],
        );
        let posts = table(
            &["Compound", "Polarity"],
            &[
                vec![0.2, 0.2],
                vec![0.1, 0.1],
                vec![-0.3, -0.3],
                vec![0.5, 0.5],
                vec![-0.1, -0.1],
                vec![0.0, 0.0],
            ],
        );
        let aligned = align(&[("price", &price), ("posts", &posts)]).unwrap();
        let fit = social_model(&aligned).unwrap();
        let names: Vec<&str> = fit.coefficients.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["const", "Open", "Compound"]);
        assert_eq!(fit.n_obs, 6);
    }

    #[test]
    fn small_tables_are_rejected_before_fitting() {
        let price = table(&["Open", "AdjClose"], &[vec![1.0, 1.0], vec![2.0, 2.5], vec![3.0, 2.9]]);
        let posts = table(&["Compound", "Polarity"], &[vec![0.1, 0.1], vec![0.2, 0.2], vec![0.0, 0.0]]);
        let aligned = align(&[("price", &price), ("posts", &posts)]).unwrap();
        assert!(matches!(
            news_model(&aligned),
            Err(DataError::InsufficientData { rows: 3, .. })
        ));
    }

    #[test]
    fn missing_sentiment_column_is_reported() {
        let price = table(
            &["Open", "AdjClose"],
            &[vec![1.0, 1.0], vec![2.0, 2.5], vec![3.0, 2.9], vec![4.0, 4.2]],
        );
        let aligned = align(&[("price", &price)]).unwrap();
        assert!(matches!(
            news_model(&aligned),
            Err(DataError::MissingColumn { .. })
        ));
    }
}
