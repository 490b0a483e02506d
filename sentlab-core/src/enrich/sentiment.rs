//! Sentiment score columns for a text column.

use tracing::debug;

use super::oracle::{SentimentOracle, SentimentScore};
use crate::data::{Column, DataError, Dataset, Value};

/// Columns appended by [`add_sentiment`], in order.
pub const SENTIMENT_COLUMNS: [&str; 6] = [
    "Subjectivity",
    "Polarity",
    "Compound",
    "Negative",
    "Neutral",
    "Positive",
];

fn pick(score: &SentimentScore, column: usize) -> f64 {
    match column {
        0 => score.subjectivity,
        1 => score.polarity,
        2 => score.intensity.compound,
        3 => score.intensity.neg,
        4 => score.intensity.neu,
        _ => score.intensity.pos,
    }
}

/// Score every row of `text_column` and append the sentiment columns.
///
/// Already-enriched datasets (both `Subjectivity` and `Compound` present)
/// are left alone and `false` is returned. Blank text scores as neutral
/// without consulting the oracle.
pub fn add_sentiment(
    dataset: &mut Dataset,
    text_column: &str,
    oracle: &dyn SentimentOracle,
) -> Result<bool, DataError> {
    if dataset.has_column("Subjectivity") && dataset.has_column("Compound") {
        return Ok(false);
    }

    let scores: Vec<SentimentScore> = dataset
        .texts(text_column)?
        .into_iter()
        .map(|text| {
            if text.trim().is_empty() {
                SentimentScore::NEUTRAL
            } else {
                oracle.score(text)
            }
        })
        .collect();

    let mut added = false;
    for (i, name) in SENTIMENT_COLUMNS.iter().enumerate() {
        if dataset.has_column(name) {
            continue;
        }
        let values = scores.iter().map(|s| Value::Number(pick(s, i))).collect();
        dataset.append_column(Column::number(*name), values)?;
        added = true;
    }
    debug!(key = %dataset.key(), rows = scores.len(), "scored sentiment");
    Ok(added)
}
