//! Yahoo Finance price source.
//!
//! Fetches daily OHLCV bars from Yahoo's v8 chart API. Yahoo has no official
//! API and is subject to unannounced format changes; every field is optional
//! on the wire and missing structure maps to `ResponseFormatChanged`.
//!
//! A window that contains no trading day comes back either without
//! timestamps or with a "Data doesn't exist" error. Both are reported as an
//! empty bar list so the fetcher can turn them into `NoDataInRange`.

use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::http::HttpClient;
use super::provider::{DataError, PriceSource, RawBar};

const CHART_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

pub struct YahooPriceSource {
    http: HttpClient,
}

impl YahooPriceSource {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    fn chart(&self, ticker: &str, query: &[(&str, String)]) -> Result<ChartResponse, DataError> {
        let url = format!("{CHART_URL}/{ticker}");
        let reply = self.http.get(&url, query, None, ticker)?;
        match reply.json::<ChartResponse>(ticker) {
            Ok(chart) => Ok(chart),
            Err(_) if !reply.is_success() => Err(DataError::SourceUnavailable(format!(
                "HTTP {} for {ticker}",
                reply.status
            ))),
            Err(e) => Err(e),
        }
    }
}

/// Inclusive date range as chart API query parameters.
fn range_query(start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
    let start_ts = start.and_time(chrono::NaiveTime::default()).and_utc().timestamp();
    let end_ts = end
        .and_hms_opt(23, 59, 59)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or(start_ts);
    vec![
        ("period1", start_ts.to_string()),
        ("period2", end_ts.to_string()),
        ("interval", "1d".to_string()),
        ("includeAdjustedClose", "true".to_string()),
        ("events", "history".to_string()),
    ]
}

fn is_empty_window(err: &ChartError) -> bool {
    err.description.contains("Data doesn't exist") || err.description.contains("data missing")
}

/// Parse the chart API response into bars.
fn parse_bars(ticker: &str, resp: ChartResponse) -> Result<Vec<RawBar>, DataError> {
    let Some(result) = resp.chart.result else {
        return match resp.chart.error {
            Some(err) if is_empty_window(&err) => Ok(Vec::new()),
            Some(err) if err.code == "Not Found" => Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            }),
            Some(err) => Err(DataError::ResponseFormatChanged(format!(
                "{}: {}",
                err.code, err.description
            ))),
            None => Err(DataError::ResponseFormatChanged(
                "empty result with no error".into(),
            )),
        };
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;

    let Some(timestamps) = data.timestamp else {
        debug!(ticker, "chart response has no timestamps");
        return Ok(Vec::new());
    };

    let indicators = data
        .indicators
        .ok_or_else(|| DataError::ResponseFormatChanged("no indicators".into()))?;
    let quote = indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;
    let adj_closes = indicators
        .adjclose
        .and_then(|v| v.into_iter().next())
        .map(|a| a.adjclose);

    let mut bars = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .map(|dt| dt.naive_utc().date())
            .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {ts}")))?;

        let open = quote.open.get(i).copied().flatten();
        let high = quote.high.get(i).copied().flatten();
        let low = quote.low.get(i).copied().flatten();
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();

        // Holidays and halted sessions come back as all-null rows.
        if open.is_none() && high.is_none() && low.is_none() && close.is_none() && volume.is_none() {
            continue;
        }

        let close = close.unwrap_or(f64::NAN);
        let adj_close = adj_closes
            .as_ref()
            .and_then(|v| v.get(i).copied().flatten())
            .unwrap_or(close);

        bars.push(RawBar {
            date,
            open: open.unwrap_or(f64::NAN),
            high: high.unwrap_or(f64::NAN),
            low: low.unwrap_or(f64::NAN),
            close,
            adj_close,
            volume: volume.unwrap_or(0),
        });
    }

    Ok(bars)
}

impl PriceSource for YahooPriceSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError> {
        let chart = self.chart(ticker, &range_query(start, end))?;
        parse_bars(ticker, chart)
    }

    fn company_name(&self, ticker: &str) -> Result<Option<String>, DataError> {
        let query = [("range", "5d".to_string()), ("interval", "1d".to_string())];
        let chart = self.chart(ticker, &query)?;
        Ok(chart
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .and_then(|d| d.meta)
            .and_then(|m| m.long_name.or(m.short_name)))
    }
}
