//! External source traits and structured error types.
//!
//! Each source trait abstracts over one upstream (Yahoo Finance, a news site,
//! a social search API, a profile page) so fetchers can be exercised against
//! stubs. Sources know nothing about the cache; fetchers sit above them and
//! route every request through a [`DatasetStore`](super::store::DatasetStore).

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raw daily OHLCV bar as reported by a price source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: u64,
}

/// A headline as it appears on a listing page.
///
/// `elapsed` is the relative age printed next to the headline ("15m", "2h",
/// "3d"). It is only meaningful together with the moment the page was read.
#[derive(Debug, Clone, PartialEq)]
pub struct RawHeadline {
    pub title: String,
    pub elapsed: String,
}

/// One listing page together with the wall-clock moment it was retrieved.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlinePage {
    pub retrieved_at: NaiveDateTime,
    pub items: Vec<RawHeadline>,
}

/// A social post as returned by a search source, before text cleaning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPost {
    pub created_at: NaiveDateTime,
    pub text: String,
}

/// Structured error type for every core operation.
///
/// Designed to be displayable directly by a front-end.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("no cached dataset for key '{key}'")]
    NotFound { key: String },

    #[error("no data for {ticker} in the requested window: {detail}")]
    NoDataInRange { ticker: String, detail: String },

    #[error("not enough data to analyze: {rows} usable rows, need at least {required}")]
    InsufficientData { rows: usize, required: usize },

    #[error("source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("authentication required: {0}")]
    AuthenticationRequired(String),

    #[error("invalid dataset key: {0}")]
    InvalidKey(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("missing column '{column}'")]
    MissingColumn { column: String },

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("degenerate model: {0}")]
    DegenerateModel(String),
}

impl DataError {
    /// True for every failure that originates in an external source.
    pub fn is_source_failure(&self) -> bool {
        matches!(
            self,
            DataError::SourceUnavailable(_)
                | DataError::RateLimited { .. }
                | DataError::CircuitBreakerTripped
                | DataError::SymbolNotFound { .. }
                | DataError::ResponseFormatChanged(_)
                | DataError::AuthenticationRequired(_)
        )
    }
}

/// Daily price history source.
pub trait PriceSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Daily bars for `[start, end]`. Non-trading days yield no bar; an empty
    /// vector means the whole window had nothing.
    fn daily_bars(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawBar>, DataError>;

    /// Long company name for a ticker, when the source knows it.
    fn company_name(&self, ticker: &str) -> Result<Option<String>, DataError>;
}

/// Paginated headline listing source.
pub trait HeadlineSource {
    fn name(&self) -> &str;

    /// Read one listing page (1-based).
    fn page(&self, ticker: &str, page: u32) -> Result<HeadlinePage, DataError>;
}

/// Windowed social search source.
pub trait PostSource {
    fn name(&self) -> &str;

    /// Posts matching `query` created in `[since, until)`, at most `limit`.
    fn search(
        &self,
        query: &str,
        since: NaiveDate,
        until: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RawPost>, DataError>;
}

/// Company profile source: ordered `(attribute, value)` pairs.
pub trait ProfileSource {
    fn name(&self) -> &str;

    fn profile(&self, ticker: &str) -> Result<Vec<(String, String)>, DataError>;
}
