//! Deterministic dataset identity keys.
//!
//! A key names exactly one cached artifact:
//! `{TICKER}_{kind-tag}_{encoded-params}`.
//!
//! Sources refreshed daily (headlines, social posts, profile) embed the as-of
//! day, so a request made on a new day resolves to a new key and bypasses
//! yesterday's artifact. Price history is keyed only by its explicit range and
//! is a snapshot: a range ending today is frozen as fetched and never expires.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::provider::DataError;

/// Length of the trailing social-post window in calendar days.
pub const SOCIAL_WINDOW_DAYS: i64 = 8;

/// What kind of data a key names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetKind {
    Price,
    Headlines,
    SocialPosts,
    Profile,
}

impl DatasetKind {
    /// Tag used in the storage name.
    pub fn tag(self) -> &'static str {
        match self {
            DatasetKind::Price => "HisPrice",
            DatasetKind::Headlines => "HisNews",
            DatasetKind::SocialPosts => "Tweets",
            DatasetKind::Profile => "Stats",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "HisPrice" => Some(DatasetKind::Price),
            "HisNews" => Some(DatasetKind::Headlines),
            "Tweets" => Some(DatasetKind::SocialPosts),
            "Stats" => Some(DatasetKind::Profile),
            _ => None,
        }
    }
}

impl fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DatasetKind::Price => "price",
            DatasetKind::Headlines => "headlines",
            DatasetKind::SocialPosts => "social-posts",
            DatasetKind::Profile => "profile",
        };
        f.write_str(s)
    }
}

/// Parameters that complete a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum KeyParams {
    /// Explicit date range. Inclusive for price; for social posts `end` is
    /// the as-of day and is excluded, since the search buckets only cover
    /// complete days.
    Range { start: NaiveDate, end: NaiveDate },
    /// Page count read on a given day (headlines).
    Pages { as_of: NaiveDate, pages: u32 },
    /// A single as-of day (profile).
    AsOf { as_of: NaiveDate },
}

/// Identity of one cached dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatasetKey {
    kind: DatasetKind,
    ticker: String,
    params: KeyParams,
}

impl DatasetKey {
    /// Resolve and validate a key.
    ///
    /// Tickers are upper-cased and restricted to `[A-Z0-9.^=-]`; the storage
    /// separator `_` can therefore never appear inside a component.
    pub fn resolve(
        kind: DatasetKind,
        ticker: &str,
        params: KeyParams,
    ) -> Result<Self, DataError> {
        let ticker = normalize_ticker(ticker)?;

        match (kind, params) {
            (DatasetKind::Price | DatasetKind::SocialPosts, KeyParams::Range { start, end }) => {
                if start > end {
                    return Err(DataError::InvalidKey(format!(
                        "start {start} is after end {end}"
                    )));
                }
            }
            (DatasetKind::Headlines, KeyParams::Pages { pages, .. }) => {
                if pages == 0 {
                    return Err(DataError::InvalidKey("page count must be at least 1".into()));
                }
            }
            (DatasetKind::Profile, KeyParams::AsOf { .. }) => {}
            (kind, params) => {
                return Err(DataError::InvalidKey(format!(
                    "{kind} keys do not take {params:?}"
                )));
            }
        }

        Ok(Self {
            kind,
            ticker,
            params,
        })
    }

    pub fn price(ticker: &str, start: NaiveDate, end: NaiveDate) -> Result<Self, DataError> {
        Self::resolve(DatasetKind::Price, ticker, KeyParams::Range { start, end })
    }

    pub fn headlines(ticker: &str, as_of: NaiveDate, pages: u32) -> Result<Self, DataError> {
        Self::resolve(
            DatasetKind::Headlines,
            ticker,
            KeyParams::Pages { as_of, pages },
        )
    }

    /// Social-post key for the trailing window `[as_of - 8d, as_of)`.
    pub fn social_posts(ticker: &str, as_of: NaiveDate) -> Result<Self, DataError> {
        let start = as_of - Duration::days(SOCIAL_WINDOW_DAYS);
        Self::resolve(
            DatasetKind::SocialPosts,
            ticker,
            KeyParams::Range { start, end: as_of },
        )
    }

    pub fn profile(ticker: &str, as_of: NaiveDate) -> Result<Self, DataError> {
        Self::resolve(DatasetKind::Profile, ticker, KeyParams::AsOf { as_of })
    }

    pub fn kind(&self) -> DatasetKind {
        self.kind
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn params(&self) -> KeyParams {
        self.params
    }

    /// Storage name without extension, e.g. `AAPL_HisNews_20240310_p3`.
    pub fn storage_name(&self) -> String {
        let params = match self.params {
            KeyParams::Range { start, end } => {
                format!("{}_{}", compact(start), compact(end))
            }
            KeyParams::Pages { as_of, pages } => format!("{}_p{pages}", compact(as_of)),
            KeyParams::AsOf { as_of } => compact(as_of),
        };
        format!("{}_{}_{}", self.ticker, self.kind.tag(), params)
    }

    /// Parse a storage name produced by [`storage_name`](Self::storage_name).
    pub fn from_storage_name(name: &str) -> Option<Self> {
        let mut parts = name.split('_');
        let ticker = parts.next()?;
        let kind = DatasetKind::from_tag(parts.next()?)?;
        let rest: Vec<&str> = parts.collect();

        let params = match (kind, rest.as_slice()) {
            (DatasetKind::Price | DatasetKind::SocialPosts, [start, end]) => KeyParams::Range {
                start: parse_compact(start)?,
                end: parse_compact(end)?,
            },
            (DatasetKind::Headlines, [as_of, pages]) => KeyParams::Pages {
                as_of: parse_compact(as_of)?,
                pages: pages.strip_prefix('p')?.parse().ok()?,
            },
            (DatasetKind::Profile, [as_of]) => KeyParams::AsOf {
                as_of: parse_compact(as_of)?,
            },
            _ => return None,
        };

        Self::resolve(kind, ticker, params).ok()
    }

    /// BLAKE3 digest of the canonical JSON form of this key.
    pub fn fingerprint(&self) -> String {
        // Field order is fixed by the struct definition, so the JSON is canonical.
        let json = serde_json::to_string(self).unwrap_or_else(|_| self.storage_name());
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_name())
    }
}

fn normalize_ticker(raw: &str) -> Result<String, DataError> {
    let ticker = raw.trim().to_ascii_uppercase();
    if ticker.is_empty() {
        return Err(DataError::InvalidKey("ticker is empty".into()));
    }
    if let Some(bad) = ticker
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '^' | '=' | '-')))
    {
        return Err(DataError::InvalidKey(format!(
            "ticker '{raw}' contains unsupported character '{bad}'"
        )));
    }
    Ok(ticker)
}

fn compact(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

fn parse_compact(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y%m%d").ok()
}
