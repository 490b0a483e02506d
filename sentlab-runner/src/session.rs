//! Analysis sessions: the operations an analyst runs against one as-of day.
//!
//! A session owns the store, the sources and the sentiment oracle, and wires
//! fetch, enrich, align and model together. Every dataset it touches goes
//! through the store, so repeating an operation on the same day never
//! refetches.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use sentlab_core::align::{aggregate_daily, align, suffixed, AlignedDataset, DailyTable};
use sentlab_core::data::{
    BusinessInsiderSource, ColumnKind, DataError, Dataset, DatasetKey, DatasetStore, FileStore,
    FinvizSource, HeadlineSource, HttpClient, PostSource, PriceSource, ProfileSource,
    TwitterSource, YahooPriceSource, SOCIAL_WINDOW_DAYS,
};
use sentlab_core::enrich::{
    add_price_move, add_sentiment, enrich_and_save, SentimentOracle, VaderOracle,
};
use sentlab_core::fetch::{
    fetch_headlines, fetch_prices, fetch_profile, fetch_social_posts, SocialRequest,
    HEADLINE_COLUMN, TEXT_COLUMN,
};
use sentlab_core::indicators::{Sma, PRICE_SMA_PERIODS};
use sentlab_core::model::{news_model, social_model, OlsFit};

use crate::config::{
    twitter_token, ConfigError, SessionConfig, MAX_NEWS_PAGES, TWITTER_TOKEN_VAR,
};

/// Errors from session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error("social search is not configured: set TWITTER_BEARER_TOKEN")]
    SocialSearchUnavailable,
    #[error("at least one ticker is required")]
    NoTickers,
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidRange { start: NaiveDate, end: NaiveDate },
}

/// Series the price-history report plots against the bars.
const PRICE_SMA_SOURCE: &str = "AdjClose";

/// Daily means shown by the post sentiment breakdown.
pub const BREAKDOWN_COLUMNS: [&str; 4] = ["Positive", "Negative", "Neutral", "Compound"];

/// External collaborators of a session.
pub struct Sources {
    pub prices: Box<dyn PriceSource>,
    pub headlines: Box<dyn HeadlineSource>,
    /// Absent when no search token is configured.
    pub posts: Option<Box<dyn PostSource>>,
    pub profiles: Box<dyn ProfileSource>,
}

impl Sources {
    /// The network-backed sources, each behind its own circuit breaker.
    pub fn live(config: &SessionConfig, token: Option<String>) -> Result<Self, SessionError> {
        let http_config = config.http_config();
        let client = || HttpClient::new(&http_config, Arc::new(config.circuit_breaker()));

        let posts = match token {
            Some(token) => {
                Some(Box::new(TwitterSource::new(client()?, token)) as Box<dyn PostSource>)
            }
            None => {
                warn!("{TWITTER_TOKEN_VAR} is not set, social search disabled");
                None
            }
        };

        Ok(Self {
            prices: Box::new(YahooPriceSource::new(client()?)),
            headlines: Box::new(BusinessInsiderSource::new(client()?)?),
            posts,
            profiles: Box::new(FinvizSource::new(client()?)?),
        })
    }
}

/// Enriched price history plus the moving averages derived from it.
#[derive(Debug, Clone)]
pub struct PriceHistory {
    pub dataset: Dataset,
    /// `(name, values)` aligned with the dataset's records.
    pub moving_averages: Vec<(String, Vec<f64>)>,
}

/// One headline in listing order.
#[derive(Debug, Clone, PartialEq)]
pub struct Headline {
    /// Read time minus the listed age; not a publication date.
    pub approx_date: NaiveDate,
    pub title: String,
}

pub struct Session {
    config: SessionConfig,
    store: Box<dyn DatasetStore>,
    sources: Sources,
    oracle: Box<dyn SentimentOracle>,
    as_of: NaiveDate,
    /// Calendar day the session runs on. Headlines, posts and profiles are
    /// only read live when `as_of` is this day.
    today: NaiveDate,
}

impl Session {
    pub fn new(
        config: SessionConfig,
        store: Box<dyn DatasetStore>,
        sources: Sources,
        oracle: Box<dyn SentimentOracle>,
        as_of: NaiveDate,
    ) -> Self {
        Self {
            config,
            store,
            sources,
            oracle,
            as_of,
            today: as_of,
        }
    }

    /// Run on `today` while analysing an earlier `as_of` day.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// A session over the file cache and the live sources, scoring with VADER.
    pub fn open(config: SessionConfig, as_of: NaiveDate) -> Result<Self, SessionError> {
        config.validate()?;
        let sources = Sources::live(&config, twitter_token())?;
        let store = Box::new(FileStore::new(&config.cache_dir));
        info!(cache_dir = %config.cache_dir.display(), %as_of, "session opened");
        Ok(Self::new(
            config,
            store,
            sources,
            Box::new(VaderOracle::new()),
            as_of,
        )
        .with_today(chrono::Local::now().date_naive()))
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Headlines, posts and profiles of a past day come only from the store.
    fn ensure_live_or_cached(&self, key: &DatasetKey) -> Result<(), SessionError> {
        if self.as_of < self.today && !self.store.exists(key) {
            warn!(key = %key, today = %self.today, "past-day dataset is not cached");
            return Err(DataError::NotFound {
                key: key.storage_name(),
            }
            .into());
        }
        Ok(())
    }

    // ── Single-dataset operations ───────────────────────────────────

    /// Price bars for `[start, end]` with `Direction` and `PercentChange`.
    pub fn prices(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Dataset, SessionError> {
        if start > end {
            return Err(SessionError::InvalidRange { start, end });
        }
        let source = self.sources.prices.as_ref();
        let dataset = fetch_prices(self.store.as_ref(), source, ticker, start, end)?;
        Ok(enrich_and_save(self.store.as_ref(), dataset, add_price_move)?)
    }

    /// Price history with simple moving averages of the adjusted close.
    pub fn price_history(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceHistory, SessionError> {
        let dataset = self.prices(ticker, start, end)?;
        let closes = dataset.numbers(PRICE_SMA_SOURCE)?;
        let moving_averages = PRICE_SMA_PERIODS
            .iter()
            .map(|&period| {
                let sma = Sma::new(period)?;
                Ok((sma.name().to_string(), sma.compute(&closes)))
            })
            .collect::<Result<Vec<_>, DataError>>()?;
        Ok(PriceHistory {
            dataset,
            moving_averages,
        })
    }

    fn pages(&self, pages: Option<u32>) -> Result<u32, SessionError> {
        let pages = pages.unwrap_or(self.config.news_pages);
        if !(1..=MAX_NEWS_PAGES).contains(&pages) {
            return Err(DataError::InvalidInput(format!(
                "page count must be between 1 and {MAX_NEWS_PAGES}, got {pages}"
            ))
            .into());
        }
        Ok(pages)
    }

    /// Headlines read today, scored for sentiment.
    pub fn news(&self, ticker: &str, pages: Option<u32>) -> Result<Dataset, SessionError> {
        let pages = self.pages(pages)?;
        self.ensure_live_or_cached(&DatasetKey::headlines(ticker, self.as_of, pages)?)?;
        let dataset = fetch_headlines(
            self.store.as_ref(),
            self.sources.headlines.as_ref(),
            ticker,
            pages,
            self.as_of,
        )?;
        Ok(enrich_and_save(self.store.as_ref(), dataset, |ds| {
            add_sentiment(ds, HEADLINE_COLUMN, self.oracle.as_ref())
        })?)
    }

    /// The most recent headlines, newest first.
    pub fn latest_headlines(
        &self,
        ticker: &str,
        pages: Option<u32>,
    ) -> Result<Vec<Headline>, SessionError> {
        let news = self.news(ticker, pages)?;
        let titles = news.texts(HEADLINE_COLUMN)?;
        let mut headlines: Vec<Headline> = news
            .records()
            .iter()
            .zip(titles)
            .map(|(record, title)| Headline {
                approx_date: record.date,
                title: title.to_string(),
            })
            .collect();
        // Same-day rows keep listing order, which is already newest first.
        headlines.sort_by_key(|h| std::cmp::Reverse(h.approx_date));
        headlines.truncate(self.config.latest_headlines);
        Ok(headlines)
    }

    fn post_source(&self) -> Result<&dyn PostSource, SessionError> {
        self.sources
            .posts
            .as_deref()
            .ok_or(SessionError::SocialSearchUnavailable)
    }

    /// Posts from the trailing window, scored for sentiment.
    pub fn posts(&self, ticker: &str) -> Result<Dataset, SessionError> {
        let source = self.post_source()?;
        self.ensure_live_or_cached(&DatasetKey::social_posts(ticker, self.as_of)?)?;
        let mut request = SocialRequest::new(ticker, self.as_of)
            .with_max_per_bucket(self.config.max_posts_per_bucket);
        match self.sources.prices.company_name(ticker) {
            Ok(Some(name)) => request = request.with_company_name(name),
            Ok(None) => {}
            // The query still works on the ticker alone.
            Err(e) => warn!(ticker, error = %e, "company name lookup failed"),
        }
        let dataset = fetch_social_posts(self.store.as_ref(), source, &request)?;
        Ok(enrich_and_save(self.store.as_ref(), dataset, |ds| {
            add_sentiment(ds, TEXT_COLUMN, self.oracle.as_ref())
        })?)
    }

    /// Profile attributes in source order.
    pub fn profile(&self, ticker: &str) -> Result<Vec<(String, String)>, SessionError> {
        self.ensure_live_or_cached(&DatasetKey::profile(ticker, self.as_of)?)?;
        let dataset = fetch_profile(
            self.store.as_ref(),
            self.sources.profiles.as_ref(),
            ticker,
            self.as_of,
        )?;
        let Some(record) = dataset.records().first() else {
            return Ok(Vec::new());
        };
        Ok(dataset
            .columns()
            .iter()
            .zip(&record.values)
            .map(|(column, value)| {
                let text = value.as_text().map(str::to_string).unwrap_or_default();
                (column.name.clone(), text)
            })
            .collect())
    }

    /// Daily mean intensity scores of the trailing-window posts.
    pub fn post_sentiment_breakdown(&self, ticker: &str) -> Result<DailyTable, SessionError> {
        let posts = self.posts(ticker)?;
        Ok(aggregate_daily(&posts, &BREAKDOWN_COLUMNS)?)
    }

    // ── Price versus sentiment ──────────────────────────────────────

    fn daily_prices(&self, ticker: &str, start: NaiveDate) -> Result<DailyTable, SessionError> {
        let prices = self.prices(ticker, start, self.as_of)?;
        let numeric: Vec<&str> = prices
            .columns()
            .iter()
            .filter(|c| c.kind == ColumnKind::Number)
            .map(|c| c.name.as_str())
            .collect();
        Ok(aggregate_daily(&prices, &numeric)?)
    }

    /// Prices from `start` to the as-of day joined with daily headline
    /// `Compound` and `Polarity` means.
    pub fn news_vs_price(
        &self,
        ticker: &str,
        start: NaiveDate,
        pages: Option<u32>,
    ) -> Result<AlignedDataset, SessionError> {
        let price = self.daily_prices(ticker, start)?;
        let news = aggregate_daily(&self.news(ticker, pages)?, &["Compound", "Polarity"])?;
        let aligned = align(&[("price", &price), ("news", &news)])?;
        aligned.ensure_usable()?;
        Ok(aligned)
    }

    /// Prices over the social window joined with the daily post `Compound`
    /// mean.
    pub fn posts_vs_price(&self, ticker: &str) -> Result<AlignedDataset, SessionError> {
        let start = self.as_of - chrono::Duration::days(SOCIAL_WINDOW_DAYS);
        let posts = aggregate_daily(&self.posts(ticker)?, &["Compound"])?;
        let price = self.daily_prices(ticker, start)?;
        let aligned = align(&[("price", &price), ("posts", &posts)])?;
        aligned.ensure_usable()?;
        Ok(aligned)
    }

    pub fn model_news(
        &self,
        ticker: &str,
        start: NaiveDate,
        pages: Option<u32>,
    ) -> Result<OlsFit, SessionError> {
        Ok(news_model(&self.news_vs_price(ticker, start, pages)?)?)
    }

    pub fn model_posts(&self, ticker: &str) -> Result<OlsFit, SessionError> {
        Ok(social_model(&self.posts_vs_price(ticker)?)?)
    }

    // ── Multi-ticker comparisons ────────────────────────────────────

    /// `AdjClose` of every ticker on the dates they all traded.
    pub fn compare_prices(
        &self,
        tickers: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<AlignedDataset, SessionError> {
        self.compare(tickers, "AdjClose", |ticker| self.prices(ticker, start, end))
    }

    /// Daily headline `Polarity` of every ticker.
    pub fn compare_news_sentiment(
        &self,
        tickers: &[String],
        pages: Option<u32>,
    ) -> Result<AlignedDataset, SessionError> {
        self.compare(tickers, "Polarity", |ticker| self.news(ticker, pages))
    }

    /// Daily post `Compound` of every ticker.
    pub fn compare_post_sentiment(
        &self,
        tickers: &[String],
    ) -> Result<AlignedDataset, SessionError> {
        self.compare(tickers, "Compound", |ticker| self.posts(ticker))
    }

    /// Join one column of each ticker's dataset, labelled `"{column} - {ticker}"`.
    fn compare(
        &self,
        tickers: &[String],
        column: &str,
        load: impl Fn(&str) -> Result<Dataset, SessionError>,
    ) -> Result<AlignedDataset, SessionError> {
        let tickers = distinct_tickers(tickers);
        if tickers.is_empty() {
            return Err(SessionError::NoTickers);
        }

        let mut tables = Vec::with_capacity(tickers.len());
        for ticker in &tickers {
            let daily = aggregate_daily(&load(ticker)?, &[column])?;
            tables.push(relabel(&daily, column, ticker)?);
        }
        let inputs: Vec<(&str, &DailyTable)> = tickers
            .iter()
            .map(String::as_str)
            .zip(tables.iter())
            .collect();
        let aligned = align(&inputs)?;
        aligned.ensure_usable()?;
        Ok(aligned)
    }
}

/// Upper-cased tickers in first-seen order, repeats and blanks dropped.
fn distinct_tickers(tickers: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    tickers
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

fn relabel(table: &DailyTable, column: &str, ticker: &str) -> Result<DailyTable, DataError> {
    let rows = table
        .dates()
        .iter()
        .copied()
        .zip(table.rows().iter().cloned())
        .collect();
    DailyTable::from_rows(vec![suffixed(column, ticker)], rows)
}
