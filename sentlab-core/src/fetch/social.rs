//! Trailing-window social post search.

use chrono::{Duration, NaiveDate};
use regex::Regex;
use tracing::{debug, info};

use crate::data::{
    Column, DataError, Dataset, DatasetKey, DatasetStore, PostSource, Record, Value,
    SOCIAL_WINDOW_DAYS,
};

/// The single text column of a social-post dataset.
pub const TEXT_COLUMN: &str = "Text";

/// Posts kept per one-day bucket unless the request says otherwise.
pub const DEFAULT_MAX_PER_BUCKET: usize = 200;

/// Parameters of one social-post fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialRequest {
    pub ticker: String,
    pub as_of: NaiveDate,
    /// Long company name; its short form is added to the search query.
    pub company_name: Option<String>,
    pub max_per_bucket: usize,
}

impl SocialRequest {
    pub fn new(ticker: impl Into<String>, as_of: NaiveDate) -> Self {
        Self {
            ticker: ticker.into(),
            as_of,
            company_name: None,
            max_per_bucket: DEFAULT_MAX_PER_BUCKET,
        }
    }

    pub fn with_company_name(mut self, name: impl Into<String>) -> Self {
        self.company_name = Some(name.into());
        self
    }

    pub fn with_max_per_bucket(mut self, max: usize) -> Self {
        self.max_per_bucket = max;
        self
    }

    /// Search terms: the ticker, then the company short name when known.
    pub fn query(&self, ticker: &str) -> String {
        match self.company_name.as_deref().and_then(short_company_name) {
            Some(short) if !short.eq_ignore_ascii_case(ticker) => format!("{ticker} {short}"),
            _ => ticker.to_string(),
        }
    }
}

/// First word of a company name ("Amazon.com, Inc." -> "Amazon").
pub fn short_company_name(full: &str) -> Option<String> {
    full.split(|c: char| c.is_ascii_punctuation() || c.is_whitespace())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Strips mentions, hash marks, retweet markers, line breaks and links.
#[derive(Debug, Clone)]
pub struct PostCleaner {
    mention: Regex,
    retweet: Regex,
    url: Regex,
    spaces: Regex,
}

impl PostCleaner {
    pub fn new() -> Result<Self, DataError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| DataError::InvalidInput(format!("bad cleaning pattern: {e}")))
        };
        Ok(Self {
            mention: compile(r"@[A-Za-z0-9_]+")?,
            retweet: compile(r"RT [@:]")?,
            url: compile(r"https?://[A-Za-z0-9./_?=&%-]+")?,
            spaces: compile(r"\s+")?,
        })
    }

    pub fn clean(&self, text: &str) -> String {
        // Mentions go first so "RT @user:" collapses to a bare "RT :".
        let text = self.mention.replace_all(text, "");
        let text = text.replace('#', "");
        let text = self.retweet.replace_all(&text, "");
        let text = self.url.replace_all(&text, "");
        self.spaces.replace_all(&text, " ").trim().to_string()
    }
}

/// Clean one post with a throwaway [`PostCleaner`].
pub fn clean_post_text(text: &str) -> Result<String, DataError> {
    Ok(PostCleaner::new()?.clean(text))
}

/// Cached posts for the eight complete days before `request.as_of`.
///
/// Each day is its own bucket, searched most recent first and capped at
/// `max_per_bucket`, so one busy day cannot crowd out the rest of the window.
pub fn fetch_social_posts(
    store: &dyn DatasetStore,
    source: &dyn PostSource,
    request: &SocialRequest,
) -> Result<Dataset, DataError> {
    if request.max_per_bucket == 0 {
        return Err(DataError::InvalidInput("max_per_bucket must be at least 1".into()));
    }
    let key = DatasetKey::social_posts(&request.ticker, request.as_of)?;
    store.get_or_fetch(&key, &mut || -> Result<Dataset, DataError> {
        let cleaner = PostCleaner::new()?;
        let query = request.query(key.ticker());
        info!(ticker = key.ticker(), %query, source = source.name(), "fetching social posts");

        let mut records = Vec::new();
        for offset in 0..SOCIAL_WINDOW_DAYS {
            let until = request.as_of - Duration::days(offset);
            let since = until - Duration::days(1);
            let mut posts = source.search(&query, since, until, request.max_per_bucket)?;
            posts.truncate(request.max_per_bucket);
            debug!(%since, posts = posts.len(), "social bucket");
            records.extend(posts.into_iter().map(|post| Record {
                date: post.created_at.date(),
                values: vec![Value::Text(cleaner.clean(&post.text))],
            }));
        }

        if records.is_empty() {
            return Err(DataError::NoDataInRange {
                ticker: key.ticker().to_string(),
                detail: format!(
                    "no posts for '{query}' in the {SOCIAL_WINDOW_DAYS} days before {}",
                    request.as_of
                ),
            });
        }
        Dataset::from_records(key.clone(), vec![Column::text(TEXT_COLUMN)], records)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryStore, RawPost};
    use std::cell::RefCell;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    #[test]
    fn short_names() {
        assert_eq!(short_company_name("Amazon.com, Inc.").as_deref(), Some("Amazon"));
        assert_eq!(short_company_name("Apple Inc.").as_deref(), Some("Apple"));
        assert_eq!(short_company_name(" , "), None);
    }

    #[test]
    fn query_adds_short_name_once() {
        let req = SocialRequest::new("AMZN", d(10)).with_company_name("Amazon.com, Inc.");
        assert_eq!(req.query("AMZN"), "AMZN Amazon");
        assert_eq!(SocialRequest::new("AMZN", d(10)).query("AMZN"), "AMZN");
    }

    #[test]
    fn cleaning_strips_noise() {
        let cleaner = PostCleaner::new().unwrap();
        assert_eq!(
            cleaner.clean("RT @trader: $AAPL #earnings beat!\nhttps://t.co/abc123 wow"),
            "$AAPL earnings beat! wow"
        );
        assert_eq!(cleaner.clean("  @a @b  "), "");
    }

    struct Recorder {
        windows: RefCell<Vec<(NaiveDate, NaiveDate)>>,
        per_bucket: usize,
    }

    impl PostSource for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn search(
            &self,
            _query: &str,
            since: NaiveDate,
            until: NaiveDate,
            _limit: usize,
        ) -> Result<Vec<RawPost>, DataError> {
            self.windows.borrow_mut().push((since, until));
            let at = since.and_hms_opt(15, 0, 0).unwrap();
            Ok((0..self.per_bucket)
                .map(|i| RawPost {
                    created_at: at,
                    text: format!("post {i} #tag"),
                })
                .collect())
        }
    }

    #[test]
    fn eight_day_buckets_most_recent_first_and_capped() {
        let source = Recorder {
            windows: RefCell::new(Vec::new()),
            per_bucket: 5,
        };
        let store = MemoryStore::new();
        let request = SocialRequest::new("AAPL", d(10)).with_max_per_bucket(3);
        let ds = fetch_social_posts(&store, &source, &request).unwrap();

        let windows = source.windows.borrow();
        assert_eq!(windows.len(), 8);
        assert_eq!(windows[0], (d(9), d(10)));
        assert_eq!(windows[7], (d(2), d(3)));
        assert_eq!(ds.len(), 8 * 3);
        assert_eq!(ds.dates().first(), Some(&d(2)));
        assert!(ds.texts(TEXT_COLUMN).unwrap().iter().all(|t| !t.contains('#')));
    }

    #[test]
    fn silent_window_is_no_data() {
        let source = Recorder {
            windows: RefCell::new(Vec::new()),
            per_bucket: 0,
        };
        let store = MemoryStore::new();
        let result = fetch_social_posts(&store, &source, &SocialRequest::new("AAPL", d(10)));
        assert!(matches!(result, Err(DataError::NoDataInRange { .. })));
        assert!(store.is_empty());
    }
}
