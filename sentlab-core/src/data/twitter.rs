//! Twitter/X v2 recent-search source.
//!
//! Requires an app bearer token. Recent search refuses an `end_time` in the
//! future, so a window ending today is sent open-ended.
//!
//! It also only reaches back seven days. Older window starts are clipped to
//! that limit; a window that ended before it gets no request at all.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, SecondsFormat, Utc};
use serde::Deserialize;
use tracing::debug;

use super::http::HttpClient;
use super::provider::{DataError, PostSource, RawPost};

const SEARCH_URL: &str = "https://api.twitter.com/2/tweets/search/recent";

/// The API caps `max_results` at 100 per page.
const PAGE_LIMIT: usize = 100;

/// How far back recent search reaches.
const RECENT_SEARCH_DAYS: i64 = 7;

/// Slack between computing `start_time` and the request reaching the API.
const START_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    meta: Option<SearchMeta>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    text: String,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SearchMeta {
    next_token: Option<String>,
}

pub struct TwitterSource {
    http: HttpClient,
    bearer_token: String,
}

impl TwitterSource {
    pub fn new(http: HttpClient, bearer_token: impl Into<String>) -> Self {
        Self {
            http,
            bearer_token: bearer_token.into(),
        }
    }
}

/// Query parameters for `[since, until)`, or `None` when the whole window is
/// older than recent search reaches.
fn window_query(
    query: &str,
    since: NaiveDate,
    until: NaiveDate,
    now: DateTime<Utc>,
) -> Option<Vec<(&'static str, String)>> {
    let earliest = now - Duration::days(RECENT_SEARCH_DAYS) + Duration::seconds(START_MARGIN_SECS);
    let start = since.and_time(NaiveTime::default()).and_utc().max(earliest);
    let end = until.and_time(NaiveTime::default()).and_utc();
    if end <= earliest {
        return None;
    }
    let mut params = vec![
        ("query", format!("{query} lang:en -is:retweet")),
        ("tweet.fields", "created_at".to_string()),
        ("start_time", start.to_rfc3339_opts(SecondsFormat::Secs, true)),
    ];
    if end + Duration::seconds(30) < now {
        params.push(("end_time", end.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    Some(params)
}

fn parse_page(resp: SearchResponse) -> (Vec<RawPost>, Option<String>) {
    let posts = resp
        .data
        .into_iter()
        .filter_map(|tweet| {
            let created_at = tweet.created_at?.naive_utc();
            Some(RawPost {
                created_at,
                text: tweet.text,
            })
        })
        .collect();
    (posts, resp.meta.and_then(|m| m.next_token))
}

impl PostSource for TwitterSource {
    fn name(&self) -> &str {
        "twitter"
    }

    fn search(
        &self,
        query: &str,
        since: NaiveDate,
        until: NaiveDate,
        limit: usize,
    ) -> Result<Vec<RawPost>, DataError> {
        let what = format!("search '{query}' {since}..{until}");
        let Some(base) = window_query(query, since, until, Utc::now()) else {
            debug!(query, since = %since, "window is older than recent search, skipping");
            return Ok(Vec::new());
        };
        let mut posts = Vec::new();
        let mut next_token: Option<String> = None;

        while posts.len() < limit {
            // The endpoint rejects max_results below 10.
            let page_size = (limit - posts.len()).clamp(10, PAGE_LIMIT);
            let mut params = base.clone();
            params.push(("max_results", page_size.to_string()));
            if let Some(token) = &next_token {
                params.push(("next_token", token.clone()));
            }

            let reply = self
                .http
                .get(SEARCH_URL, &params, Some(&self.bearer_token), &what)?;
            if !reply.is_success() {
                return Err(DataError::SourceUnavailable(format!(
                    "HTTP {} for {what}",
                    reply.status
                )));
            }
            let (page, token) = parse_page(reply.json(&what)?);
            debug!(query, since = %since, posts = page.len(), "search page");
            posts.extend(page);

            match token {
                Some(t) => next_token = Some(t),
                None => break,
            }
        }

        posts.truncate(limit);
        Ok(posts)
    }
}
