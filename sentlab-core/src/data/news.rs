//! Business Insider headline listing source.
//!
//! Listing pages show each headline with a relative age ("15m", "2h", "3d")
//! instead of a publication timestamp. The page is stamped with the local
//! wall-clock moment it was read; converting ages to dates is the fetcher's
//! job.
//!
//! The markup is third-party and changes without notice. Extraction is a pair
//! of regexes; when they stop matching, a page simply yields no items.

use regex::Regex;
use tracing::debug;

use super::http::HttpClient;
use super::provider::{DataError, HeadlinePage, HeadlineSource, RawHeadline};

const LISTING_URL: &str = "https://markets.businessinsider.com/news";

/// Regex-based extractor for one listing page.
#[derive(Debug, Clone)]
pub struct ListingParser {
    item: Regex,
    tags: Regex,
}

impl ListingParser {
    pub fn new() -> Result<Self, DataError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| DataError::InvalidInput(format!("bad listing pattern: {e}")))
        };
        Ok(Self {
            item: compile(
                r#"(?s)<a[^>]*class="[^"]*news-link[^"]*"[^>]*>(?P<title>.*?)</a>.*?<(?:time|span)[^>]*class="[^"]*(?:latest-news__date|source-and-publishdate)[^"]*"[^>]*>(?P<age>[^<]*)</(?:time|span)>"#,
            )?,
            tags: compile(r"<[^>]+>")?,
        })
    }

    /// Headlines in page order.
    pub fn parse(&self, html: &str) -> Vec<RawHeadline> {
        self.item
            .captures_iter(html)
            .filter_map(|caps| {
                let title = decode_entities(self.tags.replace_all(&caps["title"], "").trim());
                // The age is the last token ("Reuters 2h" -> "2h").
                let elapsed = caps["age"].split_whitespace().last()?.to_string();
                if title.is_empty() {
                    return None;
                }
                Some(RawHeadline { title, elapsed })
            })
            .collect()
    }
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
}

pub struct BusinessInsiderSource {
    http: HttpClient,
    parser: ListingParser,
}

impl BusinessInsiderSource {
    pub fn new(http: HttpClient) -> Result<Self, DataError> {
        Ok(Self {
            http,
            parser: ListingParser::new()?,
        })
    }
}

impl HeadlineSource for BusinessInsiderSource {
    fn name(&self) -> &str {
        "business_insider"
    }

    fn page(&self, ticker: &str, page: u32) -> Result<HeadlinePage, DataError> {
        let url = format!("{LISTING_URL}/{}", ticker.to_ascii_lowercase());
        let what = format!("{ticker} headlines page {page}");
        let body = self
            .http
            .get(&url, &[("p", page.to_string())], None, &what)?
            .into_success(&what)?;
        let retrieved_at = chrono::Local::now().naive_local();

        let items = self.parser.parse(&body);
        debug!(ticker, page, items = items.len(), "parsed headline page");
        Ok(HeadlinePage {
            retrieved_at,
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <div class="latest-news__story">
          <a class="news-link" href="/news/a">Apple &amp; Google <b>rally</b></a>
          <div class="latest-news__source">Reuters</div>
          <time class="latest-news__date" datetime="x">2h</time>
        </div>
        <div class="col-md-6 further-news-container latest-news-padding">
          <a class="news-link" href="/news/b">Shares slip</a>
          <span class="warmGrey source-and-publishdate">Benzinga 1,440m</span>
        </div>
    "#;

    #[test]
    fn extracts_titles_and_ages() {
        let parser = ListingParser::new().unwrap();
        let items = parser.parse(PAGE);
        assert_eq!(
            items,
            vec![
                RawHeadline {
                    title: "Apple & Google rally".into(),
                    elapsed: "2h".into()
                },
                RawHeadline {
                    title: "Shares slip".into(),
                    elapsed: "1,440m".into()
                },
            ]
        );
    }

    #[test]
    fn unknown_markup_yields_nothing() {
        let parser = ListingParser::new().unwrap();
        assert!(parser.parse("<html><body>moved</body></html>").is_empty());
    }
}
