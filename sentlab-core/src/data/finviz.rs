//! Finviz company profile source.
//!
//! The quote page carries the sector, industry and country as tab links, and
//! a snapshot table of label/value cells. The profile is those three fields
//! followed by the first [`SNAPSHOT_PAIRS`] snapshot pairs, in page order.

use regex::Regex;
use tracing::debug;

use super::http::HttpClient;
use super::provider::{DataError, ProfileSource};

const QUOTE_URL: &str = "https://finviz.com/quote.ashx";

/// Snapshot label/value pairs kept (six rows of three pairs on the page).
pub const SNAPSHOT_PAIRS: usize = 18;

const HEADLINE_FIELDS: [&str; 3] = ["Sector", "Industry", "Country"];

#[derive(Debug, Clone)]
pub struct ProfileParser {
    links_block: Regex,
    tab_link: Regex,
    snapshot_cell: Regex,
    tags: Regex,
}

impl ProfileParser {
    pub fn new() -> Result<Self, DataError> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| DataError::InvalidInput(format!("bad profile pattern: {e}")))
        };
        Ok(Self {
            links_block: compile(r#"(?s)<td[^>]*class="[^"]*fullview-links[^"]*"[^>]*>(.*?)</td>"#)?,
            tab_link: compile(r#"(?s)<a[^>]*class="[^"]*tab-link[^"]*"[^>]*>(.*?)</a>"#)?,
            snapshot_cell: compile(r#"(?s)<td[^>]*class="[^"]*snapshot-td2[^"]*"[^>]*>(.*?)</td>"#)?,
            tags: compile(r"<[^>]+>")?,
        })
    }

    fn text(&self, fragment: &str) -> String {
        self.tags
            .replace_all(fragment, "")
            .replace("&amp;", "&")
            .replace("&nbsp;", " ")
            .trim()
            .to_string()
    }

    /// Ordered `(attribute, value)` pairs. Empty when the page layout is not
    /// recognized at all.
    pub fn parse(&self, html: &str) -> Vec<(String, String)> {
        // The second links block holds sector/industry/country; older layouts
        // had a single block.
        let blocks: Vec<&str> = self
            .links_block
            .captures_iter(html)
            .filter_map(|c| c.get(1).map(|m| m.as_str()))
            .collect();
        let links: Vec<String> = blocks
            .get(1)
            .or_else(|| blocks.first())
            .map(|block| {
                self.tab_link
                    .captures_iter(block)
                    .map(|c| self.text(&c[1]))
                    .collect()
            })
            .unwrap_or_default();

        let cells: Vec<String> = self
            .snapshot_cell
            .captures_iter(html)
            .map(|c| self.text(&c[1]))
            .collect();

        if links.is_empty() && cells.is_empty() {
            return Vec::new();
        }

        let mut profile: Vec<(String, String)> = HEADLINE_FIELDS
            .iter()
            .enumerate()
            .map(|(i, field)| (field.to_string(), links.get(i).cloned().unwrap_or_default()))
            .collect();

        for pair in cells.chunks_exact(2).take(SNAPSHOT_PAIRS) {
            let label = &pair[0];
            if label.is_empty() || profile.iter().any(|(a, _)| a == label) {
                continue;
            }
            profile.push((label.clone(), pair[1].clone()));
        }
        profile
    }
}

pub struct FinvizSource {
    http: HttpClient,
    parser: ProfileParser,
}

impl FinvizSource {
    pub fn new(http: HttpClient) -> Result<Self, DataError> {
        Ok(Self {
            http,
            parser: ProfileParser::new()?,
        })
    }
}

impl ProfileSource for FinvizSource {
    fn name(&self) -> &str {
        "finviz"
    }

    fn profile(&self, ticker: &str) -> Result<Vec<(String, String)>, DataError> {
        let what = format!("{ticker} profile");
        let reply = self
            .http
            .get(QUOTE_URL, &[("t", ticker.to_ascii_lowercase())], None, &what)?;
        if reply.status == 404 {
            return Err(DataError::SymbolNotFound {
                symbol: ticker.to_string(),
            });
        }
        let body = reply.into_success(&what)?;
        let profile = self.parser.parse(&body);
        debug!(ticker, attributes = profile.len(), "parsed profile page");
        Ok(profile)
    }
}
