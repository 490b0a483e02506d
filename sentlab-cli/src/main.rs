//! SentLab CLI: fetch, compare and model market signals.
//!
//! Commands:
//! - `price`, `news`, `tweets`, `profile`: one dataset for one ticker
//! - `news-vs-price`, `tweets-vs-price`: sentiment joined to prices by date
//! - `compare-prices`, `compare-news`, `compare-tweets`: one column per ticker
//! - `model-news`, `model-tweets`: OLS of adjusted close on sentiment
//! - `cache status`: list cached artifacts

use anyhow::{bail, Context, Result};
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use sentlab_core::data::FileStore;
use sentlab_runner::report::{
    aligned_report, cache_status_report, daily_table_report, headlines_report,
    price_history_report, profile_report,
};
use sentlab_runner::{Session, SessionConfig};

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "sentlab=info";

/// Price window start when a command does not give one.
const DEFAULT_LOOKBACK_DAYS: i64 = 90;

#[derive(Parser)]
#[command(
    name = "sentlab",
    about = "SentLab CLI: market signals, sentiment and price diagnostics"
)]
struct Cli {
    /// Path to a TOML config file. Defaults to ./sentlab.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Cache directory, overriding the config file.
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Day the analysis is run for (YYYY-MM-DD). Defaults to today.
    #[arg(long, global = true)]
    as_of: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Analysis(AnalysisCommand),
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

/// Commands that run against an analysis session.
#[derive(Subcommand)]
enum AnalysisCommand {
    /// Daily prices with moves and simple moving averages.
    Price {
        ticker: String,

        /// Start date (YYYY-MM-DD). Defaults to 90 days before the as-of day.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD). Defaults to the as-of day.
        #[arg(long)]
        end: Option<String>,
    },
    /// The most recent headlines.
    News {
        ticker: String,

        /// Listing pages to read (1-100). Defaults to the config value.
        #[arg(long)]
        pages: Option<u32>,
    },
    /// Daily mean sentiment of posts over the trailing eight days.
    Tweets { ticker: String },
    /// Company profile.
    Profile { ticker: String },
    /// Prices joined with daily headline sentiment.
    NewsVsPrice {
        ticker: String,

        /// Price start date (YYYY-MM-DD). Defaults to 90 days before the as-of day.
        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        pages: Option<u32>,
    },
    /// Prices joined with daily post sentiment over the trailing eight days.
    TweetsVsPrice { ticker: String },
    /// Adjusted close of several tickers on shared trading days.
    ComparePrices {
        #[arg(required = true)]
        tickers: Vec<String>,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        end: Option<String>,
    },
    /// Daily headline polarity of several tickers.
    CompareNews {
        #[arg(required = true)]
        tickers: Vec<String>,

        #[arg(long)]
        pages: Option<u32>,
    },
    /// Daily post compound score of several tickers.
    CompareTweets {
        #[arg(required = true)]
        tickers: Vec<String>,
    },
    /// Regress adjusted close on open and headline sentiment.
    ModelNews {
        ticker: String,

        #[arg(long)]
        start: Option<String>,

        #[arg(long)]
        pages: Option<u32>,
    },
    /// Regress adjusted close on open and post sentiment.
    ModelTweets { ticker: String },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached artifacts with row counts, date spans and sizes.
    Status,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let mut config = SessionConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.cache_dir {
        config.cache_dir = dir;
    }
    config.validate()?;

    let today = chrono::Local::now().date_naive();
    let as_of = match cli.as_of.as_deref() {
        Some(s) => parse_date("--as-of", s)?,
        None => today,
    };
    if as_of > today {
        bail!("--as-of {as_of} is in the future");
    }
    debug!(%as_of, cache_dir = %config.cache_dir.display(), "resolved settings");

    match cli.command {
        Commands::Cache { action } => {
            println!("{}", run_cache(&config.cache_dir, action)?);
            Ok(())
        }
        Commands::Analysis(command) => {
            let session = Session::open(config, as_of)?;
            run(&session, command)
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Cache commands read the cache directory directly; no session is opened.
fn run_cache(cache_dir: &Path, action: CacheAction) -> Result<String> {
    match action {
        CacheAction::Status => {
            let entries = FileStore::new(cache_dir)
                .status()
                .with_context(|| format!("reading cache {}", cache_dir.display()))?;
            Ok(cache_status_report(cache_dir, &entries))
        }
    }
}

fn run(session: &Session, command: AnalysisCommand) -> Result<()> {
    let as_of = session.as_of();
    match command {
        AnalysisCommand::Price { ticker, start, end } => {
            let (start, end) = price_window(as_of, start, end)?;
            let history = session.price_history(&ticker, start, end)?;
            println!("{} daily prices, {start} to {end}", ticker.to_uppercase());
            println!("{}", price_history_report(&history));
        }
        AnalysisCommand::News { ticker, pages } => {
            let headlines = session.latest_headlines(&ticker, pages)?;
            println!("{}", headlines_report(&ticker.to_uppercase(), &headlines));
        }
        AnalysisCommand::Tweets { ticker } => {
            let breakdown = session.post_sentiment_breakdown(&ticker)?;
            println!("{} daily post sentiment", ticker.to_uppercase());
            println!("{}", daily_table_report(&breakdown));
        }
        AnalysisCommand::Profile { ticker } => {
            let profile = session.profile(&ticker)?;
            println!("{}", profile_report(&ticker.to_uppercase(), &profile));
        }
        AnalysisCommand::NewsVsPrice {
            ticker,
            start,
            pages,
        } => {
            let (start, _) = price_window(as_of, start, None)?;
            let aligned = session.news_vs_price(&ticker, start, pages)?;
            println!("{}", aligned_report(&aligned));
        }
        AnalysisCommand::TweetsVsPrice { ticker } => {
            let aligned = session.posts_vs_price(&ticker)?;
            println!("{}", aligned_report(&aligned));
        }
        AnalysisCommand::ComparePrices {
            tickers,
            start,
            end,
        } => {
            let (start, end) = price_window(as_of, start, end)?;
            let aligned = session.compare_prices(&tickers, start, end)?;
            println!("{}", aligned_report(&aligned));
        }
        AnalysisCommand::CompareNews { tickers, pages } => {
            let aligned = session.compare_news_sentiment(&tickers, pages)?;
            println!("{}", aligned_report(&aligned));
        }
        AnalysisCommand::CompareTweets { tickers } => {
            let aligned = session.compare_post_sentiment(&tickers)?;
            println!("{}", aligned_report(&aligned));
        }
        AnalysisCommand::ModelNews {
            ticker,
            start,
            pages,
        } => {
            let (start, _) = price_window(as_of, start, None)?;
            let fit = session.model_news(&ticker, start, pages)?;
            println!("{}", fit.summary());
        }
        AnalysisCommand::ModelTweets { ticker } => {
            let fit = session.model_posts(&ticker)?;
            println!("{}", fit.summary());
        }
    }
    Ok(())
}

fn parse_date(flag: &str, s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("{flag} must be YYYY-MM-DD, got '{s}'"))
}

/// Resolve `--start`/`--end`; the window may not run past the as-of day.
fn price_window(
    as_of: NaiveDate,
    start: Option<String>,
    end: Option<String>,
) -> Result<(NaiveDate, NaiveDate)> {
    let start = match start.as_deref() {
        Some(s) => parse_date("--start", s)?,
        None => as_of - Duration::days(DEFAULT_LOOKBACK_DAYS),
    };
    let end = match end.as_deref() {
        Some(s) => parse_date("--end", s)?,
        None => as_of,
    };
    if end > as_of {
        bail!("--end {end} is after the as-of day {as_of}");
    }
    if start >= end {
        bail!("--start {start} must be before --end {end}");
    }
    Ok((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn window_defaults_to_lookback_before_as_of() {
        let (start, end) = price_window(d(3, 10), None, None).unwrap();
        assert_eq!(end, d(3, 10));
        assert_eq!(start, d(3, 10) - Duration::days(DEFAULT_LOOKBACK_DAYS));
    }

    #[test]
    fn window_rejects_bad_dates() {
        assert!(price_window(d(3, 10), Some("2024-13-01".into()), None).is_err());
        assert!(price_window(d(3, 10), None, Some("2024-03-11".into())).is_err());
        assert!(price_window(d(3, 10), Some("2024-03-10".into()), Some("2024-03-10".into())).is_err());
        assert!(price_window(d(3, 10), Some("2024-03-01".into()), Some("2024-03-05".into())).is_ok());
    }

    #[test]
    fn subcommands_parse() {
        let cli = Cli::try_parse_from(["sentlab", "compare-prices", "AAPL", "MSFT", "--start", "2024-01-02"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Analysis(AnalysisCommand::ComparePrices { ref tickers, .. }) if tickers.len() == 2
        ));

        let cli = Cli::try_parse_from(["sentlab", "--as-of", "2024-03-10", "cache", "status"]).unwrap();
        assert_eq!(cli.as_of.as_deref(), Some("2024-03-10"));
        assert!(matches!(cli.command, Commands::Cache { action: CacheAction::Status }));

        assert!(Cli::try_parse_from(["sentlab", "compare-news"]).is_err());
    }

    #[test]
    fn cache_status_reads_the_directory_without_a_session() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("never-created");

        let report = run_cache(&missing, CacheAction::Status).unwrap();

        assert!(report.starts_with("Cache is empty"));
        assert!(!missing.exists());
    }
}
