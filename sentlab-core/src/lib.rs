//! Sentlab Core: acquisition, caching, enrichment, alignment and diagnostic
//! modelling of daily market signals.
//!
//! This crate contains the pipeline:
//! - Deterministic dataset keys and a swappable dataset store
//! - Fetchers for price bars, headlines, social posts and company profiles
//! - Enrichers that append price-move and sentiment columns
//! - An N-way date aligner
//! - OLS diagnostics of price against sentiment

pub mod align;
pub mod data;
pub mod enrich;
pub mod fetch;
pub mod indicators;
pub mod model;

pub use align::{aggregate_daily, align, AlignedDataset, DailyTable, MIN_USABLE_ROWS};
pub use data::{DataError, Dataset, DatasetKey, DatasetKind, DatasetStore, FileStore, MemoryStore};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: data types handed across threads by embedders are
    /// Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<data::Dataset>();
        require_sync::<data::Dataset>();
        require_send::<data::DatasetKey>();
        require_sync::<data::DatasetKey>();
        require_send::<data::DataError>();
        require_sync::<data::DataError>();
        require_send::<data::FileStore>();
        require_sync::<data::FileStore>();
        require_send::<data::MemoryStore>();
        require_sync::<data::MemoryStore>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();

        require_send::<align::DailyTable>();
        require_sync::<align::DailyTable>();
        require_send::<align::AlignedDataset>();
        require_sync::<align::AlignedDataset>();
        require_send::<model::OlsFit>();
        require_sync::<model::OlsFit>();
    }

    /// Architecture contract: fetchers see sources only through the traits,
    /// so any backend can sit behind them.
    #[test]
    fn fetchers_accept_trait_objects() {
        fn _check(
            store: &dyn data::DatasetStore,
            prices: &dyn data::PriceSource,
            headlines: &dyn data::HeadlineSource,
        ) {
            let day = chrono::NaiveDate::default();
            let _ = fetch::fetch_prices(store, prices, "X", day, day);
            let _ = fetch::fetch_headlines(store, headlines, "X", 1, day);
        }
    }
}
