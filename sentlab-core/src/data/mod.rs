//! Dataset identity, storage, and the external sources behind them.

pub mod circuit_breaker;
pub mod dataset;
pub mod finviz;
pub mod http;
pub mod key;
pub mod news;
pub mod provider;
pub mod store;
pub mod twitter;
pub mod yahoo;

pub use circuit_breaker::{BreakerState, CircuitBreaker};
pub use dataset::{Column, ColumnKind, Dataset, Record, Value};
pub use finviz::FinvizSource;
pub use http::{HttpClient, HttpConfig, HttpReply};
pub use key::{DatasetKey, DatasetKind, KeyParams, SOCIAL_WINDOW_DAYS};
pub use news::BusinessInsiderSource;
pub use provider::{
    DataError, HeadlinePage, HeadlineSource, PostSource, PriceSource, ProfileSource, RawBar,
    RawHeadline, RawPost,
};
pub use store::{CacheEntry, CacheMeta, DatasetStore, FileStore, MemoryStore};
pub use twitter::TwitterSource;
pub use yahoo::YahooPriceSource;
