//! Fetchers: turn source output into keyed datasets.
//!
//! Every fetcher resolves its [`DatasetKey`](crate::data::DatasetKey) first and
//! goes through [`DatasetStore::get_or_fetch`](crate::data::DatasetStore::get_or_fetch),
//! so a dataset is fetched at most once per key. An empty result is
//! `NoDataInRange` and is never cached.

pub mod headlines;
pub mod price;
pub mod profile;
pub mod social;

pub use headlines::{fetch_headlines, resolve_relative_date, HEADLINE_COLUMN};
pub use price::{bars_to_dataset, fetch_prices, PRICE_COLUMNS};
pub use profile::fetch_profile;
pub use social::{
    clean_post_text, fetch_social_posts, short_company_name, PostCleaner, SocialRequest,
    DEFAULT_MAX_PER_BUCKET, TEXT_COLUMN,
};
