//! Derived series computed on demand and never persisted.

pub mod sma;

pub use sma::Sma;

/// Moving-average periods shown alongside price history.
pub const PRICE_SMA_PERIODS: [usize; 3] = [10, 20, 50];
