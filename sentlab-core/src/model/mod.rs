//! Diagnostic regression of price on sentiment.
//!
//! These fits describe association within the aligned sample. They are not
//! forecasts and make no claim about causality.

pub mod diagnostic;
pub mod ols;

pub use diagnostic::{fit_aligned, news_model, social_model, ModelSpec, NEWS_MODEL, SOCIAL_MODEL};
pub use ols::{fit_ols, Coefficient, OlsFit, INTERCEPT};
