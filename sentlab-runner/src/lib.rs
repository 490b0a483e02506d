//! Sentlab Runner: analysis sessions over the core pipeline.
//!
//! This crate builds on `sentlab-core` to provide:
//! - TOML session configuration with validation
//! - Sessions that fetch, enrich, align and model for one as-of day
//! - Plain-text reports for the terminal

pub mod config;
pub mod report;
pub mod session;

pub use config::{twitter_token, ConfigError, HttpSettings, SessionConfig, CONFIG_FILE_NAME};
pub use session::{Headline, PriceHistory, Session, SessionError, Sources, BREAKDOWN_COLUMNS};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<SessionConfig>();
        assert_sync::<SessionConfig>();
        assert_send::<ConfigError>();
        assert_sync::<ConfigError>();
    }

    #[test]
    fn session_outputs_are_send_sync() {
        assert_send::<PriceHistory>();
        assert_sync::<PriceHistory>();
        assert_send::<Headline>();
        assert_sync::<Headline>();
        assert_send::<SessionError>();
        assert_sync::<SessionError>();
    }
}
