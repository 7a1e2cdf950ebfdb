//! Runtime configuration for the pricing service
//!
//! Defaults come from `constants`. Tests build isolated services with their
//! own limits through the `with_*` builders; deployments can override the
//! tunable values through `CARD_PRICING_*` environment variables.

use crate::constants::{
    CACHE_TTL_SECS, MAX_CONCURRENT_REQUESTS, PREMIUM_SET_TYPES, REQUEST_DELAY_MS,
    SCRYFALL_API_URL,
};
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;

/// Configuration injected into `CardPricingService`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Maximum simultaneous outbound fetches
    pub max_concurrent: usize,
    /// Pause after each fetch before the next queued one may start
    #[serde(with = "duration_ms")]
    pub request_delay: Duration,
    /// Freshness window for cached results
    #[serde(with = "duration_secs")]
    pub cache_ttl: Duration,
    /// Base URL of the card-data API
    pub api_url: String,
    /// Set types excluded from competitive pricing
    pub premium_set_types: Vec<String>,
    /// Amazon associate tag used in marketplace links
    pub amazon_affiliate_tag: String,
    /// TCGplayer campaign id used in marketplace links
    pub tcgplayer_affiliate_id: String,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            max_concurrent: MAX_CONCURRENT_REQUESTS,
            request_delay: Duration::from_millis(REQUEST_DELAY_MS),
            cache_ttl: Duration::from_secs(CACHE_TTL_SECS),
            api_url: SCRYFALL_API_URL.to_string(),
            premium_set_types: PREMIUM_SET_TYPES.iter().map(|s| s.to_string()).collect(),
            amazon_affiliate_tag: "your-tag".to_string(),
            tcgplayer_affiliate_id: "your-id".to_string(),
        }
    }
}

impl PricingConfig {
    /// Defaults overridden by any `CARD_PRICING_*` environment variables
    ///
    /// Values that fail to parse are ignored with a warning.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_parse::<usize>("CARD_PRICING_MAX_CONCURRENT") {
            config.max_concurrent = n.max(1);
        }
        if let Some(ms) = env_parse::<u64>("CARD_PRICING_REQUEST_DELAY_MS") {
            config.request_delay = Duration::from_millis(ms);
        }
        if let Some(secs) = env_parse::<u64>("CARD_PRICING_CACHE_TTL_SECS") {
            config.cache_ttl = Duration::from_secs(secs);
        }
        if let Ok(url) = std::env::var("CARD_PRICING_API_URL") {
            config.api_url = url.trim_end_matches('/').to_string();
        }
        if let Ok(tag) = std::env::var("CARD_PRICING_AMAZON_TAG") {
            config.amazon_affiliate_tag = tag;
        }
        if let Ok(id) = std::env::var("CARD_PRICING_TCGPLAYER_ID") {
            config.tcgplayer_affiliate_id = id;
        }

        config
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn with_premium_set_types(mut self, set_types: &[&str]) -> Self {
        self.premium_set_types = set_types.iter().map(|s| s.to_string()).collect();
        self
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(var = name, value = %raw, "Ignoring unparseable config override");
            None
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
