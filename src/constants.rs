//! Constants for the card pricing service
//!
//! Compile-time defaults live here. `PricingConfig` starts from these values
//! and can override the tunable ones at runtime.

/// How long a computed pricing result stays fresh (in seconds)
pub const CACHE_TTL_SECS: u64 = 30 * 60;

/// Maximum number of outbound fetches running at the same time
pub const MAX_CONCURRENT_REQUESTS: usize = 4;

/// Pause after each outbound fetch before its slot is released (in milliseconds)
pub const REQUEST_DELAY_MS: u64 = 150;

/// HTTP request timeout when fetching printings (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Prices at or below this value are discarded
pub const MIN_VALID_PRICE: f64 = 0.0;

/// Prices at or above this value are discarded
pub const MAX_VALID_PRICE: f64 = 10_000.0;

/// Frame effects that mark a collector treatment rather than a market printing
pub const SPECIAL_FRAME_EFFECTS: &[&str] = &["showcase", "borderless", "extended-art"];

/// Set types whose printings carry a collector premium
pub const PREMIUM_SET_TYPES: &[&str] = &["masterpiece", "from_the_vault", "commander_series"];

/// Set types whose variations still count as the main printing
pub const PRIMARY_SET_TYPES: &[&str] = &["core", "expansion"];

/// Note attached to estimated (non-market) pricing
pub const ESTIMATE_NOTE: &str = "Estimated pricing - real-time data unavailable";

/// Scryfall API base URL
pub const SCRYFALL_API_URL: &str = "https://api.scryfall.com";

/// Scryfall API endpoint for card searches
pub const SCRYFALL_SEARCH_ENDPOINT: &str = "/cards/search";

/// Number of latency samples kept for fetch metrics
pub const METRICS_WINDOW: usize = 100;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "card-pricing-sdk/0.1.0";

/// Upper bound on result pages followed for one search
pub const SCRYFALL_MAX_PAGES: usize = 10;
