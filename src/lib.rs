//! # Card Pricing SDK
//!
//! Competitive market pricing for trading cards, computed from every known
//! printing of a card as reported by a card-data provider (Scryfall by
//! default).
//!
//! Raw printings are noisy: showcase frames, full-art promos, digital-only
//! releases and premium reprint sets all carry prices that have little to do
//! with what a player pays for a tournament copy. The service drops those
//! printings, then summarizes the rest into low / high / median / average
//! ranges for regular and foil finishes.
//!
//! ## Usage
//!
//! ```no_run
//! use card_pricing_sdk::{CardPricingService, PricingConfig, PricingOptions};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = CardPricingService::new(PricingConfig::default())?;
//!
//! let pricing = service
//!     .get_competitive_pricing("Lightning Bolt", Some("m10"), PricingOptions::default())
//!     .await?;
//!
//! if let Some(range) = &pricing.competitive {
//!     println!("median ${:.2} over {} prices", range.median, range.count);
//! }
//! if pricing.estimated {
//!     println!("{}", pricing.note);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! get_competitive_pricing
//!     ↓
//! PriceCache (30 min TTL) ── hit ──→ result
//!     ↓ miss
//! RequestCoalescer (one computation per card/set)
//!     ↓
//! RequestScheduler (4 concurrent, 150ms pacing)
//!     ↓
//! PrintingsProvider (Scryfall)
//!     ↓
//! PrintingClassifier → stats → PriceCache
//! ```
//!
//! ## Errors
//!
//! Lookups never fail because of the provider. Network errors, unknown
//! cards and cards with no competitive printing all produce an estimate
//! flagged with `estimated == true`. The one error callers see is
//! `PricingError::Cancelled`, when they cancel through a `CancelSignal`.

pub mod cancel;
pub mod classifier;
pub mod coalescer;
pub mod config;
pub mod constants;
pub mod deck;
pub mod error;
pub mod links;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use cancel::{CancelHandle, CancelSignal};
pub use config::PricingConfig;
pub use deck::{CardLinePricing, DeckEntry, DeckPricing};
pub use error::{PricingError, ProviderError};
pub use links::{mtgo_ticket_estimate, AffiliateLinks, MtgoTicketEstimate};
pub use metrics::FetchMetrics;
pub use provider::PrintingsProvider;
pub use service::CardPricingService;
pub use types::{
    ComponentHealth, HealthStatus, PriceQuery, PriceRangeSummary, PricingOptions, PricingResult,
    RawPrinting,
};
