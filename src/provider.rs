//! Provider abstraction for fetching card printings from external APIs

use crate::{error::ProviderError, types::RawPrinting};
use async_trait::async_trait;

/// Trait for card-data providers
///
/// Implementations return every known printing of a card, with pricing and
/// printing metadata (Scryfall, a local mirror, a test double, etc.)
#[async_trait]
pub trait PrintingsProvider: Send + Sync {
    /// Fetches all unique printings for an exact card name
    ///
    /// # Arguments
    /// * `card_name` - Exact card name to search for
    ///
    /// # Returns
    /// The printings found (empty when the card is unknown), or an error if
    /// the provider could not be queried
    async fn fetch_printings(&self, card_name: &str) -> Result<Vec<RawPrinting>, ProviderError>;

    /// Returns the name of this provider
    fn provider_name(&self) -> &'static str;
}
