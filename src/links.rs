//! Marketplace links and MTGO ticket estimates shown next to prices

use crate::config::PricingConfig;
use serde::{Deserialize, Serialize};

const UTM_SOURCE: &str = "mtgpile";

/// Search links for a card on the major marketplaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffiliateLinks {
    pub amazon: String,
    pub tcgplayer: String,
    pub cardkingdom: String,
    pub starcitygames: String,
}

impl AffiliateLinks {
    /// Builds marketplace search links using the configured affiliate ids
    pub fn for_card(card_name: &str, config: &PricingConfig) -> Self {
        let name = urlencoding::encode(card_name);
        let amazon_text = format!("{} Magic The Gathering card", card_name);
        let amazon_query = urlencoding::encode(&amazon_text);

        Self {
            amazon: format!(
                "https://www.amazon.com/s?k={}&tag={}",
                amazon_query,
                urlencoding::encode(&config.amazon_affiliate_tag)
            ),
            tcgplayer: format!(
                "https://www.tcgplayer.com/search/product/product?q={}&utm_source={}&utm_medium=affiliate&utm_campaign={}",
                name,
                UTM_SOURCE,
                urlencoding::encode(&config.tcgplayer_affiliate_id)
            ),
            cardkingdom: format!("https://www.cardkingdom.com/catalog/search?search={}", name),
            starcitygames: format!("https://starcitygames.com/search/?search_query={}", name),
        }
    }
}

/// Rough MTGO ticket equivalent of a USD price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MtgoTicketEstimate {
    pub tickets: i64,
    pub usd_equivalent: f64,
    pub note: String,
}

/// One ticket is treated as one dollar
pub fn mtgo_ticket_estimate(usd_price: f64) -> MtgoTicketEstimate {
    MtgoTicketEstimate {
        tickets: usd_price.round() as i64,
        usd_equivalent: usd_price,
        note: "Approximate conversion (1 ticket ≈ $1)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_links_are_encoded() {
        let config = PricingConfig {
            amazon_affiliate_tag: "pile-20".to_string(),
            tcgplayer_affiliate_id: "spring".to_string(),
            ..Default::default()
        };
        let links = AffiliateLinks::for_card("Jace, the Mind Sculptor", &config);

        assert_eq!(
            links.amazon,
            "https://www.amazon.com/s?k=Jace%2C%20the%20Mind%20Sculptor%20Magic%20The%20Gathering%20card&tag=pile-20"
        );
        assert_eq!(
            links.tcgplayer,
            "https://www.tcgplayer.com/search/product/product?q=Jace%2C%20the%20Mind%20Sculptor&utm_source=mtgpile&utm_medium=affiliate&utm_campaign=spring"
        );
        assert_eq!(
            links.cardkingdom,
            "https://www.cardkingdom.com/catalog/search?search=Jace%2C%20the%20Mind%20Sculptor"
        );
        assert!(links.starcitygames.ends_with("search_query=Jace%2C%20the%20Mind%20Sculptor"));
    }

    #[test]
    fn test_ticket_estimate_rounds() {
        let estimate = mtgo_ticket_estimate(2.6);
        assert_eq!(estimate.tickets, 3);
        assert_eq!(estimate.usd_equivalent, 2.6);

        assert_eq!(mtgo_ticket_estimate(0.4).tickets, 0);
    }
}
