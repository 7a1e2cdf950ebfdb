//! Deck-level pricing types

use crate::stats::round_price;
use crate::types::PricingResult;
use serde::{Deserialize, Serialize};

/// One line of a deck list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub name: String,
    #[serde(default)]
    pub set_code: Option<String>,
    pub quantity: u32,
    #[serde(default)]
    pub sideboard: bool,
}

impl DeckEntry {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            set_code: None,
            quantity,
            sideboard: false,
        }
    }

    pub fn in_set(mut self, set_code: impl Into<String>) -> Self {
        self.set_code = Some(set_code.into());
        self
    }

    pub fn sideboard(mut self) -> Self {
        self.sideboard = true;
        self
    }
}

/// Pricing for one deck line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardLinePricing {
    pub name: String,
    pub quantity: u32,
    pub sideboard: bool,
    pub pricing: PricingResult,
    /// Median price times quantity; zero without a competitive range
    pub total_value: f64,
}

impl CardLinePricing {
    pub fn new(entry: &DeckEntry, pricing: PricingResult) -> Self {
        let total_value = pricing
            .median()
            .map(|median| median * entry.quantity as f64)
            .unwrap_or(0.0);
        Self {
            name: entry.name.clone(),
            quantity: entry.quantity,
            sideboard: entry.sideboard,
            pricing,
            total_value,
        }
    }
}

/// Pricing for a whole deck list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckPricing {
    pub cards: Vec<CardLinePricing>,
    pub total_value: f64,
    pub mainboard_value: f64,
    pub sideboard_value: f64,
}

impl DeckPricing {
    /// Totals the priced lines, rounding each total to cents
    pub fn from_lines(cards: Vec<CardLinePricing>) -> Self {
        let sum = |sideboard: Option<bool>| {
            cards
                .iter()
                .filter(|c| sideboard.map_or(true, |s| c.sideboard == s))
                .map(|c| c.total_value)
                .sum::<f64>()
        };
        let total_value = round_price(sum(None));
        let mainboard_value = round_price(sum(Some(false)));
        let sideboard_value = round_price(sum(Some(true)));

        Self {
            cards,
            total_value,
            mainboard_value,
            sideboard_value,
        }
    }

    pub fn mainboard(&self) -> impl Iterator<Item = &CardLinePricing> {
        self.cards.iter().filter(|c| !c.sideboard)
    }

    pub fn sideboard(&self) -> impl Iterator<Item = &CardLinePricing> {
        self.cards.iter().filter(|c| c.sideboard)
    }
}
