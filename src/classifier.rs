//! Competitive printing classification
//!
//! Decides which printings represent the ordinary tournament market price.
//! Collector treatments (full art, showcase frames, premium reprint sets,
//! digital-only cards) are dropped because their prices skew the range.

use crate::constants::{PRIMARY_SET_TYPES, SPECIAL_FRAME_EFFECTS};
use crate::types::{CompetitivePrinting, RawPrinting};

/// Filters raw printings down to the competitive subset
#[derive(Debug, Clone)]
pub struct PrintingClassifier {
    premium_set_types: Vec<String>,
}

impl PrintingClassifier {
    /// Creates a classifier that treats the given set types as premium
    pub fn new(premium_set_types: Vec<String>) -> Self {
        Self { premium_set_types }
    }

    /// Returns true if the printing counts toward competitive pricing
    pub fn is_competitive(&self, printing: &RawPrinting) -> bool {
        if printing.digital {
            return false;
        }
        if printing.promo && !is_tournament_legal(printing) {
            return false;
        }
        if printing.full_art || printing.textless {
            return false;
        }
        if printing.variation && !is_main_printing(printing) {
            return false;
        }
        if printing
            .frame_effects
            .iter()
            .any(|effect| SPECIAL_FRAME_EFFECTS.contains(&effect.as_str()))
        {
            return false;
        }
        !self.is_premium_set(&printing.set_type)
    }

    /// Keeps the competitive printings, preserving provider order
    pub fn classify(&self, printings: Vec<RawPrinting>) -> Vec<CompetitivePrinting> {
        printings
            .into_iter()
            .filter(|p| self.is_competitive(p))
            .map(CompetitivePrinting::new)
            .collect()
    }

    fn is_premium_set(&self, set_type: &str) -> bool {
        self.premium_set_types.iter().any(|t| t == set_type)
    }
}

impl Default for PrintingClassifier {
    fn default() -> Self {
        Self::new(
            crate::constants::PREMIUM_SET_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }
}

/// Narrows to printings from `set_code` when that set has any
///
/// Falls back to the full list so a set with no competitive printing still
/// gets a market range.
pub fn prefer_set(
    printings: Vec<CompetitivePrinting>,
    set_code: Option<&str>,
) -> Vec<CompetitivePrinting> {
    let Some(code) = set_code else {
        return printings;
    };
    if !printings.iter().any(|p| p.set.eq_ignore_ascii_case(code)) {
        return printings;
    }
    printings
        .into_iter()
        .filter(|p| p.set.eq_ignore_ascii_case(code))
        .collect()
}

// Promo legality is not exposed by the provider; every promo is accepted.
fn is_tournament_legal(_printing: &RawPrinting) -> bool {
    true
}

fn is_main_printing(printing: &RawPrinting) -> bool {
    PRIMARY_SET_TYPES.contains(&printing.set_type.as_str())
}
