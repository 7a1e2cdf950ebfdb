//! Price range statistics over competitive printings

use crate::constants::{MAX_VALID_PRICE, MIN_VALID_PRICE};
use crate::types::{CompetitivePrinting, PriceRangeSummary, PricingResult};
use chrono::Utc;

/// Round a price to cents
pub fn round_price(price: f64) -> f64 {
    (price * 100.0).round() / 100.0
}

/// True for prices inside the accepted market range
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > MIN_VALID_PRICE && price < MAX_VALID_PRICE
}

/// Summarizes the valid prices in `prices`
///
/// Returns `None` when no price passes validation.
pub fn summarize(prices: &[f64]) -> Option<PriceRangeSummary> {
    let mut valid: Vec<f64> = prices.iter().copied().filter(|p| is_valid_price(*p)).collect();
    if valid.is_empty() {
        return None;
    }
    valid.sort_by(|a, b| a.total_cmp(b));

    let low = round_price(valid[0]);
    let high = round_price(valid[valid.len() - 1]);
    let median = round_price(median(&valid));
    // The mean of sorted values can drift past the ends by a rounding error.
    let average = round_price(average(&valid)).clamp(low, high);

    Some(PriceRangeSummary {
        low,
        high,
        median,
        average,
        count: valid.len(),
    })
}

/// Computes the pricing result for a set of competitive printings
///
/// Non-foil prices come from `usd`; foil prices from `usd_foil` and
/// `usd_etched`. Returns `None` when there is no valid non-foil price.
pub fn calculate_price_ranges(printings: &[CompetitivePrinting]) -> Option<PricingResult> {
    let regular: Vec<f64> = printings.iter().filter_map(|p| p.prices.usd).collect();
    let foil: Vec<f64> = printings
        .iter()
        .flat_map(|p| [p.prices.usd_foil, p.prices.usd_etched])
        .flatten()
        .collect();

    let competitive = summarize(&regular)?;

    Some(PricingResult {
        competitive: Some(competitive),
        foil: summarize(&foil),
        printings: printings.len(),
        last_updated: Utc::now(),
        note: pricing_note(printings),
        estimated: false,
    })
}

/// Human-readable provenance note for a computed range
pub fn pricing_note(printings: &[CompetitivePrinting]) -> String {
    let mut set_types: Vec<&str> = Vec::new();
    for printing in printings {
        if !set_types.contains(&printing.set_type.as_str()) {
            set_types.push(&printing.set_type);
        }
    }
    let has_foil = printings.iter().any(|p| p.has_finish("foil"));

    let mut note = format!("Based on {} competitive printings", printings.len());
    if !set_types.is_empty() {
        note.push_str(&format!(" from {} sets", set_types.join(", ")));
    }
    if has_foil {
        note.push_str(" (includes foil options)");
    }
    note.push_str(". Altered art and special versions excluded.");
    note
}

fn median(sorted: &[f64]) -> f64 {
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn average(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}
