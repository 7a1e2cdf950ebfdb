use card_pricing_sdk::{
    mtgo_ticket_estimate, CancelHandle, CardPricingService, PricingConfig, PricingOptions,
};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let card_name = args.next().unwrap_or_else(|| "Lightning Bolt".to_string());
    let set_code = args.next();

    let service = CardPricingService::new(PricingConfig::from_env())?;

    println!("Competitive pricing for {} ({})", card_name, service.provider_name());
    println!("-------------------------------------------");

    // Abandon the lookup if the provider takes too long
    let handle = CancelHandle::new();
    let timeout = {
        let handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(30)).await;
            handle.cancel();
        })
    };

    let start = Instant::now();
    let pricing = service
        .get_competitive_pricing(
            &card_name,
            set_code.as_deref(),
            PricingOptions::with_signal(handle.signal()),
        )
        .await;
    timeout.abort();

    let pricing = match pricing {
        Ok(pricing) => pricing,
        Err(e) => {
            eprintln!("Lookup did not complete: {}", e);
            return Ok(());
        }
    };
    let fetch_latency = start.elapsed();

    match &pricing.competitive {
        Some(range) => {
            println!("   Low:     ${:.2}", range.low);
            println!("   Median:  ${:.2}", range.median);
            println!("   Average: ${:.2}", range.average);
            println!("   High:    ${:.2}", range.high);
            println!("   Prices:  {}", range.count);
            let tickets = mtgo_ticket_estimate(range.median);
            println!("   MTGO:    ~{} tix ({})", tickets.tickets, tickets.note);
        }
        None => println!("   No competitive range"),
    }
    if let Some(foil) = &pricing.foil {
        println!("   Foil:    ${:.2} - ${:.2}", foil.low, foil.high);
    }
    println!("   {}", pricing.note);
    println!("   Fetched in {:?}", fetch_latency);
    println!();

    let start = Instant::now();
    service
        .get_competitive_pricing(&card_name, set_code.as_deref(), PricingOptions::default())
        .await?;
    println!("Cached lookup in {:?}", start.elapsed());

    let links = service.affiliate_links(&card_name);
    println!();
    println!("TCGplayer:    {}", links.tcgplayer);
    println!("Card Kingdom: {}", links.cardkingdom);

    let metrics = service.fetch_metrics().await;
    println!(
        "Provider {}: p50={:.0}ms, success_rate={:.1}%",
        metrics.provider_name,
        metrics.latency_p50_ms,
        metrics.success_rate * 100.0
    );

    Ok(())
}
