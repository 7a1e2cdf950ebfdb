//! Competitive card pricing service
//!
//! Composes the provider, classifier, statistics, cache, coalescer and
//! scheduler into a single lookup.

use crate::{
    cancel::CancelSignal,
    classifier::{prefer_set, PrintingClassifier},
    coalescer::RequestCoalescer,
    config::PricingConfig,
    deck::{CardLinePricing, DeckEntry, DeckPricing},
    error::{PricingError, ProviderError},
    links::AffiliateLinks,
    metrics::{FetchMetrics, MetricsCollector},
    provider::PrintingsProvider,
    providers::ScryfallProvider,
    scheduler::RequestScheduler,
    stats::calculate_price_ranges,
    store::PriceCache,
    types::{
        ComponentHealth, HealthStatus, PriceQuery, PricingOptions, PricingResult, RawPrinting,
    },
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Competitive pricing service
///
/// Cheap to clone; clones share the cache, in-flight table and scheduler.
///
/// # Example
/// ```no_run
/// use card_pricing_sdk::{CardPricingService, PricingConfig, PricingOptions};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = CardPricingService::new(PricingConfig::from_env())?;
/// let pricing = service
///     .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
///     .await?;
/// if let Some(range) = pricing.competitive {
///     println!("${:.2} - ${:.2} (median ${:.2})", range.low, range.high, range.median);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CardPricingService {
    config: Arc<PricingConfig>,
    provider: Arc<dyn PrintingsProvider>,
    classifier: Arc<PrintingClassifier>,
    cache: Arc<PriceCache>,
    coalescer: Arc<RequestCoalescer<PricingResult, PricingError>>,
    scheduler: Arc<RequestScheduler>,
    metrics: Arc<MetricsCollector>,
}

impl CardPricingService {
    /// Creates a service backed by Scryfall at `config.api_url`
    pub fn new(config: PricingConfig) -> Result<Self, ProviderError> {
        let provider = ScryfallProvider::new(config.api_url.clone())?;
        Ok(Self::with_provider(Arc::new(provider), config))
    }

    /// Creates a service with a custom provider
    ///
    /// This is primarily for testing with mock providers.
    pub fn with_provider(provider: Arc<dyn PrintingsProvider>, config: PricingConfig) -> Self {
        tracing::info!(
            provider = provider.provider_name(),
            max_concurrent = config.max_concurrent,
            request_delay_ms = config.request_delay.as_millis() as u64,
            cache_ttl_secs = config.cache_ttl.as_secs(),
            "Starting card pricing service"
        );

        Self {
            classifier: Arc::new(PrintingClassifier::new(config.premium_set_types.clone())),
            cache: Arc::new(PriceCache::new(config.cache_ttl)),
            coalescer: Arc::new(RequestCoalescer::new()),
            scheduler: Arc::new(RequestScheduler::new(
                config.max_concurrent,
                config.request_delay,
            )),
            metrics: Arc::new(MetricsCollector::new(provider.provider_name())),
            provider,
            config: Arc::new(config),
        }
    }

    /// Gets competitive pricing for a card
    ///
    /// Fresh cached results are returned without network access. Otherwise
    /// the lookup joins any in-flight computation for the same card and set,
    /// or starts one on the throttled scheduler.
    ///
    /// A `set_code` narrows the aggregated range to that set's printings
    /// when the set has any competitive printing, so the same card can price
    /// differently with and without one.
    ///
    /// When no market data is available (provider failure, unknown card,
    /// everything filtered out) the result is a deterministic estimate with
    /// `estimated == true`. The only error is `PricingError::Cancelled`.
    ///
    /// Cancelling only detaches this caller. The computation keeps running
    /// for any other caller waiting on it and is dropped once none remain.
    pub async fn get_competitive_pricing(
        &self,
        card_name: &str,
        set_code: Option<&str>,
        options: PricingOptions,
    ) -> Result<PricingResult, PricingError> {
        let query = PriceQuery::new(card_name, set_code);
        let key = query.cache_key();

        if let Some(entry) = self.cache.get(&key).await {
            tracing::debug!(key = %key, "Price cache hit");
            return Ok(entry.data);
        }

        let signal = options.signal;
        if signal.as_ref().is_some_and(CancelSignal::is_cancelled) {
            tracing::debug!(key = %key, "Pricing request cancelled before start");
            return Err(PricingError::Cancelled);
        }

        let computation = self
            .coalescer
            .get_or_create(&key, || self.clone().compute(query.clone()));
        let outcome = match &signal {
            Some(signal) => tokio::select! {
                biased;
                _ = signal.cancelled() => {
                    tracing::debug!(key = %key, "Pricing request cancelled");
                    return Err(PricingError::Cancelled);
                }
                outcome = computation => outcome,
            },
            None => computation.await,
        };

        match outcome {
            Ok(result) => Ok(result),
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    provider = self.provider.provider_name(),
                    error = %e,
                    "Pricing computation failed, using estimate"
                );
                // Not cached, so the next request retries the provider
                Ok(PricingResult::estimated(card_name))
            }
        }
    }

    /// One cache-miss computation; runs at most once per key at a time
    ///
    /// Provider and scheduling failures are returned as errors and never
    /// cached. A card without competitive prices caches its estimate.
    async fn compute(self, query: PriceQuery) -> Result<PricingResult, PricingError> {
        let key = query.cache_key();

        // A computation for this key may have finished since the caller's miss
        if let Some(entry) = self.cache.get(&key).await {
            return Ok(entry.data);
        }

        tracing::debug!(key = %key, "Price cache miss, fetching printings");
        let printings = self
            .scheduler
            .schedule(self.timed_fetch(&query.card_name))
            .await
            .map_err(|_| PricingError::internal("request scheduler is closed"))??;

        let result = match self.price_printings(&query, printings) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(key = %key, reason = %e, "No competitive prices, using estimate");
                PricingResult::estimated(&query.card_name)
            }
        };

        self.cache.set(&key, result.clone()).await;
        Ok(result)
    }

    async fn timed_fetch(&self, card_name: &str) -> Result<Vec<RawPrinting>, ProviderError> {
        let start = Instant::now();
        let result = self.provider.fetch_printings(card_name).await;
        let elapsed = start.elapsed();
        self.metrics.record_request(elapsed, result.is_ok()).await;

        if result.is_ok() {
            tracing::debug!(
                card = card_name,
                latency_ms = elapsed.as_millis() as u64,
                "Fetched printings"
            );
        }
        result
    }

    /// Classifies and summarizes fetched printings
    fn price_printings(
        &self,
        query: &PriceQuery,
        printings: Vec<RawPrinting>,
    ) -> Result<PricingResult, PricingError> {
        let total = printings.len();
        let competitive = self.classifier.classify(printings);
        let competitive = prefer_set(competitive, query.set_code.as_deref());

        tracing::debug!(
            card = %query.card_name,
            total,
            competitive = competitive.len(),
            "Classified printings"
        );

        calculate_price_ranges(&competitive).ok_or_else(|| PricingError::no_data(&query.card_name))
    }

    /// Prices every line of a deck
    ///
    /// Lines are priced concurrently; repeated cards share one computation
    /// and the scheduler still bounds outbound load.
    pub async fn get_deck_pricing(
        &self,
        deck: &[DeckEntry],
        options: PricingOptions,
    ) -> Result<DeckPricing, PricingError> {
        let lines = deck.iter().map(|entry| {
            let options = options.clone();
            async move {
                let pricing = self
                    .get_competitive_pricing(&entry.name, entry.set_code.as_deref(), options)
                    .await?;
                Ok::<_, PricingError>(CardLinePricing::new(entry, pricing))
            }
        });
        let cards = futures::future::try_join_all(lines).await?;
        Ok(DeckPricing::from_lines(cards))
    }

    /// Marketplace search links for a card
    pub fn affiliate_links(&self, card_name: &str) -> AffiliateLinks {
        AffiliateLinks::for_card(card_name, &self.config)
    }

    /// Stops outbound fetches; lookups that miss the cache get estimates
    ///
    /// Fetches already running finish. Shared with every clone.
    pub fn shutdown(&self) {
        self.scheduler.close();
        tracing::info!(provider = self.provider.provider_name(), "Card pricing service shut down");
    }

    /// Drops every cached result
    pub async fn clear_cache(&self) {
        self.cache.clear().await;
        tracing::debug!("Price cache cleared");
    }

    /// Returns the name of the current provider
    pub fn provider_name(&self) -> &str {
        self.provider.provider_name()
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Gets fetch metrics including latency percentiles and success rate
    pub async fn fetch_metrics(&self) -> FetchMetrics {
        self.metrics.get_metrics().await
    }

    /// Perform a health check on the pricing service
    pub async fn health_check(&self) -> ComponentHealth {
        let metrics = self.fetch_metrics().await;
        let mut details = HashMap::new();

        details.insert(
            "cached_entries".to_string(),
            serde_json::json!(self.cache.len().await),
        );
        details.insert(
            "fresh_entries".to_string(),
            serde_json::json!(self.cache.fresh_len().await),
        );
        details.insert(
            "in_flight".to_string(),
            serde_json::json!(self.coalescer.in_flight()),
        );
        details.insert(
            "active_requests".to_string(),
            serde_json::json!(self.scheduler.active()),
        );
        details.insert(
            "queued_requests".to_string(),
            serde_json::json!(self.scheduler.queued()),
        );
        details.insert(
            "provider_name".to_string(),
            serde_json::json!(self.provider_name()),
        );
        details.insert(
            "success_rate".to_string(),
            serde_json::json!(metrics.success_rate),
        );

        details.insert(
            "accepting_requests".to_string(),
            serde_json::json!(!self.scheduler.is_closed()),
        );

        let status = if self.scheduler.is_closed()
            || (metrics.total_requests > 0 && metrics.failed_requests == metrics.total_requests)
        {
            HealthStatus::Unhealthy
        } else if metrics.success_rate < 0.5 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        let message = match status {
            HealthStatus::Healthy => "Card pricing service is operational".to_string(),
            HealthStatus::Degraded => format!(
                "Card pricing service has {} failed fetches out of {}",
                metrics.failed_requests, metrics.total_requests
            ),
            HealthStatus::Unhealthy if self.scheduler.is_closed() => {
                "Card pricing service is shut down".to_string()
            }
            HealthStatus::Unhealthy => {
                "Card pricing service has no successful fetches".to_string()
            }
        };

        ComponentHealth {
            name: "card_pricing_service".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelHandle;
    use crate::constants::ESTIMATE_NOTE;
    use crate::provider::mock::MockProvider;
    use crate::types::PrintingPrices;
    use std::time::Duration;

    fn printing(set: &str, usd: &str) -> RawPrinting {
        RawPrinting {
            name: "Lightning Bolt".to_string(),
            set: set.to_string(),
            set_name: set.to_uppercase(),
            set_type: "core".to_string(),
            prices: PrintingPrices {
                usd: usd.parse().ok(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn bolt_printings() -> Vec<RawPrinting> {
        vec![
            printing("M10", "1.00"),
            printing("M11", "3.00"),
            printing("M12", "5.00"),
        ]
    }

    fn service(provider: Arc<MockProvider>) -> CardPricingService {
        let config = PricingConfig::default().with_request_delay(Duration::from_millis(10));
        CardPricingService::with_provider(provider, config)
    }

    #[tokio::test]
    async fn test_scenario_three_printings() {
        let provider = Arc::new(MockProvider::new());
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        let result = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();

        let range = result.competitive.unwrap();
        assert_eq!(
            (range.low, range.high, range.median, range.average, range.count),
            (1.00, 5.00, 3.00, 3.00, 3)
        );
        assert!(result.foil.is_none());
        assert!(!result.estimated);
        assert_eq!(result.printings, 3);
    }

    #[tokio::test]
    async fn test_cached_result_is_reused() {
        let provider = Arc::new(MockProvider::new());
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        let first = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        let second = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_entry_is_recomputed() {
        let provider = Arc::new(MockProvider::new());
        provider.set_printings("Lightning Bolt", bolt_printings());
        let config = PricingConfig::default()
            .with_request_delay(Duration::ZERO)
            .with_cache_ttl(Duration::from_secs(60));
        let service = CardPricingService::with_provider(provider.clone(), config);

        service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(50)));
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        let calls = (0..10).map(|_| {
            service.get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
        });
        let results = futures::future::join_all(calls).await;

        assert_eq!(provider.call_count(), 1);
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert_eq!(result.as_ref().unwrap(), first);
        }
        assert_eq!(service.coalescer.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_set_code_is_part_of_the_key() {
        let provider = Arc::new(MockProvider::new());
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        let any = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        let m11 = service
            .get_competitive_pricing("Lightning Bolt", Some("m11"), PricingOptions::default())
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 2);
        assert_eq!(any.competitive.unwrap().count, 3);
        let m11_range = m11.competitive.unwrap();
        assert_eq!(m11_range.count, 1);
        assert_eq!(m11_range.median, 3.00);
    }

    #[tokio::test]
    async fn test_all_filtered_returns_cached_estimate() {
        let provider = Arc::new(MockProvider::new());
        let digital: Vec<RawPrinting> = bolt_printings()
            .into_iter()
            .map(|mut p| {
                p.digital = true;
                p
            })
            .collect();
        provider.set_printings("Lightning Bolt", digital);
        let service = service(provider.clone());

        let result = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();

        assert!(result.estimated);
        assert_eq!(result.note, ESTIMATE_NOTE);
        assert_eq!(result.competitive.unwrap().count, 1);
        assert!(result.foil.is_none());

        let again = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        assert_eq!(again, result);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_borderless_printing_never_contributes() {
        let provider = Arc::new(MockProvider::new());
        let mut borderless = printing("2XM", "250.00");
        borderless.frame_effects = vec!["borderless".to_string()];
        provider.set_printings(
            "Lightning Bolt",
            vec![printing("M10", "1.00"), borderless, printing("M11", "3.00")],
        );
        let service = service(provider);

        let result = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        let range = result.competitive.unwrap();
        assert_eq!(range.high, 3.00);
        assert_eq!(range.count, 2);
        assert_eq!(result.printings, 2);
    }

    #[tokio::test]
    async fn test_provider_failure_is_estimated_and_not_cached() {
        let provider = Arc::new(MockProvider::new());
        provider.set_rate_limited("Lightning Bolt");
        let service = service(provider.clone());

        let result = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        assert!(result.estimated);
        assert_eq!(
            result.competitive,
            PricingResult::estimated("Lightning Bolt").competitive
        );

        provider.set_printings("Lightning Bolt", bolt_printings());
        let recovered = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        assert!(!recovered.estimated);
        assert_eq!(provider.call_count(), 2);

        let metrics = service.fetch_metrics().await;
        assert_eq!(metrics.total_requests, 2);
        assert_eq!(metrics.failed_requests, 1);
    }

    #[tokio::test]
    async fn test_cancelled_request_leaves_no_trace() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(200)));
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        let handle = CancelHandle::new();
        let pending = {
            let service = service.clone();
            let options = PricingOptions::with_signal(handle.signal());
            tokio::spawn(async move {
                service
                    .get_competitive_pricing("Lightning Bolt", None, options)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        assert_eq!(pending.await.unwrap(), Err(PricingError::Cancelled));
        assert!(service.cache.get("Lightning Bolt_any").await.is_none());
        assert_eq!(service.coalescer.in_flight(), 0);

        let fresh = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        assert!(!fresh.estimated);
        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_caller_cancelling_does_not_affect_waiter() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(100)));
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        let handle = CancelHandle::new();
        let cancelled = {
            let service = service.clone();
            let options = PricingOptions::with_signal(handle.signal());
            tokio::spawn(async move {
                service
                    .get_competitive_pricing("Lightning Bolt", None, options)
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        let waiter = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.cancel();

        assert_eq!(cancelled.await.unwrap(), Err(PricingError::Cancelled));
        let result = waiter.await.unwrap().unwrap();
        assert!(!result.estimated);
        assert_eq!(provider.call_count(), 1);
        assert!(service.cache.get("Lightning Bolt_any").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_joined_caller_can_cancel_without_waiting() {
        let provider = Arc::new(MockProvider::new().with_delay(Duration::from_millis(500)));
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        let owner = {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(service.coalescer.is_in_flight("Lightning Bolt_any"));

        let handle = CancelHandle::new();
        let joined = {
            let service = service.clone();
            let options = PricingOptions::with_signal(handle.signal());
            tokio::spawn(async move {
                let start = tokio::time::Instant::now();
                let result = service
                    .get_competitive_pricing("Lightning Bolt", None, options)
                    .await;
                (result, start.elapsed())
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();

        let (result, elapsed) = joined.await.unwrap();
        assert_eq!(result, Err(PricingError::Cancelled));
        assert!(elapsed < Duration::from_millis(100), "cancel took {elapsed:?}");

        let owned = owner.await.unwrap().unwrap();
        assert!(!owned.estimated);
        assert_eq!(owned.competitive.unwrap().median, 3.00);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_already_cancelled_signal_skips_fetch() {
        let provider = Arc::new(MockProvider::new());
        let service = service(provider.clone());
        let handle = CancelHandle::new();
        handle.cancel();

        let result = service
            .get_competitive_pricing(
                "Lightning Bolt",
                None,
                PricingOptions::with_signal(handle.signal()),
            )
            .await;
        assert_eq!(result, Err(PricingError::Cancelled));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_clear_cache_forces_refetch() {
        let provider = Arc::new(MockProvider::new());
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();
        service.clear_cache().await;
        service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();

        assert_eq!(provider.call_count(), 2);
    }

    #[tokio::test]
    async fn test_deck_pricing() {
        let provider = Arc::new(MockProvider::new());
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        let deck = vec![
            DeckEntry::new("Lightning Bolt", 4),
            DeckEntry::new("Lightning Bolt", 1).sideboard(),
        ];
        let pricing = service
            .get_deck_pricing(&deck, PricingOptions::default())
            .await
            .unwrap();

        assert_eq!(pricing.cards.len(), 2);
        assert_eq!(pricing.mainboard_value, 12.0);
        assert_eq!(pricing.sideboard_value, 3.0);
        assert_eq!(pricing.total_value, 15.0);
        assert_eq!(provider.calls_for("Lightning Bolt"), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_fetches_without_caching() {
        let provider = Arc::new(MockProvider::new());
        provider.set_printings("Lightning Bolt", bolt_printings());
        let service = service(provider.clone());

        service.shutdown();
        let result = service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();

        assert!(result.estimated);
        assert_eq!(provider.call_count(), 0);
        assert!(service.cache.is_empty().await);

        let health = service.health_check().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.details["accepting_requests"], serde_json::json!(false));
    }

    #[tokio::test]
    async fn test_health_check_reflects_fetch_failures() {
        let provider = Arc::new(MockProvider::new());
        provider.set_error("Lightning Bolt", "HTTP 503");
        let service = service(provider.clone());

        assert_eq!(service.health_check().await.status, HealthStatus::Healthy);

        service
            .get_competitive_pricing("Lightning Bolt", None, PricingOptions::default())
            .await
            .unwrap();

        let health = service.health_check().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);
        assert_eq!(health.details["cached_entries"], serde_json::json!(0));
        assert_eq!(health.details["provider_name"], serde_json::json!("mock"));
    }
}
