//! Scryfall printings provider implementation

use crate::{
    constants::{REQUEST_TIMEOUT_SECS, SCRYFALL_MAX_PAGES, SCRYFALL_SEARCH_ENDPOINT, USER_AGENT},
    error::ProviderError,
    provider::PrintingsProvider,
    types::RawPrinting,
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// One page of a Scryfall card search
#[derive(Debug, Deserialize)]
struct SearchPage {
    #[serde(default)]
    data: Vec<RawPrinting>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    next_page: Option<String>,
}

/// Scryfall printings provider
pub struct ScryfallProvider {
    client: Client,
    base_url: String,
}

impl ScryfallProvider {
    /// Creates a new Scryfall provider against `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Builds the search URL for every unique printing of an exact card name
    fn build_url(&self, card_name: &str) -> String {
        let query = format!("!\"{}\" unique:prints", card_name);
        format!(
            "{}{}?q={}",
            self.base_url,
            SCRYFALL_SEARCH_ENDPOINT,
            urlencoding::encode(&query)
        )
    }

    /// Fetches and decodes one search page
    ///
    /// Returns `None` for 404, which Scryfall uses for "no cards matched".
    async fn fetch_page(&self, url: &str) -> Result<Option<SearchPage>, ProviderError> {
        tracing::debug!(url, "Fetching printings from Scryfall");

        let response = self.client.get(url).send().await.map_err(map_send_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            StatusCode::TOO_MANY_REQUESTS => return Err(ProviderError::RateLimitExceeded),
            status if !status.is_success() => {
                return Err(ProviderError::ApiError(format!(
                    "HTTP {}: {}",
                    status,
                    response.text().await.unwrap_or_default()
                )));
            }
            _ => {}
        }

        let body = response.text().await.map_err(map_send_error)?;
        let page: SearchPage = serde_json::from_str(&body).map_err(|e| {
            ProviderError::InvalidResponse(format!("Failed to parse Scryfall search page: {}", e))
        })?;

        Ok(Some(page))
    }
}

fn map_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkError(err)
    }
}

#[async_trait]
impl PrintingsProvider for ScryfallProvider {
    async fn fetch_printings(&self, card_name: &str) -> Result<Vec<RawPrinting>, ProviderError> {
        let mut printings = Vec::new();
        let mut url = self.build_url(card_name);

        for page_number in 1..=SCRYFALL_MAX_PAGES {
            let Some(page) = self.fetch_page(&url).await? else {
                break;
            };
            printings.extend(page.data);

            match page.next_page {
                Some(next) if page.has_more => {
                    if page_number == SCRYFALL_MAX_PAGES {
                        tracing::warn!(
                            card = card_name,
                            max_pages = SCRYFALL_MAX_PAGES,
                            fetched = printings.len(),
                            "Page limit reached, printings list is truncated"
                        );
                        break;
                    }
                    url = next;
                }
                _ => break,
            }
        }

        tracing::debug!(
            card = card_name,
            count = printings.len(),
            "Fetched printings from Scryfall"
        );

        Ok(printings)
    }

    fn provider_name(&self) -> &'static str {
        "scryfall"
    }
}
