//! Market price collaborator.
//!
//! Supplies the fiat price used for the fiat balance display. The trait is
//! synchronous over a cached price; [`HttpMarketService`] refreshes that
//! cache from a JSON price API.

use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};

use crate::error::WalletCoreError;

/// Latest market data for the selected fiat currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoinMarketInfo {
    pub price_fiat: Decimal,
    pub selected_fiat: String,
}

pub trait MarketService: Send + Sync {
    fn fiat_currencies(&self) -> Vec<String>;

    /// Switch the quoted fiat currency. Invalidates the cached price until
    /// the next refresh.
    fn change_currency(&self, code: &str);

    /// Latest known price, or `None` when no market data is available.
    fn current_price(&self) -> Option<CoinMarketInfo>;
}

const FIAT_CURRENCIES: [&str; 6] = ["USD", "EUR", "GBP", "JPY", "AUD", "CAD"];

struct MarketState {
    selected_fiat: String,
    price: Option<CoinMarketInfo>,
}

/// Price service backed by a JSON HTTP API.
pub struct HttpMarketService {
    client: reqwest::Client,
    base_url: String,
    state: Mutex<MarketState>,
}

impl HttpMarketService {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            state: Mutex::new(MarketState {
                selected_fiat: "USD".to_string(),
                price: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MarketState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch the current price for the selected currency into the cache.
    pub async fn refresh(&self) -> Result<(), WalletCoreError> {
        let selected = self.lock().selected_fiat.clone();
        let url = format!("{}/price?fiat={}", self.base_url, selected);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| WalletCoreError::Market(e.to_string()))?;

        if !response.status().is_success() {
            log::warn!("market API returned {}", response.status());
            return Ok(());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| WalletCoreError::Market(e.to_string()))?;

        let Some(price_str) = body["price_fiat"].as_str() else {
            log::warn!("market API response missing price_fiat");
            return Ok(());
        };
        let price = Decimal::from_str(price_str)
            .map_err(|e| WalletCoreError::Market(e.to_string()))?;

        let mut state = self.lock();
        // The selection may have changed while the request was in flight.
        if state.selected_fiat == selected {
            state.price = Some(CoinMarketInfo {
                price_fiat: price,
                selected_fiat: selected,
            });
        }
        Ok(())
    }
}

impl MarketService for HttpMarketService {
    fn fiat_currencies(&self) -> Vec<String> {
        FIAT_CURRENCIES.iter().map(|c| c.to_string()).collect()
    }

    fn change_currency(&self, code: &str) {
        let mut state = self.lock();
        if state.selected_fiat != code {
            log::debug!("market currency changed to {}", code);
            state.selected_fiat = code.to_string();
            state.price = None;
        }
    }

    fn current_price(&self) -> Option<CoinMarketInfo> {
        self.lock().price.clone()
    }
}
