//! Balance and transaction display cache.
//!
//! Pure recomputation over the wallet store and the market price; holds the
//! formatted values the display layer renders. Conversions use exact decimal
//! arithmetic, never floating point.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::error::WalletCoreError;
use crate::market::MarketService;
use crate::store::WalletStore;

/// Drops per CSC; balances arrive from the store in drops.
const DROPS_PER_CSC: u64 = 1_000_000;

/// CSC balances display with six decimal places, fiat values with two.
const CSC_SCALE: u32 = 6;
const FIAT_SCALE: u32 = 2;

pub fn drops_to_csc(drops: &str) -> Result<Decimal, WalletCoreError> {
    let drops = Decimal::from_str(drops)
        .map_err(|e| WalletCoreError::Internal(format!("invalid drops value: {}", e)))?;
    Ok(drops / Decimal::from(DROPS_PER_CSC))
}

fn format_scaled(mut value: Decimal, scale: u32) -> String {
    value.rescale(scale);
    value.to_string()
}

#[derive(Debug, Clone, Default)]
pub struct DisplayCache {
    pub balance_csc: String,
    pub fiat_value: Option<String>,
    pub transaction_count: u64,
    pub last_transaction: Option<i64>,
}

impl DisplayCache {
    /// Recompute the balance display from the store, converting to fiat when
    /// market data is present. Without a market price the fiat value stays
    /// unset, not zero.
    pub fn refresh_balance(
        &mut self,
        store: &dyn WalletStore,
        market: &dyn MarketService,
    ) -> Result<(), WalletCoreError> {
        let drops = store.balance().unwrap_or_else(|| "0".to_string());
        let csc = drops_to_csc(&drops)?;
        self.balance_csc = format_scaled(csc, CSC_SCALE);
        self.fiat_value = market
            .current_price()
            .map(|info| format_scaled(csc * info.price_fiat, FIAT_SCALE));
        Ok(())
    }

    /// Recompute the transaction display from the store.
    pub fn refresh_transactions(&mut self, store: &dyn WalletStore) {
        self.transaction_count = store.tx_count();
        self.last_transaction = store.last_tx().map(|tx| tx.timestamp);
    }
}
