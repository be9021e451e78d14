use super::TradeSignal;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Row of the trade diary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: Option<i64>,
    pub recorded_at: DateTime<Utc>,
    pub coin: String,
    pub stable_coin: String,
    pub signal: TradeSignal,
    pub close_price: f64,
    pub quantity: f64,
    pub quote_amount: f64,
    pub order_id: Option<String>,
    pub dry_run: bool,
}

impl Transaction {
    pub fn market_symbol(&self) -> String {
        format!("{}{}", self.coin, self.stable_coin)
    }

    /// Single-line summary used for notifications
    pub fn summary(&self) -> String {
        format!(
            "{}{} {} {:.8} {} @ {:.8} ({:.2} {}){}",
            if self.dry_run { "[DRY RUN] " } else { "" },
            self.signal,
            self.market_symbol(),
            self.quantity,
            self.coin,
            self.close_price,
            self.quote_amount,
            self.stable_coin,
            self.order_id
                .as_ref()
                .map(|id| format!(" order={}", id))
                .unwrap_or_default()
        )
    }
}

/// Balances relevant to one market
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct AccountBalances {
    pub coin_free: f64,
    pub stable_free: f64,
}

/// Quantity/amount decided for the next order
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TradeAmount {
    pub quantity: f64,
    pub quote_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_mentions_dry_run() {
        let tx = Transaction {
            id: None,
            recorded_at: Utc::now(),
            coin: "BTC".to_string(),
            stable_coin: "USDT".to_string(),
            signal: TradeSignal::Buy,
            close_price: 50000.0,
            quantity: 0.001,
            quote_amount: 50.0,
            order_id: None,
            dry_run: true,
        };
        let summary = tx.summary();
        assert!(summary.starts_with("[DRY RUN] BUY BTCUSDT"));
        assert!(!summary.contains("order="));
    }
}
