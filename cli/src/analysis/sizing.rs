use crate::error::{AppError, Result};
use crate::models::{AccountBalances, TradeAmount, TradeSignal};
use serde::Serialize;

/// Lot and notional constraints of one exchange symbol
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SymbolRules {
    pub step_size: f64,
    pub min_qty: f64,
    pub min_notional: f64,
}

impl Default for SymbolRules {
    fn default() -> Self {
        Self {
            step_size: 0.000_001,
            min_qty: 0.0,
            min_notional: 0.0,
        }
    }
}

/// Floor `quantity` to a multiple of `step`
pub fn floor_to_step(quantity: f64, step: f64) -> f64 {
    if step <= 0.0 {
        return quantity;
    }
    // Nudge by a tiny epsilon so 0.3 / 0.1 doesn't floor to 2
    let steps = (quantity / step + 1e-9).floor();
    let decimals = (-step.log10()).ceil().max(0.0) as i32;
    let factor = 10f64.powi(decimals);
    (steps * step * factor).round() / factor
}

/// Size the next order from the allocated pot.
///
/// BUY spends `min(budget, free stable balance)`; SELL liquidates the free coin
/// balance. Returns `Ok(None)` when the result falls below the symbol minimums.
pub fn calculate_trade_amount(
    signal: TradeSignal,
    close: f64,
    budget: f64,
    balances: &AccountBalances,
    rules: &SymbolRules,
) -> Result<Option<TradeAmount>> {
    if close <= 0.0 {
        return Err(AppError::InvalidInput(format!("Invalid close price {}", close)));
    }

    let raw_quantity = match signal {
        TradeSignal::Buy => budget.min(balances.stable_free).max(0.0) / close,
        TradeSignal::Sell => balances.coin_free.max(0.0),
        TradeSignal::NoSignal => return Ok(None),
    };

    let quantity = floor_to_step(raw_quantity, rules.step_size);
    let quote_amount = quantity * close;

    if quantity <= 0.0 || quantity < rules.min_qty || quote_amount < rules.min_notional {
        return Ok(None);
    }

    Ok(Some(TradeAmount { quantity, quote_amount }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> SymbolRules {
        SymbolRules {
            step_size: 0.001,
            min_qty: 0.001,
            min_notional: 10.0,
        }
    }

    #[test]
    fn test_floor_to_step() {
        assert_eq!(floor_to_step(1.23456, 0.01), 1.23);
        assert_eq!(floor_to_step(0.3, 0.1), 0.3);
        assert_eq!(floor_to_step(5.0, 1.0), 5.0);
        assert_eq!(floor_to_step(0.0009, 0.001), 0.0);
    }

    #[test]
    fn test_buy_limited_by_budget() {
        let balances = AccountBalances { coin_free: 0.0, stable_free: 1000.0 };
        let amount = calculate_trade_amount(TradeSignal::Buy, 100.0, 50.0, &balances, &rules())
            .unwrap()
            .unwrap();
        assert_eq!(amount.quantity, 0.5);
        assert!((amount.quote_amount - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_buy_limited_by_balance() {
        let balances = AccountBalances { coin_free: 0.0, stable_free: 20.0 };
        let amount = calculate_trade_amount(TradeSignal::Buy, 100.0, 50.0, &balances, &rules())
            .unwrap()
            .unwrap();
        assert_eq!(amount.quantity, 0.2);
    }

    #[test]
    fn test_sell_below_min_notional() {
        let balances = AccountBalances { coin_free: 0.05, stable_free: 0.0 };
        let amount = calculate_trade_amount(TradeSignal::Sell, 100.0, 50.0, &balances, &rules()).unwrap();
        assert!(amount.is_none());
    }

    #[test]
    fn test_sell_whole_balance() {
        let balances = AccountBalances { coin_free: 1.23456, stable_free: 0.0 };
        let amount = calculate_trade_amount(TradeSignal::Sell, 100.0, 50.0, &balances, &rules())
            .unwrap()
            .unwrap();
        assert_eq!(amount.quantity, 1.234);
    }

    #[test]
    fn test_invalid_close() {
        let balances = AccountBalances::default();
        assert!(calculate_trade_amount(TradeSignal::Buy, 0.0, 50.0, &balances, &rules()).is_err());
    }
}
