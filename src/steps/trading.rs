use crate::context::TradingContext;
use anyhow::Context;
use chrono::Utc;
use marketscan::{
    analysis::calculate_trade_amount,
    models::{TradeSignal, Transaction},
    pipeline::{Step, StepFlow},
    utils::Logger,
};

/// Read the most recent diary entry for this market
pub struct LoadLastTransaction {
    logger: Logger,
}

impl LoadLastTransaction {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("LOAD_LAST_TRANSACTION"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for LoadLastTransaction {
    fn name(&self) -> &'static str {
        "LOAD_LAST_TRANSACTION"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let last = context
            .diary()?
            .last_transaction(&context.config.coin, &context.config.stable_coin)
            .await?;
        match &last {
            Some(t) => self.logger.info(&format!("Last transaction: {}", t.summary())),
            None => self.logger.info("No previous transaction"),
        }
        context.last_transaction = last;
        Ok(StepFlow::Continue)
    }
}

/// Whether `signal` should be acted on given the last recorded one
pub fn is_new_signal(signal: TradeSignal, last: Option<&Transaction>) -> bool {
    signal.is_actionable() && last.map_or(true, |t| t.signal != signal)
}

/// Halt unless the signal differs from the last recorded trade
pub struct CheckIfIsANewSignal;

#[async_trait::async_trait]
impl Step<TradingContext> for CheckIfIsANewSignal {
    fn name(&self) -> &'static str {
        "CHECK_IF_IS_A_NEW_SIGNAL"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        if !context.signal.is_actionable() {
            return Ok(StepFlow::Halt("no signal".to_string()));
        }
        if !is_new_signal(context.signal, context.last_transaction.as_ref()) {
            return Ok(StepFlow::Halt(format!("{} already recorded", context.signal)));
        }
        Ok(StepFlow::Continue)
    }
}

/// Fetch free balances and lot rules
pub struct FetchAccountInfo {
    logger: Logger,
}

impl FetchAccountInfo {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("FETCH_ACCOUNT_INFO"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for FetchAccountInfo {
    fn name(&self) -> &'static str {
        "FETCH_ACCOUNT_INFO"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let exchange = context.exchange()?;
        let config = &context.config;
        let rules = exchange.symbol_rules(&config.market_symbol()).await?;

        let has_credentials = context
            .settings
            .as_ref()
            .is_some_and(|s| s.has_exchange_credentials());
        let balances = if has_credentials {
            exchange.account_balances(&config.coin, &config.stable_coin).await?
        } else if config.dry_run {
            // Simulate a funded account so the sizing can still be exercised
            self.logger.warn("No exchange credentials; simulating balances for the dry run");
            let close = context.close_price()?;
            marketscan::models::AccountBalances {
                coin_free: config.buying_budget / close,
                stable_free: config.buying_budget,
            }
        } else {
            anyhow::bail!("exchange credentials are required to read account balances");
        };

        self.logger.info(&format!(
            "Free {}: {}, free {}: {}",
            config.coin, balances.coin_free, config.stable_coin, balances.stable_free
        ));
        context.symbol_rules = Some(rules);
        context.balances = Some(balances);
        Ok(StepFlow::Continue)
    }
}

/// Size the order from the allocated pot
pub struct CalculateBuySellAmount {
    logger: Logger,
}

impl CalculateBuySellAmount {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("CALCULATE_BUY_SELL_AMOUNT"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for CalculateBuySellAmount {
    fn name(&self) -> &'static str {
        "CALCULATE_BUY_SELL_AMOUNT"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let close = context.close_price()?;
        let balances = context
            .balances
            .as_ref()
            .context("balances missing; FETCH_ACCOUNT_INFO must run first")?;
        let rules = context.symbol_rules.unwrap_or_default();

        let amount = calculate_trade_amount(
            context.signal,
            close,
            context.config.buying_budget,
            balances,
            &rules,
        )?;

        match amount {
            Some(amount) => {
                self.logger.info(&format!(
                    "{} {} {} (~{:.2} {})",
                    context.signal,
                    amount.quantity,
                    context.config.coin,
                    amount.quote_amount,
                    context.config.stable_coin
                ));
                context.trade_amount = Some(amount);
                Ok(StepFlow::Continue)
            }
            None => Ok(StepFlow::Halt(format!(
                "{} amount below the exchange minimums",
                context.signal
            ))),
        }
    }
}

/// Place the market order; dry runs only log it
pub struct ExecuteTrade {
    logger: Logger,
}

impl ExecuteTrade {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("EXECUTE_TRADE"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for ExecuteTrade {
    fn name(&self) -> &'static str {
        "EXECUTE_TRADE"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let amount = context
            .trade_amount
            .context("trade amount missing; CALCULATE_BUY_SELL_AMOUNT must run first")?;

        if context.config.dry_run {
            self.logger.info(&format!(
                "[DRY RUN] would {} {} {}",
                context.signal,
                amount.quantity,
                context.config.market_symbol()
            ));
            return Ok(StepFlow::Continue);
        }

        let order = context
            .exchange()?
            .market_order(&context.config.market_symbol(), context.signal, amount.quantity)
            .await?;
        self.logger.info(&format!(
            "Order {} filled {} for {} {}",
            order.order_id, order.executed_qty, order.quote_qty, context.config.stable_coin
        ));
        context.order = Some(order);
        Ok(StepFlow::Continue)
    }
}

/// Store the trade in the diary
pub struct RecordTransaction {
    logger: Logger,
}

impl RecordTransaction {
    pub fn new() -> Self {
        Self {
            logger: Logger::new("RECORD_TRANSACTION"),
        }
    }
}

#[async_trait::async_trait]
impl Step<TradingContext> for RecordTransaction {
    fn name(&self) -> &'static str {
        "RECORD_TRANSACTION"
    }

    async fn run(&mut self, context: &mut TradingContext) -> anyhow::Result<StepFlow> {
        let close = context.close_price()?;
        let amount = context
            .trade_amount
            .context("trade amount missing; CALCULATE_BUY_SELL_AMOUNT must run first")?;

        // Filled amounts win over the estimate when the exchange reports them
        let (quantity, quote_amount) = match &context.order {
            Some(order) if order.executed_qty > 0.0 => (order.executed_qty, order.quote_qty),
            _ => (amount.quantity, amount.quote_amount),
        };

        let mut transaction = Transaction {
            id: None,
            recorded_at: Utc::now(),
            coin: context.config.coin.clone(),
            stable_coin: context.config.stable_coin.clone(),
            signal: context.signal,
            close_price: close,
            quantity,
            quote_amount,
            order_id: context.order.as_ref().map(|o| o.order_id.clone()),
            dry_run: context.config.dry_run,
        };
        let id = context.diary()?.record(&transaction).await?;
        transaction.id = Some(id);

        self.logger.info(&format!("Recorded #{}: {}", id, transaction.summary()));
        context.transaction = Some(transaction);
        Ok(StepFlow::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;
    use crate::steps::setup::SetupDatabase;
    use marketscan::analysis::SymbolRules;
    use marketscan::models::{AccountBalances, TradeAmount};

    fn transaction(signal: TradeSignal) -> Transaction {
        Transaction {
            id: Some(1),
            recorded_at: Utc::now(),
            coin: "BTC".to_string(),
            stable_coin: "USDT".to_string(),
            signal,
            close_price: 100.0,
            quantity: 0.5,
            quote_amount: 50.0,
            order_id: None,
            dry_run: true,
        }
    }

    #[test]
    fn test_is_new_signal() {
        assert!(is_new_signal(TradeSignal::Buy, None));
        assert!(!is_new_signal(TradeSignal::NoSignal, None));
        assert!(!is_new_signal(TradeSignal::Buy, Some(&transaction(TradeSignal::Buy))));
        assert!(is_new_signal(TradeSignal::Sell, Some(&transaction(TradeSignal::Buy))));
    }

    #[tokio::test]
    async fn test_check_signal_halts() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = test_support::context(dir.path());

        let flow = CheckIfIsANewSignal.run(&mut context).await.unwrap();
        assert_eq!(flow, StepFlow::Halt("no signal".to_string()));

        context.signal = TradeSignal::Buy;
        context.last_transaction = Some(transaction(TradeSignal::Buy));
        let flow = CheckIfIsANewSignal.run(&mut context).await.unwrap();
        assert_eq!(flow, StepFlow::Halt("BUY already recorded".to_string()));

        context.signal = TradeSignal::Sell;
        assert_eq!(CheckIfIsANewSignal.run(&mut context).await.unwrap(), StepFlow::Continue);
    }

    #[tokio::test]
    async fn test_sizing_halts_below_minimum() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = test_support::context(dir.path());
        context.signal = TradeSignal::Buy;
        context.close_price = Some(100.0);
        context.balances = Some(AccountBalances {
            coin_free: 0.0,
            stable_free: 5.0,
        });
        context.symbol_rules = Some(SymbolRules {
            step_size: 0.001,
            min_qty: 0.001,
            min_notional: 10.0,
        });

        let flow = CalculateBuySellAmount::new().run(&mut context).await.unwrap();
        assert!(matches!(flow, StepFlow::Halt(_)));

        context.balances = Some(AccountBalances {
            coin_free: 0.0,
            stable_free: 500.0,
        });
        let flow = CalculateBuySellAmount::new().run(&mut context).await.unwrap();
        assert_eq!(flow, StepFlow::Continue);
        assert_eq!(
            context.trade_amount,
            Some(TradeAmount {
                quantity: 0.5,
                quote_amount: 50.0
            })
        );
    }

    #[tokio::test]
    async fn test_dry_run_trade_is_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let mut context = test_support::context(dir.path());
        SetupDatabase::new().run(&mut context).await.unwrap();

        context.signal = TradeSignal::Buy;
        context.close_price = Some(100.0);
        context.trade_amount = Some(TradeAmount {
            quantity: 0.5,
            quote_amount: 50.0,
        });

        ExecuteTrade::new().run(&mut context).await.unwrap();
        assert!(context.order.is_none());
        RecordTransaction::new().run(&mut context).await.unwrap();

        let recorded = context.transaction.clone().unwrap();
        assert!(recorded.dry_run);
        assert_eq!(recorded.quantity, 0.5);

        LoadLastTransaction::new().run(&mut context).await.unwrap();
        let last = context.last_transaction.unwrap();
        assert_eq!(last.id, recorded.id);
        assert_eq!(last.signal, TradeSignal::Buy);
    }
}
