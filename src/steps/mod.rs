pub mod market;
pub mod notify;
pub mod setup;
pub mod strategy;
pub mod trading;

use crate::{config::BotConfig, context::TradingContext};
use marketscan::pipeline::Pipeline;

/// Steps of one bot run. The account and order chain is only added with `--trade`.
pub fn bot_pipeline(config: &BotConfig) -> Pipeline<TradingContext> {
    let mut pipeline = Pipeline::new("STRAT_BOT")
        .with_step(setup::SetupDatabase::new())
        .with_step(setup::ReadConfiguration::new())
        .with_step(market::FetchDataFromExchange::new())
        .with_step(market::LoadCandles::new())
        .with_step(market::ReSampleData::new())
        .with_step(strategy::CalculateIndicators::new())
        .with_step(strategy::GenerateChart::new())
        .with_step(strategy::IdentifyBuySellSignal::new());

    if config.trade {
        pipeline = pipeline
            .with_step(trading::LoadLastTransaction::new())
            .with_step(trading::CheckIfIsANewSignal)
            .with_step(trading::FetchAccountInfo::new())
            .with_step(trading::CalculateBuySellAmount::new())
            .with_step(trading::ExecuteTrade::new())
            .with_step(trading::RecordTransaction::new())
            .with_step(notify::PublishTransactionOnTelegram::new());
    }

    pipeline.with_step(notify::PublishStrategyChartOnTelegram::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::test_support;

    #[test]
    fn test_pipeline_without_trading() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = test_support::config(dir.path());
        config.trade = false;
        let names = bot_pipeline(&config).step_names();
        assert_eq!(names.len(), 9);
        assert_eq!(names[0], "SETUP_DATABASE");
        assert_eq!(names[7], "IDENTIFY_BUY_SELL_SIGNAL");
        assert_eq!(names[8], "PUBLISH_STRATEGY_CHART_ON_TELEGRAM");
    }

    #[test]
    fn test_pipeline_with_trading() {
        let dir = tempfile::tempdir().unwrap();
        let names = bot_pipeline(&test_support::config(dir.path())).step_names();
        assert_eq!(names.len(), 16);
        assert_eq!(names[9], "CHECK_IF_IS_A_NEW_SIGNAL");
        assert_eq!(names[12], "EXECUTE_TRADE");
        assert_eq!(names[15], "PUBLISH_STRATEGY_CHART_ON_TELEGRAM");
    }
}
