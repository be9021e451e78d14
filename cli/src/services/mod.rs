pub mod chart;
pub mod database;
pub mod exchange;
pub mod explorer;
pub mod http;
pub mod market_data;
pub mod stock_list;
pub mod telegram;

pub use chart::{strat_chart_path, write_chart, ChartPanel};
pub use database::TradeDiary;
pub use exchange::{ExchangeClient, OrderAck, RawKline};
pub use market_data::{BatchHistory, MarketDataClient};
pub use stock_list::{read_stock_list, write_stock_list, StockListFilter, StockListService};
pub use telegram::TelegramNotifier;
