pub mod binance_futures;
pub mod feishu;

pub use binance_futures::{BinanceFuturesClient, BINANCE_FUTURES_URL};
pub use feishu::FeishuNotifier;
