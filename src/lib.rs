pub mod api_server;
pub mod config;
pub mod error;
pub mod logging;
pub mod market_client;
pub mod mock;
pub mod models;
pub mod portfolio;
pub mod processor;
pub mod rules;

// Re-exports for convenience
pub use error::VendorError;
pub use market_client::{ApiKeys, MarketClient};
pub use models::{
    FlowRecord, GreeksData, MarketConditions, MarketSnapshot, OptionContract, StockQuote,
    StockView, ZeroDteData,
};
