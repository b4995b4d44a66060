use serde::{Deserialize, Serialize};

// -----------------------------------------------
// QUOTE SHAPES
// -----------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    Polygon,
    TwelveData,
    AlphaVantage,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    pub change: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub source: QuoteSource,
}

// -----------------------------------------------
// UNUSUAL WHALES ROW SHAPES
// -----------------------------------------------

/// One contract row from the option-contracts endpoint.
/// Vendor fields arrive as a mix of strings and numbers; the client
/// normalizes them before building this.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OptionContract {
    pub option_symbol: Option<String>,
    pub option_type: Option<String>,
    pub strike: Option<f64>,
    pub expiry: Option<String>,
    pub volume: f64,
    pub open_interest: f64,
    pub implied_volatility: Option<f64>,
}

impl OptionContract {
    /// Call/put classification: explicit type field first, OSI-style
    /// option symbol second.
    pub fn is_call(&self) -> bool {
        if let Some(t) = &self.option_type {
            return t.eq_ignore_ascii_case("call");
        }
        self.option_symbol
            .as_deref()
            .is_some_and(|s| s.contains('C'))
    }

    pub fn is_put(&self) -> bool {
        if let Some(t) = &self.option_type {
            return t.eq_ignore_ascii_case("put");
        }
        self.option_symbol
            .as_deref()
            .is_some_and(|s| s.contains('P'))
    }
}

/// One row from the options-flow endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowRecord {
    pub tags: Vec<String>,
    pub aggressor: Option<String>,
    pub is_unusual: bool,
    pub volume: f64,
    pub expiry: Option<String>,
}

// -----------------------------------------------
// DERIVED SHAPES
// -----------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsSummary {
    pub call_count: usize,
    pub put_count: usize,
    pub call_volume: f64,
    pub put_volume: f64,
    pub total_volume: f64,
    pub total_oi: f64,
    pub put_call_ratio: f64,
    pub average_iv: f64,
    pub is_zero_dte: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtmGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GreeksData {
    pub available: bool,
    pub atm: AtmGreeks,
    /// Fractional IV (0.30 = 30%)
    pub iv: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZeroDteData {
    pub available: bool,
    pub call_count: usize,
    pub put_count: usize,
    pub total_volume: f64,
    pub total_oi: f64,
    pub flows: usize,
}

impl ZeroDteData {
    pub fn unavailable() -> Self {
        Self {
            available: false,
            call_count: 0,
            put_count: 0,
            total_volume: 0.0,
            total_oi: 0.0,
            flows: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Movement {
    Volatile,
    Stable,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketConditions {
    pub trend: Trend,
    pub movement: Movement,
    #[serde(rename = "flowSentiment")]
    pub flow_sentiment: Sentiment,
    #[serde(rename = "unusualOptions")]
    pub unusual_options: usize,
    #[serde(rename = "has0DTE")]
    pub has_zero_dte: bool,
    #[serde(rename = "zeroDTEVolume")]
    pub zero_dte_volume: f64,
    #[serde(rename = "zeroDTEFlow")]
    pub zero_dte_flow: usize,
}

impl Default for MarketConditions {
    fn default() -> Self {
        Self {
            trend: Trend::Neutral,
            movement: Movement::Stable,
            flow_sentiment: Sentiment::Neutral,
            unusual_options: 0,
            has_zero_dte: false,
            zero_dte_volume: 0.0,
            zero_dte_flow: 0,
        }
    }
}

// -----------------------------------------------
// AGGREGATED RESPONSE
// -----------------------------------------------

/// Quote enriched with the option-derived display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockView {
    #[serde(flatten)]
    pub quote: StockQuote,
    /// Percent IV (30.0 = 30%)
    pub iv: f64,
    pub iv_rank: u32,
    pub atm_strike: f64,
    pub put_call_ratio: f64,
    pub option_volume: f64,
    pub open_interest: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub success: bool,
    pub use_mock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub stock_data: StockView,
    pub market_conditions: MarketConditions,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greeks_data: Option<GreeksData>,
    pub zero_dte_data: ZeroDteData,
}
