use std::time::Duration;

// -----------------------------------------------
// VENDOR API ENDPOINTS
// -----------------------------------------------
pub const POLYGON_BASE_URL: &str = "https://api.polygon.io";
pub const TWELVE_DATA_BASE_URL: &str = "https://api.twelvedata.com";
pub const ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co";
pub const UNUSUAL_WHALES_BASE_URL: &str = "https://api.unusualwhales.com";

pub fn polygon_prev_day_url(symbol: &str, api_key: &str) -> String {
    format!(
        "{}/v2/aggs/ticker/{}/prev?adjusted=true&apiKey={}",
        POLYGON_BASE_URL,
        urlencoding::encode(symbol),
        api_key
    )
}

pub fn twelve_data_quote_url(symbol: &str, api_key: &str) -> String {
    format!(
        "{}/quote?symbol={}&apikey={}",
        TWELVE_DATA_BASE_URL,
        urlencoding::encode(symbol),
        api_key
    )
}

pub fn alpha_vantage_quote_url(symbol: &str, api_key: &str) -> String {
    format!(
        "{}/query?function=GLOBAL_QUOTE&symbol={}&apikey={}",
        ALPHA_VANTAGE_BASE_URL,
        urlencoding::encode(symbol),
        api_key
    )
}

pub fn uw_greeks_url(symbol: &str, expiry: &str) -> String {
    format!(
        "{}/api/stock/{}/greeks?expiry={}",
        UNUSUAL_WHALES_BASE_URL,
        urlencoding::encode(symbol),
        urlencoding::encode(expiry)
    )
}

pub fn uw_option_contracts_url(symbol: &str, expiry: &str) -> String {
    format!(
        "{}/api/stock/{}/option-contracts?expiry={}",
        UNUSUAL_WHALES_BASE_URL,
        urlencoding::encode(symbol),
        urlencoding::encode(expiry)
    )
}

pub fn uw_flow_url(symbol: &str) -> String {
    format!(
        "{}/api/stock/{}/options/flow",
        UNUSUAL_WHALES_BASE_URL,
        urlencoding::encode(symbol)
    )
}

// -----------------------------------------------
// API KEY ENVIRONMENT VARIABLES
// -----------------------------------------------
pub const ENV_POLYGON_KEY: &str = "POLYGON_API_KEY";
pub const ENV_UW_KEY: &str = "UNUSUAL_WHALES_API_KEY";
pub const ENV_UW_KEY_ALT: &str = "UW_TOKEN";
pub const ENV_TWELVE_DATA_KEY: &str = "TWELVE_DATA_API_KEY";
pub const ENV_ALPHA_VANTAGE_KEY: &str = "ALPHA_VANTAGE_API_KEY";

// -----------------------------------------------
// HTTP CLIENT CONFIG
// -----------------------------------------------
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
pub const USER_AGENT: &str = concat!("options-radar/", env!("CARGO_PKG_VERSION"));

// -----------------------------------------------
// RETRY CONFIG (Unusual Whales only)
// -----------------------------------------------
pub const RETRY_BASE_DELAY_MS: u64 = 200;
pub const RETRY_FACTOR: u64 = 2;
pub const RETRY_MAX_DELAY_SECS: u64 = 3;
pub const RETRY_MAX_ATTEMPTS: usize = 3;

// -----------------------------------------------
// RESPONSE CACHE
// -----------------------------------------------
pub const CACHE_WINDOW_SECS: u64 = 60;

// -----------------------------------------------
// DETERMINISTIC DEFAULTS FOR UNPARSEABLE FIELDS
// -----------------------------------------------
pub const DEFAULT_PRICE: f64 = 100.0;
pub const DEFAULT_IV_PERCENT: f64 = 30.0;
pub const DEFAULT_DELTA: f64 = 0.5;
pub const DEFAULT_GAMMA: f64 = 0.01;
pub const DEFAULT_THETA: f64 = -0.05;
pub const DEFAULT_VEGA: f64 = 0.1;
pub const DEFAULT_RHO: f64 = 0.05;

// -----------------------------------------------
// INDICATOR THRESHOLDS
// -----------------------------------------------
pub const ATM_STRIKE_STEP: f64 = 5.0;
pub const ATM_IV_WINDOW: f64 = 2.5;
pub const TREND_THRESHOLD_PCT: f64 = 1.0;
pub const VOLATILE_THRESHOLD_PCT: f64 = 2.0;
pub const STABLE_THRESHOLD_PCT: f64 = 0.5;

// -----------------------------------------------
// RUNTIME CONFIGURATION
// -----------------------------------------------

/// Execution mode: "server" (default) or "single"
pub fn get_execution_mode() -> String {
    std::env::var("RADAR_MODE").unwrap_or_else(|_| "server".to_string())
}

/// Port for server mode
pub fn get_port() -> u16 {
    std::env::var("RADAR_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3001)
}

/// Symbol for single-shot mode
pub fn get_single_symbol() -> String {
    std::env::var("RADAR_SYMBOL").unwrap_or_else(|_| "AAPL".to_string())
}
