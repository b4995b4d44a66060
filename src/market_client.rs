use crate::config;
use crate::error::VendorError;
use crate::models::{AtmGreeks, FlowRecord, GreeksData, OptionContract, QuoteSource, StockQuote};
use crate::processor;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio_retry::strategy::ExponentialBackoff;
use tokio_retry::Retry;
use tracing::{debug, warn};

// -----------------------------------------------
// API KEYS
// -----------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub polygon: Option<String>,
    pub unusual_whales: Option<String>,
    pub twelve_data: Option<String>,
    pub alpha_vantage: Option<String>,
}

impl ApiKeys {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());
        Self {
            polygon: var(config::ENV_POLYGON_KEY),
            unusual_whales: var(config::ENV_UW_KEY).or_else(|| var(config::ENV_UW_KEY_ALT)),
            twelve_data: var(config::ENV_TWELVE_DATA_KEY),
            alpha_vantage: var(config::ENV_ALPHA_VANTAGE_KEY),
        }
    }

    pub fn has_quote_vendor(&self) -> bool {
        self.polygon.is_some() || self.twelve_data.is_some() || self.alpha_vantage.is_some()
    }

    pub fn has_unusual_whales(&self) -> bool {
        self.unusual_whales.is_some()
    }
}

// -----------------------------------------------
// CLIENT WRAPPER
// -----------------------------------------------

pub struct MarketClient {
    client: Client,
    keys: ApiKeys,
}

impl MarketClient {
    pub fn new() -> Result<Self, VendorError> {
        Self::with_keys(ApiKeys::from_env())
    }

    pub fn with_keys(keys: ApiKeys) -> Result<Self, VendorError> {
        let client = Client::builder()
            .user_agent(config::USER_AGENT)
            .timeout(config::HTTP_TIMEOUT)
            .build()?;
        Ok(Self { client, keys })
    }

    pub fn keys(&self) -> &ApiKeys {
        &self.keys
    }

    /// Single-attempt GET returning validated JSON. Quote vendors are
    /// not retried; a failure just moves us down the fallback chain.
    async fn fetch_json(&self, url: &str, auth: Option<&str>) -> Result<Value, VendorError> {
        let mut req = self.client.get(url).header("Accept", "application/json, text/plain");
        if let Some(token) = auth {
            // Raw key, not a Bearer scheme
            req = req.header("Authorization", token.to_string());
        }

        let res = req.send().await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(VendorError::Request(format!("{}: {}", status, preview)));
        }

        let text = res.text().await?;
        let trimmed = text.trim();
        if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
            let preview: String = trimmed.chars().take(200).collect();
            return Err(VendorError::NonJsonResponse(preview));
        }

        Ok(serde_json::from_str(trimmed)?)
    }

    /// Unusual Whales GET with exponential backoff on rate limits and
    /// server errors. Client errors fail fast.
    async fn fetch_json_with_retry(&self, url: &str, token: &str) -> Result<Value, VendorError> {
        let backoff = ExponentialBackoff::from_millis(config::RETRY_BASE_DELAY_MS)
            .factor(config::RETRY_FACTOR)
            .max_delay(Duration::from_secs(config::RETRY_MAX_DELAY_SECS))
            .take(config::RETRY_MAX_ATTEMPTS);

        Retry::spawn(backoff, || async {
            let res = self
                .client
                .get(url)
                .header("Accept", "application/json, text/plain")
                .header("Authorization", token.to_string())
                .send()
                .await
                .map_err(VendorError::from)?;

            let status = res.status();
            if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
                return Err(VendorError::Request(format!("retryable error: {}", status)));
            }
            if !status.is_success() {
                let body = res.text().await.unwrap_or_default();
                let preview: String = body.chars().take(200).collect();
                return Err(VendorError::Request(format!("{}: {}", status, preview)));
            }

            let text = res.text().await.map_err(VendorError::from)?;
            let trimmed = text.trim();
            if !trimmed.starts_with('{') && !trimmed.starts_with('[') {
                let preview: String = trimmed.chars().take(200).collect();
                return Err(VendorError::NonJsonResponse(preview));
            }
            serde_json::from_str(trimmed).map_err(VendorError::from)
        })
        .await
    }

    // -----------------------------------------------
    // STOCK QUOTE WITH VENDOR FALLBACK
    // -----------------------------------------------

    /// Try Polygon, then Twelve Data, then Alpha Vantage. The first
    /// vendor that yields a parseable non-zero price wins; individual
    /// vendor failures are logged and swallowed.
    pub async fn fetch_quote(&self, symbol: &str) -> Option<StockQuote> {
        if let Some(key) = &self.keys.polygon {
            match self.fetch_json(&config::polygon_prev_day_url(symbol, key), None).await {
                Ok(body) => {
                    if let Some(quote) = parse_polygon_quote(symbol, &body) {
                        debug!(symbol, vendor = "polygon", price = quote.price, "quote received");
                        return Some(quote);
                    }
                }
                Err(e) => warn!(symbol, vendor = "polygon", error = %e, "quote fetch failed"),
            }
        }

        if let Some(key) = &self.keys.twelve_data {
            debug!(symbol, "falling back to Twelve Data");
            match self.fetch_json(&config::twelve_data_quote_url(symbol, key), None).await {
                Ok(body) => {
                    if let Some(quote) = parse_twelve_data_quote(symbol, &body) {
                        return Some(quote);
                    }
                }
                Err(e) => warn!(symbol, vendor = "twelve_data", error = %e, "quote fetch failed"),
            }
        }

        if let Some(key) = &self.keys.alpha_vantage {
            debug!(symbol, "falling back to Alpha Vantage");
            match self.fetch_json(&config::alpha_vantage_quote_url(symbol, key), None).await {
                Ok(body) => {
                    if let Some(quote) = parse_alpha_vantage_quote(symbol, &body) {
                        return Some(quote);
                    }
                }
                Err(e) => warn!(symbol, vendor = "alpha_vantage", error = %e, "quote fetch failed"),
            }
        }

        None
    }

    // -----------------------------------------------
    // UNUSUAL WHALES: GREEKS
    // -----------------------------------------------

    /// ATM Greeks for the given expiry. `None` when the key is missing
    /// or the vendor returned nothing usable.
    pub async fn fetch_greeks(
        &self,
        symbol: &str,
        expiry: &str,
        stock_price: Option<f64>,
    ) -> Option<GreeksData> {
        let token = self.keys.unusual_whales.as_deref()?;

        let body = match self
            .fetch_json_with_retry(&config::uw_greeks_url(symbol, expiry), token)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(symbol, expiry, error = %e, "greeks fetch failed");
                return None;
            }
        };

        let rows = body.get("data")?.as_array()?;
        if rows.is_empty() {
            return None;
        }

        let price = stock_price.unwrap_or(config::DEFAULT_PRICE);
        let atm = processor::atm_strike(price);
        let atm_row = rows
            .iter()
            .find(|r| num_field(r, "strike").is_some_and(|s| (s - atm).abs() < config::ATM_IV_WINDOW))
            .unwrap_or(&rows[0]);

        Some(GreeksData {
            available: true,
            atm: AtmGreeks {
                delta: num_field(atm_row, "call_delta").unwrap_or(config::DEFAULT_DELTA),
                gamma: num_field(atm_row, "call_gamma").unwrap_or(config::DEFAULT_GAMMA),
                theta: num_field(atm_row, "call_theta").unwrap_or(config::DEFAULT_THETA),
                vega: num_field(atm_row, "call_vega").unwrap_or(config::DEFAULT_VEGA),
                rho: num_field(atm_row, "call_rho").unwrap_or(config::DEFAULT_RHO),
            },
            iv: num_field(atm_row, "implied_volatility")
                .unwrap_or(config::DEFAULT_IV_PERCENT / 100.0),
        })
    }

    // -----------------------------------------------
    // UNUSUAL WHALES: OPTION CONTRACTS
    // -----------------------------------------------

    pub async fn fetch_option_contracts(
        &self,
        symbol: &str,
        expiry: &str,
    ) -> Option<Vec<OptionContract>> {
        let token = self.keys.unusual_whales.as_deref()?;

        let body = match self
            .fetch_json_with_retry(&config::uw_option_contracts_url(symbol, expiry), token)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(symbol, expiry, error = %e, "option contracts fetch failed");
                return None;
            }
        };

        let rows = body.get("data")?.as_array()?;
        Some(rows.iter().map(parse_contract_row).collect())
    }

    // -----------------------------------------------
    // UNUSUAL WHALES: OPTIONS FLOW
    // -----------------------------------------------

    pub async fn fetch_flow(&self, symbol: &str) -> Option<Vec<FlowRecord>> {
        let token = self.keys.unusual_whales.as_deref()?;

        let body = match self
            .fetch_json_with_retry(&config::uw_flow_url(symbol), token)
            .await
        {
            Ok(body) => body,
            Err(e) => {
                warn!(symbol, error = %e, "flow fetch failed");
                return None;
            }
        };

        let rows = body.get("data")?.as_array()?;
        Some(rows.iter().map(parse_flow_row).collect())
    }
}

// -----------------------------------------------
// VENDOR FIELD MAPPING
// -----------------------------------------------

/// Numeric field that may arrive as a JSON number or a string (with or
/// without a trailing percent sign). NaN and infinities are rejected.
fn num_field(value: &Value, key: &str) -> Option<f64> {
    match value.get(key)? {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().trim_end_matches('%').parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(str::to_string)
}

/// Polygon previous-day aggregate: `{status:"OK", results:[{c,o,h,l,v,t}]}`
pub fn parse_polygon_quote(symbol: &str, body: &Value) -> Option<StockQuote> {
    if body.get("status").and_then(Value::as_str) != Some("OK") {
        return None;
    }
    let result = body.get("results")?.as_array()?.first()?;

    let close = num_field(result, "c").filter(|p| *p != 0.0)?;
    let open = num_field(result, "o").unwrap_or(0.0);
    let (change, change_percent) = processor::change_stats(open, close);

    Some(StockQuote {
        symbol: symbol.to_string(),
        price: close,
        change,
        change_percent,
        volume: num_field(result, "v").unwrap_or(0.0) as u64,
        open,
        high: num_field(result, "h").unwrap_or(0.0),
        low: num_field(result, "l").unwrap_or(0.0),
        close,
        source: QuoteSource::Polygon,
    })
}

/// Twelve Data quote: flat object with string-typed numerics.
pub fn parse_twelve_data_quote(symbol: &str, body: &Value) -> Option<StockQuote> {
    let close = num_field(body, "close").filter(|p| *p != 0.0)?;

    Some(StockQuote {
        symbol: symbol.to_string(),
        price: close,
        change: num_field(body, "change").unwrap_or(0.0),
        change_percent: num_field(body, "percent_change").unwrap_or(0.0),
        volume: num_field(body, "volume").unwrap_or(0.0) as u64,
        open: num_field(body, "open").unwrap_or(0.0),
        high: num_field(body, "high").unwrap_or(0.0),
        low: num_field(body, "low").unwrap_or(0.0),
        close,
        source: QuoteSource::TwelveData,
    })
}

/// Alpha Vantage GLOBAL_QUOTE: numbered keys, percent field carries a
/// trailing `%`.
pub fn parse_alpha_vantage_quote(symbol: &str, body: &Value) -> Option<StockQuote> {
    let quote = body.get("Global Quote")?;
    let price = num_field(quote, "05. price").filter(|p| *p != 0.0)?;

    Some(StockQuote {
        symbol: symbol.to_string(),
        price,
        change: num_field(quote, "09. change").unwrap_or(0.0),
        change_percent: num_field(quote, "10. change percent").unwrap_or(0.0),
        volume: num_field(quote, "06. volume").unwrap_or(0.0) as u64,
        open: num_field(quote, "02. open").unwrap_or(0.0),
        high: num_field(quote, "03. high").unwrap_or(0.0),
        low: num_field(quote, "04. low").unwrap_or(0.0),
        close: num_field(quote, "08. previous close").unwrap_or(price),
        source: QuoteSource::AlphaVantage,
    })
}

pub fn parse_contract_row(row: &Value) -> OptionContract {
    OptionContract {
        option_symbol: str_field(row, "option_symbol"),
        option_type: str_field(row, "option_type").or_else(|| str_field(row, "type")),
        strike: num_field(row, "strike"),
        expiry: str_field(row, "expiry"),
        volume: num_field(row, "volume").unwrap_or(0.0),
        open_interest: num_field(row, "open_interest").unwrap_or(0.0),
        implied_volatility: num_field(row, "implied_volatility").or_else(|| num_field(row, "iv")),
    }
}

pub fn parse_flow_row(row: &Value) -> FlowRecord {
    let tags = row
        .get("tags")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    FlowRecord {
        tags,
        aggressor: str_field(row, "aggressor"),
        is_unusual: row.get("is_unusual").and_then(Value::as_bool).unwrap_or(false),
        volume: num_field(row, "volume").unwrap_or(0.0),
        expiry: str_field(row, "expiry").or_else(|| str_field(row, "date")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_polygon_quote() {
        let body = json!({
            "status": "OK",
            "results": [{"c": 150.0, "o": 145.0, "h": 151.0, "l": 144.0, "v": 1000000, "t": 0}]
        });
        let quote = parse_polygon_quote("AAPL", &body).unwrap();
        assert_eq!(quote.price, 150.0);
        assert_eq!(quote.change, 5.0);
        assert!((quote.change_percent - 3.4482758).abs() < 1e-4);
        assert_eq!(quote.volume, 1_000_000);
        assert_eq!(quote.source, QuoteSource::Polygon);
    }

    #[test]
    fn test_parse_polygon_rejects_bad_status_and_zero_price() {
        let bad_status = json!({"status": "ERROR", "results": []});
        assert!(parse_polygon_quote("AAPL", &bad_status).is_none());

        let zero = json!({"status": "OK", "results": [{"c": 0.0, "o": 145.0}]});
        assert!(parse_polygon_quote("AAPL", &zero).is_none());
    }

    #[test]
    fn test_parse_twelve_data_string_numerics() {
        let body = json!({
            "symbol": "AAPL",
            "close": "150.00",
            "change": "5.00",
            "percent_change": "3.45",
            "volume": "1000000",
            "open": "145.00",
            "high": "151.00",
            "low": "144.00"
        });
        let quote = parse_twelve_data_quote("AAPL", &body).unwrap();
        assert_eq!(quote.price, 150.0);
        assert_eq!(quote.change_percent, 3.45);
        assert_eq!(quote.source, QuoteSource::TwelveData);
    }

    #[test]
    fn test_parse_alpha_vantage_percent_suffix() {
        let body = json!({
            "Global Quote": {
                "02. open": "145.0000",
                "03. high": "151.0000",
                "04. low": "144.0000",
                "05. price": "150.0000",
                "06. volume": "1000000",
                "08. previous close": "145.0000",
                "09. change": "5.0000",
                "10. change percent": "3.4483%"
            }
        });
        let quote = parse_alpha_vantage_quote("AAPL", &body).unwrap();
        assert_eq!(quote.price, 150.0);
        assert!((quote.change_percent - 3.4483).abs() < 1e-9);
        assert_eq!(quote.source, QuoteSource::AlphaVantage);
    }

    #[test]
    fn test_unparseable_numeric_fields_default_to_zero() {
        let body = json!({
            "status": "OK",
            "results": [{"c": 150.0, "o": "garbage", "v": null}]
        });
        let quote = parse_polygon_quote("AAPL", &body).unwrap();
        assert_eq!(quote.open, 0.0);
        assert_eq!(quote.volume, 0);
        assert_eq!(quote.change_percent, 0.0);
        assert!(!quote.change_percent.is_nan());
    }

    #[test]
    fn test_parse_contract_row_aliases() {
        let row = json!({
            "option_symbol": "AAPL260918C00150000",
            "type": "call",
            "strike": "150",
            "volume": 1200,
            "open_interest": 5000,
            "iv": "0.31"
        });
        let contract = parse_contract_row(&row);
        assert_eq!(contract.option_type.as_deref(), Some("call"));
        assert_eq!(contract.strike, Some(150.0));
        assert_eq!(contract.implied_volatility, Some(0.31));
        assert!(contract.is_call());
    }

    #[test]
    fn test_parse_flow_row() {
        let row = json!({
            "tags": ["bullish", "sweep"],
            "aggressor": "buy",
            "is_unusual": true,
            "volume": 500,
            "date": "2026-08-21"
        });
        let flow = parse_flow_row(&row);
        assert_eq!(flow.tags, vec!["bullish", "sweep"]);
        assert_eq!(flow.aggressor.as_deref(), Some("buy"));
        assert!(flow.is_unusual);
        assert_eq!(flow.expiry.as_deref(), Some("2026-08-21"));
    }
}
