use crate::config;
use crate::market_client::MarketClient;
use crate::mock;
use crate::models::{MarketConditions, MarketSnapshot, StockQuote, StockView, ZeroDteData};
use crate::portfolio::{self, Trade};
use crate::{processor, rules};
use anyhow::Result;
use axum::{
    extract::{Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::warn;

// -----------------------------------------------
// API REQUEST/RESPONSE MODELS
// -----------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketRequest {
    pub symbol: Option<String>,
    pub include_greeks: Option<bool>,
    pub expiry: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SymbolQuery {
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub processing_time_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationView {
    #[serde(flatten)]
    pub recommendation: rules::Recommendation,
    pub position_size: rules::PositionSize,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationsResponse {
    pub symbol: String,
    pub use_mock: bool,
    pub market_conditions: MarketConditions,
    pub recommendations: Vec<RecommendationView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateTradeResponse {
    pub valid: bool,
    pub errors: Vec<String>,
    pub display_name: String,
}

/// Sizing defaults mirrored from the dashboard's strategy panel.
const SIZING_RISK_PCT: f64 = 2.0;

// -----------------------------------------------
// APPLICATION STATE
// -----------------------------------------------

#[derive(Clone)]
pub struct AppState {
    client: Arc<MarketClient>,
    cache: Arc<RwLock<Cache>>,
}

impl AppState {
    pub fn new() -> Result<Self> {
        Ok(Self {
            client: Arc::new(MarketClient::new()?),
            cache: Arc::new(RwLock::new(Cache::default())),
        })
    }
}

// -----------------------------------------------
// RESPONSE CACHE
// -----------------------------------------------

/// Fixed-window response cache. Keys carry the window bucket, so a
/// stale entry simply misses; inserts evict everything from older
/// buckets.
#[derive(Default)]
struct Cache {
    entries: HashMap<String, Value>,
}

fn current_bucket() -> u64 {
    Utc::now().timestamp().max(0) as u64 / config::CACHE_WINDOW_SECS
}

fn cache_key(symbol: &str, kind: &str, bucket: u64) -> String {
    format!("{}_{}_{}", symbol.to_uppercase(), kind, bucket)
}

impl Cache {
    fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    fn put(&mut self, key: String, value: Value, bucket: u64) {
        let live_suffix = format!("_{}", bucket);
        self.entries.retain(|k, _| k.ends_with(&live_suffix));
        self.entries.insert(key, value);
    }
}

// -----------------------------------------------
// MARKET AGGREGATION
// -----------------------------------------------

/// The full aggregation pass: quote with vendor fallback, optional ATM
/// Greeks, target-expiry chain, 0DTE chain when today qualifies, and
/// flow-derived market conditions. Falls back to a mock snapshot when
/// no vendor yields a quote.
pub async fn aggregate_market(
    client: &MarketClient,
    symbol: &str,
    include_greeks: bool,
    expiry: Option<&str>,
) -> MarketSnapshot {
    let symbol = symbol.to_uppercase();

    let Some(quote) = client.fetch_quote(&symbol).await else {
        let reason = if client.keys().has_quote_vendor() {
            "all quote vendors failed"
        } else {
            "no quote vendor API keys configured"
        };
        warn!(symbol, reason, "serving mock snapshot");
        return mock::mock_snapshot(&symbol, Some(reason.to_string()));
    };

    let target_expiry = expiry
        .map(str::to_string)
        .unwrap_or_else(processor::next_monthly_expiry);
    let atm = processor::atm_strike(quote.price);

    let greeks = if include_greeks {
        client
            .fetch_greeks(&symbol, &target_expiry, Some(quote.price))
            .await
    } else {
        None
    };

    let contracts = client.fetch_option_contracts(&symbol, &target_expiry).await;
    let summary = contracts
        .as_deref()
        .filter(|c| !c.is_empty())
        .map(|c| processor::summarize_contracts(c, atm, processor::is_zero_dte(&target_expiry)));

    let mut zero_dte_data = ZeroDteData::unavailable();
    if processor::is_trading_day() {
        if let Some(todays) = client
            .fetch_option_contracts(&symbol, &processor::today_expiry())
            .await
        {
            if !todays.is_empty() {
                let s = processor::summarize_contracts(&todays, atm, true);
                zero_dte_data = ZeroDteData {
                    available: true,
                    call_count: s.call_count,
                    put_count: s.put_count,
                    total_volume: s.total_volume,
                    total_oi: s.total_oi,
                    flows: 0,
                };
            }
        }
    }

    let flows = client.fetch_flow(&symbol).await.unwrap_or_default();
    let (flow_has_zero_dte, flow_zero_dte_volume, zero_dte_flow) =
        processor::zero_dte_flow_stats(&flows);
    zero_dte_data.flows = zero_dte_flow;

    let (trend, movement) = processor::label_quote(&quote);

    let iv = match (&greeks, &summary) {
        (Some(g), _) => g.iv * 100.0,
        (None, Some(s)) => s.average_iv,
        (None, None) => config::DEFAULT_IV_PERCENT,
    };
    let iv_rank = if greeks.is_some() || summary.is_some() {
        processor::iv_rank(iv)
    } else {
        processor::estimate_iv_rank_from_move(quote.change_percent)
    };

    let (put_call_ratio, option_volume, open_interest) = summary
        .as_ref()
        .map(|s| (s.put_call_ratio, s.total_volume, s.total_oi))
        .unwrap_or((1.0, 0.0, 0.0));

    let market_conditions = MarketConditions {
        trend,
        movement,
        flow_sentiment: processor::flow_sentiment(&flows),
        unusual_options: processor::count_unusual(&flows),
        has_zero_dte: zero_dte_data.available || flow_has_zero_dte,
        zero_dte_volume: if zero_dte_data.available {
            zero_dte_data.total_volume
        } else {
            flow_zero_dte_volume
        },
        zero_dte_flow,
    };

    MarketSnapshot {
        success: true,
        use_mock: false,
        error: None,
        stock_data: StockView {
            quote,
            iv,
            iv_rank,
            atm_strike: atm,
            put_call_ratio,
            option_volume,
            open_interest,
        },
        market_conditions,
        greeks_data: greeks,
        zero_dte_data,
    }
}

/// Aggregation behind the 60-second response cache.
async fn cached_snapshot(
    app_state: &AppState,
    symbol: &str,
    include_greeks: bool,
    expiry: Option<&str>,
) -> Value {
    let bucket = current_bucket();
    let key = cache_key(symbol, "market", bucket);

    {
        let cache = app_state.cache.read().await;
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
    }

    let snapshot = aggregate_market(&app_state.client, symbol, include_greeks, expiry).await;
    let value = serde_json::to_value(&snapshot).unwrap_or_else(|e| {
        warn!(error = %e, "snapshot serialization failed");
        json!({"success": false, "useMock": false, "error": e.to_string()})
    });

    {
        let mut cache = app_state.cache.write().await;
        cache.put(key, value.clone(), bucket);
    }

    value
}

// -----------------------------------------------
// API HANDLERS
// -----------------------------------------------

/// POST /api/market {"symbol":"AAPL"} - Aggregated market snapshot
async fn post_market(
    State(app_state): State<AppState>,
    Json(req): Json<MarketRequest>,
) -> Json<Value> {
    let symbol = req
        .symbol
        .unwrap_or_default()
        .trim()
        .to_uppercase();
    if symbol.is_empty() {
        return Json(json!({"success": false, "error": "Symbol is required"}));
    }

    let include_greeks = req.include_greeks.unwrap_or(true);
    Json(cached_snapshot(&app_state, &symbol, include_greeks, req.expiry.as_deref()).await)
}

/// GET /api/quote?symbol=AAPL - Quote alone, with vendor fallback
async fn get_quote(
    Query(query): Query<SymbolQuery>,
    State(app_state): State<AppState>,
) -> Json<ApiResponse<StockQuote>> {
    let start_time = Instant::now();
    let symbol = query.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Json(ApiResponse {
            success: false,
            data: None,
            error: Some("Symbol is required".to_string()),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        });
    }

    let bucket = current_bucket();
    let key = cache_key(&symbol, "quote", bucket);

    {
        let cache = app_state.cache.read().await;
        if let Some(hit) = cache.get(&key) {
            if let Ok(quote) = serde_json::from_value::<StockQuote>(hit.clone()) {
                return Json(ApiResponse {
                    success: true,
                    data: Some(quote),
                    error: None,
                    processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
                });
            }
        }
    }

    match app_state.client.fetch_quote(&symbol).await {
        Some(quote) => {
            if let Ok(value) = serde_json::to_value(&quote) {
                let mut cache = app_state.cache.write().await;
                cache.put(key, value, bucket);
            }
            Json(ApiResponse {
                success: true,
                data: Some(quote),
                error: None,
                processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
            })
        }
        None => Json(ApiResponse {
            success: false,
            data: None,
            error: Some("all quote vendors failed or none configured".to_string()),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        }),
    }
}

/// GET /api/recommendations?symbol=AAPL - Strategy recommendations
async fn get_recommendations(
    Query(query): Query<SymbolQuery>,
    State(app_state): State<AppState>,
) -> Json<ApiResponse<RecommendationsResponse>> {
    let start_time = Instant::now();
    let symbol = query.symbol.trim().to_uppercase();
    if symbol.is_empty() {
        return Json(ApiResponse {
            success: false,
            data: None,
            error: Some("Symbol is required".to_string()),
            processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
        });
    }

    let value = cached_snapshot(&app_state, &symbol, true, None).await;
    let snapshot: MarketSnapshot = match serde_json::from_value(value) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            return Json(ApiResponse {
                success: false,
                data: None,
                error: Some(e.to_string()),
                processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
            });
        }
    };

    let recommendations = rules::recommend(
        &snapshot.stock_data,
        &snapshot.market_conditions,
        &snapshot.zero_dte_data,
    )
    .into_iter()
    .map(|recommendation| {
        let position_size = rules::position_size(
            &recommendation.metrics,
            portfolio::DEFAULT_BALANCE,
            SIZING_RISK_PCT,
        );
        RecommendationView {
            recommendation,
            position_size,
        }
    })
    .collect();

    Json(ApiResponse {
        success: true,
        data: Some(RecommendationsResponse {
            symbol,
            use_mock: snapshot.use_mock,
            market_conditions: snapshot.market_conditions,
            recommendations,
        }),
        error: None,
        processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
    })
}

/// GET /api/strategies - Static strategy catalog
async fn get_strategies() -> Json<ApiResponse<Vec<rules::StrategyDef>>> {
    let start_time = Instant::now();
    Json(ApiResponse {
        success: true,
        data: Some(rules::catalog()),
        error: None,
        processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
    })
}

/// POST /api/validate-trade - Structural trade validation
async fn post_validate_trade(Json(trade): Json<Trade>) -> Json<ApiResponse<ValidateTradeResponse>> {
    let start_time = Instant::now();
    let errors = portfolio::validate_trade(&trade);

    Json(ApiResponse {
        success: true,
        data: Some(ValidateTradeResponse {
            valid: errors.is_empty(),
            errors,
            display_name: trade.display_name(),
        }),
        error: None,
        processing_time_ms: Some(start_time.elapsed().as_millis() as u64),
    })
}

// -----------------------------------------------
// SERVER SETUP
// -----------------------------------------------

pub async fn start_server(port: u16) -> Result<()> {
    let app_state = AppState::new()?;

    let app = Router::new()
        .route("/api/market", post(post_market))
        .route("/api/quote", get(get_quote))
        .route("/api/recommendations", get(get_recommendations))
        .route("/api/strategies", get(get_strategies))
        .route("/api/validate-trade", post(post_validate_trade))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let addr = format!("127.0.0.1:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    println!("🚀 Options Radar API running on http://{}", addr);
    println!("📋 Available endpoints:");
    println!("   POST /api/market");
    println!("   GET  /api/quote?symbol=AAPL");
    println!("   GET  /api/recommendations?symbol=AAPL");
    println!("   GET  /api/strategies");
    println!("   POST /api/validate-trade");
    println!();

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("aapl", "market", 29_000_000), "AAPL_market_29000000");
    }

    #[test]
    fn test_cache_evicts_older_buckets_on_insert() {
        let mut cache = Cache::default();
        cache.put(cache_key("AAPL", "market", 100), json!({"a": 1}), 100);
        cache.put(cache_key("SPY", "quote", 100), json!({"b": 2}), 100);
        assert_eq!(cache.entries.len(), 2);

        cache.put(cache_key("AAPL", "market", 101), json!({"a": 2}), 101);
        assert_eq!(cache.entries.len(), 1);
        assert!(cache.get(&cache_key("AAPL", "market", 100)).is_none());
        assert!(cache.get(&cache_key("AAPL", "market", 101)).is_some());
    }

    #[tokio::test]
    async fn test_all_vendor_failure_degrades_to_mock() {
        // No API keys configured: every vendor path short-circuits
        // without touching the network, and the aggregation must still
        // produce a full snapshot flagged as mock.
        let client = MarketClient::with_keys(crate::market_client::ApiKeys::default()).unwrap();
        let snapshot = aggregate_market(&client, "aapl", true, None).await;

        assert!(!snapshot.success);
        assert!(snapshot.use_mock);
        assert!(snapshot.error.is_some());
        assert_eq!(snapshot.stock_data.quote.symbol, "AAPL");
        assert!(snapshot.stock_data.quote.price > 0.0);
        assert!(snapshot.greeks_data.is_some());
    }

    #[test]
    fn test_market_request_accepts_camel_case() {
        let req: MarketRequest =
            serde_json::from_str(r#"{"symbol":"tsla","includeGreeks":false,"expiry":"2026-09-18"}"#)
                .unwrap();
        assert_eq!(req.symbol.as_deref(), Some("tsla"));
        assert_eq!(req.include_greeks, Some(false));
        assert_eq!(req.expiry.as_deref(), Some("2026-09-18"));
    }
}
