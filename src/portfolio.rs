use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

// -----------------------------------------------
// TRADE SHAPES
// -----------------------------------------------

pub const DEFAULT_BALANCE: f64 = 25_000.0;
pub const DEFAULT_COMMISSION: f64 = 0.65;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Stock,
    Option,
    Spread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpreadType {
    BullCallSpread,
    BearCallSpread,
    BullPutSpread,
    BearPutSpread,
    IronCondor,
    IronButterfly,
    CalendarSpread,
    DiagonalSpread,
    Straddle,
    Strangle,
    JadeLizard,
    BigLizard,
}

impl SpreadType {
    pub fn label(&self) -> &'static str {
        match self {
            SpreadType::BullCallSpread => "bull_call_spread",
            SpreadType::BearCallSpread => "bear_call_spread",
            SpreadType::BullPutSpread => "bull_put_spread",
            SpreadType::BearPutSpread => "bear_put_spread",
            SpreadType::IronCondor => "iron_condor",
            SpreadType::IronButterfly => "iron_butterfly",
            SpreadType::CalendarSpread => "calendar_spread",
            SpreadType::DiagonalSpread => "diagonal_spread",
            SpreadType::Straddle => "straddle",
            SpreadType::Strangle => "strangle",
            SpreadType::JadeLizard => "jade_lizard",
            SpreadType::BigLizard => "big_lizard",
        }
    }
}

/// A trade as submitted by the dashboard form. Unset strikes arrive as
/// zero, unset dates as empty strings, matching the form payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(rename = "type")]
    pub trade_type: TradeType,
    #[serde(default = "default_side")]
    pub side: String,
    #[serde(default)]
    pub quantity: i64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub option_type: Option<OptionType>,
    #[serde(default)]
    pub strike: f64,
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub spread_type: Option<SpreadType>,
    #[serde(default)]
    pub long_strike: f64,
    #[serde(default)]
    pub short_strike: f64,
    #[serde(default)]
    pub put_long_strike: f64,
    #[serde(default)]
    pub put_short_strike: f64,
    #[serde(default)]
    pub call_long_strike: f64,
    #[serde(default)]
    pub call_short_strike: f64,
    #[serde(default)]
    pub premium: f64,
    #[serde(default = "default_commission")]
    pub commission: f64,
    #[serde(default)]
    pub notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

fn default_side() -> String {
    "buy".to_string()
}

fn default_commission() -> f64 {
    DEFAULT_COMMISSION
}

impl Trade {
    pub fn display_name(&self) -> String {
        match self.trade_type {
            TradeType::Stock => format!("{} Stock", self.symbol),
            TradeType::Option => {
                let kind = match self.option_type {
                    Some(OptionType::Put) => 'P',
                    _ => 'C',
                };
                format!("{} {}{} {}", self.symbol, self.strike, kind, self.expiry)
            }
            TradeType::Spread => {
                let spread = self
                    .spread_type
                    .map(|s| s.label().replace('_', " ").to_uppercase())
                    .unwrap_or_else(|| "SPREAD".to_string());
                format!("{} {}", self.symbol, spread)
            }
        }
    }
}

// -----------------------------------------------
// TRADE VALIDATION
// -----------------------------------------------

/// Validate a submitted trade, returning every problem found rather
/// than stopping at the first.
pub fn validate_trade(trade: &Trade) -> Vec<String> {
    let mut errors = Vec::new();

    if trade.symbol.trim().is_empty() {
        errors.push("Symbol is required".to_string());
    }

    match trade.trade_type {
        TradeType::Spread => {
            if let Some(spread) = trade.spread_type {
                errors.extend(spread_errors(spread, trade));
            }
        }
        TradeType::Option => {
            if trade.strike <= 0.0 {
                errors.push("Strike price must be greater than 0".to_string());
            }
            if trade.expiry.is_empty() {
                errors.push("Expiration date is required".to_string());
            }
        }
        TradeType::Stock => {
            if trade.price <= 0.0 {
                errors.push("Stock price must be greater than 0".to_string());
            }
        }
    }

    if trade.quantity <= 0 {
        errors.push("Quantity must be greater than 0".to_string());
    }

    errors
}

/// Strike-ordering rules per spread. Spreads without a rule set (e.g.
/// straddles) only get the base checks.
fn spread_errors(spread: SpreadType, trade: &Trade) -> Vec<String> {
    let mut errors = Vec::new();

    match spread {
        SpreadType::BullCallSpread => {
            vertical_checks(trade, &mut errors, true, "Bull call spread");
        }
        SpreadType::BearCallSpread => {
            vertical_checks(trade, &mut errors, false, "Bear call spread");
        }
        SpreadType::BullPutSpread => {
            vertical_checks(trade, &mut errors, true, "Bull put spread");
        }
        SpreadType::BearPutSpread => {
            vertical_checks(trade, &mut errors, false, "Bear put spread");
        }
        SpreadType::IronCondor => {
            if trade.put_long_strike == 0.0
                || trade.put_short_strike == 0.0
                || trade.call_short_strike == 0.0
                || trade.call_long_strike == 0.0
            {
                errors.push("All four strikes are required for iron condor".to_string());
            }
            if trade.put_long_strike != 0.0
                && trade.put_short_strike != 0.0
                && trade.put_long_strike >= trade.put_short_strike
            {
                errors.push("Put spread: long strike must be < short strike".to_string());
            }
            if trade.call_short_strike != 0.0
                && trade.call_long_strike != 0.0
                && trade.call_short_strike >= trade.call_long_strike
            {
                errors.push("Call spread: short strike must be < long strike".to_string());
            }
            if trade.put_short_strike != 0.0
                && trade.call_short_strike != 0.0
                && trade.put_short_strike >= trade.call_short_strike
            {
                errors.push("Put short strike must be < call short strike".to_string());
            }
            base_spread_checks(trade, &mut errors);
        }
        SpreadType::JadeLizard => {
            if trade.put_short_strike == 0.0
                || trade.call_short_strike == 0.0
                || trade.call_long_strike == 0.0
            {
                errors.push(
                    "Put short strike, call short strike, and call long strike are required"
                        .to_string(),
                );
            }
            if trade.call_short_strike != 0.0
                && trade.call_long_strike != 0.0
                && trade.call_short_strike >= trade.call_long_strike
            {
                errors.push("Call short strike must be < call long strike".to_string());
            }
            base_spread_checks(trade, &mut errors);
        }
        _ => {}
    }

    errors
}

fn vertical_checks(trade: &Trade, errors: &mut Vec<String>, long_below: bool, name: &str) {
    if trade.long_strike == 0.0 || trade.short_strike == 0.0 {
        errors.push("Both long and short strikes are required".to_string());
    }
    if trade.long_strike != 0.0 && trade.short_strike != 0.0 {
        let ordered = if long_below {
            trade.long_strike < trade.short_strike
        } else {
            trade.long_strike > trade.short_strike
        };
        if !ordered {
            let relation = if long_below { "<" } else { ">" };
            errors.push(format!(
                "{} requires long strike {} short strike",
                name, relation
            ));
        }
    }
    base_spread_checks(trade, errors);
}

fn base_spread_checks(trade: &Trade, errors: &mut Vec<String>) {
    if trade.expiry.is_empty() {
        errors.push("Expiration date is required".to_string());
    }
    if trade.quantity <= 0 {
        errors.push("Quantity must be greater than 0".to_string());
    }
}

// -----------------------------------------------
// PORTFOLIO PERSISTENCE
// -----------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    pub balance: f64,
    pub trades: Vec<Trade>,
    pub total_value: f64,
    pub total_pnl: f64,
    pub total_pnl_percent: f64,
}

impl Default for Portfolio {
    fn default() -> Self {
        Self {
            id: Utc::now().timestamp_millis().to_string(),
            name: "Main Portfolio".to_string(),
            balance: DEFAULT_BALANCE,
            trades: Vec::new(),
            total_value: DEFAULT_BALANCE,
            total_pnl: 0.0,
            total_pnl_percent: 0.0,
        }
    }
}

/// JSON-file-backed portfolio storage. A missing or corrupt file falls
/// back to a fresh default portfolio instead of failing.
pub struct PortfolioStore {
    path: PathBuf,
}

impl PortfolioStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self) -> Vec<Portfolio> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(_) => return vec![Portfolio::default()],
        };
        match serde_json::from_str::<Vec<Portfolio>>(&raw) {
            Ok(portfolios) if !portfolios.is_empty() => portfolios,
            Ok(_) => vec![Portfolio::default()],
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "portfolio file unreadable, starting fresh");
                vec![Portfolio::default()]
            }
        }
    }

    pub fn save(&self, portfolios: &[Portfolio]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(portfolios)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread_trade(spread: SpreadType) -> Trade {
        Trade {
            id: "1".to_string(),
            symbol: "AAPL".to_string(),
            trade_type: TradeType::Spread,
            side: "buy".to_string(),
            quantity: 1,
            price: 0.0,
            option_type: None,
            strike: 0.0,
            expiry: "2026-09-18".to_string(),
            spread_type: Some(spread),
            long_strike: 0.0,
            short_strike: 0.0,
            put_long_strike: 0.0,
            put_short_strike: 0.0,
            call_long_strike: 0.0,
            call_short_strike: 0.0,
            premium: 1.5,
            commission: DEFAULT_COMMISSION,
            notes: String::new(),
            timestamp: None,
        }
    }

    #[test]
    fn test_bull_call_spread_ordering() {
        let mut trade = spread_trade(SpreadType::BullCallSpread);
        trade.long_strike = 150.0;
        trade.short_strike = 155.0;
        assert!(validate_trade(&trade).is_empty());

        trade.long_strike = 160.0;
        let errors = validate_trade(&trade);
        assert_eq!(
            errors,
            vec!["Bull call spread requires long strike < short strike"]
        );
    }

    #[test]
    fn test_bear_put_spread_ordering() {
        let mut trade = spread_trade(SpreadType::BearPutSpread);
        trade.long_strike = 155.0;
        trade.short_strike = 150.0;
        assert!(validate_trade(&trade).is_empty());

        trade.long_strike = 145.0;
        let errors = validate_trade(&trade);
        assert!(errors.contains(&"Bear put spread requires long strike > short strike".to_string()));
    }

    #[test]
    fn test_iron_condor_strike_ordering() {
        let mut trade = spread_trade(SpreadType::IronCondor);
        trade.put_long_strike = 140.0;
        trade.put_short_strike = 145.0;
        trade.call_short_strike = 155.0;
        trade.call_long_strike = 160.0;
        assert!(validate_trade(&trade).is_empty());

        // Put short wanders above call short
        trade.put_short_strike = 156.0;
        let errors = validate_trade(&trade);
        assert!(errors.contains(&"Put short strike must be < call short strike".to_string()));
    }

    #[test]
    fn test_iron_condor_missing_legs() {
        let trade = spread_trade(SpreadType::IronCondor);
        let errors = validate_trade(&trade);
        assert!(errors.contains(&"All four strikes are required for iron condor".to_string()));
    }

    #[test]
    fn test_jade_lizard() {
        let mut trade = spread_trade(SpreadType::JadeLizard);
        trade.put_short_strike = 145.0;
        trade.call_short_strike = 155.0;
        trade.call_long_strike = 160.0;
        assert!(validate_trade(&trade).is_empty());

        trade.call_short_strike = 165.0;
        let errors = validate_trade(&trade);
        assert!(errors.contains(&"Call short strike must be < call long strike".to_string()));
    }

    #[test]
    fn test_straddle_only_gets_base_checks() {
        let trade = spread_trade(SpreadType::Straddle);
        assert!(validate_trade(&trade).is_empty());
    }

    #[test]
    fn test_option_and_stock_validation() {
        let mut trade = spread_trade(SpreadType::BullCallSpread);
        trade.trade_type = TradeType::Option;
        trade.spread_type = None;
        trade.strike = 0.0;
        trade.expiry.clear();
        let errors = validate_trade(&trade);
        assert!(errors.contains(&"Strike price must be greater than 0".to_string()));
        assert!(errors.contains(&"Expiration date is required".to_string()));

        trade.trade_type = TradeType::Stock;
        trade.price = 0.0;
        trade.symbol.clear();
        trade.quantity = 0;
        let errors = validate_trade(&trade);
        assert_eq!(
            errors,
            vec![
                "Symbol is required",
                "Stock price must be greater than 0",
                "Quantity must be greater than 0"
            ]
        );
    }

    #[test]
    fn test_display_names() {
        let mut trade = spread_trade(SpreadType::JadeLizard);
        assert_eq!(trade.display_name(), "AAPL JADE LIZARD");

        trade.trade_type = TradeType::Option;
        trade.option_type = Some(OptionType::Put);
        trade.strike = 150.0;
        assert_eq!(trade.display_name(), "AAPL 150P 2026-09-18");
    }

    #[test]
    fn test_store_roundtrip_and_corrupt_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("portfolios.json");
        let store = PortfolioStore::new(&path);

        // Missing file gives a default portfolio
        let portfolios = store.load();
        assert_eq!(portfolios.len(), 1);
        assert_eq!(portfolios[0].balance, DEFAULT_BALANCE);
        assert_eq!(portfolios[0].name, "Main Portfolio");

        let mut portfolios = portfolios;
        portfolios[0].trades.push(spread_trade(SpreadType::Strangle));
        store.save(&portfolios).unwrap();

        let reloaded = store.load();
        assert_eq!(reloaded[0].trades.len(), 1);
        assert_eq!(reloaded[0].trades[0].symbol, "AAPL");

        std::fs::write(&path, "{not json").unwrap();
        let fallback = store.load();
        assert_eq!(fallback.len(), 1);
        assert!(fallback[0].trades.is_empty());
    }

    #[test]
    fn test_trade_deserializes_with_form_defaults() {
        let trade: Trade = serde_json::from_str(
            r#"{"type":"option","symbol":"TSLA","strike":250.0,"expiry":"2026-09-18","quantity":2,"optionType":"call"}"#,
        )
        .unwrap();
        assert_eq!(trade.side, "buy");
        assert_eq!(trade.commission, DEFAULT_COMMISSION);
        assert!(validate_trade(&trade).is_empty());
    }
}
