use crate::models::{MarketConditions, StockView, ZeroDteData};
use serde::Serialize;

// -----------------------------------------------
// STRATEGY CATALOG
// -----------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    LongCall,
    LongPut,
    IronCondor,
    BullPutSpread,
    ZeroDteLongCall,
    ZeroDteIronFly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Directional,
    Neutral,
    Spread,
    ZeroDte,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bias {
    Bullish,
    Bearish,
    Neutral,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyDef {
    pub id: StrategyId,
    pub name: &'static str,
    pub kind: StrategyKind,
    pub bias: Bias,
    pub description: &'static str,
    pub best_for: &'static str,
    pub max_profit: &'static str,
    pub max_loss: &'static str,
    pub risk_reward: &'static str,
}

pub fn catalog() -> Vec<StrategyDef> {
    vec![
        strategy(StrategyId::LongCall),
        strategy(StrategyId::LongPut),
        strategy(StrategyId::IronCondor),
        strategy(StrategyId::BullPutSpread),
        strategy(StrategyId::ZeroDteLongCall),
        strategy(StrategyId::ZeroDteIronFly),
    ]
}

pub fn strategy(id: StrategyId) -> StrategyDef {
    match id {
        StrategyId::LongCall => StrategyDef {
            id,
            name: "Long Call",
            kind: StrategyKind::Directional,
            bias: Bias::Bullish,
            description: "Buy call options for bullish outlook",
            best_for: "Strong upward movement expected",
            max_profit: "Unlimited",
            max_loss: "Premium paid",
            risk_reward: "High",
        },
        StrategyId::LongPut => StrategyDef {
            id,
            name: "Long Put",
            kind: StrategyKind::Directional,
            bias: Bias::Bearish,
            description: "Buy put options for bearish outlook",
            best_for: "Strong downward movement expected",
            max_profit: "Stock to zero minus premium",
            max_loss: "Premium paid",
            risk_reward: "High",
        },
        StrategyId::IronCondor => StrategyDef {
            id,
            name: "Iron Condor",
            kind: StrategyKind::Neutral,
            bias: Bias::Neutral,
            description: "Sell OTM call & put spreads",
            best_for: "Range-bound markets",
            max_profit: "Net credit received",
            max_loss: "Strike width - credit",
            risk_reward: "Moderate",
        },
        StrategyId::BullPutSpread => StrategyDef {
            id,
            name: "Bull Put Spread",
            kind: StrategyKind::Spread,
            bias: Bias::Bullish,
            description: "Sell put + buy lower strike put",
            best_for: "Moderate bullish view with income",
            max_profit: "Net credit received",
            max_loss: "Strike difference - credit",
            risk_reward: "Moderate",
        },
        StrategyId::ZeroDteLongCall => StrategyDef {
            id,
            name: "0DTE Long Call",
            kind: StrategyKind::ZeroDte,
            bias: Bias::Bullish,
            description: "Intraday directional play - calls expiring today",
            best_for: "Strong intraday momentum with clear direction",
            max_profit: "Unlimited (until close)",
            max_loss: "Premium paid",
            risk_reward: "Very High Risk",
        },
        StrategyId::ZeroDteIronFly => StrategyDef {
            id,
            name: "0DTE Iron Fly",
            kind: StrategyKind::ZeroDte,
            bias: Bias::Neutral,
            description: "Sell ATM straddle with protection - expires today",
            best_for: "Pin risk at major levels, maximum theta decay",
            max_profit: "Credit received",
            max_loss: "Wing width - credit",
            risk_reward: "High Probability",
        },
    }
}

// -----------------------------------------------
// PER-STRATEGY METRICS
// -----------------------------------------------

/// Illustrative per-contract dollar figures, not calibrated pricing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyMetrics {
    /// None means unlimited
    pub max_profit: Option<f64>,
    pub max_loss: f64,
    pub breakeven_low: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breakeven_high: Option<f64>,
    pub profit_probability: u32,
}

pub fn compute_metrics(id: StrategyId, price: f64, atm_strike: f64) -> StrategyMetrics {
    const STRIKE_WIDTH: f64 = 5.0;
    const CONTRACT_MULTIPLIER: f64 = 100.0;

    match id {
        StrategyId::LongCall => {
            let premium = price * 0.02;
            StrategyMetrics {
                max_profit: None,
                max_loss: premium * CONTRACT_MULTIPLIER,
                breakeven_low: atm_strike + premium,
                breakeven_high: None,
                profit_probability: 35,
            }
        }
        StrategyId::LongPut => {
            let premium = price * 0.02;
            StrategyMetrics {
                max_profit: None,
                max_loss: premium * CONTRACT_MULTIPLIER,
                breakeven_low: atm_strike - premium,
                breakeven_high: None,
                profit_probability: 35,
            }
        }
        StrategyId::IronCondor => {
            let credit = STRIKE_WIDTH * 0.3;
            StrategyMetrics {
                max_profit: Some(credit * CONTRACT_MULTIPLIER),
                max_loss: (STRIKE_WIDTH - credit) * CONTRACT_MULTIPLIER,
                breakeven_low: price - 10.0,
                breakeven_high: Some(price + 10.0),
                profit_probability: 68,
            }
        }
        StrategyId::BullPutSpread => {
            let credit = STRIKE_WIDTH * 0.35;
            StrategyMetrics {
                max_profit: Some(credit * CONTRACT_MULTIPLIER),
                max_loss: (STRIKE_WIDTH - credit) * CONTRACT_MULTIPLIER,
                breakeven_low: price - credit,
                breakeven_high: None,
                profit_probability: 70,
            }
        }
        StrategyId::ZeroDteLongCall => {
            let premium = price * 0.003;
            StrategyMetrics {
                max_profit: None,
                max_loss: premium * CONTRACT_MULTIPLIER,
                breakeven_low: price + premium,
                breakeven_high: None,
                profit_probability: 25,
            }
        }
        StrategyId::ZeroDteIronFly => {
            let credit = price * 0.015;
            StrategyMetrics {
                max_profit: Some(credit * CONTRACT_MULTIPLIER),
                max_loss: (STRIKE_WIDTH - credit).max(0.0) * CONTRACT_MULTIPLIER,
                breakeven_low: price - credit,
                breakeven_high: Some(price + credit),
                profit_probability: 68,
            }
        }
    }
}

// -----------------------------------------------
// RECOMMENDATION ENGINE
// -----------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(flatten)]
    pub strategy: StrategyDef,
    pub win_rate: u32,
    pub priority: u8,
    pub reason: String,
    pub metrics: StrategyMetrics,
}

/// Priority-ordered if/else rules over trend, IV rank, and flow data.
/// Win rates are canned constants carried through for display.
pub fn recommend(
    stock: &StockView,
    conditions: &MarketConditions,
    zero_dte: &ZeroDteData,
) -> Vec<Recommendation> {
    fn push(
        recs: &mut Vec<Recommendation>,
        id: StrategyId,
        win_rate: u32,
        priority: u8,
        reason: String,
        price: f64,
        atm: f64,
    ) {
        recs.push(Recommendation {
            strategy: strategy(id),
            win_rate,
            priority,
            reason,
            metrics: compute_metrics(id, price, atm),
        });
    }

    let mut recs: Vec<Recommendation> = Vec::new();
    let change_percent = stock.quote.change_percent;
    let iv_rank = stock.iv_rank;
    let price = stock.quote.price;
    let atm = stock.atm_strike;

    // Priority 1: 0DTE plays when today's chain is active
    if conditions.has_zero_dte || zero_dte.available {
        if change_percent.abs() > 0.5 {
            if change_percent > 0.5 {
                push(
                    &mut recs,
                    StrategyId::ZeroDteLongCall,
                    35,
                    1,
                    format!(
                        "0DTE momentum: stock up {:.2}%, ride the intraday trend",
                        change_percent
                    ),
                    price,
                    atm,
                );
            }
        } else {
            push(
                &mut recs,
                StrategyId::ZeroDteIronFly,
                68,
                1,
                format!(
                    "0DTE pin play: stock stable ({:.2}%), maximum theta decay",
                    change_percent
                ),
                price,
                atm,
            );
        }
    }

    // Priority 2: directional plays on a strong up move
    if change_percent > 2.0 {
        if iv_rank < 40 {
            push(
                &mut recs,
                StrategyId::LongCall,
                45,
                2,
                format!(
                    "Strong bullish: up {:.2}% with low IV rank ({}), calls are cheap",
                    change_percent, iv_rank
                ),
                price,
                atm,
            );
        } else {
            push(
                &mut recs,
                StrategyId::BullPutSpread,
                70,
                2,
                format!(
                    "Bullish momentum: up {:.2}%, collect premium on pullbacks",
                    change_percent
                ),
                price,
                atm,
            );
        }
    }

    // Priority 3: premium selling on elevated IV
    if iv_rank > 70 {
        push(
            &mut recs,
            StrategyId::IronCondor,
            75,
            3,
            format!("Extreme IV rank ({}): premium selling opportunity", iv_rank),
            price,
            atm,
        );
    }

    // Default when nothing fired
    if recs.is_empty() {
        push(
            &mut recs,
            StrategyId::IronCondor,
            65,
            5,
            "No strong directional bias - neutral iron condor".to_string(),
            price,
            atm,
        );
    }

    // Dedupe by strategy, first occurrence wins
    let mut seen = Vec::new();
    recs.retain(|r| {
        if seen.contains(&r.strategy.id) {
            false
        } else {
            seen.push(r.strategy.id);
            true
        }
    });

    recs.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(b.win_rate.cmp(&a.win_rate))
    });
    recs.truncate(5);
    recs
}

// -----------------------------------------------
// POSITION SIZING
// -----------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionSize {
    pub contracts: u32,
    pub total_cost: f64,
}

/// Contracts sized so that max loss stays within the risk budget. A
/// non-positive max loss falls back to a flat default for
/// undefined-risk math.
pub fn position_size(metrics: &StrategyMetrics, account_balance: f64, max_risk_pct: f64) -> PositionSize {
    const FALLBACK_CONTRACTS: u32 = 10;

    let risk_amount = (account_balance * max_risk_pct) / 100.0;
    let contracts = if metrics.max_loss > 0.0 && risk_amount.is_finite() {
        let c = (risk_amount / metrics.max_loss).floor();
        if c >= 1.0 { c as u32 } else { FALLBACK_CONTRACTS }
    } else {
        FALLBACK_CONTRACTS
    };

    PositionSize {
        contracts,
        total_cost: contracts as f64 * metrics.max_loss.max(0.0),
    }
}
