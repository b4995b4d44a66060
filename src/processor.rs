use crate::config;
use crate::models::{
    FlowRecord, Movement, OptionContract, OptionsSummary, Sentiment, StockQuote, Trend,
};
use chrono::{Datelike, Duration, Local, NaiveDate, Weekday};

// -----------------------------------------------
// PRICE DERIVATIONS
// -----------------------------------------------

/// Change and change-percent from open/close. Zero open yields zero
/// percent rather than a division blowup.
pub fn change_stats(open: f64, close: f64) -> (f64, f64) {
    let change = close - open;
    let pct = if open != 0.0 {
        (change / open) * 100.0
    } else {
        0.0
    };
    (change, pct)
}

/// Nearest $5 strike to the spot price.
pub fn atm_strike(price: f64) -> f64 {
    (price / config::ATM_STRIKE_STEP).round() * config::ATM_STRIKE_STEP
}

// -----------------------------------------------
// OPTIONS SUMMARY
// -----------------------------------------------

/// put volume / call volume, defaulting to 1.0 when there is no call
/// volume to divide by.
pub fn put_call_ratio(put_volume: f64, call_volume: f64) -> f64 {
    if call_volume > 0.0 {
        put_volume / call_volume
    } else {
        1.0
    }
}

/// Average IV (as a percent) over contracts within half a strike step of
/// the ATM strike. Falls back to all contracts carrying an IV, then to
/// the deterministic default.
pub fn average_iv_near_atm(contracts: &[OptionContract], atm: f64) -> f64 {
    let near: Vec<f64> = contracts
        .iter()
        .filter(|c| {
            c.strike
                .is_some_and(|s| (s - atm).abs() < config::ATM_IV_WINDOW)
        })
        .filter_map(|c| c.implied_volatility)
        .collect();

    let pool: Vec<f64> = if !near.is_empty() {
        near
    } else {
        contracts.iter().filter_map(|c| c.implied_volatility).collect()
    };

    if pool.is_empty() {
        return config::DEFAULT_IV_PERCENT;
    }

    // Vendor IVs are fractional (0.30 = 30%)
    let avg = pool.iter().sum::<f64>() / pool.len() as f64;
    avg * 100.0
}

pub fn summarize_contracts(
    contracts: &[OptionContract],
    atm: f64,
    is_zero_dte: bool,
) -> OptionsSummary {
    let mut call_count = 0;
    let mut put_count = 0;
    let mut call_volume = 0.0;
    let mut put_volume = 0.0;
    let mut total_volume = 0.0;
    let mut total_oi = 0.0;

    for c in contracts {
        if c.is_call() {
            call_count += 1;
            call_volume += c.volume;
        } else if c.is_put() {
            put_count += 1;
            put_volume += c.volume;
        }
        total_volume += c.volume;
        total_oi += c.open_interest;
    }

    OptionsSummary {
        call_count,
        put_count,
        call_volume,
        put_volume,
        total_volume,
        total_oi,
        put_call_ratio: put_call_ratio(put_volume, call_volume),
        average_iv: average_iv_near_atm(contracts, atm),
        is_zero_dte,
    }
}

// -----------------------------------------------
// IV RANK BUCKETING
// -----------------------------------------------

/// Heuristic IV-rank bucket from a percent IV. Not a percentile rank,
/// just a fixed monotonic lookup.
pub fn iv_rank(iv_percent: f64) -> u32 {
    if iv_percent > 80.0 {
        95
    } else if iv_percent > 60.0 {
        80
    } else if iv_percent > 40.0 {
        60
    } else if iv_percent > 25.0 {
        40
    } else {
        20
    }
}

/// IV-rank estimate from the day's move, used when no Greeks IV is
/// available.
pub fn estimate_iv_rank_from_move(change_percent: f64) -> u32 {
    let abs = change_percent.abs();
    if abs > 3.0 {
        70
    } else if abs > 1.5 {
        50
    } else {
        30
    }
}

// -----------------------------------------------
// TRADING CALENDAR
// -----------------------------------------------

pub fn today_expiry() -> String {
    Local::now().date_naive().format("%Y-%m-%d").to_string()
}

pub fn is_trading_day() -> bool {
    !matches!(
        Local::now().date_naive().weekday(),
        Weekday::Sat | Weekday::Sun
    )
}

/// 0DTE: the expiry string equals today's local calendar date and the
/// market is open today. Does not account for exchange holidays.
pub fn is_zero_dte(expiry: &str) -> bool {
    expiry == today_expiry() && is_trading_day()
}

/// Third Friday of the month after the given date.
pub fn third_friday_after(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    // First day of next month always exists
    let mut d = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date);
    while d.weekday() != Weekday::Fri {
        d += Duration::days(1);
    }
    d + Duration::days(14)
}

/// Default target expiry when the caller provides none.
pub fn next_monthly_expiry() -> String {
    third_friday_after(Local::now().date_naive())
        .format("%Y-%m-%d")
        .to_string()
}

// -----------------------------------------------
// MARKET CONDITION LABELS
// -----------------------------------------------

pub fn trend_label(change_percent: f64) -> Trend {
    if change_percent > config::TREND_THRESHOLD_PCT {
        Trend::Bullish
    } else if change_percent < -config::TREND_THRESHOLD_PCT {
        Trend::Bearish
    } else {
        Trend::Neutral
    }
}

pub fn movement_label(change_percent: f64) -> Movement {
    let abs = change_percent.abs();
    if abs > config::VOLATILE_THRESHOLD_PCT {
        Movement::Volatile
    } else if abs < config::STABLE_THRESHOLD_PCT {
        Movement::Stable
    } else {
        Movement::Neutral
    }
}

pub fn flow_sentiment(flows: &[FlowRecord]) -> Sentiment {
    let bullish = flows
        .iter()
        .filter(|f| {
            f.tags.iter().any(|t| t == "bullish") || f.aggressor.as_deref() == Some("buy")
        })
        .count();
    let bearish = flows
        .iter()
        .filter(|f| {
            f.tags.iter().any(|t| t == "bearish") || f.aggressor.as_deref() == Some("sell")
        })
        .count();

    if bullish > bearish {
        Sentiment::Bullish
    } else if bearish > bullish {
        Sentiment::Bearish
    } else {
        Sentiment::Neutral
    }
}

pub fn count_unusual(flows: &[FlowRecord]) -> usize {
    flows
        .iter()
        .filter(|f| f.is_unusual || f.tags.iter().any(|t| t == "unusual"))
        .count()
}

/// (has 0DTE activity, 0DTE volume, 0DTE flow count) for flows expiring
/// today.
pub fn zero_dte_flow_stats(flows: &[FlowRecord]) -> (bool, f64, usize) {
    if !is_trading_day() {
        return (false, 0.0, 0);
    }
    let today = today_expiry();
    let todays: Vec<&FlowRecord> = flows
        .iter()
        .filter(|f| f.expiry.as_deref() == Some(today.as_str()))
        .collect();
    let volume = todays.iter().map(|f| f.volume).sum();
    (!todays.is_empty(), volume, todays.len())
}

/// Trend/movement from the quote's day move.
pub fn label_quote(quote: &StockQuote) -> (Trend, Movement) {
    (
        trend_label(quote.change_percent),
        movement_label(quote.change_percent),
    )
}
