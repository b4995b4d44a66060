use crate::models::{
    AtmGreeks, GreeksData, MarketConditions, MarketSnapshot, QuoteSource, StockQuote, StockView,
    ZeroDteData,
};
use crate::processor;
use rand::Rng;

// -----------------------------------------------
// MOCK MARKET DATA
// -----------------------------------------------

/// Randomized but internally consistent snapshot, served when every
/// live vendor fails. Marked `useMock` so clients can badge it.
pub fn mock_snapshot(symbol: &str, error: Option<String>) -> MarketSnapshot {
    let mut rng = rand::thread_rng();

    let price: f64 = rng.gen_range(50.0..350.0);
    let change: f64 = rng.gen_range(-5.0..5.0);
    let change_percent = change / price * 100.0;
    let open = price - change;
    let iv: f64 = rng.gen_range(20.0..80.0);

    let quote = StockQuote {
        symbol: symbol.to_string(),
        price,
        change,
        change_percent,
        volume: rng.gen_range(1_000_000..50_000_000),
        open,
        high: price.max(open) + rng.gen_range(0.0..2.0),
        low: price.min(open) - rng.gen_range(0.0..2.0),
        close: price,
        source: QuoteSource::Mock,
    };

    let (trend, movement) = processor::label_quote(&quote);
    let zero_dte_today = processor::is_trading_day();
    let zero_dte_volume = if zero_dte_today {
        rng.gen_range(5_000.0..100_000.0)
    } else {
        0.0
    };
    let zero_dte_flow = if zero_dte_today { rng.gen_range(0..25) } else { 0 };

    let stock_data = StockView {
        quote,
        iv,
        iv_rank: rng.gen_range(0..100),
        atm_strike: processor::atm_strike(price),
        put_call_ratio: rng.gen_range(0.5..1.5),
        option_volume: rng.gen_range(10_000.0..500_000.0),
        open_interest: rng.gen_range(50_000.0..1_000_000.0),
    };

    let greeks_data = GreeksData {
        available: true,
        atm: AtmGreeks {
            delta: rng.gen_range(0.40..0.60),
            gamma: rng.gen_range(0.005..0.02),
            theta: rng.gen_range(-0.10..-0.02),
            vega: rng.gen_range(0.05..0.15),
            rho: rng.gen_range(0.02..0.08),
        },
        iv: iv / 100.0,
    };

    let zero_dte_data = if zero_dte_today {
        ZeroDteData {
            available: true,
            call_count: rng.gen_range(10..60),
            put_count: rng.gen_range(10..60),
            total_volume: zero_dte_volume,
            total_oi: rng.gen_range(10_000.0..200_000.0),
            flows: zero_dte_flow,
        }
    } else {
        ZeroDteData::unavailable()
    };

    MarketSnapshot {
        success: false,
        use_mock: true,
        error,
        stock_data,
        market_conditions: MarketConditions {
            trend,
            movement,
            flow_sentiment: processor::flow_sentiment(&[]),
            unusual_options: rng.gen_range(0..10),
            has_zero_dte: zero_dte_today,
            zero_dte_volume,
            zero_dte_flow,
        },
        greeks_data: Some(greeks_data),
        zero_dte_data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_snapshot_is_flagged_and_bounded() {
        let snap = mock_snapshot("AAPL", Some("all vendors failed".to_string()));
        assert!(!snap.success);
        assert!(snap.use_mock);
        assert_eq!(snap.stock_data.quote.symbol, "AAPL");
        assert_eq!(snap.stock_data.quote.source, QuoteSource::Mock);
        assert!(snap.stock_data.quote.price >= 50.0 && snap.stock_data.quote.price < 350.0);
        assert!(snap.stock_data.iv >= 20.0 && snap.stock_data.iv < 80.0);
        assert!(snap.stock_data.put_call_ratio > 0.0);
        assert!(snap.greeks_data.is_some());
    }

    #[test]
    fn test_mock_snapshot_internally_consistent() {
        let snap = mock_snapshot("SPY", None);
        let q = &snap.stock_data.quote;
        assert!(q.high >= q.price && q.high >= q.open);
        assert!(q.low <= q.price && q.low <= q.open);
        assert_eq!(
            snap.stock_data.atm_strike,
            (q.price / 5.0).round() * 5.0
        );
        assert_eq!(
            snap.market_conditions.has_zero_dte,
            snap.zero_dte_data.available
        );
    }
}
