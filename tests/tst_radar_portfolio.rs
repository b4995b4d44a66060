use options_radar::portfolio::{
    validate_trade, Portfolio, PortfolioStore, SpreadType, Trade, TradeType,
    DEFAULT_BALANCE, DEFAULT_COMMISSION,
};

#[cfg(test)]
mod tests {
    use super::*;

    fn base_trade(trade_type: TradeType) -> Trade {
        let kind = match trade_type {
            TradeType::Stock => "stock",
            TradeType::Option => "option",
            TradeType::Spread => "spread",
        };
        serde_json::from_value(serde_json::json!({
            "type": kind,
            "symbol": "AAPL",
            "quantity": 1,
        }))
        .unwrap()
    }

    #[test]
    fn test_stock_trade_requires_price() {
        let mut trade = base_trade(TradeType::Stock);
        assert_eq!(
            validate_trade(&trade),
            vec!["Stock price must be greater than 0"]
        );

        trade.price = 150.0;
        assert!(validate_trade(&trade).is_empty());
    }

    #[test]
    fn test_option_trade_requires_strike_and_expiry() {
        let mut trade = base_trade(TradeType::Option);
        let errors = validate_trade(&trade);
        assert!(errors.contains(&"Strike price must be greater than 0".to_string()));
        assert!(errors.contains(&"Expiration date is required".to_string()));

        trade.strike = 150.0;
        trade.expiry = "2026-09-18".to_string();
        assert!(validate_trade(&trade).is_empty());
    }

    #[test]
    fn test_vertical_spread_strike_ordering() {
        let mut trade = base_trade(TradeType::Spread);
        trade.spread_type = Some(SpreadType::BullPutSpread);
        trade.expiry = "2026-09-18".to_string();
        trade.long_strike = 145.0;
        trade.short_strike = 150.0;
        assert!(validate_trade(&trade).is_empty());

        // Inverted legs
        trade.long_strike = 155.0;
        let errors = validate_trade(&trade);
        assert_eq!(
            errors,
            vec!["Bull put spread requires long strike < short strike"]
        );

        // Bear call wants the opposite ordering
        trade.spread_type = Some(SpreadType::BearCallSpread);
        assert!(validate_trade(&trade).is_empty());
    }

    #[test]
    fn test_iron_condor_needs_ordered_wings() {
        let mut trade = base_trade(TradeType::Spread);
        trade.spread_type = Some(SpreadType::IronCondor);
        trade.expiry = "2026-09-18".to_string();
        trade.put_long_strike = 140.0;
        trade.put_short_strike = 145.0;
        trade.call_short_strike = 155.0;
        trade.call_long_strike = 160.0;
        assert!(validate_trade(&trade).is_empty());

        trade.call_long_strike = 150.0;
        let errors = validate_trade(&trade);
        assert_eq!(
            errors,
            vec!["Call spread: short strike must be < long strike"]
        );
    }

    #[test]
    fn test_unruled_spreads_pass_with_base_checks() {
        let mut trade = base_trade(TradeType::Spread);
        for spread in [
            SpreadType::IronButterfly,
            SpreadType::CalendarSpread,
            SpreadType::DiagonalSpread,
            SpreadType::Straddle,
            SpreadType::Strangle,
            SpreadType::BigLizard,
        ] {
            trade.spread_type = Some(spread);
            assert!(validate_trade(&trade).is_empty(), "{:?}", spread);
        }
    }

    #[test]
    fn test_errors_accumulate() {
        let trade: Trade = serde_json::from_value(serde_json::json!({
            "type": "spread",
            "symbol": "",
            "quantity": 0,
            "spreadType": "jade_lizard",
        }))
        .unwrap();
        let errors = validate_trade(&trade);
        assert!(errors.contains(&"Symbol is required".to_string()));
        assert!(errors.contains(
            &"Put short strike, call short strike, and call long strike are required".to_string()
        ));
        assert!(errors.contains(&"Expiration date is required".to_string()));
        assert!(errors.contains(&"Quantity must be greater than 0".to_string()));
    }

    #[test]
    fn test_commission_default_applied_on_decode() {
        let trade = base_trade(TradeType::Stock);
        assert_eq!(trade.commission, DEFAULT_COMMISSION);
        assert_eq!(trade.side, "buy");
    }

    #[test]
    fn test_store_persists_and_survives_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("radar").join("portfolios.json");
        let store = PortfolioStore::new(&path);

        let mut portfolios = store.load();
        assert_eq!(portfolios.len(), 1);
        assert_eq!(portfolios[0].balance, DEFAULT_BALANCE);

        let mut trade = base_trade(TradeType::Stock);
        trade.price = 150.0;
        portfolios[0].trades.push(trade);
        portfolios.push(Portfolio {
            name: "Paper Account".to_string(),
            ..Portfolio::default()
        });
        store.save(&portfolios).unwrap();

        let reloaded = store.load();
        assert_eq!(reloaded.len(), 2);
        assert_eq!(reloaded[0].trades.len(), 1);
        assert_eq!(reloaded[1].name, "Paper Account");

        std::fs::write(&path, "[{\"broken\":").unwrap();
        let fallback = store.load();
        assert_eq!(fallback.len(), 1);
        assert_eq!(fallback[0].name, "Main Portfolio");
        assert!(fallback[0].trades.is_empty());
    }
}
