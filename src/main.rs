mod api_server;
mod config;
mod error;
mod logging;
mod market_client;
mod mock;
mod models;
mod portfolio;
mod processor;
mod rules;

use anyhow::Result;
use colored::Colorize;
use market_client::MarketClient;

/// Run API server mode
async fn run_server(port: u16) -> Result<()> {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "Options Radar API Server".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    api_server::start_server(port).await
}

/// One-shot aggregation for a single symbol, printed to stdout.
async fn run_single(symbol: &str) -> Result<()> {
    println!("{}", "=".repeat(60).blue());
    println!("{}", "Options Radar Single Symbol".green().bold());
    println!("{}", "=".repeat(60).blue());
    println!();

    let client = MarketClient::new()?;

    println!("{} Fetching market snapshot for {}...", "→".cyan(), symbol.yellow());
    println!();

    let snapshot = api_server::aggregate_market(&client, symbol, true, None).await;

    println!("{}", "=".repeat(60).blue());
    println!("{}", "Results".cyan().bold());
    println!("{}", "=".repeat(60).blue());
    if snapshot.use_mock {
        println!("{} Live data unavailable, showing mock data", "⚠".yellow());
    }
    let stock = &snapshot.stock_data;
    println!("{} Symbol: {}", "✓".green(), stock.quote.symbol.yellow());
    println!(
        "{} Price: {:.2} ({:+.2}, {:+.2}%)",
        "✓".green(),
        stock.quote.price,
        stock.quote.change,
        stock.quote.change_percent
    );
    println!("{} IV: {:.1}% (rank {})", "✓".green(), stock.iv, stock.iv_rank);
    println!("{} ATM strike: {:.0}", "✓".green(), stock.atm_strike);
    println!("{} Put/call ratio: {:.2}", "✓".green(), stock.put_call_ratio);
    println!(
        "{} Conditions: trend={:?} movement={:?} sentiment={:?}",
        "ℹ".blue(),
        snapshot.market_conditions.trend,
        snapshot.market_conditions.movement,
        snapshot.market_conditions.flow_sentiment
    );
    if snapshot.zero_dte_data.available {
        println!(
            "{} 0DTE: {} calls / {} puts, volume {:.0}",
            "ℹ".blue(),
            snapshot.zero_dte_data.call_count,
            snapshot.zero_dte_data.put_count,
            snapshot.zero_dte_data.total_volume
        );
    }
    println!();

    let recommendations = rules::recommend(
        &snapshot.stock_data,
        &snapshot.market_conditions,
        &snapshot.zero_dte_data,
    );
    println!("{} Recommendations:", "ℹ".blue());
    for rec in &recommendations {
        println!(
            "  {} {} (win {}%) → {}",
            "✓".green(),
            rec.strategy.name.yellow(),
            rec.win_rate,
            rec.reason
        );
    }
    println!("{}", "=".repeat(60).blue());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();

    let mode = config::get_execution_mode();
    let symbol = config::get_single_symbol();
    let port = config::get_port();

    match mode.as_str() {
        "server" => run_server(port).await?,
        "single" => run_single(&symbol).await?,
        _ => {
            eprintln!("Invalid mode '{}'. Use 'server' or 'single'", mode);
            eprintln!("Set RADAR_MODE environment variable to control execution mode");
            eprintln!("Examples:");
            eprintln!("  RADAR_MODE=server RADAR_PORT=3001 cargo run   # Start API server on port 3001");
            eprintln!("  RADAR_MODE=single RADAR_SYMBOL=AAPL cargo run # One-shot snapshot");
            std::process::exit(1);
        }
    }

    Ok(())
}
