// src/main.rs
use env_logger::Builder;
use log::{error, info, LevelFilter};
use reqwest::Client;
use rust_decimal::Decimal;
use std::sync::Arc;
use stock_demo::api::{self, AppState};
use stock_demo::config::Config;
use stock_demo::db::ScyllaGateway;
use stock_demo::gateway::{Gateway, InMemoryGateway};
use stock_demo::ledger::Ledger;
use stock_demo::market::{default_markets, AlphaVantageQuotes, FixedQuotes, QuoteSource};

fn offline_quotes() -> FixedQuotes {
    [
        ("AAPL", Decimal::new(19000, 2)),
        ("GOOGL", Decimal::new(14000, 2)),
        ("MSFT", Decimal::new(41500, 2)),
        ("ABNB", Decimal::new(13500, 2)),
        ("ADBE", Decimal::new(47500, 2)),
    ]
    .iter()
    .fold(FixedQuotes::new(), |quotes, (symbol, price)| {
        quotes.with_price(symbol, *price)
    })
}

#[tokio::main]
async fn main() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let config = Config::from_env();
    info!("Starting the stock demo application...");

    let gateway: Arc<dyn Gateway> = match &config.scylla_node {
        Some(node) => match ScyllaGateway::connect(node).await {
            Ok(gateway) => Arc::new(gateway),
            Err(e) => {
                error!("Failed to initialize database: {}", e);
                return;
            }
        },
        None => {
            info!("No ScyllaDB node configured; keeping accounts in memory.");
            Arc::new(InMemoryGateway::new())
        }
    };

    let quotes: Arc<dyn QuoteSource> = match &config.alphavantage_api_key {
        Some(key) => Arc::new(AlphaVantageQuotes::new(Client::new(), key.clone())),
        None => {
            info!("No Alpha Vantage key configured; using fixed prices.");
            Arc::new(offline_quotes())
        }
    };

    let state = Arc::new(AppState {
        ledger: Ledger::with_fee(gateway, config.fee),
        quotes,
        markets: default_markets(),
        jwt_secret: config.jwt_secret.clone(),
        token_ttl_secs: config.token_ttl_secs,
    });

    let addr = config.addr();
    info!("Server running on http://{}", addr);
    warp::serve(api::routes(state)).run(addr).await;
}
