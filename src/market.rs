// src/market.rs
use crate::error::{LedgerError, LedgerResult};
use crate::models::Market;
use async_trait::async_trait;
use log::{error, info};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

const SEARCH_LIMIT: usize = 5;
const ALPHAVANTAGE_URL: &str = "https://www.alphavantage.co/query";

pub fn default_markets() -> Vec<Market> {
    vec![
        Market::new("AAPL", "Apple Inc."),
        Market::new("GOOGL", "Alphabet Inc."),
        Market::new("MSFT", "Microsoft Corporation"),
        Market::new("ABNB", "Airbnb, Inc."),
        Market::new("ADBE", "Adobe Inc."),
    ]
}

/// Markets whose symbol or name contains `query`, ignoring case. An empty
/// query lists the whole catalogue.
pub fn search(markets: &[Market], query: &str) -> Vec<Market> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return markets.to_vec();
    }
    markets
        .iter()
        .filter(|m| {
            m.symbol.to_lowercase().contains(&query) || m.name.to_lowercase().contains(&query)
        })
        .take(SEARCH_LIMIT)
        .cloned()
        .collect()
}

/// Resolves the price a buy executes at.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn latest_price(&self, symbol: &str) -> LedgerResult<Decimal>;
}

#[derive(Deserialize)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: String,
}

#[derive(Deserialize)]
struct AlphaVantageResponse {
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

pub struct AlphaVantageQuotes {
    client: Client,
    api_key: String,
}

impl AlphaVantageQuotes {
    pub fn new(client: Client, api_key: String) -> Self {
        AlphaVantageQuotes { client, api_key }
    }

    fn quote_request(&self, symbol: &str) -> reqwest::Result<reqwest::Request> {
        self.client
            .get(ALPHAVANTAGE_URL)
            .query(&[
                ("function", "GLOBAL_QUOTE"),
                ("symbol", symbol),
                ("apikey", self.api_key.as_str()),
            ])
            .build()
    }
}

#[async_trait]
impl QuoteSource for AlphaVantageQuotes {
    async fn latest_price(&self, symbol: &str) -> LedgerResult<Decimal> {
        let request = self
            .quote_request(symbol)
            .map_err(|e| LedgerError::Quote(e.to_string()))?;

        let response = self.client.execute(request).await.map_err(|e| {
            error!("HTTP request failed: {}", e);
            LedgerError::Quote(e.to_string())
        })?;
        if !response.status().is_success() {
            error!(
                "Failed to fetch quote from provider: HTTP {}",
                response.status()
            );
            return Err(LedgerError::Quote(format!("HTTP {}", response.status())));
        }

        let body = response
            .json::<AlphaVantageResponse>()
            .await
            .map_err(|e| LedgerError::Quote(e.to_string()))?;
        let quote = body
            .global_quote
            .ok_or_else(|| LedgerError::Quote(format!("no quote for {}", symbol)))?;
        let price = Decimal::from_str(quote.price.trim())
            .map_err(|e| LedgerError::Quote(e.to_string()))?;

        info!("Quote for {}: {}", symbol, price);
        Ok(price)
    }
}

/// Static price table, for tests and offline runs.
#[derive(Default)]
pub struct FixedQuotes {
    prices: HashMap<String, Decimal>,
}

impl FixedQuotes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_price(mut self, symbol: &str, price: Decimal) -> Self {
        self.prices.insert(symbol.to_string(), price);
        self
    }
}

#[async_trait]
impl QuoteSource for FixedQuotes {
    async fn latest_price(&self, symbol: &str) -> LedgerResult<Decimal> {
        self.prices
            .get(symbol)
            .copied()
            .ok_or_else(|| LedgerError::Quote(format!("no quote for {}", symbol)))
    }
}
