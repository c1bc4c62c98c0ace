// src/config.rs
use rust_decimal::Decimal;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::ledger::TRANSACTION_FEE;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub jwt_secret: String,
    /// Lifetime of issued session tokens.
    pub token_ttl_secs: i64,
    pub fee: Decimal,
    /// ScyllaDB contact point; accounts stay in memory when unset.
    pub scylla_node: Option<String>,
    /// Alpha Vantage key; prices come from a fixed table when unset.
    pub alphavantage_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: 3030,
            jwt_secret: "change-me".to_string(),
            token_ttl_secs: 24 * 60 * 60,
            fee: TRANSACTION_FEE,
            scylla_node: None,
            alphavantage_api_key: None,
        }
    }
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Config::default();
        Config {
            host: parsed("STOCK_DEMO_HOST", defaults.host),
            port: parsed("STOCK_DEMO_PORT", defaults.port),
            jwt_secret: optional("STOCK_DEMO_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_secs: parsed("STOCK_DEMO_TOKEN_TTL_SECS", defaults.token_ttl_secs),
            fee: parsed("STOCK_DEMO_FEE", defaults.fee),
            scylla_node: optional("STOCK_DEMO_SCYLLA_NODE"),
            alphavantage_api_key: optional("ALPHAVANTAGE_API_KEY"),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}
