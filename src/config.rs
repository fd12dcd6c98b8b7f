use std::net::SocketAddr;

use anyhow::Context;

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub redis_url: Option<String>,
    pub cache_ttl_seconds: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "3000".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://reelbase.db?mode=rwc".to_string());

        let redis_url = std::env::var("REDIS_URL").ok().filter(|s| !s.trim().is_empty());

        let cache_ttl_seconds: u64 = match std::env::var("CACHE_TTL_SECONDS") {
            Ok(s) => s.parse().context("CACHE_TTL_SECONDS")?,
            Err(_) => 3600,
        };

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            redis_url,
            cache_ttl_seconds,
        })
    }
}
