use std::{net::SocketAddr, str::FromStr, time::Duration};

use anyhow::Context;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreKind {
    Sqlite,
    Memory,
}

impl FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" | "sql" => Ok(StoreKind::Sqlite),
            "memory" | "mem" => Ok(StoreKind::Memory),
            other => anyhow::bail!("unknown store kind {other:?}, expected sqlite or memory"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub addr: SocketAddr,
    pub database_url: String,
    pub store: StoreKind,
    pub list_delay: Duration,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port: u16 =
            std::env::var("PORT").unwrap_or_else(|_| "8080".to_string()).parse().context("PORT")?;

        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://movies.db?mode=rwc".to_string());

        let store: StoreKind = std::env::var("MOVIE_STORE")
            .unwrap_or_else(|_| "sqlite".to_string())
            .parse()
            .context("MOVIE_STORE")?;

        let list_delay_ms: u64 =
            std::env::var("LIST_DELAY_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(3_000);

        Ok(Self {
            addr: format!("{host}:{port}").parse().context("HOST/PORT")?,
            database_url,
            store,
            list_delay: Duration::from_millis(list_delay_ms),
        })
    }
}
