use anyhow::{bail, Context};
use serde::Deserialize;

const DEFAULT_TTL_MINUTES: i64 = 60;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Postgres URL; `None` runs the API on the in-memory store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub host: String,
    pub port: u16,
    pub seed: bool,
}

/// Token lifetime in minutes; must be a positive whole number.
fn parse_ttl(raw: &str) -> anyhow::Result<i64> {
    let minutes = raw
        .trim()
        .parse::<i64>()
        .with_context(|| format!("JWT_TTL_MINUTES must be a whole number, got {raw:?}"))?;
    if minutes <= 0 {
        bail!("JWT_TTL_MINUTES must be positive, got {minutes}");
    }
    Ok(minutes)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "nexus-crm".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "nexus-crm-users".into()),
            ttl_minutes: match std::env::var("JWT_TTL_MINUTES") {
                Ok(raw) => parse_ttl(&raw)?,
                Err(_) => DEFAULT_TTL_MINUTES,
            },
        };
        let host = std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = std::env::var("APP_PORT")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(3000);
        let seed = std::env::var("SEED_DATABASE")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        Ok(Self {
            database_url,
            jwt,
            host,
            port,
            seed,
        })
    }

    /// Configuration used by tests and local tooling.
    pub fn for_tests(secret: &str) -> Self {
        Self {
            database_url: None,
            jwt: JwtConfig {
                secret: secret.into(),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: DEFAULT_TTL_MINUTES,
            },
            host: "127.0.0.1".into(),
            port: 0,
            seed: false,
        }
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
