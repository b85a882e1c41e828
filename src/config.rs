use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Object storage settings. `endpoint` is only set for S3-compatible
/// services such as MinIO, which also switches to path-style addressing.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    pub public_base_url: Option<String>,
    pub url_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "shum".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "shum-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        let storage = StorageConfig {
            endpoint: env_opt("S3_ENDPOINT"),
            bucket: std::env::var("S3_BUCKET").context("S3_BUCKET is not set")?,
            access_key: std::env::var("S3_ACCESS_KEY").unwrap_or_default(),
            secret_key: std::env::var("S3_SECRET_KEY").unwrap_or_default(),
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "eu-central-1".into()),
            public_base_url: env_opt("MEDIA_BASE_URL"),
            url_ttl_secs: env_parse("MEDIA_URL_TTL_SECS").unwrap_or(30 * 60),
        };
        Ok(Self {
            database_url,
            jwt,
            storage,
        })
    }
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}
