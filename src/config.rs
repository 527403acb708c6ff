use std::str::FromStr;

use anyhow::ensure;
use serde::Deserialize;

/// One year.
const MAX_JWT_TTL_MINUTES: i64 = 525_600;
/// One day.
const MAX_RESET_TTL_MINUTES: i64 = 1_440;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 work factors. `hash_cost` is the iteration count.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordConfig {
    pub hash_cost: u32,
    pub memory_kib: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    pub ttl_minutes: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub reset: ResetConfig,
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "storefront-users".into()),
            ttl_minutes: env_or("JWT_TTL_MINUTES", 60),
        };
        let password = PasswordConfig {
            hash_cost: env_or("PASSWORD_HASH_COST", argon2::Params::DEFAULT_T_COST),
            memory_kib: env_or("PASSWORD_HASH_MEMORY_KIB", argon2::Params::DEFAULT_M_COST),
        };
        let reset = ResetConfig {
            ttl_minutes: env_or("RESET_TOKEN_TTL_MINUTES", 15),
        };
        let config = Self {
            database_url,
            jwt,
            password,
            reset,
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks run once at startup so request paths never see a value
    /// that could overflow a timestamp or disable a check.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(!self.jwt.secret.is_empty(), "JWT_SECRET must not be empty");
        ensure!(
            (1..=MAX_JWT_TTL_MINUTES).contains(&self.jwt.ttl_minutes),
            "JWT_TTL_MINUTES must be between 1 and {MAX_JWT_TTL_MINUTES}, got {}",
            self.jwt.ttl_minutes
        );
        ensure!(
            (1..=MAX_RESET_TTL_MINUTES).contains(&self.reset.ttl_minutes),
            "RESET_TOKEN_TTL_MINUTES must be between 1 and {MAX_RESET_TTL_MINUTES}, got {}",
            self.reset.ttl_minutes
        );
        argon2::Params::new(
            self.password.memory_kib,
            self.password.hash_cost,
            argon2::Params::DEFAULT_P_COST,
            None,
        )
        .map_err(|e| {
            anyhow::anyhow!(
                "PASSWORD_HASH_COST={} / PASSWORD_HASH_MEMORY_KIB={} rejected: {e}",
                self.password.hash_cost,
                self.password.memory_kib
            )
        })?;
        Ok(())
    }
}
