use std::env;
use std::str::FromStr;

use crate::auth::password::DEFAULT_COST;
use crate::error::AppError;

const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 10 * 24 * 60 * 60;
const DEFAULT_MAX_SESSIONS_PER_USER: usize = 10;

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
    pub server_port: u16,
    pub server_host: String,
    pub jwt_secret: String,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
    pub max_sessions_per_user: usize,
    /// bcrypt work factor.
    pub password_cost: u32,
    /// Require an access token on `GET /lists/{list_id}/tasks`.
    pub protect_task_listing: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| AppError::Internal("JWT_SECRET must be set".into()))?;
        if jwt_secret.is_empty() {
            return Err(AppError::Internal("JWT_SECRET must not be empty".into()));
        }

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.is_empty()),
            server_port: parse_var("SERVER_PORT", 8080)?,
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            jwt_secret,
            access_token_ttl_secs: parse_var("ACCESS_TOKEN_TTL_SECS", DEFAULT_ACCESS_TOKEN_TTL_SECS)?,
            refresh_token_ttl_secs: parse_var(
                "REFRESH_TOKEN_TTL_SECS",
                DEFAULT_REFRESH_TOKEN_TTL_SECS,
            )?,
            max_sessions_per_user: parse_var(
                "MAX_SESSIONS_PER_USER",
                DEFAULT_MAX_SESSIONS_PER_USER,
            )?,
            password_cost: parse_var("BCRYPT_COST", DEFAULT_COST)?,
            protect_task_listing: parse_var("PROTECT_TASK_LISTING", false)?,
        })
    }

    /// Defaults suitable for tests: in-memory storage and the given secret.
    pub fn for_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            database_url: None,
            server_port: 8080,
            server_host: "127.0.0.1".to_string(),
            jwt_secret: jwt_secret.into(),
            access_token_ttl_secs: DEFAULT_ACCESS_TOKEN_TTL_SECS,
            refresh_token_ttl_secs: DEFAULT_REFRESH_TOKEN_TTL_SECS,
            max_sessions_per_user: DEFAULT_MAX_SESSIONS_PER_USER,
            // bcrypt's minimum; keeps test signups fast
            password_cost: 4,
            protect_task_listing: false,
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Internal(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}
