//! Server Configuration
//!
//! Everything is read from the environment once at startup.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};
use auth::AuthConfig;
use directory::store::RemoteKvConfig;
use platform::rate_limit::RateLimitConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";
const DEFAULT_FRONTEND_ORIGINS: &str = "http://localhost:3000";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read before the rest of the configuration so startup warnings are formatted too
    pub fn from_env() -> Self {
        Self::parse(env::var("LOG_FORMAT").ok().as_deref())
    }

    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some(format) if format.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub auth: AuthConfig,
    /// Primary store; `None` runs on the local fallback only
    pub remote_kv: Option<RemoteKvConfig>,
    /// Local fallback directory; `None` keeps data in memory
    pub local_dir: Option<PathBuf>,
    pub fallback_on_error: bool,
    pub frontend_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or(&var, "BIND_ADDR", DEFAULT_BIND_ADDR.parse()?)?;

        let jwt_secret = match var("JWT_SECRET") {
            Some(secret) => {
                if secret.len() < 32 {
                    tracing::warn!("JWT_SECRET is shorter than 32 bytes");
                }
                secret.into_bytes()
            }
            None if cfg!(debug_assertions) => {
                tracing::warn!("JWT_SECRET not set, using a random secret (dev only)");
                AuthConfig::with_random_secret().jwt_secret
            }
            None => bail!("JWT_SECRET must be set in production"),
        };

        let defaults = AuthConfig::default();
        let token_ttl = Duration::from_secs(parse_or(
            &var,
            "TOKEN_TTL_SECS",
            defaults.token_ttl.as_secs(),
        )?);
        let rate_limit = RateLimitConfig::new(
            parse_or(&var, "AUTH_RATE_LIMIT_MAX", defaults.rate_limit.max_requests)?,
            parse_or(
                &var,
                "AUTH_RATE_LIMIT_WINDOW_SECS",
                defaults.rate_limit.window.as_secs(),
            )?,
        );
        if rate_limit.max_requests == 0 {
            bail!("AUTH_RATE_LIMIT_MAX must be at least 1");
        }

        let auth = AuthConfig {
            jwt_secret,
            token_ttl,
            rate_limit,
            password_pepper: var("PASSWORD_PEPPER").map(String::into_bytes),
            ..defaults
        };

        let remote_kv = match var("KV_REMOTE_URL") {
            Some(url) => {
                let defaults = RemoteKvConfig::default();
                Some(RemoteKvConfig {
                    base_url: url.trim_end_matches('/').to_string(),
                    token: var("KV_REMOTE_TOKEN"),
                    timeout: Duration::from_millis(parse_or(
                        &var,
                        "KV_REMOTE_TIMEOUT_MS",
                        u64::try_from(defaults.timeout.as_millis()).unwrap_or(2000),
                    )?),
                })
            }
            None => None,
        };

        let frontend_origins = var("FRONTEND_ORIGINS")
            .unwrap_or_else(|| DEFAULT_FRONTEND_ORIGINS.to_string())
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            bind_addr,
            auth,
            remote_kv,
            local_dir: var("KV_LOCAL_DIR").map(PathBuf::from),
            fallback_on_error: parse_or(&var, "KV_FALLBACK_ON_ERROR", true)?,
            frontend_origins,
        })
    }
}

fn parse_or<T>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid value for {key}: {raw:?}")),
        None => Ok(default),
    }
}
