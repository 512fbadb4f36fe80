use std::env;
use std::str::FromStr;
use std::time::Duration;

use keeper_application::ReconcilerConfig;
use keeper_core::{AppError, TenantId};
use tracing_subscriber::EnvFilter;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8080";

#[derive(Debug, Clone)]
pub struct AdminConfig {
    pub api_base_url: Url,
    pub api_token: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub call_timeout_ms: u64,
    pub max_concurrency: usize,
}

impl AdminConfig {
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let raw_base_url = optional_value(&lookup, "KEEPER_API_BASE_URL")
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned());
        let api_base_url = Url::parse(raw_base_url.as_str()).map_err(|error| {
            AppError::Validation(format!(
                "invalid KEEPER_API_BASE_URL value '{raw_base_url}': {error}"
            ))
        })?;
        if !matches!(api_base_url.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "KEEPER_API_BASE_URL must use http or https, got '{}'",
                api_base_url.scheme()
            )));
        }

        let api_token = optional_value(&lookup, "KEEPER_API_TOKEN");
        let tenant_id = optional_value(&lookup, "KEEPER_TENANT_ID")
            .map(|value| TenantId::from_str(value.as_str()))
            .transpose()?;
        let call_timeout_ms = parse_value(&lookup, "KEEPER_CALL_TIMEOUT_MS", 10_000_u64)?;
        let max_concurrency = parse_value(&lookup, "KEEPER_MAX_CONCURRENCY", 8_usize)?;

        if call_timeout_ms == 0 {
            return Err(AppError::Validation(
                "KEEPER_CALL_TIMEOUT_MS must be greater than zero".to_owned(),
            ));
        }

        if max_concurrency == 0 {
            return Err(AppError::Validation(
                "KEEPER_MAX_CONCURRENCY must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            api_base_url,
            api_token,
            tenant_id,
            call_timeout_ms,
            max_concurrency,
        })
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            call_timeout: self.call_timeout(),
            max_concurrency: self.max_concurrency,
        }
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn optional_value(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_value<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    default: T,
) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional_value(lookup, name) {
        Some(value) => value.parse::<T>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        None => Ok(default),
    }
}
