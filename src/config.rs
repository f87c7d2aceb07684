use crate::domain::retry::{DEFAULT_MAX_RETRIES, RetryPolicy};
use crate::error::{ProvisionError, Result};
use crate::infrastructure::http::Endpoint;
use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Runtime wiring for the provisioner. Every option can also come from the
/// environment.
#[derive(Args, Debug, Clone)]
pub struct Settings {
    /// Base URL of the identity-governance facade
    #[arg(long, env = "PROVISIONER_IDENTITY_URL")]
    pub identity_url: String,

    /// Bearer token for the identity-governance facade
    #[arg(long, env = "PROVISIONER_IDENTITY_API_KEY", hide_env_values = true)]
    pub identity_api_key: Option<String>,

    /// Base URL of the vault facade
    #[arg(long, env = "PROVISIONER_VAULT_URL")]
    pub vault_url: String,

    /// Bearer token for the vault facade
    #[arg(long, env = "PROVISIONER_VAULT_API_KEY", hide_env_values = true)]
    pub vault_api_key: Option<String>,

    /// Base URL of the ticketing system
    #[arg(long, env = "PROVISIONER_TICKET_URL")]
    pub ticket_url: String,

    /// Bearer token for the ticketing system
    #[arg(long, env = "PROVISIONER_TICKET_API_KEY", hide_env_values = true)]
    pub ticket_api_key: Option<String>,

    /// Timeout for each HTTP call, in seconds
    #[arg(long, env = "PROVISIONER_HTTP_TIMEOUT_SECS", default_value_t = 10)]
    pub http_timeout_secs: u64,

    /// Attempts per correlation id before escalation
    #[arg(long, env = "PROVISIONER_MAX_RETRIES", default_value_t = DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Concurrent dispatch lanes, partitioned by correlation id
    #[arg(long, env = "PROVISIONER_LANES", default_value_t = 1)]
    pub lanes: usize,

    /// Path to a persistent retry ledger (optional). If provided, uses RocksDB.
    #[arg(long, env = "PROVISIONER_LEDGER_PATH")]
    pub ledger_path: Option<PathBuf>,

    /// File that receives dead-lettered requests as JSON lines
    #[arg(long, env = "PROVISIONER_DEAD_LETTER_PATH")]
    pub dead_letter_path: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "PROVISIONER_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Settings {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(ProvisionError::Config(
                "max-retries must be at least 1".to_string(),
            ));
        }
        if self.lanes == 0 {
            return Err(ProvisionError::Config(
                "lanes must be at least 1".to_string(),
            ));
        }
        if self.http_timeout_secs == 0 {
            return Err(ProvisionError::Config(
                "http-timeout-secs must be at least 1".to_string(),
            ));
        }
        for (name, url) in [
            ("identity-url", &self.identity_url),
            ("vault-url", &self.vault_url),
            ("ticket-url", &self.ticket_url),
        ] {
            reqwest::Url::parse(url)
                .map_err(|e| ProvisionError::Config(format!("{name} {url:?} is invalid: {e}")))?;
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn identity_endpoint(&self) -> Endpoint {
        endpoint(&self.identity_url, &self.identity_api_key)
    }

    pub fn vault_endpoint(&self) -> Endpoint {
        endpoint(&self.vault_url, &self.vault_api_key)
    }

    pub fn ticket_endpoint(&self) -> Endpoint {
        endpoint(&self.ticket_url, &self.ticket_api_key)
    }
}

fn endpoint(url: &str, api_key: &Option<String>) -> Endpoint {
    let endpoint = Endpoint::new(url);
    match api_key {
        Some(key) => endpoint.with_api_key(key),
        None => endpoint,
    }
}
