// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Engine-level configuration and its TOML/environment loader.

use std::env;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Tunables shared by the policy, budget, and token-exchange services.
///
/// Mirrors the teacher's `Config::default()` shape: a small struct of
/// booleans/numbers with conservative defaults, constructed once at startup
/// and threaded through every service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Default issuer claim (`iss`) stamped onto every signed token.
    pub token_issuer: String,
    /// Default token time-to-live when `exchange` is not given one.
    pub default_token_ttl: Duration,
    /// Maximum number of live (non-expired, non-revoked) tokens the
    /// exchange service will track at once (spec §4.6).
    pub token_capacity: usize,
    /// Maximum records the audit log retains before dropping the oldest.
    pub audit_log_capacity: usize,
    /// Consecutive external-policy-engine failures before the circuit opens.
    pub circuit_failure_threshold: u32,
    /// How long the circuit stays open before allowing a half-open probe.
    pub circuit_reset_timeout: Duration,
    /// Request timeout applied to the external policy engine adapter.
    pub policy_request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token_issuer: "agent-platform".to_string(),
            default_token_ttl: Duration::from_secs(300),
            token_capacity: 10_000,
            audit_log_capacity: 10_000,
            circuit_failure_threshold: 3,
            circuit_reset_timeout: Duration::from_secs(30),
            policy_request_timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse TOML config: {0}")]
    TomlParse(String),
    #[error("invalid value for field '{field}': '{value}' ({reason})")]
    ParseField {
        field: String,
        value: String,
        reason: String,
    },
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Config {{ token_issuer: {}, token_capacity: {}, audit_log_capacity: {} }}",
            self.token_issuer, self.token_capacity, self.audit_log_capacity
        )
    }
}

/// Load configuration from a TOML file, falling back to [`Config::default`]
/// for any key absent from the file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path_ref = path.as_ref();
    let raw = fs::read_to_string(path_ref).map_err(|source| ConfigError::FileRead {
        path: path_ref.display().to_string(),
        source,
    })?;
    parse_toml(&raw)
}

fn parse_toml(raw: &str) -> Result<Config, ConfigError> {
    let table: toml::Table = raw.parse().map_err(|e: toml::de::Error| ConfigError::TomlParse(e.to_string()))?;
    let mut config = Config::default();

    if let Some(v) = table.get("token_issuer").and_then(|v| v.as_str()) {
        config.token_issuer = v.to_string();
    }
    if let Some(v) = field_u64(&table, "default_token_ttl_seconds")? {
        config.default_token_ttl = Duration::from_secs(v);
    }
    if let Some(v) = field_u64(&table, "token_capacity")? {
        config.token_capacity = v as usize;
    }
    if let Some(v) = field_u64(&table, "audit_log_capacity")? {
        config.audit_log_capacity = v as usize;
    }
    if let Some(v) = field_u64(&table, "circuit_failure_threshold")? {
        config.circuit_failure_threshold = v as u32;
    }
    if let Some(v) = field_u64(&table, "circuit_reset_timeout_seconds")? {
        config.circuit_reset_timeout = Duration::from_secs(v);
    }
    Ok(config)
}

fn field_u64(table: &toml::Table, field: &str) -> Result<Option<u64>, ConfigError> {
    match table.get(field) {
        None => Ok(None),
        Some(v) => v
            .as_integer()
            .map(|i| i as u64)
            .ok_or_else(|| ConfigError::ParseField {
                field: field.to_string(),
                value: v.to_string(),
                reason: "expected an integer".to_string(),
            })
            .map(Some),
    }
}

/// Load overrides from environment variables, starting from
/// [`Config::default`]. Recognizes `AP_TOKEN_ISSUER`, `AP_TOKEN_CAPACITY`,
/// `AP_AUDIT_LOG_CAPACITY` (spec §6 documents the consumer-facing env vars;
/// these are the engine-internal companions).
pub fn load_config_from_env() -> Config {
    let mut config = Config::default();
    if let Some(v) = read_env("AP_TOKEN_ISSUER") {
        config.token_issuer = v;
    }
    if let Some(v) = read_env_u64("AP_TOKEN_CAPACITY") {
        config.token_capacity = v as usize;
    }
    if let Some(v) = read_env_u64("AP_AUDIT_LOG_CAPACITY") {
        config.audit_log_capacity = v as usize;
    }
    config
}

fn read_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u64(name: &str) -> Option<u64> {
    read_env(name).and_then(|v| v.parse().ok())
}
