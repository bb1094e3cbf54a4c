// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Tool handler contract and registry.
//!
//! Grounded on `ToolRegistry`/`BaseTool` (`agent_platform/execution/tools.py`).
//! A handler's arity/name validation is its own business, per design note
//! §9 — the proxy only enforces the parameter-count/length floor.

use std::collections::HashMap;
#[cfg(feature = "http-tool")]
use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use serde_json::Value;

#[cfg(feature = "http-tool")]
use crate::error::GovernorError;

/// The error a handler raises mid-execution. `error_type` is preserved
/// verbatim into the proxy's audit entry / outcome, mirroring the spec's
/// "exception class name" contract without requiring real exception types.
#[derive(Debug, Clone)]
pub struct ToolCallError {
    pub error_type: String,
    pub message: String,
}

impl ToolCallError {
    pub fn new(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.into(),
            message: message.into(),
        }
    }
}

pub trait ToolHandler: Send + Sync {
    fn call(&self, params: &HashMap<String, Value>) -> Result<Value, ToolCallError>;
}

impl<F> ToolHandler for F
where
    F: Fn(&HashMap<String, Value>) -> Result<Value, ToolCallError> + Send + Sync,
{
    fn call(&self, params: &HashMap<String, Value>) -> Result<Value, ToolCallError> {
        self(params)
    }
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, Arc<dyn ToolHandler>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        let name = name.into();
        self.tools.write().expect("tool registry lock poisoned").insert(name.clone(), handler);
        tracing::info!(tool_name = %name, "tool registered");
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.read().expect("tool registry lock poisoned").get(name).cloned()
    }

    pub fn count(&self) -> usize {
        self.tools.read().expect("tool registry lock poisoned").len()
    }
}

/// Echoes its `value` parameter back, or the whole parameter map if absent.
pub struct EchoTool;

impl ToolHandler for EchoTool {
    fn call(&self, params: &HashMap<String, Value>) -> Result<Value, ToolCallError> {
        Ok(params
            .get("value")
            .cloned()
            .unwrap_or_else(|| Value::Object(params.clone().into_iter().collect())))
    }
}

/// A handful of arithmetic operators over `a` and `b` numeric parameters.
pub struct CalculatorTool;

impl ToolHandler for CalculatorTool {
    fn call(&self, params: &HashMap<String, Value>) -> Result<Value, ToolCallError> {
        let op = params
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolCallError::new("ToolParameterError", "missing 'op' parameter"))?;
        let a = params
            .get("a")
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolCallError::new("ToolParameterError", "missing 'a' parameter"))?;
        let b = params
            .get("b")
            .and_then(Value::as_f64)
            .ok_or_else(|| ToolCallError::new("ToolParameterError", "missing 'b' parameter"))?;

        let result = match op {
            "add" => a + b,
            "sub" => a - b,
            "mul" => a * b,
            "div" => {
                if b == 0.0 {
                    return Err(ToolCallError::new("ToolExecutionError", "division by zero"));
                }
                a / b
            }
            other => {
                return Err(ToolCallError::new(
                    "ToolParameterError",
                    format!("unknown operator '{}'", other),
                ))
            }
        };
        Ok(serde_json::json!({ "result": result }))
    }
}

/// Hostnames a tenant can never reach, regardless of what they resolve to —
/// the cloud-metadata endpoints that a same-host SSRF would otherwise be
/// able to reach.
#[cfg(feature = "http-tool")]
const BLOCKED_HOSTS: [&str; 2] = ["metadata.google.internal", "169.254.169.254"];

#[cfg(feature = "http-tool")]
fn is_blocked_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified(),
        IpAddr::V6(v6) => {
            v6.is_loopback() || v6.is_unspecified() || is_v6_unique_local(&v6) || is_v6_link_local(&v6)
        }
    }
}

/// fc00::/7 (unique-local), in practice almost always seen as fd00::/8.
#[cfg(feature = "http-tool")]
fn is_v6_unique_local(ip: &std::net::Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xFE00) == 0xFC00
}

/// fe80::/10.
#[cfg(feature = "http-tool")]
fn is_v6_link_local(ip: &std::net::Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xFFC0) == 0xFE80
}

/// Blocks requests to loopback, private, or link-local addresses and a
/// fixed metadata-host blocklist before any outbound call is attempted.
/// Hostnames that aren't IP literals (ordinary DNS names) are allowed
/// through unchecked — this is a same-host/literal-address guard, not a
/// DNS-resolving one.
#[cfg(feature = "http-tool")]
fn check_ssrf_safe(url: &str) -> Result<(), GovernorError> {
    let parsed = reqwest::Url::parse(url).map_err(|e| GovernorError::ToolParameter(format!("invalid URL: {e}")))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| GovernorError::ToolParameter("URL has no host".to_string()))?;

    if BLOCKED_HOSTS.contains(&host) {
        return Err(GovernorError::SsrfBlocked(url.to_string()));
    }
    // `Url::host_str` brackets IPv6 literals (`[::1]`); strip them before
    // attempting to parse as an address.
    let host_literal = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')).unwrap_or(host);
    if let Ok(ip) = host_literal.parse::<IpAddr>() {
        if is_blocked_ip(ip) {
            return Err(GovernorError::SsrfBlocked(url.to_string()));
        }
    }
    Ok(())
}

/// Makes an outbound HTTP request on the agent's behalf, guarded by
/// [`check_ssrf_safe`]. No redirects are followed — a redirect to an
/// internal address would otherwise bypass the guard entirely.
#[cfg(feature = "http-tool")]
pub struct HttpFetchTool {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "http-tool")]
impl HttpFetchTool {
    pub fn new() -> Self {
        Self {
            client: reqwest::blocking::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .redirect(reqwest::redirect::Policy::none())
                .build()
                .expect("failed to build http tool client"),
        }
    }
}

#[cfg(feature = "http-tool")]
impl Default for HttpFetchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "http-tool")]
impl ToolHandler for HttpFetchTool {
    fn call(&self, params: &HashMap<String, Value>) -> Result<Value, ToolCallError> {
        let url = params
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolCallError::new("ToolParameterError", "missing 'url' parameter"))?;
        let method = params.get("method").and_then(Value::as_str).unwrap_or("GET");

        check_ssrf_safe(url).map_err(|e| ToolCallError::new(e.error_type(), e.to_string()))?;

        let request_method = method
            .parse::<reqwest::Method>()
            .map_err(|_| ToolCallError::new("ToolParameterError", format!("unsupported method '{}'", method)))?;

        let response = self
            .client
            .request(request_method, url)
            .send()
            .map_err(|e| ToolCallError::new("ToolExecutionError", e.to_string()))?;

        let status_code = response.status().as_u16();
        let headers: serde_json::Map<String, Value> = response
            .headers()
            .iter()
            .map(|(name, value)| (name.to_string(), Value::String(value.to_str().unwrap_or("").to_string())))
            .collect();
        let body = response.text().map_err(|e| ToolCallError::new("ToolExecutionError", e.to_string()))?;
        let truncated: String = body.chars().take(10_000).collect();

        Ok(serde_json::json!({
            "status_code": status_code,
            "body": truncated,
            "headers": Value::Object(headers),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_round_trip() {
        let registry = ToolRegistry::new();
        registry.register("echo", Arc::new(EchoTool));
        assert_eq!(registry.count(), 1);
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn calculator_divide_by_zero() {
        let tool = CalculatorTool;
        let mut params = HashMap::new();
        params.insert("op".to_string(), serde_json::json!("div"));
        params.insert("a".to_string(), serde_json::json!(1));
        params.insert("b".to_string(), serde_json::json!(0));
        let err = tool.call(&params).unwrap_err();
        assert_eq!(err.error_type, "ToolExecutionError");
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn ssrf_check_blocks_loopback() {
        let err = check_ssrf_safe("http://127.0.0.1/admin").unwrap_err();
        assert_eq!(err.error_type(), "SSRFBlockedError");
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn ssrf_check_blocks_private_rfc1918() {
        assert!(check_ssrf_safe("http://10.0.0.5/secret").is_err());
        assert!(check_ssrf_safe("http://172.16.0.1/secret").is_err());
        assert!(check_ssrf_safe("http://192.168.1.1/secret").is_err());
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn ssrf_check_blocks_link_local_v4() {
        assert!(check_ssrf_safe("http://169.254.1.2/").is_err());
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn ssrf_check_blocks_metadata_blocklist() {
        assert!(check_ssrf_safe("http://169.254.169.254/latest/meta-data/").is_err());
        assert!(check_ssrf_safe("http://metadata.google.internal/computeMetadata/v1/").is_err());
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn ssrf_check_blocks_ipv6_loopback_and_unique_local() {
        assert!(check_ssrf_safe("http://[::1]/").is_err());
        assert!(check_ssrf_safe("http://[fd12:3456:789a::1]/").is_err());
        assert!(check_ssrf_safe("http://[fe80::1]/").is_err());
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn ssrf_check_allows_ordinary_dns_names() {
        assert!(check_ssrf_safe("https://example.com/widgets").is_ok());
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn ssrf_check_rejects_missing_host() {
        let err = check_ssrf_safe("not a url at all").unwrap_err();
        assert_eq!(err.error_type(), "ToolParameterError");
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn http_fetch_tool_denies_private_target_before_dispatch() {
        let tool = HttpFetchTool::new();
        let mut params = HashMap::new();
        params.insert("url".to_string(), serde_json::json!("http://169.254.169.254/latest/meta-data/"));
        let err = tool.call(&params).unwrap_err();
        assert_eq!(err.error_type, "SSRFBlockedError");
    }

    #[cfg(feature = "http-tool")]
    #[test]
    fn http_fetch_tool_requires_url_parameter() {
        let tool = HttpFetchTool::new();
        let err = tool.call(&HashMap::new()).unwrap_err();
        assert_eq!(err.error_type, "ToolParameterError");
    }
}