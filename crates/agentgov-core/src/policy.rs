// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Policy CRUD, hierarchical merge, and evaluation.
//!
//! Grounded on `PolicyService`/`OPAAdapter`
//! (`agent_platform/control_plane/policy.py`). The merge and evaluation
//! rules in [`merge_policies`] and [`evaluate_tool_permission`] are the
//! deny-wins / specificity invariants from spec §4.3, carried over verbatim.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;

use crate::config::Config;
use crate::error::{GovernorError, Result};
use crate::store::Store;
use crate::types::{Policy, PolicyDecision, PolicyEffect, ToolPermission};

fn policy_key(org_id: &str, agent_id: Option<&str>) -> String {
    match agent_id {
        Some(agent_id) => format!("{}:agent:{}", org_id, agent_id),
        None => format!("{}:org", org_id),
    }
}

/// Remote policy evaluation target, e.g. an OPA REST endpoint. Kept as a
/// trait so tests can substitute an in-process fake without a network call.
pub trait ExternalPolicyEvaluator: Send + Sync {
    fn push_policy(&self, policy_name: &str, rego: &str) -> Result<bool>;
    fn evaluate(&self, policy_name: &str, input: &serde_json::Value) -> Result<PolicyDecision>;
}

struct CircuitBreaker {
    failure_count: AtomicU32,
    failure_threshold: u32,
    reset_timeout: Duration,
    circuit_open_until: Mutex<Option<Instant>>,
}

impl CircuitBreaker {
    fn new(failure_threshold: u32, reset_timeout: Duration) -> Self {
        Self {
            failure_count: AtomicU32::new(0),
            failure_threshold,
            reset_timeout,
            circuit_open_until: Mutex::new(None),
        }
    }

    /// Returns `Err` with a distinguishable "service unavailable" error if
    /// the circuit is open; otherwise lets the call proceed (including the
    /// single half-open probe once the reset timeout has elapsed).
    fn check(&self, service: &str) -> Result<()> {
        if self.failure_count.load(Ordering::SeqCst) >= self.failure_threshold {
            let mut open_until = self.circuit_open_until.lock().expect("circuit mutex poisoned");
            if let Some(until) = *open_until {
                if Instant::now() < until {
                    let remaining = until.saturating_duration_since(Instant::now());
                    return Err(GovernorError::ServiceUnavailable {
                        service: service.to_string(),
                        reason: format!(
                            "circuit breaker open, retry after {}s",
                            remaining.as_secs()
                        ),
                    });
                }
            }
            // Reset timeout elapsed: allow a single half-open probe.
            self.failure_count.store(0, Ordering::SeqCst);
            *open_until = None;
        }
        Ok(())
    }

    fn record_success(&self) {
        self.failure_count.store(0, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
        if count >= self.failure_threshold {
            *self.circuit_open_until.lock().expect("circuit mutex poisoned") =
                Some(Instant::now() + self.reset_timeout);
        }
    }
}

#[cfg(feature = "opa")]
pub struct OpaAdapter {
    opa_url: String,
    client: reqwest::blocking::Client,
    breaker: CircuitBreaker,
}

#[cfg(feature = "opa")]
impl OpaAdapter {
    pub fn new(opa_url: impl Into<String>, config: &Config) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.policy_request_timeout)
            .build()
            .expect("failed to build OPA http client");
        Self {
            opa_url: opa_url.into(),
            client,
            breaker: CircuitBreaker::new(config.circuit_failure_threshold, config.circuit_reset_timeout),
        }
    }
}

#[cfg(feature = "opa")]
impl ExternalPolicyEvaluator for OpaAdapter {
    fn push_policy(&self, policy_name: &str, rego: &str) -> Result<bool> {
        self.breaker.check("OPA")?;
        let url = format!("{}/v1/policies/{}", self.opa_url, policy_name);
        match self
            .client
            .put(&url)
            .header("Content-Type", "text/plain")
            .body(rego.to_string())
            .send()
        {
            Ok(resp) if resp.status().is_success() => {
                self.breaker.record_success();
                Ok(true)
            }
            Ok(resp) => {
                self.breaker.record_failure();
                tracing::error!(policy = %policy_name, status = %resp.status(), "opa push failed");
                Ok(false)
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(GovernorError::ServiceUnavailable {
                    service: "OPA".to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }

    fn evaluate(&self, policy_name: &str, input: &serde_json::Value) -> Result<PolicyDecision> {
        self.breaker.check("OPA")?;
        let url = format!("{}/v1/data/{}/allow", self.opa_url, policy_name);
        let body = serde_json::json!({ "input": input });
        match self.client.post(&url).json(&body).send() {
            Ok(resp) if resp.status().is_success() => {
                self.breaker.record_success();
                let parsed: serde_json::Value = resp.json().map_err(|e| GovernorError::ServiceUnavailable {
                    service: "OPA".to_string(),
                    reason: e.to_string(),
                })?;
                let allowed = parsed.get("result").and_then(|v| v.as_bool()).unwrap_or(false);
                Ok(PolicyDecision {
                    allowed,
                    reason: "opa_evaluation".to_string(),
                    matched_policy_id: None,
                    evaluated_at: Utc::now(),
                })
            }
            Ok(resp) => {
                self.breaker.record_failure();
                Err(GovernorError::ServiceUnavailable {
                    service: "OPA".to_string(),
                    reason: format!("HTTP {}", resp.status()),
                })
            }
            Err(e) => {
                self.breaker.record_failure();
                Err(GovernorError::ServiceUnavailable {
                    service: "OPA".to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

/// Translate a [`Policy`] into a Rego module — only used when an external
/// evaluator is configured; the local evaluation path below never consults
/// this.
pub fn policy_to_rego(policy: &Policy) -> String {
    let mut lines = vec![
        format!(
            "package agentgov.policy.{}",
            policy.org_id.replace('-', "_")
        ),
        String::new(),
        "default allow := false".to_string(),
        String::new(),
        format!("token_limit := {}", policy.token_limit),
        format!("execution_timeout := {}", policy.execution_timeout_seconds),
        String::new(),
    ];

    let allowed: Vec<&str> = policy
        .tools
        .iter()
        .filter(|p| p.effect == PolicyEffect::Allow)
        .map(|p| p.tool_name.as_str())
        .collect();
    let denied: Vec<&str> = policy
        .tools
        .iter()
        .filter(|p| p.effect == PolicyEffect::Deny)
        .map(|p| p.tool_name.as_str())
        .collect();

    if !denied.is_empty() {
        lines.push(format!("denied_tools := {}", serde_json::to_string(&denied).unwrap()));
        lines.push(String::new());
        lines.push("deny if {".to_string());
        lines.push("    input.tool_name == denied_tools[_]".to_string());
        lines.push("}".to_string());
        lines.push(String::new());
    }

    if !allowed.is_empty() {
        if allowed.contains(&"*") {
            lines.push("allow if {".to_string());
            lines.push("    not deny".to_string());
            lines.push("}".to_string());
        } else {
            lines.push(format!("allowed_tools := {}", serde_json::to_string(&allowed).unwrap()));
            lines.push(String::new());
            lines.push("allow if {".to_string());
            lines.push("    input.tool_name == allowed_tools[_]".to_string());
            lines.push("    not deny".to_string());
            lines.push("}".to_string());
        }
    }

    lines.push(String::new());
    lines.push("allow if {".to_string());
    lines.push("    input.estimated_tokens <= token_limit".to_string());
    lines.push("}".to_string());

    lines.join("\n")
}

/// Merge an organization baseline with an agent overlay. Org-level denies
/// can never be overridden by an agent-level allow.
pub fn merge_policies(org: &Policy, agent: &Policy) -> Policy {
    let org_denied: std::collections::HashSet<&str> = org
        .tools
        .iter()
        .filter(|p| p.effect == PolicyEffect::Deny)
        .map(|p| p.tool_name.as_str())
        .collect();

    let mut merged: Vec<ToolPermission> = org.tools.clone();
    for perm in &agent.tools {
        if org_denied.contains(perm.tool_name.as_str()) {
            continue;
        }
        merged.retain(|t| t.tool_name != perm.tool_name);
        merged.push(perm.clone());
    }

    Policy {
        policy_id: agent.policy_id.clone(),
        org_id: org.org_id.clone(),
        agent_id: agent.agent_id.clone(),
        tools: merged,
        token_limit: org.token_limit.min(agent.token_limit),
        execution_timeout_seconds: org
            .execution_timeout_seconds
            .min(agent.execution_timeout_seconds),
        created_at: agent.created_at,
        updated_at: agent.updated_at,
    }
}

/// Strict-order tool evaluation: explicit deny, then explicit allow, then
/// wildcard allow, then default deny.
pub fn evaluate_tool_permission(policy: &Policy, tool_name: &str) -> PolicyDecision {
    let now = Utc::now();
    if policy
        .tools
        .iter()
        .any(|p| p.tool_name == tool_name && p.effect == PolicyEffect::Deny)
    {
        return PolicyDecision {
            allowed: false,
            reason: format!("tool '{}' explicitly denied", tool_name),
            matched_policy_id: Some(policy.policy_id.clone()),
            evaluated_at: now,
        };
    }
    if policy
        .tools
        .iter()
        .any(|p| p.tool_name == tool_name && p.effect == PolicyEffect::Allow)
    {
        return PolicyDecision {
            allowed: true,
            reason: format!("tool '{}' explicitly allowed", tool_name),
            matched_policy_id: Some(policy.policy_id.clone()),
            evaluated_at: now,
        };
    }
    if policy
        .tools
        .iter()
        .any(|p| p.tool_name == "*" && p.effect == PolicyEffect::Allow)
    {
        return PolicyDecision {
            allowed: true,
            reason: "wildcard allow".to_string(),
            matched_policy_id: Some(policy.policy_id.clone()),
            evaluated_at: now,
        };
    }
    PolicyDecision {
        allowed: false,
        reason: format!("tool '{}' not in allowed list (default deny)", tool_name),
        matched_policy_id: Some(policy.policy_id.clone()),
        evaluated_at: now,
    }
}

pub struct PolicyService {
    store: Arc<dyn Store<Policy>>,
    external: Option<Arc<dyn ExternalPolicyEvaluator>>,
}

impl PolicyService {
    pub fn new(store: Arc<dyn Store<Policy>>) -> Self {
        Self { store, external: None }
    }

    pub fn with_external_evaluator(
        store: Arc<dyn Store<Policy>>,
        external: Arc<dyn ExternalPolicyEvaluator>,
    ) -> Self {
        Self {
            store,
            external: Some(external),
        }
    }

    pub fn set_policy(
        &self,
        org_id: &str,
        agent_id: Option<&str>,
        tools: Vec<ToolPermission>,
        token_limit: u64,
        execution_timeout_seconds: u64,
    ) -> Result<Policy> {
        let key = policy_key(org_id, agent_id);
        let existing = self.store.get(&key)?;

        let now = Utc::now();
        let policy = Policy {
            policy_id: existing.as_ref().map(|p| p.policy_id.clone()).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            org_id: org_id.to_string(),
            agent_id: agent_id.map(str::to_string),
            tools,
            token_limit,
            execution_timeout_seconds,
            created_at: existing.as_ref().map(|p| p.created_at).unwrap_or(now),
            updated_at: now,
        };
        self.store.put(&key, policy.clone())?;

        if let Some(external) = &self.external {
            let mut policy_name = format!("agentgov.policy.{}", org_id.replace('-', "_"));
            if let Some(agent_id) = agent_id {
                policy_name.push('.');
                policy_name.push_str(&agent_id.replace('-', "_"));
            }
            let rego = policy_to_rego(&policy);
            external.push_policy(&policy_name, &rego)?;
        }

        let scope = agent_id.map(|a| format!("agent:{}", a)).unwrap_or_else(|| "org".to_string());
        tracing::info!(org_id = %org_id, scope = %scope, policy_id = %policy.policy_id, "policy set");
        Ok(policy)
    }

    pub fn get_policy(&self, org_id: &str, agent_id: Option<&str>) -> Result<Option<Policy>> {
        self.store.get(&policy_key(org_id, agent_id))
    }

    /// Merge org baseline + agent overlay. `None` if neither exists.
    pub fn get_effective_policy(&self, org_id: &str, agent_id: &str) -> Result<Option<Policy>> {
        let org_policy = self.store.get(&policy_key(org_id, None))?;
        let agent_policy = self.store.get(&policy_key(org_id, Some(agent_id)))?;
        Ok(match (org_policy, agent_policy) {
            (Some(org), Some(agent)) => Some(merge_policies(&org, &agent)),
            (None, Some(agent)) => Some(agent),
            (Some(org), None) => Some(org),
            (None, None) => None,
        })
    }

    pub fn evaluate(
        &self,
        org_id: &str,
        agent_id: &str,
        tool_name: &str,
        estimated_tokens: u64,
        context: Option<&serde_json::Value>,
    ) -> Result<PolicyDecision> {
        if let Some(external) = &self.external {
            let policy_name = format!("agentgov.policy.{}", org_id.replace('-', "_"));
            let mut input = serde_json::json!({
                "org_id": org_id,
                "agent_id": agent_id,
                "tool_name": tool_name,
                "estimated_tokens": estimated_tokens,
            });
            if let Some(context) = context {
                input["context"] = context.clone();
            }
            return external.evaluate(&policy_name, &input);
        }

        let policy = match self.get_effective_policy(org_id, agent_id)? {
            Some(p) => p,
            None => {
                return Ok(PolicyDecision {
                    allowed: false,
                    reason: "no policy found for org/agent".to_string(),
                    matched_policy_id: None,
                    evaluated_at: Utc::now(),
                })
            }
        };

        if estimated_tokens > policy.token_limit {
            return Ok(PolicyDecision {
                allowed: false,
                reason: format!(
                    "estimated tokens {} exceeds limit {}",
                    estimated_tokens, policy.token_limit
                ),
                matched_policy_id: Some(policy.policy_id.clone()),
                evaluated_at: Utc::now(),
            });
        }

        Ok(evaluate_tool_permission(&policy, tool_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;

    fn service() -> PolicyService {
        PolicyService::new(Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn end_to_end_fixture_scenario() {
        let svc = service();
        svc.set_policy(
            "o1",
            None,
            vec![
                ToolPermission::allow("*"),
                ToolPermission::deny("shell"),
            ],
            200_000,
            300,
        )
        .unwrap();
        svc.set_policy(
            "o1",
            Some("a1"),
            vec![
                ToolPermission::allow("search"),
                ToolPermission::allow("calculator"),
            ],
            50_000,
            300,
        )
        .unwrap();

        let d = svc.evaluate("o1", "a1", "search", 10, None).unwrap();
        assert!(d.allowed);

        let d = svc.evaluate("o1", "a1", "shell", 10, None).unwrap();
        assert!(!d.allowed);
        assert!(d.reason.contains("denied"));

        let d = svc.evaluate("o1", "a1", "email", 10, None).unwrap();
        assert!(!d.allowed);
        assert!(d.reason.contains("default deny"));

        let effective = svc.get_effective_policy("o1", "a1").unwrap().unwrap();
        assert_eq!(effective.token_limit, 50_000);
    }

    #[test]
    fn org_deny_cannot_be_overridden_by_agent_allow() {
        let org = Policy {
            tools: vec![ToolPermission::deny("shell")],
            ..Policy::new("o1", None)
        };
        let agent = Policy {
            tools: vec![ToolPermission::allow("shell")],
            ..Policy::new("o1", Some("a1".into()))
        };
        let merged = merge_policies(&org, &agent);
        let decision = evaluate_tool_permission(&merged, "shell");
        assert!(!decision.allowed);
    }

    #[test]
    fn merge_takes_minimum_limits() {
        let org = Policy {
            token_limit: 200_000,
            execution_timeout_seconds: 600,
            ..Policy::new("o1", None)
        };
        let agent = Policy {
            token_limit: 50_000,
            execution_timeout_seconds: 120,
            ..Policy::new("o1", Some("a1".into()))
        };
        let merged = merge_policies(&org, &agent);
        assert_eq!(merged.token_limit, 50_000);
        assert_eq!(merged.execution_timeout_seconds, 120);
    }

    #[test]
    fn circuit_breaker_opens_after_threshold() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        assert!(breaker.check("OPA").is_ok());
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_failure();
        let err = breaker.check("OPA").unwrap_err();
        assert_eq!(err.error_type(), "ServiceUnavailableError");
    }
}