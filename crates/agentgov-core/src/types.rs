// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Core data model.
//!
//! Every entity mirrors the shapes the control plane persists: an
//! [`Organization`] owns [`AgentIdentity`] records, each of which is governed
//! by an effective [`Policy`] and a [`Budget`], and every tool call or task
//! execution produces an [`AuditEntry`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Executor,
    Planner,
    Reviewer,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyEffect {
    Allow,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageMetricType {
    Tokens,
    ToolInvocations,
    ExecutionDurationMs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Organization {
    #[serde(default = "new_id")]
    pub org_id: String,
    pub name: String,
    #[serde(default = "utc_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

impl Organization {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            org_id: new_id(),
            name: name.into(),
            created_at: utc_now(),
            metadata: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentIdentity {
    #[serde(default = "new_id")]
    pub agent_id: String,
    pub org_id: String,
    pub name: String,
    pub role: AgentRole,
    pub delegated_user_id: Option<String>,
    #[serde(default)]
    pub token_claims: HashMap<String, Value>,
    #[serde(default = "utc_now")]
    pub created_at: DateTime<Utc>,
    pub active: bool,
}

impl AgentIdentity {
    pub fn new(org_id: impl Into<String>, name: impl Into<String>, role: AgentRole) -> Self {
        Self {
            agent_id: new_id(),
            org_id: org_id.into(),
            name: name.into(),
            role,
            delegated_user_id: None,
            token_claims: HashMap::new(),
            created_at: utc_now(),
            active: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPermission {
    pub tool_name: String,
    pub effect: PolicyEffect,
    #[serde(default)]
    pub parameters_constraint: HashMap<String, Value>,
}

impl ToolPermission {
    pub fn allow(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            effect: PolicyEffect::Allow,
            parameters_constraint: HashMap::new(),
        }
    }

    pub fn deny(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            effect: PolicyEffect::Deny,
            parameters_constraint: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default = "new_id")]
    pub policy_id: String,
    pub org_id: String,
    /// `None` means this is the organization baseline; `Some` is an agent overlay.
    pub agent_id: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolPermission>,
    pub token_limit: u64,
    pub execution_timeout_seconds: u64,
    #[serde(default = "utc_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "utc_now")]
    pub updated_at: DateTime<Utc>,
}

impl Policy {
    pub fn new(org_id: impl Into<String>, agent_id: Option<String>) -> Self {
        let now = utc_now();
        Self {
            policy_id: new_id(),
            org_id: org_id.into(),
            agent_id,
            tools: Vec::new(),
            token_limit: 100_000,
            execution_timeout_seconds: 300,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    #[serde(default = "new_id")]
    pub budget_id: String,
    pub org_id: String,
    pub agent_id: Option<String>,
    pub token_limit: i64,
    #[serde(default)]
    pub tokens_used: i64,
    #[serde(default)]
    pub tool_invocations: i64,
    pub reset_period_days: u32,
    #[serde(default = "utc_now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "utc_now")]
    pub last_reset_at: DateTime<Utc>,
}

impl Budget {
    pub fn new(org_id: impl Into<String>, agent_id: Option<String>, token_limit: i64) -> Self {
        let now = utc_now();
        Self {
            budget_id: new_id(),
            org_id: org_id.into(),
            agent_id,
            token_limit,
            tokens_used: 0,
            tool_invocations: 0,
            reset_period_days: 30,
            created_at: now,
            last_reset_at: now,
        }
    }

    pub fn tokens_remaining(&self) -> i64 {
        (self.token_limit - self.tokens_used).max(0)
    }

    pub fn is_exhausted(&self) -> bool {
        self.tokens_used >= self.token_limit
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    #[serde(default = "new_id")]
    pub report_id: String,
    pub org_id: String,
    pub agent_id: String,
    pub execution_id: String,
    pub tokens_used: i64,
    pub tool_invocations: i64,
    pub execution_duration_ms: i64,
    pub tool_name: Option<String>,
    #[serde(default = "utc_now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageQuery {
    pub org_id: Option<String>,
    pub agent_id: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageSummary {
    pub org_id: String,
    pub agent_id: Option<String>,
    pub total_tokens: i64,
    pub total_tool_invocations: i64,
    pub total_execution_duration_ms: i64,
    pub report_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub agent_id: String,
    pub org_id: String,
    pub task: String,
    #[serde(default = "new_id")]
    pub execution_id: String,
    #[serde(default)]
    pub context: HashMap<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCallOutcome {
    pub tool_name: String,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub error_type: Option<String>,
    pub latency_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResponse {
    pub execution_id: String,
    pub agent_id: String,
    pub org_id: String,
    pub result: String,
    pub tokens_used: i64,
    pub tool_calls: Vec<ToolCallOutcome>,
    pub duration_ms: i64,
    pub success: bool,
    pub error: Option<String>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditResult {
    Allowed,
    Denied,
    Executed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    #[serde(default = "new_id")]
    pub entry_id: String,
    pub org_id: String,
    pub agent_id: String,
    pub delegated_user_id: Option<String>,
    pub execution_id: String,
    /// e.g. `"tool_call"`, `"policy_check"`, `"execution_complete"`.
    pub action: String,
    pub tool_name: Option<String>,
    /// Parameter names mapped to their JSON type tag only — values are
    /// never persisted to the audit log.
    #[serde(default)]
    pub parameters: HashMap<String, String>,
    pub result: AuditResult,
    pub reason: Option<String>,
    pub latency_ms: i64,
    pub tokens_used: i64,
    #[serde(default = "utc_now")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuditFilter {
    pub org_id: Option<String>,
    pub agent_id: Option<String>,
    pub execution_id: Option<String>,
    pub action: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: String,
    pub matched_policy_id: Option<String>,
    pub evaluated_at: DateTime<Utc>,
}

/// Redact a raw parameter map down to `name -> JSON type tag`, per spec
/// §4.2: values never reach persistent storage.
pub fn redact_parameters(params: &HashMap<String, Value>) -> HashMap<String, String> {
    params
        .iter()
        .map(|(k, v)| (k.clone(), json_type_tag(v).to_string()))
        .collect()
}

fn json_type_tag(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}