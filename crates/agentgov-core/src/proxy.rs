// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! MCP authorization proxy — the per-tool-call critical path.
//!
//! Grounded on `MCPAuthorizationProxy` (`agent_platform/gateway/mcp_proxy.py`).
//! The pipeline order (`validate -> policy -> budget -> handler -> report ->
//! audit`) is strict per spec §4.5/§5; each early-exit branch produces
//! exactly one audit entry and reports zero usage.

use std::collections::HashMap;
use std::time::Instant;

use serde_json::Value;

use crate::audit::AuditLog;
use crate::budget::BudgetEngine;
use crate::policy::PolicyService;
use crate::tools::ToolRegistry;
use crate::types::{AuditEntry, AuditResult};

const MAX_PARAMETERS: usize = 50;
const MAX_KEY_LEN: usize = 256;
const MAX_STRING_VALUE_LEN: usize = 10_000;
const DEFAULT_ESTIMATED_TOKENS: i64 = 1_000;

pub struct ToolCallRequest {
    pub agent_id: String,
    pub org_id: String,
    pub delegated_user_id: Option<String>,
    pub execution_id: String,
    pub tool_name: String,
    pub parameters: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
    pub error_type: Option<String>,
    pub tokens_used: i64,
    pub latency_ms: i64,
}

pub struct McpProxy {
    policy: std::sync::Arc<PolicyService>,
    budget: std::sync::Arc<BudgetEngine>,
    audit: std::sync::Arc<AuditLog>,
    registry: std::sync::Arc<ToolRegistry>,
    default_estimated_tokens: i64,
}

impl McpProxy {
    pub fn new(
        policy: std::sync::Arc<PolicyService>,
        budget: std::sync::Arc<BudgetEngine>,
        audit: std::sync::Arc<AuditLog>,
        registry: std::sync::Arc<ToolRegistry>,
    ) -> Self {
        Self {
            policy,
            budget,
            audit,
            registry,
            default_estimated_tokens: DEFAULT_ESTIMATED_TOKENS,
        }
    }

    pub fn execute(&self, request: ToolCallRequest) -> ToolCallResult {
        let t0 = Instant::now();

        // 1. Validate parameters.
        if let Err(reason) = validate_parameters(&request.parameters) {
            let audit = self.build_audit(&request, AuditResult::Denied, Some(reason.clone()), 0, 0);
            let _ = self.audit.append(audit, &request.parameters);
            return ToolCallResult {
                success: false,
                result: None,
                error: Some(reason),
                error_type: Some("ToolParameterError".to_string()),
                tokens_used: 0,
                latency_ms: elapsed_ms(t0),
            };
        }

        // 2. Policy check.
        let decision = match self.policy.evaluate(
            &request.org_id,
            &request.agent_id,
            &request.tool_name,
            self.default_estimated_tokens as u64,
            None,
        ) {
            Ok(d) => d,
            Err(e) => {
                let audit = self.build_audit(&request, AuditResult::Failed, Some(e.to_string()), elapsed_ms(t0), 0);
                let _ = self.audit.append(audit, &request.parameters);
                return ToolCallResult {
                    success: false,
                    error: Some(e.to_string()),
                    error_type: Some(e.error_type().to_string()),
                    result: None,
                    tokens_used: 0,
                    latency_ms: elapsed_ms(t0),
                };
            }
        };
        if !decision.allowed {
            let reason = format!("policy denied: {}", decision.reason);
            let audit = self.build_audit(&request, AuditResult::Denied, Some(decision.reason.clone()), 0, 0);
            let _ = self.audit.append(audit, &request.parameters);
            return ToolCallResult {
                success: false,
                result: None,
                error: Some(reason),
                error_type: Some("PolicyViolationError".to_string()),
                tokens_used: 0,
                latency_ms: elapsed_ms(t0),
            };
        }

        // 3. Budget pre-flight.
        let pre_flight = match self.budget.check(&request.org_id, &request.agent_id, self.default_estimated_tokens) {
            Ok(r) => r,
            Err(e) => {
                let audit = self.build_audit(&request, AuditResult::Failed, Some(e.to_string()), elapsed_ms(t0), 0);
                let _ = self.audit.append(audit, &request.parameters);
                return ToolCallResult {
                    success: false,
                    error: Some(e.to_string()),
                    error_type: Some(e.error_type().to_string()),
                    result: None,
                    tokens_used: 0,
                    latency_ms: elapsed_ms(t0),
                };
            }
        };
        if !pre_flight.allowed {
            let reason = format!("budget denied: {}", pre_flight.reason);
            let audit = self.build_audit(&request, AuditResult::Denied, Some(pre_flight.reason.clone()), 0, 0);
            let _ = self.audit.append(audit, &request.parameters);
            return ToolCallResult {
                success: false,
                result: None,
                error: Some(reason),
                error_type: Some("BudgetExhaustedError".to_string()),
                tokens_used: 0,
                latency_ms: elapsed_ms(t0),
            };
        }

        // 4. Handler lookup.
        let handler = match self.registry.get(&request.tool_name) {
            Some(h) => h,
            None => {
                let reason = format!("tool '{}' not found", request.tool_name);
                let audit = self.build_audit(&request, AuditResult::Failed, Some(reason.clone()), 0, 0);
                let _ = self.audit.append(audit, &request.parameters);
                return ToolCallResult {
                    success: false,
                    result: None,
                    error: Some(format!("tool '{}' not registered", request.tool_name)),
                    error_type: Some("ToolNotFoundError".to_string()),
                    tokens_used: 0,
                    latency_ms: elapsed_ms(t0),
                };
            }
        };

        // 5. Invoke handler.
        match handler.call(&request.parameters) {
            Ok(result) => {
                let latency = elapsed_ms(t0);

                // 6. Report usage.
                let _ = self.budget.report(
                    &request.org_id,
                    &request.agent_id,
                    &request.execution_id,
                    0,
                    1,
                    latency,
                    Some(request.tool_name.clone()),
                );

                // 7. Audit.
                let audit = self.build_audit(&request, AuditResult::Executed, None, latency, 0);
                let _ = self.audit.append(audit, &request.parameters);

                ToolCallResult {
                    success: true,
                    result: Some(result),
                    error: None,
                    error_type: None,
                    tokens_used: 0,
                    latency_ms: latency,
                }
            }
            Err(call_err) => {
                let latency = elapsed_ms(t0);
                let audit = self.build_audit(&request, AuditResult::Failed, Some(call_err.message.clone()), latency, 0);
                let _ = self.audit.append(audit, &request.parameters);
                ToolCallResult {
                    success: false,
                    result: None,
                    error: Some(call_err.message),
                    error_type: Some(call_err.error_type),
                    tokens_used: 0,
                    latency_ms: latency,
                }
            }
        }
    }

    fn build_audit(
        &self,
        request: &ToolCallRequest,
        result: AuditResult,
        reason: Option<String>,
        latency_ms: i64,
        tokens_used: i64,
    ) -> AuditEntry {
        AuditEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            org_id: request.org_id.clone(),
            agent_id: request.agent_id.clone(),
            delegated_user_id: request.delegated_user_id.clone(),
            execution_id: request.execution_id.clone(),
            action: "tool_call".to_string(),
            tool_name: Some(request.tool_name.clone()),
            parameters: HashMap::new(),
            result,
            reason,
            latency_ms,
            tokens_used,
            timestamp: chrono::Utc::now(),
        }
    }
}

fn elapsed_ms(t0: Instant) -> i64 {
    t0.elapsed().as_millis() as i64
}

/// Parameter validation floor (spec §4.5): at most 50 entries; keys at most
/// 256 characters; string values at most 10,000 characters.
fn validate_parameters(parameters: &HashMap<String, Value>) -> Result<(), String> {
    if parameters.len() > MAX_PARAMETERS {
        return Err(format!(
            "too many parameters: {} exceeds the limit of {}",
            parameters.len(),
            MAX_PARAMETERS
        ));
    }
    for (key, value) in parameters {
        if key.len() > MAX_KEY_LEN {
            return Err(format!(
                "parameter name '{}...' exceeds {} characters",
                &key[..key.len().min(32)],
                MAX_KEY_LEN
            ));
        }
        if let Value::String(s) = value {
            if s.len() > MAX_STRING_VALUE_LEN {
                return Err(format!(
                    "parameter '{}' value exceeds {} characters",
                    key, MAX_STRING_VALUE_LEN
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::BudgetEngine;
    use crate::policy::PolicyService;
    use crate::store::InMemoryStore;
    use crate::tools::{CalculatorTool, ToolCallError, ToolHandler};
    use crate::types::ToolPermission;
    use std::sync::Arc;

    struct BoomTool;
    impl ToolHandler for BoomTool {
        fn call(&self, _params: &HashMap<String, Value>) -> Result<Value, ToolCallError> {
            Err(ToolCallError::new("RuntimeError", "boom"))
        }
    }

    fn build_proxy() -> (McpProxy, Arc<AuditLog>) {
        let policy = Arc::new(PolicyService::new(Arc::new(InMemoryStore::new())));
        let budget = Arc::new(BudgetEngine::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryStore::new())));
        let audit = Arc::new(AuditLog::new(100));
        let registry = Arc::new(ToolRegistry::new());
        registry.register("calculator", Arc::new(CalculatorTool));
        registry.register("boom", Arc::new(BoomTool));

        policy
            .set_policy("o1", None, vec![ToolPermission::allow("*")], 200_000, 300)
            .unwrap();

        (McpProxy::new(policy, budget, audit.clone(), registry), audit)
    }

    fn request(tool_name: &str, parameters: HashMap<String, Value>) -> ToolCallRequest {
        ToolCallRequest {
            agent_id: "a1".to_string(),
            org_id: "o1".to_string(),
            delegated_user_id: Some("user-alice".to_string()),
            execution_id: "exec-1".to_string(),
            tool_name: tool_name.to_string(),
            parameters,
        }
    }

    #[test]
    fn successful_call_produces_exactly_one_executed_audit_entry() {
        let (proxy, audit) = build_proxy();
        let mut params = HashMap::new();
        params.insert("op".to_string(), serde_json::json!("add"));
        params.insert("a".to_string(), serde_json::json!(1));
        params.insert("b".to_string(), serde_json::json!(2));
        let result = proxy.execute(request("calculator", params));
        assert!(result.success);
        let entries = audit.delegation_chain("exec-1");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].result, AuditResult::Executed);
    }

    #[test]
    fn missing_tool_produces_failed_audit_entry() {
        let (proxy, audit) = build_proxy();
        let result = proxy.execute(request("nonexistent", HashMap::new()));
        assert!(!result.success);
        assert_eq!(result.error_type.as_deref(), Some("ToolNotFoundError"));
        let entries = audit.delegation_chain("exec-1");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn handler_crash_reports_exception_class_and_zero_usage() {
        let (proxy, audit) = build_proxy();
        let result = proxy.execute(request("boom", HashMap::new()));
        assert!(!result.success);
        assert_eq!(result.error_type.as_deref(), Some("RuntimeError"));
        assert!(result.error.as_deref().unwrap().contains("boom"));
        let entries = audit.delegation_chain("exec-1");
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].result, AuditResult::Failed);
    }

    #[test]
    fn too_many_parameters_denied_before_policy() {
        let (proxy, _audit) = build_proxy();
        let mut params = HashMap::new();
        for i in 0..51 {
            params.insert(format!("k{}", i), serde_json::json!(i));
        }
        let result = proxy.execute(request("calculator", params));
        assert!(!result.success);
        assert_eq!(result.error_type.as_deref(), Some("ToolParameterError"));
    }

    #[test]
    fn fifty_parameters_accepted_at_the_boundary() {
        let (proxy, _audit) = build_proxy();
        let mut params = HashMap::new();
        params.insert("op".to_string(), serde_json::json!("add"));
        params.insert("a".to_string(), serde_json::json!(1));
        params.insert("b".to_string(), serde_json::json!(2));
        for i in 0..47 {
            params.insert(format!("k{}", i), serde_json::json!(i));
        }
        assert_eq!(params.len(), 50);
        let result = proxy.execute(request("calculator", params));
        assert!(result.success);
    }
}