// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Execution runtime — the per-task orchestrator.
//!
//! Grounded on `ExecutionRuntime` (`agent_platform/execution/runtime.py`):
//! identity -> policy -> budget -> LLM -> proxy-loop -> usage -> audit, for
//! a single [`ExecutionRequest`]. Every step after agent/policy resolution
//! is wrapped so that no exception escapes unclassified (spec §7) — a
//! failure anywhere surfaces as `ExecutionResponse { success: false, .. }`,
//! never as a panic or a bubbled error type.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;

use crate::agent::AgentService;
use crate::audit::AuditLog;
use crate::budget::BudgetEngine;
use crate::error::GovernorError;
use crate::llm::{LlmAdapter, LlmRequest};
use crate::policy::PolicyService;
use crate::proxy::{McpProxy, ToolCallRequest};
use crate::types::{AuditEntry, AuditResult, ExecutionRequest, ExecutionResponse, ToolCallOutcome};

pub struct ExecutionRuntime {
    agents: Arc<AgentService>,
    policy: Arc<PolicyService>,
    budget: Arc<BudgetEngine>,
    audit: Arc<AuditLog>,
    proxy: Arc<McpProxy>,
    llm: Arc<dyn LlmAdapter>,
}

impl ExecutionRuntime {
    pub fn new(
        agents: Arc<AgentService>,
        policy: Arc<PolicyService>,
        budget: Arc<BudgetEngine>,
        audit: Arc<AuditLog>,
        proxy: Arc<McpProxy>,
        llm: Arc<dyn LlmAdapter>,
    ) -> Self {
        Self {
            agents,
            policy,
            budget,
            audit,
            proxy,
            llm,
        }
    }

    pub fn execute(&self, request: ExecutionRequest) -> ExecutionResponse {
        let t0 = Instant::now();
        let span = tracing::info_span!(
            "execution",
            org_id = %request.org_id,
            agent_id = %request.agent_id,
            execution_id = %request.execution_id,
        );
        let _entered = span.enter();

        match self.run(&request, t0) {
            Ok(response) => response,
            Err(err) => self.failure_response(&request, t0, err.error_type(), err.to_string()),
        }
    }

    fn run(&self, request: &ExecutionRequest, t0: Instant) -> Result<ExecutionResponse, GovernorError> {
        let agent = match self.agents.get(&request.org_id, &request.agent_id) {
            Ok(a) => a,
            Err(_) => return Err(GovernorError::AgentNotFound(request.agent_id.clone())),
        };
        if !agent.active {
            return Err(GovernorError::AgentNotFound(format!(
                "{} (inactive)",
                request.agent_id
            )));
        }

        let policy = self
            .policy
            .get_effective_policy(&request.org_id, &request.agent_id)?
            .ok_or_else(|| GovernorError::PolicyNotFound(request.agent_id.clone()))?;

        let pre_flight = self
            .budget
            .check(&request.org_id, &request.agent_id, policy.token_limit as i64)?;
        if !pre_flight.allowed {
            return Err(GovernorError::BudgetExhausted {
                reason: pre_flight.reason,
                tokens_remaining: pre_flight.tokens_remaining,
            });
        }

        let llm_request = LlmRequest {
            prompt: request.task.clone(),
            system_prompt: String::new(),
            max_tokens: policy.token_limit.min(u32::MAX as u64) as u32,
            temperature: 0.0,
            context: request.context.clone(),
        };
        let llm_response = self.llm.complete(&llm_request);

        let mut tool_calls = Vec::with_capacity(llm_response.tool_calls.len());
        for call in &llm_response.tool_calls {
            let call_t0 = Instant::now();
            let result = self.proxy.execute(ToolCallRequest {
                agent_id: request.agent_id.clone(),
                org_id: request.org_id.clone(),
                delegated_user_id: agent.delegated_user_id.clone(),
                execution_id: request.execution_id.clone(),
                tool_name: call.tool_name.clone(),
                parameters: call.parameters.clone(),
            });
            tool_calls.push(ToolCallOutcome {
                tool_name: call.tool_name.clone(),
                success: result.success,
                result: result.result,
                error: result.error,
                error_type: result.error_type,
                latency_ms: call_t0.elapsed().as_millis() as i64,
            });
        }

        // Runtime reports the LLM's token consumption only; the proxy has
        // already reported one tool invocation per call it executed, so
        // `tool_invocations = 0` here avoids double-counting (spec §4.7).
        self.budget.report(
            &request.org_id,
            &request.agent_id,
            &request.execution_id,
            llm_response.tokens_used,
            0,
            t0.elapsed().as_millis() as i64,
            None,
        )?;

        let duration_ms = t0.elapsed().as_millis() as i64;
        self.audit.append_tagged(AuditEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            org_id: request.org_id.clone(),
            agent_id: request.agent_id.clone(),
            delegated_user_id: agent.delegated_user_id.clone(),
            execution_id: request.execution_id.clone(),
            action: "execution_complete".to_string(),
            tool_name: None,
            parameters: Default::default(),
            result: AuditResult::Executed,
            reason: None,
            latency_ms: duration_ms,
            tokens_used: llm_response.tokens_used,
            timestamp: Utc::now(),
        })?;

        Ok(ExecutionResponse {
            execution_id: request.execution_id.clone(),
            agent_id: request.agent_id.clone(),
            org_id: request.org_id.clone(),
            result: llm_response.content,
            tokens_used: llm_response.tokens_used,
            tool_calls,
            duration_ms,
            success: true,
            error: None,
            completed_at: Utc::now(),
        })
    }

    fn failure_response(
        &self,
        request: &ExecutionRequest,
        t0: Instant,
        error_type: &str,
        message: String,
    ) -> ExecutionResponse {
        let duration_ms = t0.elapsed().as_millis() as i64;
        let _ = self.audit.append_tagged(AuditEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            org_id: request.org_id.clone(),
            agent_id: request.agent_id.clone(),
            delegated_user_id: None,
            execution_id: request.execution_id.clone(),
            action: "execution_complete".to_string(),
            tool_name: None,
            parameters: Default::default(),
            result: AuditResult::Failed,
            reason: Some(message.clone()),
            latency_ms: duration_ms,
            tokens_used: 0,
            timestamp: Utc::now(),
        });
        tracing::warn!(error_type, %message, "execution failed");
        ExecutionResponse {
            execution_id: request.execution_id.clone(),
            agent_id: request.agent_id.clone(),
            org_id: request.org_id.clone(),
            result: String::new(),
            tokens_used: 0,
            tool_calls: Vec::new(),
            duration_ms,
            success: false,
            error: Some(format!("{}: {}", error_type, message)),
            completed_at: Utc::now(),
        }
    }
}
