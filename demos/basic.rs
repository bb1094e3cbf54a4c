// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! # Basic Governance Engine Example
//!
//! Demonstrates the org/agent/policy/budget/proxy pipeline against the
//! in-memory storage backend.  Run with:
//!
//! ```bash
//! cargo run --example basic
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use agentgov_core::agent::AgentService;
use agentgov_core::audit::AuditLog;
use agentgov_core::budget::BudgetEngine;
use agentgov_core::org::OrgService;
use agentgov_core::policy::PolicyService;
use agentgov_core::proxy::{McpProxy, ToolCallRequest};
use agentgov_core::store::InMemoryStore;
use agentgov_core::tools::{CalculatorTool, ToolRegistry};
use agentgov_core::types::{AuditFilter, PolicyEffect, ToolPermission};

fn main() {
    println!("agentgov — basic governance example\n");

    // -----------------------------------------------------------------------
    // 1. Wire the services against in-memory stores.
    // -----------------------------------------------------------------------
    let orgs = OrgService::new(Arc::new(InMemoryStore::new()));
    let agents = AgentService::new(Arc::new(InMemoryStore::new()));
    let policy = Arc::new(PolicyService::new(Arc::new(InMemoryStore::new())));
    let budget = Arc::new(BudgetEngine::new(
        Arc::new(InMemoryStore::new()),
        Arc::new(InMemoryStore::new()),
    ));
    let audit = Arc::new(AuditLog::new(1_000));

    let registry = Arc::new(ToolRegistry::new());
    registry.register("calculator", Arc::new(CalculatorTool));
    let proxy = McpProxy::new(policy.clone(), budget.clone(), audit.clone(), registry);

    // -----------------------------------------------------------------------
    // 2. Onboard an org and an agent.
    // -----------------------------------------------------------------------
    let org = orgs.create("Acme Research").expect("create org");
    println!("org created: {} ({})", org.name, org.org_id);

    let agent = agents
        .register(&orgs, org.org_id.clone(), "triage-bot", agentgov_core::types::AgentRole::Executor, None)
        .expect("register agent");
    println!("agent registered: {} ({})\n", agent.name, agent.agent_id);

    // -----------------------------------------------------------------------
    // 3. Grant the agent a narrow tool allowance and a small budget.
    // -----------------------------------------------------------------------
    policy
        .set_policy(
            &org.org_id,
            Some(agent.agent_id.as_str()),
            vec![ToolPermission {
                tool_name: "calculator".into(),
                effect: PolicyEffect::Allow,
                parameters_constraint: None,
            }],
            10_000,
            30,
        )
        .expect("set policy");
    budget
        .set_budget(&org.org_id, Some(agent.agent_id.as_str()), 5_000, 1)
        .expect("set budget");
    println!("policy: calculator allowed, 10000 token ceiling");
    println!("budget: 5000 tokens / day\n");

    // -----------------------------------------------------------------------
    // 4. Call the allowed tool through the proxy.
    // -----------------------------------------------------------------------
    let mut params = HashMap::new();
    params.insert("op".to_string(), "add".into());
    params.insert("a".to_string(), 2.into());
    params.insert("b".to_string(), 40.into());

    let result = proxy.execute(ToolCallRequest {
        agent_id: agent.agent_id.clone(),
        org_id: org.org_id.clone(),
        delegated_user_id: None,
        execution_id: "exec-1".into(),
        tool_name: "calculator".into(),
        parameters: params,
    });
    print_outcome("calculator add(2, 40)", &result);

    // -----------------------------------------------------------------------
    // 5. Call a tool the policy never granted — denied before it runs.
    // -----------------------------------------------------------------------
    let result = proxy.execute(ToolCallRequest {
        agent_id: agent.agent_id.clone(),
        org_id: org.org_id.clone(),
        delegated_user_id: None,
        execution_id: "exec-2".into(),
        tool_name: "http_fetch".into(),
        parameters: HashMap::new(),
    });
    print_outcome("http_fetch (not granted)", &result);

    // -----------------------------------------------------------------------
    // 6. Check the remaining budget and query the audit trail.
    // -----------------------------------------------------------------------
    match budget.get_budget(&org.org_id, Some(agent.agent_id.as_str())) {
        Ok(Some(b)) => println!(
            "\nbudget remaining: {} / {}",
            b.token_limit - b.tokens_used,
            b.token_limit
        ),
        _ => println!("\nno budget on record"),
    }

    let entries = audit.query(&AuditFilter { org_id: Some(org.org_id.clone()), ..Default::default() });
    println!("\naudit trail ({} entries):", entries.len());
    for entry in &entries {
        println!(
            "  [{}] tool={} result={:?}",
            &entry.entry_id[..8.min(entry.entry_id.len())],
            entry.tool_name,
            entry.result
        );
    }

    println!("\ndone.");
}

fn print_outcome(label: &str, result: &agentgov_core::proxy::ToolCallResult) {
    println!(
        "[{}] success={} tokens_used={} latency_ms={}",
        label, result.success, result.tokens_used, result.latency_ms
    );
    if let Some(err) = &result.error {
        println!("  error ({}): {}", result.error_type.as_deref().unwrap_or("unknown"), err);
    }
    if let Some(value) = &result.result {
        println!("  result: {value}");
    }
}
