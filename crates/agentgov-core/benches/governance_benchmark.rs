// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Criterion benchmark suite for the agentgov governance engine.
//!
//! Benchmarks cover the hot paths of the authorization pipeline:
//!
//! - Policy merge + evaluation (allow / explicit deny / default deny)
//! - Budget pre-flight check + post-flight report
//! - Audit log append + query
//! - Full MCP proxy pipeline for a single tool call
//!
//! Run with: `cargo bench --bench governance_benchmark`

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use agentgov_core::audit::AuditLog;
use agentgov_core::budget::BudgetEngine;
use agentgov_core::policy::{evaluate_tool_permission, merge_policies, PolicyService};
use agentgov_core::proxy::{McpProxy, ToolCallRequest};
use agentgov_core::store::InMemoryStore;
use agentgov_core::tools::{CalculatorTool, ToolHandler, ToolRegistry};
use agentgov_core::types::{AuditFilter, Policy, ToolPermission};

fn policy_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("policy");

    let svc = PolicyService::new(Arc::new(InMemoryStore::new()));
    svc.set_policy(
        "o1",
        None,
        vec![ToolPermission::allow("*"), ToolPermission::deny("shell")],
        200_000,
        300,
    )
    .unwrap();
    svc.set_policy(
        "o1",
        Some("a1"),
        vec![ToolPermission::allow("search"), ToolPermission::allow("calculator")],
        50_000,
        300,
    )
    .unwrap();

    group.bench_function("evaluate_explicit_allow", |bencher| {
        bencher.iter(|| {
            let decision = svc.evaluate(black_box("o1"), black_box("a1"), black_box("search"), black_box(10), None);
            black_box(decision)
        });
    });

    group.bench_function("evaluate_explicit_deny", |bencher| {
        bencher.iter(|| {
            let decision = svc.evaluate(black_box("o1"), black_box("a1"), black_box("shell"), black_box(10), None);
            black_box(decision)
        });
    });

    group.bench_function("evaluate_default_deny", |bencher| {
        bencher.iter(|| {
            let decision = svc.evaluate(black_box("o1"), black_box("a1"), black_box("email"), black_box(10), None);
            black_box(decision)
        });
    });

    let org = Policy {
        tools: vec![ToolPermission::allow("*"), ToolPermission::deny("shell")],
        ..Policy::new("o1", None)
    };
    let agent = Policy {
        tools: vec![ToolPermission::allow("search")],
        ..Policy::new("o1", Some("a1".into()))
    };
    group.bench_function("merge_then_evaluate", |bencher| {
        bencher.iter(|| {
            let merged = merge_policies(black_box(&org), black_box(&agent));
            let decision = evaluate_tool_permission(&merged, black_box("search"));
            black_box(decision)
        });
    });

    group.finish();
}

fn budget_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("budget");

    let engine = BudgetEngine::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryStore::new()));
    engine.set_budget("o1", Some("a1"), 10_000_000, 30).unwrap();

    group.bench_function("check_within_budget", |bencher| {
        bencher.iter(|| {
            let result = engine.check(black_box("o1"), black_box("a1"), black_box(100));
            black_box(result)
        });
    });

    group.bench_function("report_usage", |bencher| {
        bencher.iter(|| {
            let result = engine.report(
                black_box("o1"),
                black_box("a1"),
                black_box("exec-bench"),
                black_box(1),
                black_box(1),
                black_box(5),
                None,
            );
            black_box(result)
        });
    });

    group.finish();
}

fn audit_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("audit");

    let log = AuditLog::new(10_000);
    for i in 0..2_000 {
        let entry = agentgov_core::audit::denial_entry(
            "o1",
            "a1",
            None,
            format!("exec-{}", i),
            "tool_call",
            Some("search".to_string()),
            "default deny",
        );
        log.append_tagged(entry).unwrap();
    }

    group.bench_function("append", |bencher| {
        bencher.iter(|| {
            let entry = agentgov_core::audit::denial_entry(
                "o1",
                "a1",
                None,
                black_box("exec-bench"),
                "tool_call",
                Some("search".to_string()),
                "default deny",
            );
            log.append_tagged(entry).unwrap();
        });
    });

    group.bench_function("query_by_org", |bencher| {
        let filter = AuditFilter {
            org_id: Some("o1".to_string()),
            limit: Some(50),
            ..AuditFilter::default()
        };
        bencher.iter(|| {
            let results = log.query(black_box(&filter));
            black_box(results)
        });
    });

    group.finish();
}

fn proxy_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("mcp_proxy");

    let policy = Arc::new(PolicyService::new(Arc::new(InMemoryStore::new())));
    policy
        .set_policy("o1", None, vec![ToolPermission::allow("*")], 200_000, 300)
        .unwrap();
    let budget = Arc::new(BudgetEngine::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryStore::new())));
    let audit = Arc::new(AuditLog::new(10_000));
    let registry = Arc::new(ToolRegistry::new());
    registry.register("calculator", Arc::new(CalculatorTool) as Arc<dyn ToolHandler>);
    let proxy = McpProxy::new(policy, budget, audit, registry);

    group.bench_function("execute_successful_call", |bencher| {
        bencher.iter(|| {
            let mut params = std::collections::HashMap::new();
            params.insert("op".to_string(), serde_json::json!("add"));
            params.insert("a".to_string(), serde_json::json!(1));
            params.insert("b".to_string(), serde_json::json!(2));
            let result = proxy.execute(ToolCallRequest {
                agent_id: "a1".to_string(),
                org_id: "o1".to_string(),
                delegated_user_id: Some("user-alice".to_string()),
                execution_id: "exec-bench".to_string(),
                tool_name: "calculator".to_string(),
                parameters: params,
            });
            black_box(result)
        });
    });

    group.finish();
}

criterion_group!(benches, policy_benchmark, budget_benchmark, audit_benchmark, proxy_benchmark);
criterion_main!(benches);