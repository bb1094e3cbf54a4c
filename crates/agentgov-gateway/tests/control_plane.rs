// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! End-to-end exercise of the control-plane HTTP surface: create an org,
//! register an agent, set a policy and budget, evaluate and check them,
//! report usage, query the audit log, and exchange/validate/revoke a token.
//! Drives the router directly with `tower::ServiceExt::oneshot` rather than
//! binding a socket, mirroring `caliber-api`'s auth property tests.

use std::sync::Arc;

use agentgov_core::agent::AgentService;
use agentgov_core::audit::AuditLog;
use agentgov_core::budget::BudgetEngine;
use agentgov_core::org::OrgService;
use agentgov_core::policy::PolicyService;
use agentgov_core::store::InMemoryStore;
use agentgov_core::token::{TokenExchange, TokenSigner};

use agentgov_gateway::state::AppState;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_state() -> AppState {
    AppState {
        orgs: Arc::new(OrgService::new(Arc::new(InMemoryStore::new()))),
        agents: Arc::new(AgentService::new(Arc::new(InMemoryStore::new()))),
        policy: Arc::new(PolicyService::new(Arc::new(InMemoryStore::new()))),
        budget: Arc::new(BudgetEngine::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryStore::new()))),
        audit: Arc::new(AuditLog::new(1024)),
        tokens: Arc::new(TokenExchange::new(
            "agentgov-test",
            3600,
            TokenSigner::hmac("test-signing-secret"),
        )),
    }
}

async fn send(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(match body {
            Some(v) => Body::from(v.to_string()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

#[tokio::test]
async fn full_governance_flow() {
    let app = agentgov_gateway::app(test_state(), None);

    let (status, org) = send(app.clone(), "POST", "/v1/orgs", Some(json!({ "name": "Acme Research" }))).await;
    assert_eq!(status, StatusCode::OK);
    let org_id = org["org_id"].as_str().unwrap().to_string();

    let (status, agent) = send(
        app.clone(),
        "POST",
        &format!("/v1/orgs/{org_id}/agents"),
        Some(json!({ "name": "triage-bot", "role": "executor" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let agent_id = agent["agent_id"].as_str().unwrap().to_string();

    let (status, _policy) = send(
        app.clone(),
        "PUT",
        &format!("/v1/orgs/{org_id}/policy"),
        Some(json!({
            "tools": [{ "tool_name": "http_fetch", "effect": "allow", "parameters_constraint": null }],
            "token_limit": 100_000,
            "execution_timeout_seconds": 30,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _budget) = send(
        app.clone(),
        "PUT",
        &format!("/v1/orgs/{org_id}/agents/{agent_id}/budget"),
        Some(json!({ "token_limit": 50_000, "reset_period_days": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, decision) = send(
        app.clone(),
        "POST",
        &format!("/v1/orgs/{org_id}/agents/{agent_id}/policy/evaluate"),
        Some(json!({ "tool_name": "http_fetch", "estimated_tokens": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decision["allowed"], json!(true));

    let (status, check) = send(
        app.clone(),
        "POST",
        &format!("/v1/orgs/{org_id}/agents/{agent_id}/budget/check"),
        Some(json!({ "estimated_tokens": 500 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(check["allowed"], json!(true));

    let (status, _report) = send(
        app.clone(),
        "POST",
        "/v1/usage",
        Some(json!({
            "org_id": org_id,
            "agent_id": agent_id,
            "execution_id": "exec-1",
            "tokens_used": 500,
            "tool_invocations": 1,
            "execution_duration_ms": 120,
            "tool_name": "http_fetch",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, summary) = send(
        app.clone(),
        "GET",
        &format!("/v1/usage?org_id={org_id}&agent_id={agent_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["total_tokens"], json!(500));

    let (status, entries) = send(app.clone(), "GET", &format!("/v1/audit?org_id={org_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(entries.as_array().unwrap().len() >= 1);

    let (status, token) = send(
        app.clone(),
        "POST",
        "/v1/tokens/exchange",
        Some(json!({
            "parent_token_id": "root-session",
            "agent_id": agent_id,
            "org_id": org_id,
            "tool_name": "http_fetch",
            "scopes": ["http_fetch"],
            "ttl_seconds": null,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let token_id = token["token_id"].as_str().unwrap().to_string();

    let (status, validated) = send(
        app.clone(),
        "POST",
        "/v1/tokens/validate",
        Some(json!({ "token_id": token_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(validated["token_id"], json!(token_id));

    let (status, revoked) = send(
        app.clone(),
        "POST",
        "/v1/tokens/revoke",
        Some(json!({ "token_id": token_id })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(revoked["success"], json!(true));

    let (status, _) = send(
        app.clone(),
        "POST",
        "/v1/tokens/validate",
        Some(json!({ "token_id": token_id })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn agent_registration_requires_existing_org() {
    let app = agentgov_gateway::app(test_state(), None);

    let (status, _) = send(
        app.clone(),
        "POST",
        "/v1/orgs/does-not-exist/agents",
        Some(json!({ "name": "ghost-agent", "role": "executor" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_org_is_not_found() {
    let app = agentgov_gateway::app(test_state(), None);

    let (status, _) = send(app.clone(), "GET", "/v1/orgs/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn shared_secret_mismatch_is_unauthenticated() {
    let app = agentgov_gateway::app(test_state(), Some("correct-secret".to_string()));

    let request = Request::builder()
        .method("GET")
        .uri("/v1/orgs")
        .header("x-api-key", "wrong-secret")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .method("GET")
        .uri("/v1/orgs")
        .header("x-api-key", "correct-secret")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}