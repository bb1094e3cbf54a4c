// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Policy set/get/evaluate routes. An org-scoped route sets the baseline
//! policy (`agent_id: None`); an agent-scoped route sets the overlay.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use agentgov_core::types::{Policy, PolicyDecision, ToolPermission};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SetPolicyRequest {
    pub tools: Vec<ToolPermission>,
    pub token_limit: u64,
    pub execution_timeout_seconds: u64,
}

#[derive(Deserialize)]
pub struct EvaluateRequest {
    pub tool_name: String,
    pub estimated_tokens: u64,
}

async fn set_org_policy(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(req): Json<SetPolicyRequest>,
) -> ApiResult<Json<Policy>> {
    let policy = state
        .policy
        .set_policy(&org_id, None, req.tools, req.token_limit, req.execution_timeout_seconds)?;
    Ok(Json(policy))
}

async fn get_org_policy(State(state): State<AppState>, Path(org_id): Path<String>) -> ApiResult<Json<Policy>> {
    let policy = state
        .policy
        .get_policy(&org_id, None)?
        .ok_or_else(|| agentgov_core::error::GovernorError::PolicyNotFound(org_id))?;
    Ok(Json(policy))
}

async fn set_agent_policy(
    State(state): State<AppState>,
    Path((org_id, agent_id)): Path<(String, String)>,
    Json(req): Json<SetPolicyRequest>,
) -> ApiResult<Json<Policy>> {
    let policy = state.policy.set_policy(
        &org_id,
        Some(agent_id.as_str()),
        req.tools,
        req.token_limit,
        req.execution_timeout_seconds,
    )?;
    Ok(Json(policy))
}

async fn get_effective_policy(
    State(state): State<AppState>,
    Path((org_id, agent_id)): Path<(String, String)>,
) -> ApiResult<Json<Policy>> {
    let policy = state
        .policy
        .get_effective_policy(&org_id, &agent_id)?
        .ok_or_else(|| agentgov_core::error::GovernorError::PolicyNotFound(agent_id))?;
    Ok(Json(policy))
}

async fn evaluate_policy(
    State(state): State<AppState>,
    Path((org_id, agent_id)): Path<(String, String)>,
    Json(req): Json<EvaluateRequest>,
) -> ApiResult<Json<PolicyDecision>> {
    let decision = state
        .policy
        .evaluate(&org_id, &agent_id, &req.tool_name, req.estimated_tokens, None)?;
    Ok(Json(decision))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orgs/:org_id/policy", put(set_org_policy).get(get_org_policy))
        .route(
            "/v1/orgs/:org_id/agents/:agent_id/policy",
            put(set_agent_policy).get(get_effective_policy),
        )
        .route("/v1/orgs/:org_id/agents/:agent_id/policy/evaluate", post(evaluate_policy))
}