// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Budget set/get/check routes, org- and agent-scoped.

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use agentgov_core::types::Budget;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SetBudgetRequest {
    pub token_limit: i64,
    pub reset_period_days: u32,
}

#[derive(Deserialize)]
pub struct CheckBudgetRequest {
    pub estimated_tokens: i64,
}

#[derive(Serialize)]
pub struct CheckBudgetResponse {
    pub allowed: bool,
    pub tokens_remaining: i64,
    pub reason: String,
}

async fn set_org_budget(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(req): Json<SetBudgetRequest>,
) -> ApiResult<Json<Budget>> {
    let budget = state.budget.set_budget(&org_id, None, req.token_limit, req.reset_period_days)?;
    Ok(Json(budget))
}

async fn get_org_budget(State(state): State<AppState>, Path(org_id): Path<String>) -> ApiResult<Json<Budget>> {
    let budget = state
        .budget
        .get_budget(&org_id, None)?
        .ok_or_else(|| agentgov_core::error::GovernorError::OrgNotFound(org_id))?;
    Ok(Json(budget))
}

async fn set_agent_budget(
    State(state): State<AppState>,
    Path((org_id, agent_id)): Path<(String, String)>,
    Json(req): Json<SetBudgetRequest>,
) -> ApiResult<Json<Budget>> {
    let budget = state
        .budget
        .set_budget(&org_id, Some(agent_id.as_str()), req.token_limit, req.reset_period_days)?;
    Ok(Json(budget))
}

async fn get_agent_budget(
    State(state): State<AppState>,
    Path((org_id, agent_id)): Path<(String, String)>,
) -> ApiResult<Json<Budget>> {
    let budget = state
        .budget
        .get_budget(&org_id, Some(agent_id.as_str()))?
        .ok_or_else(|| agentgov_core::error::GovernorError::AgentNotFound(agent_id))?;
    Ok(Json(budget))
}

async fn check_budget(
    State(state): State<AppState>,
    Path((org_id, agent_id)): Path<(String, String)>,
    Json(req): Json<CheckBudgetRequest>,
) -> ApiResult<Json<CheckBudgetResponse>> {
    let result = state.budget.check(&org_id, &agent_id, req.estimated_tokens)?;
    Ok(Json(CheckBudgetResponse {
        allowed: result.allowed,
        tokens_remaining: result.tokens_remaining,
        reason: result.reason,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orgs/:org_id/budget", put(set_org_budget).get(get_org_budget))
        .route(
            "/v1/orgs/:org_id/agents/:agent_id/budget",
            put(set_agent_budget).get(get_agent_budget),
        )
        .route("/v1/orgs/:org_id/agents/:agent_id/budget/check", post(check_budget))
}