// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Agent identity CRUD + activation routes.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use agentgov_core::types::{AgentIdentity, AgentRole};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct RegisterAgentRequest {
    pub name: String,
    #[serde(default = "default_role")]
    pub role: AgentRole,
    pub delegated_user_id: Option<String>,
}

fn default_role() -> AgentRole {
    AgentRole::Executor
}

async fn register_agent(
    State(state): State<AppState>,
    Path(org_id): Path<String>,
    Json(req): Json<RegisterAgentRequest>,
) -> ApiResult<Json<AgentIdentity>> {
    let agent = state
        .agents
        .register(&state.orgs, org_id, req.name, req.role, req.delegated_user_id)?;
    Ok(Json(agent))
}

async fn get_agent(
    State(state): State<AppState>,
    Path((org_id, agent_id)): Path<(String, String)>,
) -> ApiResult<Json<AgentIdentity>> {
    Ok(Json(state.agents.get(&org_id, &agent_id)?))
}

async fn list_agents(State(state): State<AppState>, Path(org_id): Path<String>) -> ApiResult<Json<Vec<AgentIdentity>>> {
    Ok(Json(state.agents.list(&org_id)?))
}

async fn deactivate_agent(
    State(state): State<AppState>,
    Path((org_id, agent_id)): Path<(String, String)>,
) -> ApiResult<Json<AgentIdentity>> {
    Ok(Json(state.agents.deactivate(&org_id, &agent_id)?))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orgs/:org_id/agents", post(register_agent).get(list_agents))
        .route("/v1/orgs/:org_id/agents/:agent_id", get(get_agent))
        .route("/v1/orgs/:org_id/agents/:agent_id/deactivate", post(deactivate_agent))
}