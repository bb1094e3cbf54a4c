// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Organization CRUD routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;

use agentgov_core::types::Organization;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CreateOrgRequest {
    pub name: String,
}

async fn create_org(
    State(state): State<AppState>,
    Json(req): Json<CreateOrgRequest>,
) -> ApiResult<Json<Organization>> {
    let org = state.orgs.create(req.name)?;
    Ok(Json(org))
}

async fn get_org(State(state): State<AppState>, Path(org_id): Path<String>) -> ApiResult<Json<Organization>> {
    Ok(Json(state.orgs.get(&org_id)?))
}

async fn list_orgs(State(state): State<AppState>) -> ApiResult<Json<Vec<Organization>>> {
    Ok(Json(state.orgs.list()?))
}

async fn delete_org(State(state): State<AppState>, Path(org_id): Path<String>) -> ApiResult<StatusCode> {
    state.orgs.delete(&org_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/orgs", post(create_org).get(list_orgs))
        .route("/v1/orgs/:org_id", get(get_org).delete(delete_org))
}