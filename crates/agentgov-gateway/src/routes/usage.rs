// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Usage report + query routes.

use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use agentgov_core::types::{UsageQuery, UsageSummary};

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ReportUsageRequest {
    pub org_id: String,
    pub agent_id: String,
    pub execution_id: String,
    pub tokens_used: i64,
    pub tool_invocations: i64,
    pub execution_duration_ms: i64,
    pub tool_name: Option<String>,
}

#[derive(Serialize)]
pub struct ReportUsageResponse {
    pub tokens_remaining: i64,
}

async fn report_usage(
    State(state): State<AppState>,
    Json(req): Json<ReportUsageRequest>,
) -> ApiResult<Json<ReportUsageResponse>> {
    let remaining = state.budget.report(
        &req.org_id,
        &req.agent_id,
        &req.execution_id,
        req.tokens_used,
        req.tool_invocations,
        req.execution_duration_ms,
        req.tool_name,
    )?;
    Ok(Json(ReportUsageResponse { tokens_remaining: remaining }))
}

async fn get_usage(State(state): State<AppState>, Query(query): Query<UsageQuery>) -> ApiResult<Json<UsageSummary>> {
    Ok(Json(state.budget.get_usage(&query)?))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/usage", post(report_usage).get(get_usage))
}