// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Audit log query route.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};

use agentgov_core::types::{AuditEntry, AuditFilter};

use crate::state::AppState;

async fn query_audit(State(state): State<AppState>, Query(filter): Query<AuditFilter>) -> Json<Vec<AuditEntry>> {
    Json(state.audit.query(&filter))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/v1/audit", get(query_audit))
}