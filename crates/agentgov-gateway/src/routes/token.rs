// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Token exchange/validate/revoke routes.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentgov_core::error::GovernorError;
use agentgov_core::token::ScopedToken;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ExchangeRequest {
    pub parent_token_id: String,
    pub agent_id: String,
    pub org_id: String,
    pub tool_name: String,
    pub scopes: Option<Vec<String>>,
    pub ttl_seconds: Option<i64>,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub token_id: String,
    pub agent_id: String,
    pub org_id: String,
    pub tool_name: String,
    pub scopes: Vec<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// The compact JWT a caller presents to downstream tool handlers.
    pub signed_token: String,
}

impl From<ScopedToken> for TokenResponse {
    fn from(token: ScopedToken) -> Self {
        Self {
            token_id: token.token_id,
            agent_id: token.agent_id,
            org_id: token.org_id,
            tool_name: token.tool_name,
            scopes: token.scopes,
            issued_at: token.issued_at,
            expires_at: token.expires_at,
            signed_token: token.signed_bytes,
        }
    }
}

#[derive(Deserialize)]
pub struct TokenIdRequest {
    pub token_id: String,
}

#[derive(Serialize)]
pub struct RevokeResponse {
    pub success: bool,
}

async fn exchange(
    State(state): State<AppState>,
    Json(req): Json<ExchangeRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let token = state.tokens.exchange(
        &req.parent_token_id,
        &req.agent_id,
        &req.org_id,
        &req.tool_name,
        req.scopes,
        req.ttl_seconds,
    )?;
    Ok(Json(token.into()))
}

async fn validate(
    State(state): State<AppState>,
    Json(req): Json<TokenIdRequest>,
) -> ApiResult<Json<TokenResponse>> {
    let token = state
        .tokens
        .validate(&req.token_id)
        .ok_or_else(|| GovernorError::TokenNotFound(req.token_id.clone()))?;
    Ok(Json(token.into()))
}

async fn revoke(State(state): State<AppState>, Json(req): Json<TokenIdRequest>) -> Json<RevokeResponse> {
    let success = state.tokens.revoke(&req.token_id);
    Json(RevokeResponse { success })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/tokens/exchange", post(exchange))
        .route("/v1/tokens/validate", post(validate))
        .route("/v1/tokens/revoke", post(revoke))
}