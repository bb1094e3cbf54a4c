// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Shared-secret request interceptor.
//!
//! Grounded on `APIKeyInterceptor` (`agent_platform/control_plane/server.py`):
//! when `AP_API_KEY` is configured, every request must carry a matching
//! `x-api-key` header or the request is rejected before reaching a handler.
//! Unset `AP_API_KEY` disables the check (dev mode), matching the original's
//! behavior.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

#[derive(Clone)]
pub struct ApiKeyConfig {
    pub expected: Option<String>,
}

pub async fn require_api_key(
    State(config): State<ApiKeyConfig>,
    req: Request,
    next: Next,
) -> Response {
    match &config.expected {
        None => next.run(req).await,
        Some(expected) => {
            let provided = req
                .headers()
                .get("x-api-key")
                .and_then(|v| v.to_str().ok());
            if provided == Some(expected.as_str()) {
                next.run(req).await
            } else {
                (StatusCode::UNAUTHORIZED, "invalid or missing API key").into_response()
            }
        }
    }
}