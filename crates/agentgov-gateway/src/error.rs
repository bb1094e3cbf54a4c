// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Maps [`GovernorError`] onto HTTP responses.
//!
//! Grounded on spec §4.8's two semantic requirements for the control-plane
//! surface: missing entities answer "not found", and everything else falls
//! back to a generic failure status keyed off `error_type()`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use agentgov_core::error::GovernorError;

pub struct ApiError(pub GovernorError);

impl From<GovernorError> for ApiError {
    fn from(err: GovernorError) -> Self {
        ApiError(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            match &self.0 {
                GovernorError::PolicyViolation { .. }
                | GovernorError::BudgetExhausted { .. }
                | GovernorError::SsrfBlocked(_) => StatusCode::FORBIDDEN,
                GovernorError::InvalidUsage(_) | GovernorError::ToolParameter(_) => StatusCode::BAD_REQUEST,
                GovernorError::TokenExpired(_) => StatusCode::UNAUTHORIZED,
                GovernorError::TokenCapacity => StatusCode::TOO_MANY_REQUESTS,
                GovernorError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        };
        let body = ErrorBody {
            error: self.0.error_type().to_string(),
            message: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;