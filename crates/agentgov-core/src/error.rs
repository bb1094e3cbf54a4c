// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Error taxonomy.
//!
//! Every fallible operation in this crate returns [`GovernorError`]. The
//! `error_type()` accessor mirrors the variant name so callers (and the
//! gateway's RPC mapping) can branch on a stable string without matching on
//! the `Display` text.

use thiserror::Error;

pub type Result<T> = core::result::Result<T, GovernorError>;

#[derive(Debug, Error)]
pub enum GovernorError {
    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("organization not found: {0}")]
    OrgNotFound(String),

    #[error("policy not found: {0}")]
    PolicyNotFound(String),

    #[error("{reason}")]
    PolicyViolation {
        reason: String,
        policy_id: Option<String>,
    },

    #[error("{reason}")]
    BudgetExhausted { reason: String, tokens_remaining: i64 },

    #[error("invalid usage report: {0}")]
    InvalidUsage(String),

    #[error("token expired: {0}")]
    TokenExpired(String),

    #[error("token not found: {0}")]
    TokenNotFound(String),

    #[error("token store at capacity")]
    TokenCapacity,

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    #[error("tool parameters failed validation: {0}")]
    ToolParameter(String),

    #[error("URL blocked by SSRF protection: {0}")]
    SsrfBlocked(String),

    #[error("failed to read from store: {0}")]
    StoreRead(String),

    #[error("failed to write to store: {0}")]
    StoreWrite(String),

    #[error("{service} unavailable: {reason}")]
    ServiceUnavailable { service: String, reason: String },

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

impl GovernorError {
    /// Stable class-name string, preserved across the proxy/runtime outcome
    /// boundary so consumers can branch without string matching.
    pub fn error_type(&self) -> &'static str {
        match self {
            GovernorError::AgentNotFound(_) => "AgentNotFoundError",
            GovernorError::OrgNotFound(_) => "OrgNotFoundError",
            GovernorError::PolicyNotFound(_) => "PolicyNotFoundError",
            GovernorError::PolicyViolation { .. } => "PolicyViolationError",
            GovernorError::BudgetExhausted { .. } => "BudgetExhaustedError",
            GovernorError::InvalidUsage(_) => "InvalidUsageError",
            GovernorError::TokenExpired(_) => "TokenExpiredError",
            GovernorError::TokenNotFound(_) => "TokenNotFoundError",
            GovernorError::TokenCapacity => "TokenCapacityError",
            GovernorError::ToolNotFound(_) => "ToolNotFoundError",
            GovernorError::ToolExecution(_) => "ToolExecutionError",
            GovernorError::ToolParameter(_) => "ToolParameterError",
            GovernorError::SsrfBlocked(_) => "SSRFBlockedError",
            GovernorError::StoreRead(_) => "StoreReadError",
            GovernorError::StoreWrite(_) => "StoreWriteError",
            GovernorError::ServiceUnavailable { .. } => "ServiceUnavailableError",
            GovernorError::Configuration(_) => "ConfigurationError",
        }
    }

    /// `true` for the three lookup errors that the control-plane surface
    /// maps to an RPC-level "not found", per spec §7.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GovernorError::AgentNotFound(_)
                | GovernorError::OrgNotFound(_)
                | GovernorError::PolicyNotFound(_)
                | GovernorError::TokenNotFound(_)
        )
    }
}