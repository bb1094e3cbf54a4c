// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Shared application state handed to every route handler.

use std::sync::Arc;

use agentgov_core::agent::AgentService;
use agentgov_core::audit::AuditLog;
use agentgov_core::budget::BudgetEngine;
use agentgov_core::org::OrgService;
use agentgov_core::policy::PolicyService;
use agentgov_core::token::TokenExchange;

#[derive(Clone)]
pub struct AppState {
    pub orgs: Arc<OrgService>,
    pub agents: Arc<AgentService>,
    pub policy: Arc<PolicyService>,
    pub budget: Arc<BudgetEngine>,
    pub audit: Arc<AuditLog>,
    pub tokens: Arc<TokenExchange>,
}