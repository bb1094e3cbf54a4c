// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Control-plane HTTP routes, one module per resource family, merged into a
//! single [`Router`] in [`build_router`].

pub mod agents;
pub mod audit;
pub mod budget;
pub mod orgs;
pub mod policy;
pub mod token;
pub mod usage;

use axum::Router;

use crate::state::AppState;

pub fn build_router() -> Router<AppState> {
    Router::new()
        .merge(orgs::router())
        .merge(agents::router())
        .merge(policy::router())
        .merge(budget::router())
        .merge(usage::router())
        .merge(audit::router())
        .merge(token::router())
}