// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Library half of `agentgov-gateway`: builds the [`AppState`] from
//! environment configuration and assembles the Axum [`Router`]. Split out of
//! `main.rs` so integration tests can drive the router directly with
//! `tower::ServiceExt::oneshot` instead of binding a real socket.

pub mod auth;
pub mod error;
pub mod routes;
pub mod state;

use std::env;
use std::sync::Arc;

use agentgov_core::agent::AgentService;
use agentgov_core::audit::AuditLog;
use agentgov_core::budget::BudgetEngine;
use agentgov_core::config::load_config_from_env;
use agentgov_core::org::OrgService;
use agentgov_core::policy::PolicyService;
use agentgov_core::store::{InMemoryStore, Store};
use agentgov_core::token::{TokenExchange, TokenSigner};
use agentgov_core::types::{AgentIdentity, Budget, Organization, Policy, UsageReport};

use axum::middleware;
use axum::Router;

use crate::auth::ApiKeyConfig;
use crate::state::AppState;

fn build_store<T>(database_url: Option<&str>, table: &str) -> anyhow::Result<Arc<dyn Store<T>>>
where
    T: Clone + Send + Sync + serde::Serialize + serde::de::DeserializeOwned + 'static,
{
    match database_url {
        Some(url) => {
            tracing::info!(table, "persistence_postgres");
            let store = agentgov_storage::pg::PgStore::<T>::connect(url, table)?;
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!(table, "persistence_memory");
            Ok(Arc::new(InMemoryStore::<T>::new()))
        }
    }
}

/// Build every service from `DATABASE_URL`/`AP_TOKEN_SECRET`/env-based
/// config, mirroring `_create_stores()`
/// (`agent_platform/control_plane/server.py`): Postgres when `DATABASE_URL`
/// is set, in-memory otherwise.
pub fn build_state_from_env() -> anyhow::Result<AppState> {
    let database_url = env::var("DATABASE_URL").ok().filter(|v| !v.is_empty());
    let database_url = database_url.as_deref();

    let org_store = build_store::<Organization>(database_url, "orgs")?;
    let agent_store = build_store::<AgentIdentity>(database_url, "agents")?;
    let policy_store = build_store::<Policy>(database_url, "policies")?;
    let budget_store = build_store::<Budget>(database_url, "budgets")?;
    let usage_store = build_store::<UsageReport>(database_url, "usage_reports")?;

    let engine_config = load_config_from_env();

    let signer = match env::var("AP_TOKEN_SECRET").ok().filter(|v| !v.is_empty()) {
        Some(secret) => {
            tracing::info!("token_signing_hmac");
            TokenSigner::hmac(&secret)
        }
        None => {
            tracing::warn!("token_signing_ed25519_ephemeral");
            TokenSigner::generate_ed25519()?
        }
    };

    Ok(AppState {
        orgs: Arc::new(OrgService::new(org_store)),
        agents: Arc::new(AgentService::new(agent_store)),
        policy: Arc::new(PolicyService::new(policy_store)),
        budget: Arc::new(BudgetEngine::new(budget_store, usage_store)),
        audit: Arc::new(AuditLog::new(engine_config.audit_log_capacity)),
        tokens: Arc::new(TokenExchange::new(
            engine_config.token_issuer,
            engine_config.default_token_ttl.as_secs() as i64,
            signer,
        )),
    })
}

/// Build the full request-handling stack: routes, the optional shared-secret
/// interceptor, and HTTP tracing — everything except the listening socket.
pub fn app(state: AppState, api_key: Option<String>) -> Router {
    let api_key_config = ApiKeyConfig { expected: api_key };
    routes::build_router()
        .layer(middleware::from_fn_with_state(api_key_config, auth::require_api_key))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}