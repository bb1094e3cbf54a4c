// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! # Standalone Control-Plane Server Example
//!
//! Boots the `agentgov-gateway` router against in-memory stores and an
//! ephemeral Ed25519 token signer — no `DATABASE_URL`/`AP_TOKEN_SECRET`
//! required. Useful for kicking the tires on the HTTP surface locally.
//!
//! ## Running
//!
//! ```bash
//! cargo run --example axum_middleware --package agentgov-gateway
//! ```
//!
//! Then, from another shell:
//!
//! ```bash
//! curl -X POST localhost:3000/v1/orgs -d '{"name":"Acme Research"}' \
//!      -H 'content-type: application/json'
//!
//! curl -X POST localhost:3000/v1/orgs/<org_id>/agents \
//!      -d '{"name":"triage-bot","role":"executor"}' \
//!      -H 'content-type: application/json'
//! ```
//!
//! Set `AP_API_KEY=some-secret` in the environment before starting the
//! example to also exercise the `x-api-key` shared-secret interceptor.

use std::env;
use std::sync::Arc;

use agentgov_core::agent::AgentService;
use agentgov_core::audit::AuditLog;
use agentgov_core::budget::BudgetEngine;
use agentgov_core::org::OrgService;
use agentgov_core::policy::PolicyService;
use agentgov_core::store::InMemoryStore;
use agentgov_core::token::{TokenExchange, TokenSigner};

use agentgov_gateway::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let state = AppState {
        orgs: Arc::new(OrgService::new(Arc::new(InMemoryStore::new()))),
        agents: Arc::new(AgentService::new(Arc::new(InMemoryStore::new()))),
        policy: Arc::new(PolicyService::new(Arc::new(InMemoryStore::new()))),
        budget: Arc::new(BudgetEngine::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryStore::new()))),
        audit: Arc::new(AuditLog::new(1_000)),
        tokens: Arc::new(TokenExchange::new("agentgov-demo", 3600, TokenSigner::generate_ed25519()?)),
    };

    let api_key = env::var("AP_API_KEY").ok().filter(|v| !v.is_empty());
    if api_key.is_some() {
        println!("shared-secret interceptor enabled (x-api-key required)");
    } else {
        println!("no AP_API_KEY set, all routes open (dev mode)");
    }

    let app = agentgov_gateway::app(state, api_key);

    let address = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(address).await?;
    println!("control plane listening on http://{address}");
    axum::serve(listener, app).await?;
    Ok(())
}
