// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! `agentgov-gateway` binary: wires the governance services to a JSON-over-HTTP
//! control-plane surface.
//!
//! Storage selection mirrors `_create_stores()`
//! (`agent_platform/control_plane/server.py`): `DATABASE_URL` set selects the
//! Postgres-backed stores, otherwise every service falls back to an
//! in-memory `Store<T>`. The shared-secret interceptor is enabled whenever
//! `AP_API_KEY` is non-empty.

use std::env;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let state = agentgov_gateway::build_state_from_env()?;

    let api_key = env::var("AP_API_KEY").ok().filter(|v| !v.is_empty());
    if api_key.is_none() {
        tracing::warn!(reason = "AP_API_KEY not set", "auth_disabled");
    } else {
        tracing::info!(method = "api_key", "auth_enabled");
    }

    let app = agentgov_gateway::app(state, api_key);

    let address = env::var("CONTROL_PLANE_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(%address, "control_plane_server_started");
    axum::serve(listener, app).await?;
    Ok(())
}