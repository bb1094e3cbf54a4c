// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Agent identity CRUD and activation.
//!
//! Grounded on `AgentService` (`sdks/python/agent_platform_sdk/agents.py`):
//! keys are `{org_id}:{agent_id}`, so listing agents for an org is a prefix
//! scan, and `register` enforces spec §3's invariant that `org_id` must
//! reference an existing organization.

use std::sync::Arc;

use crate::error::{GovernorError, Result};
use crate::org::OrgService;
use crate::store::Store;
use crate::types::{AgentIdentity, AgentRole};

pub struct AgentService {
    store: Arc<dyn Store<AgentIdentity>>,
}

fn key(org_id: &str, agent_id: &str) -> String {
    format!("{}:{}", org_id, agent_id)
}

impl AgentService {
    pub fn new(store: Arc<dyn Store<AgentIdentity>>) -> Self {
        Self { store }
    }

    /// Register an agent under `org_id`. `orgs` is consulted so an agent
    /// can never be registered under a non-existent organization.
    pub fn register(
        &self,
        orgs: &OrgService,
        org_id: impl Into<String>,
        name: impl Into<String>,
        role: AgentRole,
        delegated_user_id: Option<String>,
    ) -> Result<AgentIdentity> {
        let org_id = org_id.into();
        if !orgs.exists(&org_id)? {
            return Err(GovernorError::OrgNotFound(org_id));
        }
        let mut agent = AgentIdentity::new(org_id, name, role);
        agent.delegated_user_id = delegated_user_id;
        self.store.put(&key(&agent.org_id, &agent.agent_id), agent.clone())?;
        tracing::info!(agent_id = %agent.agent_id, org_id = %agent.org_id, "agent registered");
        Ok(agent)
    }

    pub fn get(&self, org_id: &str, agent_id: &str) -> Result<AgentIdentity> {
        self.store
            .get(&key(org_id, agent_id))?
            .ok_or_else(|| GovernorError::AgentNotFound(agent_id.to_string()))
    }

    pub fn list(&self, org_id: &str) -> Result<Vec<AgentIdentity>> {
        self.store.list(&format!("{}:", org_id))
    }

    pub fn deactivate(&self, org_id: &str, agent_id: &str) -> Result<AgentIdentity> {
        let mut agent = self.get(org_id, agent_id)?;
        agent.active = false;
        self.store.put(&key(org_id, agent_id), agent.clone())?;
        tracing::info!(agent_id = %agent_id, "agent deactivated");
        Ok(agent)
    }

    pub fn is_active(&self, org_id: &str, agent_id: &str) -> Result<bool> {
        Ok(self.get(org_id, agent_id)?.active)
    }
}
