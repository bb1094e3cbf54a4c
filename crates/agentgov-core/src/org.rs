// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Organization CRUD.
//!
//! Grounded on `OrgService` (`platform/control_plane/orgs.py`): create,
//! get, list, delete, plus an `exists` check the agent service relies on
//! before registering an agent under an org (spec §4.8 invariant (a)).

use std::sync::Arc;

use crate::error::{GovernorError, Result};
use crate::store::Store;
use crate::types::Organization;

pub struct OrgService {
    store: Arc<dyn Store<Organization>>,
}

impl OrgService {
    pub fn new(store: Arc<dyn Store<Organization>>) -> Self {
        Self { store }
    }

    pub fn create(&self, name: impl Into<String>) -> Result<Organization> {
        let org = Organization::new(name);
        self.store.put(&org.org_id, org.clone())?;
        tracing::info!(org_id = %org.org_id, "organization created");
        Ok(org)
    }

    pub fn get(&self, org_id: &str) -> Result<Organization> {
        self.store
            .get(org_id)?
            .ok_or_else(|| GovernorError::OrgNotFound(org_id.to_string()))
    }

    pub fn list(&self) -> Result<Vec<Organization>> {
        self.store.list("")
    }

    pub fn delete(&self, org_id: &str) -> Result<()> {
        if !self.store.delete(org_id)? {
            return Err(GovernorError::OrgNotFound(org_id.to_string()));
        }
        tracing::info!(org_id = %org_id, "organization deleted");
        Ok(())
    }

    pub fn exists(&self, org_id: &str) -> Result<bool> {
        self.store.exists(org_id)
    }
}
