// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Bounded append-only audit log.
//!
//! Entries are appended in a single critical section guarding both the FIFO
//! and the two counters (current size, lifetime count) — see the
//! concurrency model in spec §5. When the configured capacity is reached the
//! oldest entry is dropped; an append never fails because the log is full.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::Result;
use crate::types::{redact_parameters, AuditEntry, AuditFilter, AuditResult};
use serde_json::Value;
use std::collections::HashMap;

struct Inner {
    entries: VecDeque<AuditEntry>,
    capacity: usize,
}

pub struct AuditLog {
    inner: Mutex<Inner>,
    lifetime_count: AtomicU64,
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: VecDeque::with_capacity(capacity.min(1024)),
                capacity,
            }),
            lifetime_count: AtomicU64::new(0),
        }
    }

    /// Append an entry, redacting raw parameter values down to type tags
    /// first so a caller cannot bypass the redaction contract.
    pub fn append(&self, mut entry: AuditEntry, raw_parameters: &HashMap<String, Value>) -> Result<()> {
        entry.parameters = redact_parameters(raw_parameters);
        let mut guard = self.inner.lock().expect("audit log mutex poisoned");
        if guard.entries.len() >= guard.capacity {
            guard.entries.pop_front();
        }
        guard.entries.push_back(entry);
        self.lifetime_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Append an entry whose `parameters` are already type-tagged (used by
    /// callers building an entry with no raw parameter map at all, e.g. the
    /// execution runtime's `execution_complete` entries).
    pub fn append_tagged(&self, entry: AuditEntry) -> Result<()> {
        let mut guard = self.inner.lock().expect("audit log mutex poisoned");
        if guard.entries.len() >= guard.capacity {
            guard.entries.pop_front();
        }
        guard.entries.push_back(entry);
        self.lifetime_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Newest-first query over any subset of `{org_id, agent_id,
    /// execution_id, action}`, truncated to `filter.limit`.
    pub fn query(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        let guard = self.inner.lock().expect("audit log mutex poisoned");
        guard
            .entries
            .iter()
            .rev()
            .filter(|e| matches(e, filter))
            .take(filter.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect()
    }

    /// All entries for a single `execution_id`, oldest-first — preserves
    /// causality within one execution's delegation chain.
    pub fn delegation_chain(&self, execution_id: &str) -> Vec<AuditEntry> {
        let guard = self.inner.lock().expect("audit log mutex poisoned");
        guard
            .entries
            .iter()
            .filter(|e| e.execution_id == execution_id)
            .cloned()
            .collect()
    }

    /// Current number of entries held (≤ capacity).
    pub fn len(&self) -> usize {
        self.inner.lock().expect("audit log mutex poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Monotonic count of every entry ever appended, including dropped ones.
    pub fn lifetime_count(&self) -> u64 {
        self.lifetime_count.load(Ordering::SeqCst)
    }
}

fn matches(entry: &AuditEntry, filter: &AuditFilter) -> bool {
    if let Some(ref org_id) = filter.org_id {
        if &entry.org_id != org_id {
            return false;
        }
    }
    if let Some(ref agent_id) = filter.agent_id {
        if &entry.agent_id != agent_id {
            return false;
        }
    }
    if let Some(ref execution_id) = filter.execution_id {
        if &entry.execution_id != execution_id {
            return false;
        }
    }
    if let Some(ref action) = filter.action {
        if &entry.action != action {
            return false;
        }
    }
    true
}

pub fn denial_entry(
    org_id: impl Into<String>,
    agent_id: impl Into<String>,
    delegated_user_id: Option<String>,
    execution_id: impl Into<String>,
    action: impl Into<String>,
    tool_name: Option<String>,
    reason: impl Into<String>,
) -> AuditEntry {
    AuditEntry {
        entry_id: uuid::Uuid::new_v4().to_string(),
        org_id: org_id.into(),
        agent_id: agent_id.into(),
        delegated_user_id,
        execution_id: execution_id.into(),
        action: action.into(),
        tool_name,
        parameters: HashMap::new(),
        result: AuditResult::Denied,
        reason: Some(reason.into()),
        latency_ms: 0,
        tokens_used: 0,
        timestamp: chrono::Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap as Map;

    fn entry(execution_id: &str, action: &str, result: AuditResult) -> AuditEntry {
        AuditEntry {
            entry_id: uuid::Uuid::new_v4().to_string(),
            org_id: "o1".into(),
            agent_id: "a1".into(),
            delegated_user_id: None,
            execution_id: execution_id.into(),
            action: action.into(),
            tool_name: None,
            parameters: Map::new(),
            result,
            reason: None,
            latency_ms: 0,
            tokens_used: 0,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn drop_oldest_on_overflow() {
        let log = AuditLog::new(2);
        log.append_tagged(entry("e1", "tool_call", AuditResult::Executed)).unwrap();
        log.append_tagged(entry("e2", "tool_call", AuditResult::Executed)).unwrap();
        log.append_tagged(entry("e3", "tool_call", AuditResult::Executed)).unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log.lifetime_count(), 3);
        let all = log.query(&AuditFilter::default());
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|e| e.execution_id != "e1"));
    }

    #[test]
    fn delegation_chain_is_oldest_first() {
        let log = AuditLog::new(10);
        log.append_tagged(entry("exec-1", "policy_check", AuditResult::Allowed)).unwrap();
        log.append_tagged(entry("exec-1", "tool_call", AuditResult::Executed)).unwrap();
        log.append_tagged(entry("exec-1", "execution_complete", AuditResult::Executed)).unwrap();
        let chain = log.delegation_chain("exec-1");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].action, "policy_check");
        assert_eq!(chain[2].action, "execution_complete");
    }

    #[test]
    fn redacts_raw_parameter_values() {
        let log = AuditLog::new(10);
        let mut raw = Map::new();
        raw.insert("password".to_string(), serde_json::json!("hunter2"));
        raw.insert("count".to_string(), serde_json::json!(5));
        let e = entry("exec-2", "tool_call", AuditResult::Executed);
        log.append(e, &raw).unwrap();
        let got = &log.query(&AuditFilter::default())[0];
        assert_eq!(got.parameters.get("password").unwrap(), "string");
        assert_eq!(got.parameters.get("count").unwrap(), "number");
    }
}