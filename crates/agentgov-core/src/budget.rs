// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2026 agentgov contributors

//! Budget engine: two-scope concurrent pre-flight/post-flight accounting.
//!
//! Grounded on `BillingService` (`agent_platform/control_plane/billing.py`).
//! `check` and `report` share a single mutex so concurrent `report` calls on
//! the same `(org_id, agent_id)` never lose updates (spec §8's quantified
//! invariant).

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::{GovernorError, Result};
use crate::store::Store;
use crate::types::{Budget, UsageQuery, UsageReport, UsageSummary};

fn budget_key(org_id: &str, agent_id: Option<&str>) -> String {
    match agent_id {
        Some(agent_id) => format!("{}:agent:{}", org_id, agent_id),
        None => format!("{}:org", org_id),
    }
}

pub struct BudgetEngine {
    budgets: Arc<dyn Store<Budget>>,
    usage: Arc<dyn Store<UsageReport>>,
    // A single reentrant-in-spirit lock: `check` and `report` both acquire
    // it for the whole read-mutate-write critical section (spec §5).
    lock: Mutex<()>,
}

pub struct PreFlightResult {
    pub allowed: bool,
    pub tokens_remaining: i64,
    pub reason: String,
}

impl BudgetEngine {
    pub fn new(budgets: Arc<dyn Store<Budget>>, usage: Arc<dyn Store<UsageReport>>) -> Self {
        Self {
            budgets,
            usage,
            lock: Mutex::new(()),
        }
    }

    pub fn set_budget(
        &self,
        org_id: &str,
        agent_id: Option<&str>,
        token_limit: i64,
        reset_period_days: u32,
    ) -> Result<Budget> {
        let key = budget_key(org_id, agent_id);
        let _guard = self.lock.lock().expect("budget mutex poisoned");
        let existing = self.budgets.get(&key)?;
        let now = Utc::now();
        let budget = Budget {
            budget_id: existing.as_ref().map(|b| b.budget_id.clone()).unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            org_id: org_id.to_string(),
            agent_id: agent_id.map(str::to_string),
            token_limit,
            tokens_used: existing.as_ref().map(|b| b.tokens_used).unwrap_or(0),
            tool_invocations: existing.as_ref().map(|b| b.tool_invocations).unwrap_or(0),
            reset_period_days,
            created_at: existing.as_ref().map(|b| b.created_at).unwrap_or(now),
            last_reset_at: existing.as_ref().map(|b| b.last_reset_at).unwrap_or(now),
        };
        self.budgets.put(&key, budget.clone())?;
        tracing::info!(org_id = %org_id, ?agent_id, token_limit, "budget set");
        Ok(budget)
    }

    pub fn get_budget(&self, org_id: &str, agent_id: Option<&str>) -> Result<Option<Budget>> {
        self.budgets.get(&budget_key(org_id, agent_id))
    }

    /// Pre-flight check: agent budget consulted first, then org budget.
    /// Absence of both budgets means no cap — `remaining = 0` is reported
    /// (never a sentinel), matching spec §4.4's explicit requirement.
    pub fn check(&self, org_id: &str, agent_id: &str, estimated_tokens: i64) -> Result<PreFlightResult> {
        let _guard = self.lock.lock().expect("budget mutex poisoned");

        let agent_budget = self.budgets.get(&budget_key(org_id, Some(agent_id)))?;
        if let Some(ref b) = agent_budget {
            if b.tokens_remaining() < estimated_tokens {
                return Ok(PreFlightResult {
                    allowed: false,
                    tokens_remaining: b.tokens_remaining(),
                    reason: format!(
                        "agent budget exhausted: {} remaining, {} requested",
                        b.tokens_remaining(),
                        estimated_tokens
                    ),
                });
            }
        }

        let org_budget = self.budgets.get(&budget_key(org_id, None))?;
        if let Some(ref b) = org_budget {
            if b.tokens_remaining() < estimated_tokens {
                return Ok(PreFlightResult {
                    allowed: false,
                    tokens_remaining: b.tokens_remaining(),
                    reason: format!(
                        "org budget exhausted: {} remaining, {} requested",
                        b.tokens_remaining(),
                        estimated_tokens
                    ),
                });
            }
        }

        let remaining = match (&agent_budget, &org_budget) {
            (None, None) => 0,
            (Some(a), None) => a.tokens_remaining(),
            (None, Some(o)) => o.tokens_remaining(),
            (Some(a), Some(o)) => a.tokens_remaining().min(o.tokens_remaining()),
        };
        Ok(PreFlightResult {
            allowed: true,
            tokens_remaining: remaining,
            reason: "budget_ok".to_string(),
        })
    }

    /// Post-flight deduction. Persists a [`UsageReport`], then debits both
    /// budget scopes (whichever exist) inside the same critical section as
    /// the read, so concurrent reports never lose an update.
    pub fn report(
        &self,
        org_id: &str,
        agent_id: &str,
        execution_id: &str,
        tokens_used: i64,
        tool_invocations: i64,
        execution_duration_ms: i64,
        tool_name: Option<String>,
    ) -> Result<i64> {
        if tokens_used < 0 {
            return Err(GovernorError::InvalidUsage("tokens_used must not be negative".to_string()));
        }

        let report = UsageReport {
            report_id: uuid::Uuid::new_v4().to_string(),
            org_id: org_id.to_string(),
            agent_id: agent_id.to_string(),
            execution_id: execution_id.to_string(),
            tokens_used,
            tool_invocations,
            execution_duration_ms,
            tool_name,
            timestamp: Utc::now(),
        };

        let _guard = self.lock.lock().expect("budget mutex poisoned");
        self.usage.put(&report.report_id, report)?;

        let agent_key = budget_key(org_id, Some(agent_id));
        let remaining = if let Some(mut b) = self.budgets.get(&agent_key)? {
            b.tokens_used += tokens_used;
            b.tool_invocations += tool_invocations;
            let remaining = b.tokens_remaining();
            self.budgets.put(&agent_key, b)?;
            remaining
        } else {
            0
        };

        let org_key = budget_key(org_id, None);
        if let Some(mut b) = self.budgets.get(&org_key)? {
            b.tokens_used += tokens_used;
            b.tool_invocations += tool_invocations;
            self.budgets.put(&org_key, b)?;
        }

        tracing::info!(org_id = %org_id, agent_id = %agent_id, execution_id = %execution_id, tokens_used, remaining, "usage reported");
        Ok(remaining)
    }

    /// Sum usage reports matching the query's filters. Both time bounds are
    /// inclusive (spec design note (c) — inclusive reading chosen).
    pub fn get_usage(&self, query: &UsageQuery) -> Result<UsageSummary> {
        let reports = self.usage.list("")?;
        let filtered: Vec<&UsageReport> = reports
            .iter()
            .filter(|r| {
                if let Some(ref org_id) = query.org_id {
                    if &r.org_id != org_id {
                        return false;
                    }
                }
                if let Some(ref agent_id) = query.agent_id {
                    if &r.agent_id != agent_id {
                        return false;
                    }
                }
                if let Some(start) = query.start_time {
                    if r.timestamp < start {
                        return false;
                    }
                }
                if let Some(end) = query.end_time {
                    if r.timestamp > end {
                        return false;
                    }
                }
                true
            })
            .collect();

        Ok(UsageSummary {
            org_id: query.org_id.clone().unwrap_or_default(),
            agent_id: query.agent_id.clone(),
            total_tokens: filtered.iter().map(|r| r.tokens_used).sum(),
            total_tool_invocations: filtered.iter().map(|r| r.tool_invocations).sum(),
            total_execution_duration_ms: filtered.iter().map(|r| r.execution_duration_ms).sum(),
            report_count: filtered.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryStore;
    use std::thread;

    fn engine() -> BudgetEngine {
        BudgetEngine::new(Arc::new(InMemoryStore::new()), Arc::new(InMemoryStore::new()))
    }

    #[test]
    fn check_with_no_budget_returns_ok_zero() {
        let engine = engine();
        let result = engine.check("o1", "a1", 100).unwrap();
        assert!(result.allowed);
        assert_eq!(result.tokens_remaining, 0);
        assert_eq!(result.reason, "budget_ok");
    }

    #[test]
    fn negative_usage_rejected() {
        let engine = engine();
        let err = engine.report("o1", "a1", "e1", -1, 0, 0, None).unwrap_err();
        assert_eq!(err.error_type(), "InvalidUsageError");
    }

    #[test]
    fn concurrent_reports_never_lose_updates() {
        let engine = Arc::new(engine());
        engine.set_budget("o1", Some("a1"), 100_000, 30).unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let engine = Arc::clone(&engine);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    engine.report("o1", "a1", "exec", 100, 1, 0, None).unwrap();
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let budget = engine.get_budget("o1", Some("a1")).unwrap().unwrap();
        assert_eq!(budget.tokens_used, 10_000);
    }

    #[test]
    fn pre_flight_denies_when_agent_budget_exhausted() {
        let engine = engine();
        engine.set_budget("o1", Some("a1"), 100, 30).unwrap();
        engine.report("o1", "a1", "e1", 90, 0, 0, None).unwrap();
        let result = engine.check("o1", "a1", 20).unwrap();
        assert!(!result.allowed);
        assert_eq!(result.tokens_remaining, 10);
    }
}