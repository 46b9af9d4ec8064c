//! Result aggregation.
//!
//! Collects one result per check id and computes summaries for the
//! reporting layer.

use crate::{CheckResult, ResultKind};
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Result summary statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResultSummary {
    pub passed: u32,
    pub failed_orchestrator: u32,
    pub failed_upgrade: u32,
    pub manual: u32,
    pub not_applicable: u32,
    pub errors: u32,
    pub total: u32,
}

impl ResultSummary {
    /// Failures of either kind
    pub fn failed(&self) -> u32 {
        self.failed_orchestrator + self.failed_upgrade
    }
}

/// Precheck report: one result per selected check, in registration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct PrecheckReport {
    results: IndexMap<String, CheckResult>,
    timed_out: Vec<String>,
    total_duration_ms: u64,
    #[serde(skip)]
    names: HashMap<String, String>,
}

impl PrecheckReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the result for a check. A later result for the same id replaces
    /// the earlier one without changing its position.
    pub(crate) fn insert(&mut self, check_id: String, result: CheckResult) {
        self.results.insert(check_id, result);
    }

    pub(crate) fn set_name(&mut self, check_id: &str, name: &str) {
        self.names.insert(check_id.to_string(), name.to_string());
    }

    pub(crate) fn set_timed_out(&mut self, ids: Vec<String>) {
        self.timed_out = ids;
    }

    pub(crate) fn set_duration(&mut self, elapsed: Duration) {
        self.total_duration_ms = elapsed.as_millis() as u64;
    }

    pub fn get(&self, check_id: &str) -> Option<&CheckResult> {
        self.results.get(check_id)
    }

    /// Display name of a check in this report
    pub fn name(&self, check_id: &str) -> Option<&str> {
        self.names.get(check_id).map(String::as_str)
    }

    pub fn results(&self) -> &IndexMap<String, CheckResult> {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Checks that ran past the deadline, in submission order
    pub fn timed_out(&self) -> &[String] {
        &self.timed_out
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration_ms
    }

    /// Calculate summary statistics
    pub fn summary(&self) -> ResultSummary {
        let mut summary = ResultSummary::default();

        for result in self.results.values() {
            summary.total += 1;

            match result.kind() {
                ResultKind::Pass => summary.passed += 1,
                ResultKind::FailOrchestrator => summary.failed_orchestrator += 1,
                ResultKind::FailUpgradeFailure => summary.failed_upgrade += 1,
                ResultKind::ManualReviewRequired => summary.manual += 1,
                ResultKind::NotApplicable => summary.not_applicable += 1,
                ResultKind::Error => summary.errors += 1,
            }
        }

        summary
    }

    /// Check if there are any failures
    pub fn has_failures(&self) -> bool {
        self.results.values().any(|r| r.kind().is_failure())
    }

    /// Ids whose result has the given kind
    pub fn ids_with_kind(&self, kind: ResultKind) -> Vec<&str> {
        self.results
            .iter()
            .filter(|(_, r)| r.kind() == kind)
            .map(|(id, _)| id.as_str())
            .collect()
    }
}
