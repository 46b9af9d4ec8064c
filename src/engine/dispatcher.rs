//! Check registration and dispatch.
//!
//! Manages the static check registry, version gating, and execution.
//!
//! # Graceful Degradation
//!
//! This module handles errors gracefully:
//! - Check errors: converted to an ERROR result with the message as evidence
//! - Check panics: caught via std::panic::catch_unwind, converted to ERROR
//! - Check timeout: ERROR result flagged as a timeout
//! - Missing current/target version: MANUAL_REVIEW_REQUIRED, check not invoked
//! - Unknown check ID: configuration error, raised before any check starts
//!
//! Every selected check appears exactly once in the returned report.

use crate::engine::result::PrecheckReport;
use crate::engine::runner::{panic_message, Task, TaskInput, TaskOutcome, TaskRunner};
use crate::fabric::api::ApiAccessor;
use crate::fabric::version::VersionId;
use crate::{CheckError, CheckResult, PrecheckError};
use indexmap::IndexMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Signature every check implements
pub type CheckFn = Arc<dyn Fn(&CheckContext) -> Result<CheckResult, CheckError> + Send + Sync>;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Wall-clock budget for all query checks, in milliseconds
    pub timeout_ms: u64,
    /// Query checks in flight at once; further checks wait for the next batch
    pub max_parallel: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        DispatcherConfig {
            timeout_ms: 30000,
            max_parallel: 16,
        }
    }
}

/// Shared, read-only input for every check in a run
#[derive(Clone)]
pub struct CheckContext {
    current: Option<VersionId>,
    target: Option<VersionId>,
    api: Arc<dyn ApiAccessor>,
}

impl CheckContext {
    pub fn new(current: Option<VersionId>, target: Option<VersionId>, api: Arc<dyn ApiAccessor>) -> Self {
        CheckContext { current, target, api }
    }

    pub fn current(&self) -> Option<&VersionId> {
        self.current.as_ref()
    }

    pub fn target(&self) -> Option<&VersionId> {
        self.target.as_ref()
    }

    pub fn api(&self) -> &dyn ApiAccessor {
        self.api.as_ref()
    }

    pub fn require_current(&self) -> Result<&VersionId, CheckError> {
        self.current.as_ref().ok_or(CheckError::MissingVersion("current"))
    }

    pub fn require_target(&self) -> Result<&VersionId, CheckError> {
        self.target.as_ref().ok_or(CheckError::MissingVersion("target"))
    }

    /// Both versions, or the name of the first missing one
    pub fn require_both(&self) -> Result<(&VersionId, &VersionId), CheckError> {
        Ok((self.require_current()?, self.require_target()?))
    }
}

impl fmt::Debug for CheckContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckContext")
            .field("current", &self.current)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

/// Which versions a check cannot run without
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VersionRequirement {
    #[default]
    None,
    Current,
    Target,
    Both,
}

impl VersionRequirement {
    /// Name of the first required version the context lacks
    pub fn missing(&self, ctx: &CheckContext) -> Option<&'static str> {
        let needs_current = matches!(self, VersionRequirement::Current | VersionRequirement::Both);
        let needs_target = matches!(self, VersionRequirement::Target | VersionRequirement::Both);
        if needs_current && ctx.current.is_none() {
            Some("current")
        } else if needs_target && ctx.target.is_none() {
            Some("target")
        } else {
            None
        }
    }
}

/// How a check is executed
#[derive(Clone)]
pub enum CheckClass {
    /// No I/O; run directly on the dispatcher thread
    Pure(CheckFn),
    /// Queries the inventory; run through the task runner under the deadline
    Query(CheckFn),
    /// Always needs a human; never invoked
    Manual { guidance: String },
}

impl fmt::Debug for CheckClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckClass::Pure(_) => write!(f, "Pure"),
            CheckClass::Query(_) => write!(f, "Query"),
            CheckClass::Manual { guidance } => f.debug_struct("Manual").field("guidance", guidance).finish(),
        }
    }
}

/// A registered check with its execution function
#[derive(Debug, Clone)]
pub struct RegisteredCheck {
    pub id: String,
    pub name: String,
    pub description: String,
    pub class: CheckClass,
    pub requires: VersionRequirement,
}

impl RegisteredCheck {
    fn new(id: &str, name: &str, class: CheckClass) -> Self {
        RegisteredCheck {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            class,
            requires: VersionRequirement::None,
        }
    }

    pub fn pure<F>(id: &str, name: &str, check_fn: F) -> Self
    where
        F: Fn(&CheckContext) -> Result<CheckResult, CheckError> + Send + Sync + 'static,
    {
        Self::new(id, name, CheckClass::Pure(Arc::new(check_fn)))
    }

    pub fn query<F>(id: &str, name: &str, check_fn: F) -> Self
    where
        F: Fn(&CheckContext) -> Result<CheckResult, CheckError> + Send + Sync + 'static,
    {
        Self::new(id, name, CheckClass::Query(Arc::new(check_fn)))
    }

    pub fn manual(id: &str, name: &str, guidance: &str) -> Self {
        Self::new(
            id,
            name,
            CheckClass::Manual {
                guidance: guidance.to_string(),
            },
        )
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn requires(mut self, requirement: VersionRequirement) -> Self {
        self.requires = requirement;
        self
    }
}

/// Checks keyed by id, in registration order. Built once; ids are unique.
#[derive(Debug, Clone, Default)]
pub struct CheckRegistry {
    checks: IndexMap<String, RegisteredCheck>,
}

impl CheckRegistry {
    pub fn new(checks: Vec<RegisteredCheck>) -> Result<Self, PrecheckError> {
        let mut map = IndexMap::with_capacity(checks.len());
        for check in checks {
            if map.contains_key(&check.id) {
                return Err(PrecheckError::DuplicateCheck(check.id));
            }
            map.insert(check.id.clone(), check);
        }
        Ok(CheckRegistry { checks: map })
    }

    pub fn get(&self, id: &str) -> Option<&RegisteredCheck> {
        self.checks.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredCheck> {
        self.checks.values()
    }

    pub fn len(&self) -> usize {
        self.checks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    fn ensure_known(&self, ids: &[String]) -> Result<(), PrecheckError> {
        match ids.iter().find(|id| !self.checks.contains_key(id.as_str())) {
            Some(id) => Err(PrecheckError::UnknownCheck(id.clone())),
            None => Ok(()),
        }
    }
}

/// Check dispatcher
pub struct CheckDispatcher {
    config: DispatcherConfig,
    registry: CheckRegistry,
}

impl CheckDispatcher {
    /// Create a new dispatcher over a validated registry
    pub fn new(config: DispatcherConfig, registry: CheckRegistry) -> Self {
        CheckDispatcher { config, registry }
    }

    pub fn registry(&self) -> &CheckRegistry {
        &self.registry
    }

    /// Run a single check
    pub fn run(&self, check_id: &str, ctx: &CheckContext) -> Result<CheckResult, PrecheckError> {
        let check = self
            .registry
            .get(check_id)
            .ok_or_else(|| PrecheckError::UnknownCheck(check_id.to_string()))?;
        let report = self.run_checks(vec![check], ctx);
        report
            .get(check_id)
            .cloned()
            .ok_or_else(|| PrecheckError::UnknownCheck(check_id.to_string()))
    }

    /// Run all registered checks
    pub fn run_all(&self, ctx: &CheckContext) -> PrecheckReport {
        self.run_checks(self.registry.iter().collect(), ctx)
    }

    /// Run specific checks by ID
    pub fn run_specific(&self, check_ids: &[String], ctx: &CheckContext) -> Result<PrecheckReport, PrecheckError> {
        self.registry.ensure_known(check_ids)?;
        let selected = self.registry.iter().filter(|c| check_ids.contains(&c.id)).collect();
        Ok(self.run_checks(selected, ctx))
    }

    /// Run all checks except specified IDs
    pub fn run_excluding(&self, skip_ids: &[String], ctx: &CheckContext) -> Result<PrecheckReport, PrecheckError> {
        self.registry.ensure_known(skip_ids)?;
        let selected = self.registry.iter().filter(|c| !skip_ids.contains(&c.id)).collect();
        Ok(self.run_checks(selected, ctx))
    }

    /// Execute the selected checks. Pure and manual checks resolve first on
    /// this thread; query checks then run in batches under one budget.
    fn run_checks(&self, selected: Vec<&RegisteredCheck>, ctx: &CheckContext) -> PrecheckReport {
        let start = Instant::now();
        let budget = Duration::from_millis(self.config.timeout_ms);
        let shared = Arc::new(ctx.clone());

        let mut slots: IndexMap<String, Option<CheckResult>> =
            selected.iter().map(|c| (c.id.clone(), None)).collect();
        let mut timed_out = Vec::new();
        let mut queries: Vec<(&str, &CheckFn)> = Vec::new();

        for check in &selected {
            if let Some(which) = check.requires.missing(ctx) {
                tracing::info!(check = %check.id, missing = which, "version unknown, manual review required");
                slots.insert(check.id.clone(), Some(CheckResult::version_unknown(which)));
                continue;
            }
            match &check.class {
                CheckClass::Manual { guidance } => {
                    slots.insert(check.id.clone(), Some(CheckResult::manual(guidance.clone())));
                }
                CheckClass::Pure(check_fn) => {
                    let result = execute_check(&check.id, check_fn, ctx);
                    slots.insert(check.id.clone(), Some(result));
                }
                CheckClass::Query(check_fn) => queries.push((check.id.as_str(), check_fn)),
            }
        }

        // The budget covers query checks only; it starts once inline checks are done.
        let queries_started = Instant::now();
        for batch in queries.chunks(self.config.max_parallel.max(1)) {
            let remaining = budget.saturating_sub(queries_started.elapsed());
            if remaining.is_zero() {
                // Budget spent before this batch could start.
                for (id, _) in batch {
                    tracing::warn!(check = %id, "run budget exhausted before check started");
                    timed_out.push(id.to_string());
                    slots.insert(id.to_string(), Some(CheckResult::timeout(budget)));
                }
                continue;
            }

            let tasks = batch
                .iter()
                .map(|(id, check_fn)| {
                    let check_fn = Arc::clone(*check_fn);
                    Task::new(*id, move |input: TaskInput<CheckContext>| {
                        let result = execute_check(&input.task_id, &check_fn, &input.shared);
                        if !input.token.is_expired() {
                            tracing::debug!(check = %input.task_id, kind = %result.kind(), "check finished");
                        }
                        Ok(result)
                    })
                })
                .collect();

            let report = TaskRunner::new(remaining).start(tasks, Arc::clone(&shared)).join();
            for (id, outcome) in report.into_outcomes() {
                let result = match outcome {
                    TaskOutcome::Completed(result) => result,
                    TaskOutcome::Failed(e) => CheckResult::error(e.to_string()),
                    TaskOutcome::TimedOut => {
                        timed_out.push(id.clone());
                        CheckResult::timeout(budget)
                    }
                };
                slots.insert(id, Some(result));
            }
        }

        let mut report = PrecheckReport::new();
        for check in &selected {
            report.set_name(&check.id, &check.name);
        }
        for (id, slot) in slots {
            // Every path above fills its slot; an empty one means the check never ran.
            report.insert(id, slot.unwrap_or_else(|| CheckResult::error("check was not executed")));
        }
        report.set_timed_out(timed_out);
        report.set_duration(start.elapsed());

        let summary = report.summary();
        tracing::info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed(),
            errors = summary.errors,
            timed_out = report.timed_out().len(),
            "checks complete"
        );
        report
    }
}

/// Run one check, converting errors and panics into results
fn execute_check(id: &str, check_fn: &CheckFn, ctx: &CheckContext) -> CheckResult {
    match panic::catch_unwind(AssertUnwindSafe(|| check_fn(ctx))) {
        Ok(Ok(result)) => result,
        Ok(Err(CheckError::MissingVersion(which))) => CheckResult::version_unknown(which),
        Ok(Err(e)) => {
            tracing::warn!(check = %id, error = %e, "check raised an error");
            CheckResult::error(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(check = %id, panic = %message, "check panicked");
            CheckResult::error(format!("check panicked: {}", message))
        }
    }
}
