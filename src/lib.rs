//! fabric-precheck library
//!
//! Pre-upgrade health checks for fabric controllers.
//!
//! This library provides:
//! - Structured release versions with train-aware ordering
//! - A deadline-bounded parallel task runner
//! - A check dispatcher that isolates failures and aggregates one result per check
//! - A small built-in check set (version gating, fault lookups, manual reviews)
//!
//! # Example
//!
//! ```no_run
//! use fabric_precheck::{run_prechecks, PrecheckConfig};
//!
//! let config = PrecheckConfig {
//!     current_version: Some("5.2(3g)".to_string()),
//!     target_version: Some("6.0(2h)".to_string()),
//!     ..Default::default()
//! };
//! let report = run_prechecks(config).expect("invalid configuration");
//! println!("Checks passed: {}", report.summary().passed);
//! ```

pub mod build_info;
pub mod checks;
pub mod cli;
pub mod data;
pub mod engine;
pub mod fabric;
pub mod telemetry;

use cli::args::CheckArgs;
use engine::dispatcher::{CheckContext, CheckDispatcher, CheckRegistry, DispatcherConfig};
use engine::result::PrecheckReport;
use fabric::api::{ApiAccessor, ApiError, SnapshotAccessor};
use fabric::version::{VersionError, VersionId};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

// Re-exports for public API
pub use engine::dispatcher::CheckDispatcher as Dispatcher;
pub use engine::result::{PrecheckReport as Report, ResultSummary};

/// Outcome category of a check. Every check maps onto this closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultKind {
    /// Nothing to act on
    Pass,
    /// Upgrading now risks a fabric outage
    FailOrchestrator,
    /// The upgrade itself is expected to fail
    FailUpgradeFailure,
    /// A human has to look before upgrading
    ManualReviewRequired,
    /// The check does not apply to this upgrade path
    NotApplicable,
    /// The check could not produce a verdict
    Error,
}

impl ResultKind {
    /// Whether results of this kind carry evidence rows
    pub fn carries_evidence(&self) -> bool {
        !matches!(self, ResultKind::Pass | ResultKind::NotApplicable)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ResultKind::FailOrchestrator | ResultKind::FailUpgradeFailure)
    }
}

impl fmt::Display for ResultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultKind::Pass => write!(f, "PASS"),
            ResultKind::FailOrchestrator => write!(f, "FAIL - OUTAGE WARNING"),
            ResultKind::FailUpgradeFailure => write!(f, "FAIL - UPGRADE FAILURE"),
            ResultKind::ManualReviewRequired => write!(f, "MANUAL CHECK REQUIRED"),
            ResultKind::NotApplicable => write!(f, "N/A"),
            ResultKind::Error => write!(f, "ERROR"),
        }
    }
}

/// One record of supporting detail
pub type EvidenceRow = Vec<String>;

/// Build an evidence row from anything string-like
pub fn evidence_row<I, S>(fields: I) -> EvidenceRow
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fields.into_iter().map(Into::into).collect()
}

/// Result of a single check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckResult {
    kind: ResultKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    headers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    data: Vec<EvidenceRow>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    timed_out: bool,
}

impl CheckResult {
    /// Result with evidence rows. Rows are discarded for kinds that never
    /// carry evidence (PASS, NOT_APPLICABLE).
    pub fn with_rows(kind: ResultKind, data: Vec<EvidenceRow>) -> Self {
        let data = if kind.carries_evidence() { data } else { Vec::new() };
        CheckResult {
            kind,
            headers: Vec::new(),
            data,
            timed_out: false,
        }
    }

    pub fn pass() -> Self {
        Self::with_rows(ResultKind::Pass, Vec::new())
    }

    pub fn not_applicable() -> Self {
        Self::with_rows(ResultKind::NotApplicable, Vec::new())
    }

    /// Manual review with a single line of guidance
    pub fn manual(guidance: impl Into<String>) -> Self {
        Self::with_rows(ResultKind::ManualReviewRequired, vec![vec![guidance.into()]])
    }

    /// Error with its description as the single evidence row
    pub fn error(message: impl Into<String>) -> Self {
        Self::with_rows(ResultKind::Error, vec![vec![message.into()]])
    }

    /// Error reported for a check that did not finish within the run budget
    pub fn timeout(budget: Duration) -> Self {
        let mut result = Self::error(format!(
            "TIMEOUT: check did not finish within {} ms",
            budget.as_millis()
        ));
        result.timed_out = true;
        result
    }

    /// Manual review because a version the check depends on is unknown
    pub fn version_unknown(which: &str) -> Self {
        Self::manual(format!(
            "{} version unknown; verify applicability by hand",
            which
        ))
    }

    /// Attach column names for the evidence rows
    pub fn with_headers<I, S>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.headers = evidence_row(headers);
        self
    }

    pub fn kind(&self) -> ResultKind {
        self.kind
    }

    pub fn data(&self) -> &[EvidenceRow] {
        &self.data
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// True for the ERROR produced when a check ran past the deadline
    pub fn is_timeout(&self) -> bool {
        self.timed_out
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.data.is_empty() {
            write!(f, " ({} row{})", self.data.len(), if self.data.len() == 1 { "" } else { "s" })?;
        }
        Ok(())
    }
}

/// Failure raised inside a check's logic. The dispatcher turns it into a result.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Version(#[from] VersionError),

    #[error(transparent)]
    Api(#[from] ApiError),

    /// A version the check depends on was not supplied
    #[error("{0} version unknown")]
    MissingVersion(&'static str),

    #[error("{0}")]
    Other(String),
}

/// Configuration errors. These are the only failures that abort a run, and
/// they are raised before any check starts.
#[derive(Debug, Error)]
pub enum PrecheckError {
    #[error("duplicate check id '{0}'")]
    DuplicateCheck(String),

    #[error("unknown check id '{0}'")]
    UnknownCheck(String),

    #[error("invalid {which} version: {source}")]
    InvalidVersion {
        which: &'static str,
        #[source]
        source: VersionError,
    },

    #[error("cannot load inventory snapshot: {0}")]
    Snapshot(#[from] ApiError),
}

/// Configuration for a precheck run.
#[derive(Debug, Clone)]
pub struct PrecheckConfig {
    /// Version running today (None = unknown)
    pub current_version: Option<String>,
    /// Version being upgraded to (None = unknown)
    pub target_version: Option<String>,
    /// Captured inventory to query
    pub snapshot: Option<PathBuf>,
    /// Specific checks to run (by ID)
    pub only_checks: Vec<String>,
    /// Specific checks to skip (by ID)
    pub skip_checks: Vec<String>,
    /// Global timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum number of query checks in flight at once
    pub max_parallel: usize,
}

impl Default for PrecheckConfig {
    fn default() -> Self {
        PrecheckConfig {
            current_version: None,
            target_version: None,
            snapshot: None,
            only_checks: Vec::new(),
            skip_checks: Vec::new(),
            timeout_ms: 30000,
            max_parallel: 16,
        }
    }
}

impl PrecheckConfig {
    /// Create configuration from command line arguments
    pub fn from_args(args: &CheckArgs) -> Self {
        PrecheckConfig {
            current_version: args.current_version.clone(),
            target_version: args.target_version.clone(),
            snapshot: args.snapshot.clone(),
            only_checks: args.only.clone(),
            skip_checks: args.skip.clone(),
            timeout_ms: args.timeout_ms,
            max_parallel: args.max_parallel,
        }
    }
}

/// Run precheck validation.
///
/// This is the main entry point. Every selected check yields exactly one
/// result in the returned report; only configuration problems produce an
/// `Err`.
pub fn run_prechecks(config: PrecheckConfig) -> Result<PrecheckReport, PrecheckError> {
    let current = parse_version_arg("current", config.current_version.as_deref())?;
    let target = parse_version_arg("target", config.target_version.as_deref())?;

    let api: Arc<dyn ApiAccessor> = match &config.snapshot {
        Some(path) => Arc::new(SnapshotAccessor::load(path)?),
        None => Arc::new(|resource: &str| -> Result<serde_json::Value, ApiError> {
            Err(ApiError::Transport {
                resource: resource.to_string(),
                message: "no inventory source configured".to_string(),
            })
        }),
    };

    let registry = CheckRegistry::new(checks::create_all_checks())?;
    let dispatcher = CheckDispatcher::new(
        DispatcherConfig {
            timeout_ms: config.timeout_ms,
            max_parallel: config.max_parallel,
        },
        registry,
    );
    let context = CheckContext::new(current, target, api);

    tracing::info!(
        current = ?config.current_version,
        target = ?config.target_version,
        "starting prechecks"
    );

    if !config.only_checks.is_empty() {
        dispatcher.run_specific(&config.only_checks, &context)
    } else if !config.skip_checks.is_empty() {
        dispatcher.run_excluding(&config.skip_checks, &context)
    } else {
        Ok(dispatcher.run_all(&context))
    }
}

fn parse_version_arg(which: &'static str, raw: Option<&str>) -> Result<Option<VersionId>, PrecheckError> {
    raw.map(|s| VersionId::parse(s).map_err(|source| PrecheckError::InvalidVersion { which, source }))
        .transpose()
}
