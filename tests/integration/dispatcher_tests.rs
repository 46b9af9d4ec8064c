//! Check dispatcher integration tests.
//!
//! Failure isolation, version gating, deadline handling, and repeatability
//! across the full dispatch path.

use crate::mocks::MockInventory;
use fabric_precheck::engine::dispatcher::{
    CheckContext, CheckDispatcher, CheckRegistry, DispatcherConfig, RegisteredCheck, VersionRequirement,
};
use fabric_precheck::fabric::api::ApiAccessor;
use fabric_precheck::fabric::version::VersionId;
use fabric_precheck::{evidence_row, CheckError, CheckResult, PrecheckError, ResultKind};
use std::sync::Arc;
use std::time::Duration;

fn version(s: &str) -> VersionId {
    VersionId::parse(s).unwrap()
}

fn context(inventory: MockInventory, current: Option<&str>, target: Option<&str>) -> CheckContext {
    let api: Arc<dyn ApiAccessor> = Arc::new(inventory);
    CheckContext::new(current.map(version), target.map(version), api)
}

fn dispatcher(config: DispatcherConfig, checks: Vec<RegisteredCheck>) -> CheckDispatcher {
    CheckDispatcher::new(config, CheckRegistry::new(checks).unwrap())
}

/// Query check that reads one resource and passes if it exists
fn reads(id: &str, resource: &'static str) -> RegisteredCheck {
    RegisteredCheck::query(id, "Reads Inventory", move |ctx| {
        ctx.api().query(resource)?;
        Ok(CheckResult::pass())
    })
}

#[test]
fn test_raising_check_is_isolated() {
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        vec![
            RegisteredCheck::pure("A-001", "Fine", |_| Ok(CheckResult::pass())),
            RegisteredCheck::pure("A-002", "Raises", |_| Err(CheckError::Other("lookup table corrupt".to_string()))),
            RegisteredCheck::query("A-003", "Panics", |_| panic!("unexpected shape")),
            RegisteredCheck::pure("A-004", "Finds Something", |_| {
                Ok(CheckResult::with_rows(ResultKind::FailOrchestrator, vec![evidence_row(["node-2", "diverged"])]))
            }),
        ],
    );
    let report = dispatcher.run_all(&context(MockInventory::new(), None, None));

    assert_eq!(report.len(), 4);
    assert_eq!(report.get("A-001").unwrap().kind(), ResultKind::Pass);

    let raised = report.get("A-002").unwrap();
    assert_eq!(raised.kind(), ResultKind::Error);
    assert!(!raised.data().is_empty());
    assert!(raised.data()[0][0].contains("lookup table corrupt"));

    let panicked = report.get("A-003").unwrap();
    assert_eq!(panicked.kind(), ResultKind::Error);
    assert!(panicked.data()[0][0].contains("unexpected shape"));

    assert_eq!(report.get("A-004").unwrap().kind(), ResultKind::FailOrchestrator);
}

#[test]
fn test_missing_target_requires_manual_review() {
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        vec![RegisteredCheck::pure("G-001", "Needs Both", |_| -> Result<CheckResult, CheckError> {
            panic!("gated check must not run")
        })
        .requires(VersionRequirement::Both)],
    );
    let report = dispatcher.run_all(&context(MockInventory::new(), Some("5.2(3g)"), None));
    let result = report.get("G-001").unwrap();
    assert_eq!(result.kind(), ResultKind::ManualReviewRequired);
    assert!(result.data()[0][0].contains("target"));
}

#[test]
fn test_gated_query_never_touches_inventory() {
    let inventory = Arc::new(MockInventory::healthy());
    let api: Arc<dyn ApiAccessor> = inventory.clone();
    let ctx = CheckContext::new(None, Some(version("6.0(2h)")), api);
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        vec![
            reads("Q-001", "infraWiNode").requires(VersionRequirement::Current),
            reads("Q-002", "faultInst"),
        ],
    );
    let report = dispatcher.run_all(&ctx);

    assert_eq!(report.get("Q-001").unwrap().kind(), ResultKind::ManualReviewRequired);
    assert_eq!(report.get("Q-002").unwrap().kind(), ResultKind::Pass);
    assert_eq!(inventory.queries(), vec!["faultInst".to_string()]);
}

#[test]
fn test_query_failure_becomes_error() {
    let inventory = MockInventory::healthy().with_failure("faultInst", "connection reset");
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        vec![reads("Q-001", "infraWiNode"), reads("Q-002", "faultInst")],
    );
    let report = dispatcher.run_all(&context(inventory, None, None));
    assert_eq!(report.get("Q-001").unwrap().kind(), ResultKind::Pass);
    let failed = report.get("Q-002").unwrap();
    assert_eq!(failed.kind(), ResultKind::Error);
    assert!(failed.data()[0][0].contains("connection reset"));
}

#[test]
fn test_slow_query_times_out_without_blocking_others() {
    let inventory = MockInventory::healthy().with_latency("faultInst", Duration::from_millis(2000));
    let dispatcher = dispatcher(
        DispatcherConfig {
            timeout_ms: 300,
            max_parallel: 16,
        },
        vec![
            reads("Q-001", "infraWiNode"),
            reads("Q-002", "faultInst"),
            RegisteredCheck::pure("P-001", "Pure", |_| Ok(CheckResult::pass())),
        ],
    );
    let report = dispatcher.run_all(&context(inventory, None, None));

    assert_eq!(report.get("Q-001").unwrap().kind(), ResultKind::Pass);
    assert_eq!(report.get("P-001").unwrap().kind(), ResultKind::Pass);
    let slow = report.get("Q-002").unwrap();
    assert_eq!(slow.kind(), ResultKind::Error);
    assert!(slow.is_timeout());
    assert!(slow.data()[0][0].starts_with("TIMEOUT"));
    assert_eq!(report.timed_out(), &["Q-002".to_string()]);
    assert!(report.total_duration_ms() < 1500);
}

#[test]
fn test_inline_checks_do_not_consume_query_budget() {
    let inventory = MockInventory::healthy().with_latency("infraWiNode", Duration::from_millis(200));
    let dispatcher = dispatcher(
        DispatcherConfig {
            timeout_ms: 600,
            max_parallel: 16,
        },
        vec![
            RegisteredCheck::pure("P-001", "Slow Pure", |_| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(CheckResult::pass())
            }),
            reads("Q-001", "infraWiNode"),
        ],
    );
    let report = dispatcher.run_all(&context(inventory, None, None));

    assert_eq!(report.get("P-001").unwrap().kind(), ResultKind::Pass);
    assert_eq!(report.get("Q-001").unwrap().kind(), ResultKind::Pass);
    assert!(report.timed_out().is_empty());
    // Reported duration still covers the whole run.
    assert!(report.total_duration_ms() >= 700);
}

#[test]
fn test_report_carries_check_names() {
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        vec![
            RegisteredCheck::manual("N-001", "Backup Exported", "export a backup"),
            RegisteredCheck::manual("N-002", "Images Staged", "stage the images"),
        ],
    );
    let report = dispatcher
        .run_specific(&["N-002".to_string()], &context(MockInventory::new(), None, None))
        .unwrap();
    assert_eq!(report.name("N-002"), Some("Images Staged"));
    assert_eq!(report.name("N-001"), None);
}

#[test]
fn test_batches_share_one_budget() {
    let inventory = MockInventory::healthy().with_latency("infraWiNode", Duration::from_millis(400));
    let dispatcher = dispatcher(
        DispatcherConfig {
            timeout_ms: 1000,
            max_parallel: 1,
        },
        vec![
            reads("B-001", "infraWiNode"),
            reads("B-002", "infraWiNode"),
            reads("B-003", "infraWiNode"),
        ],
    );
    let report = dispatcher.run_all(&context(inventory, None, None));

    assert_eq!(report.get("B-001").unwrap().kind(), ResultKind::Pass);
    assert_eq!(report.get("B-002").unwrap().kind(), ResultKind::Pass);
    assert!(report.get("B-003").unwrap().is_timeout());
}

#[test]
fn test_results_follow_registration_order() {
    let inventory = MockInventory::healthy().with_latency("infraWiNode", Duration::from_millis(100));
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        vec![
            reads("Z-001", "infraWiNode"),
            RegisteredCheck::manual("Z-002", "Manual", "ask the operator"),
            reads("Z-003", "faultInst"),
            RegisteredCheck::pure("Z-004", "Pure", |_| Ok(CheckResult::pass())),
        ],
    );
    let report = dispatcher.run_all(&context(inventory, None, None));
    let ids: Vec<&str> = report.results().keys().map(String::as_str).collect();
    assert_eq!(ids, vec!["Z-001", "Z-002", "Z-003", "Z-004"]);
}

#[test]
fn test_repeated_runs_are_identical() {
    let dispatcher = CheckDispatcher::new(
        DispatcherConfig::default(),
        CheckRegistry::new(fabric_precheck::checks::create_all_checks()).unwrap(),
    );
    let ctx = context(
        MockInventory::healthy().with_resource("faultInst", serde_json::json!([{"code": "F1527", "dn": "node-1"}])),
        Some("5.2(3g)"),
        Some("6.0(2h)"),
    );
    let first = dispatcher.run_all(&ctx);
    let second = dispatcher.run_all(&ctx);
    assert_eq!(first.results(), second.results());
}

#[test]
fn test_selection_errors() {
    let dispatcher = dispatcher(
        DispatcherConfig::default(),
        vec![RegisteredCheck::pure("S-001", "Pure", |_| Ok(CheckResult::pass()))],
    );
    let ctx = context(MockInventory::new(), None, None);
    assert!(matches!(
        dispatcher.run_specific(&["S-404".to_string()], &ctx),
        Err(PrecheckError::UnknownCheck(id)) if id == "S-404"
    ));
    assert!(dispatcher.run_excluding(&["S-404".to_string()], &ctx).is_err());
    assert!(dispatcher.run_excluding(&["S-001".to_string()], &ctx).unwrap().is_empty());
    assert_eq!(dispatcher.run("S-001", &ctx).unwrap().kind(), ResultKind::Pass);
}

#[test]
fn test_duplicate_registration_rejected() {
    let result = CheckRegistry::new(vec![
        RegisteredCheck::manual("D-001", "One", "a"),
        RegisteredCheck::manual("D-001", "Two", "b"),
    ]);
    assert!(matches!(result, Err(PrecheckError::DuplicateCheck(id)) if id == "D-001"));
}
