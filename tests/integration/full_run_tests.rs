//! Full run integration tests.
//!
//! Complete runs through `run_prechecks` against snapshot files on disk.

use fabric_precheck::cli::output::exit_code;
use fabric_precheck::{run_prechecks, PrecheckConfig, PrecheckError, ResultKind};
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

fn snapshot_file(document: serde_json::Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", document).unwrap();
    file
}

fn healthy_snapshot() -> serde_json::Value {
    json!({
        "infraWiNode": [
            {"id": "1", "addr": "10.0.0.1", "health": "fully-fit"},
            {"id": "2", "addr": "10.0.0.2", "health": "fully-fit"},
            {"id": "3", "addr": "10.0.0.3", "health": "fully-fit"}
        ],
        "faultInst": [
            {"code": "F0532", "dn": "topology/pod-1/node-101/sys/phys-[eth1/7]/fault-F0532"}
        ],
        "firmwareCtrlrRunning": [
            {"node": "1", "version": "5.2(3g)"},
            {"node": "2", "version": "5.2(3g)"},
            {"node": "3", "version": "5.2(3g)"}
        ]
    })
}

fn config(snapshot: &NamedTempFile, current: &str, target: &str) -> PrecheckConfig {
    PrecheckConfig {
        current_version: Some(current.to_string()),
        target_version: Some(target.to_string()),
        snapshot: Some(snapshot.path().to_path_buf()),
        ..Default::default()
    }
}

#[test]
fn test_healthy_fabric() {
    let file = snapshot_file(healthy_snapshot());
    let report = run_prechecks(config(&file, "5.2(3g)", "6.0(2h)")).unwrap();

    assert_eq!(report.len(), 8);
    for id in ["UPG-001", "UPG-002", "FLT-001", "FLT-002", "FLT-003"] {
        assert_eq!(report.get(id).unwrap().kind(), ResultKind::Pass, "{}", id);
    }
    assert_eq!(report.get("UPG-003").unwrap().kind(), ResultKind::NotApplicable);
    assert_eq!(report.ids_with_kind(ResultKind::ManualReviewRequired), vec!["MAN-001", "MAN-002"]);
    assert!(report.timed_out().is_empty());
    assert_eq!(report.name("FLT-001"), Some("Controller Cluster Health"));
    assert_eq!(exit_code(&report.summary()), 2);
}

#[test]
fn test_blocked_upgrade() {
    let mut snapshot = healthy_snapshot();
    snapshot["faultInst"] = json!([{"code": "F0101", "dn": "topology/pod-1/node-2/sys/ch/fault-F0101"}]);
    snapshot["infraWiNode"][1]["health"] = json!("data-layer-partially-diverged");
    let file = snapshot_file(snapshot);

    let report = run_prechecks(config(&file, "5.2(3g)", "6.0(2h)")).unwrap();
    assert_eq!(report.get("FLT-001").unwrap().kind(), ResultKind::FailOrchestrator);
    assert_eq!(report.get("FLT-002").unwrap().kind(), ResultKind::FailUpgradeFailure);
    assert!(report.has_failures());
    assert_eq!(exit_code(&report.summary()), 1);
}

#[test]
fn test_unknown_target_gates_version_checks() {
    let file = snapshot_file(healthy_snapshot());
    let report = run_prechecks(PrecheckConfig {
        current_version: Some("5.2(3g)".to_string()),
        snapshot: Some(file.path().to_path_buf()),
        ..Default::default()
    })
    .unwrap();

    for id in ["UPG-001", "UPG-002", "UPG-003"] {
        assert_eq!(report.get(id).unwrap().kind(), ResultKind::ManualReviewRequired, "{}", id);
    }
    assert_eq!(report.get("FLT-003").unwrap().kind(), ResultKind::Pass);
}

#[test]
fn test_no_inventory_source_yields_errors() {
    let report = run_prechecks(PrecheckConfig {
        only_checks: vec!["FLT-001".to_string(), "UPG-001".to_string()],
        ..Default::default()
    })
    .unwrap();
    assert_eq!(report.len(), 2);
    assert_eq!(report.get("FLT-001").unwrap().kind(), ResultKind::Error);
    assert_eq!(report.get("UPG-001").unwrap().kind(), ResultKind::ManualReviewRequired);
}

#[test]
fn test_unreadable_snapshot_is_config_error() {
    let file = snapshot_file(json!(["not", "an", "object"]));
    let result = run_prechecks(config(&file, "5.2(3g)", "6.0(2h)"));
    assert!(matches!(result, Err(PrecheckError::Snapshot(_))));

    let missing = PrecheckConfig {
        snapshot: Some(std::path::PathBuf::from("/nonexistent/inventory.json")),
        ..Default::default()
    };
    assert!(matches!(run_prechecks(missing), Err(PrecheckError::Snapshot(_))));
}
