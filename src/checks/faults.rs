//! Inventory-backed checks.
//!
//! Each of these queries the controller inventory, so they run on the task
//! runner under the run deadline.

use crate::data::advisories::Advisories;
use crate::engine::dispatcher::{CheckContext, RegisteredCheck, VersionRequirement};
use crate::fabric::api::{attr, attribute_rows};
use crate::fabric::version::VersionId;
use crate::{evidence_row, CheckError, CheckResult, ResultKind};

/// Controller cluster membership
pub const CLUSTER_RESOURCE: &str = "infraWiNode";
/// Raised faults
pub const FAULT_RESOURCE: &str = "faultInst";
/// Firmware running on each controller
pub const CONTROLLER_FIRMWARE_RESOURCE: &str = "firmwareCtrlrRunning";

/// Get all inventory checks
pub fn get_fault_checks() -> Vec<RegisteredCheck> {
    vec![create_flt001_check(), create_flt002_check(), create_flt003_check()]
}

/// FLT-001: Controller Cluster Health
fn create_flt001_check() -> RegisteredCheck {
    RegisteredCheck::query("FLT-001", "Controller Cluster Health", run_flt001)
        .with_description("Every controller cluster member must be fully fit")
}

/// FLT-002: Upgrade-Blocking Faults
fn create_flt002_check() -> RegisteredCheck {
    RegisteredCheck::query("FLT-002", "Upgrade-Blocking Faults", run_flt002)
        .with_description("Look for raised faults known to break the upgrade")
}

/// FLT-003: Controller Firmware Consistency
fn create_flt003_check() -> RegisteredCheck {
    RegisteredCheck::query("FLT-003", "Controller Firmware Consistency", run_flt003)
        .with_description("Every controller must run the declared current version")
        .requires(VersionRequirement::Current)
}

/// Execute FLT-001: Controller Cluster Health
pub fn run_flt001(ctx: &CheckContext) -> Result<CheckResult, CheckError> {
    let value = ctx.api().query(CLUSTER_RESOURCE)?;
    let nodes = attribute_rows(CLUSTER_RESOURCE, &value)?;
    if nodes.is_empty() {
        return Err(CheckError::Other("inventory returned no controller cluster members".to_string()));
    }

    let rows: Vec<_> = nodes
        .iter()
        .filter(|node| attr(node, "health") != "fully-fit")
        .map(|node| evidence_row([attr(node, "id"), attr(node, "addr"), attr(node, "health")]))
        .collect();

    if rows.is_empty() {
        return Ok(CheckResult::pass());
    }
    Ok(CheckResult::with_rows(ResultKind::FailOrchestrator, rows).with_headers(["Controller", "Address", "Health"]))
}

/// Execute FLT-002: Upgrade-Blocking Faults
pub fn run_flt002(ctx: &CheckContext) -> Result<CheckResult, CheckError> {
    let value = ctx.api().query(FAULT_RESOURCE)?;
    let faults = attribute_rows(FAULT_RESOURCE, &value)?;
    let advisories = Advisories::load();

    let rows: Vec<_> = faults
        .iter()
        .filter_map(|fault| {
            let known = advisories.blocking_fault(attr(fault, "code"))?;
            Some(evidence_row([known.code, attr(fault, "dn"), known.description, known.resolution]))
        })
        .collect();

    if rows.is_empty() {
        return Ok(CheckResult::pass());
    }
    Ok(CheckResult::with_rows(ResultKind::FailUpgradeFailure, rows)
        .with_headers(["Fault", "Affected Object", "Description", "Resolution"]))
}

/// Execute FLT-003: Controller Firmware Consistency
///
/// A controller reporting an unparseable version makes the whole check an
/// error; guessing its position would hide exactly the mismatch this looks for.
pub fn run_flt003(ctx: &CheckContext) -> Result<CheckResult, CheckError> {
    let current = ctx.require_current()?;
    let value = ctx.api().query(CONTROLLER_FIRMWARE_RESOURCE)?;
    let controllers = attribute_rows(CONTROLLER_FIRMWARE_RESOURCE, &value)?;

    let mut rows = Vec::new();
    for controller in &controllers {
        let running = VersionId::parse(attr(controller, "version"))?;
        if running != *current {
            rows.push(evidence_row([
                attr(controller, "node").to_string(),
                running.to_string(),
                current.to_string(),
            ]));
        }
    }

    if rows.is_empty() {
        return Ok(CheckResult::pass());
    }
    Ok(CheckResult::with_rows(ResultKind::FailUpgradeFailure, rows)
        .with_headers(["Controller", "Running", "Expected"]))
}
