//! Upgrade path checks.
//!
//! Pure version comparisons between the running and target releases. None of
//! these touch the inventory.

use crate::data::advisories::Advisories;
use crate::engine::dispatcher::{CheckContext, RegisteredCheck, VersionRequirement};
use crate::fabric::version::VersionId;
use crate::{evidence_row, CheckError, CheckResult, ResultKind};

/// Get all upgrade path checks
pub fn get_upgrade_checks() -> Vec<RegisteredCheck> {
    vec![create_upg001_check(), create_upg002_check(), create_upg003_check()]
}

/// UPG-001: Target Version Sanity
fn create_upg001_check() -> RegisteredCheck {
    RegisteredCheck::pure("UPG-001", "Target Version Sanity", run_upg001)
        .with_description("Verify the target version is newer than the running version")
        .requires(VersionRequirement::Both)
}

/// UPG-002: Upgrade Path Hop
fn create_upg002_check() -> RegisteredCheck {
    RegisteredCheck::pure("UPG-002", "Upgrade Path Hop", run_upg002)
        .with_description("Detect upgrades that must stop at an intermediate release")
        .requires(VersionRequirement::Both)
}

/// UPG-003: Known Defect Window
fn create_upg003_check() -> RegisteredCheck {
    RegisteredCheck::pure("UPG-003", "Known Defect Window", run_upg003)
        .with_description("Match the upgrade path against known upgrade defects")
        .requires(VersionRequirement::Both)
}

/// Execute UPG-001: Target Version Sanity
pub fn run_upg001(ctx: &CheckContext) -> Result<CheckResult, CheckError> {
    let (current, target) = ctx.require_both()?;

    if target <= current {
        let reason = if target == current {
            "Target version is already running"
        } else {
            "Downgrades are not supported by this workflow"
        };
        return Ok(CheckResult::with_rows(
            ResultKind::FailUpgradeFailure,
            vec![evidence_row([current.to_string(), target.to_string(), reason.to_string()])],
        )
        .with_headers(["Current", "Target", "Reason"]));
    }

    Ok(CheckResult::pass())
}

/// Execute UPG-002: Upgrade Path Hop
///
/// Releases before 4.2 cannot jump straight to train 5 or later; they must
/// stop on 4.2 first.
pub fn run_upg002(ctx: &CheckContext) -> Result<CheckResult, CheckError> {
    let (current, target) = ctx.require_both()?;

    let hop = VersionId::from_parts("4", 2, 0, None)?;
    let next_train = VersionId::from_parts("5", 0, 0, None)?;

    if target < &next_train {
        return Ok(CheckResult::not_applicable());
    }
    if current < &hop {
        return Ok(CheckResult::with_rows(
            ResultKind::FailUpgradeFailure,
            vec![evidence_row([
                current.to_string(),
                target.to_string(),
                format!("Upgrade to {}.{} first", hop.train(), hop.release()),
            ])],
        )
        .with_headers(["Current", "Target", "Recommended Action"]));
    }

    Ok(CheckResult::pass())
}

/// Execute UPG-003: Known Defect Window
pub fn run_upg003(ctx: &CheckContext) -> Result<CheckResult, CheckError> {
    let (current, target) = ctx.require_both()?;
    let advisories = Advisories::load();

    let mut rows = Vec::new();
    for window in &advisories.defect_windows {
        let affected_from = VersionId::parse(window.affected_from)?;
        let fixed_in = VersionId::parse(window.fixed_in)?;
        let target_from = VersionId::parse(window.target_from)?;

        if current.in_range(&affected_from, &fixed_in) && target >= &target_from {
            rows.push(evidence_row([
                window.defect_id.to_string(),
                current.to_string(),
                target.to_string(),
                window.description.to_string(),
            ]));
        }
    }

    if rows.is_empty() {
        return Ok(CheckResult::not_applicable());
    }
    Ok(CheckResult::with_rows(ResultKind::FailOrchestrator, rows)
        .with_headers(["Defect", "Current", "Target", "Description"]))
}
