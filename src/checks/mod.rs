//! Built-in precheck modules.
//!
//! Checks are organized by how they run:
//! - Upgrade: pure version comparisons between current and target
//! - Faults: inventory queries, executed in parallel under the run deadline
//! - Manual: items that always need a human
//!
//! # Graceful Degradation
//!
//! Checks return `Err(CheckError)` instead of panicking; the dispatcher
//! turns errors into ERROR results and a missing version into
//! MANUAL_REVIEW_REQUIRED. No check ever defaults an unknown version.

pub mod faults;
pub mod manual;
pub mod upgrade;

use crate::engine::dispatcher::RegisteredCheck;

/// Create all registered checks with their execution functions
pub fn create_all_checks() -> Vec<RegisteredCheck> {
    let mut checks = Vec::new();
    checks.extend(upgrade::get_upgrade_checks());
    checks.extend(faults::get_fault_checks());
    checks.extend(manual::get_manual_checks());
    checks
}
