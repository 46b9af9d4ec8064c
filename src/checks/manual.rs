//! Checks that always need a human.
//!
//! Nothing in the inventory can answer these, so they are reported as
//! MANUAL_REVIEW_REQUIRED with guidance and never executed.

use crate::engine::dispatcher::RegisteredCheck;

/// Get all manual review checks
pub fn get_manual_checks() -> Vec<RegisteredCheck> {
    vec![
        RegisteredCheck::manual(
            "MAN-001",
            "Firmware Image Staging",
            "Confirm the target controller and switch images are uploaded to the firmware repository",
        )
        .with_description("Target images must be present before the upgrade starts"),
        RegisteredCheck::manual(
            "MAN-002",
            "Configuration Backup",
            "Export a configuration snapshot to an off-box location and verify it can be read back",
        )
        .with_description("A restorable backup must exist before upgrading"),
    ]
}
