//! Upgrade advisories.
//!
//! Embedded tables of fault codes that block an upgrade and of known defect
//! windows keyed on the current/target version pair. Version bounds are kept
//! as strings and parsed by the check that consumes them, so a bad entry
//! surfaces as that check's error rather than a crash at load time.

/// Fault code that must be cleared before upgrading
#[derive(Debug, Clone)]
pub struct BlockingFault {
    pub code: &'static str,
    pub description: &'static str,
    pub resolution: &'static str,
}

/// Defect hit when upgrading from an affected range to a new enough target
#[derive(Debug, Clone)]
pub struct DefectWindow {
    pub defect_id: &'static str,
    /// First affected current version (inclusive)
    pub affected_from: &'static str,
    /// First current version carrying the fix (exclusive upper bound)
    pub fixed_in: &'static str,
    /// Targets at or above this version trigger the defect
    pub target_from: &'static str,
    pub description: &'static str,
}

/// Embedded advisory tables
#[derive(Debug)]
pub struct Advisories {
    pub blocking_faults: Vec<BlockingFault>,
    pub defect_windows: Vec<DefectWindow>,
}

impl Advisories {
    /// Load the embedded advisory tables
    pub fn load() -> Self {
        Advisories {
            blocking_faults: vec![
                BlockingFault {
                    code: "F0101",
                    description: "Controller cluster member unreachable",
                    resolution: "Restore connectivity to every controller before upgrading",
                },
                BlockingFault {
                    code: "F1527",
                    description: "Controller storage utilization above 75%",
                    resolution: "Free space on the flagged partition",
                },
                BlockingFault {
                    code: "F2109",
                    description: "Switch decommission in progress",
                    resolution: "Wait for decommission to finish or recommission the switch",
                },
                BlockingFault {
                    code: "F0467",
                    description: "Deployed configuration invalid",
                    resolution: "Correct the rejected configuration before upgrading",
                },
            ],
            defect_windows: vec![
                DefectWindow {
                    defect_id: "DEF-0412",
                    affected_from: "4.2(1a)",
                    fixed_in: "4.2(7m)",
                    target_from: "5.2(1a)",
                    description: "Policy database conversion stalls during upgrade",
                },
                DefectWindow {
                    defect_id: "DEF-0538",
                    affected_from: "5.1(1a)",
                    fixed_in: "5.2(3e)",
                    target_from: "6.0(1a)",
                    description: "Certificate chain rejected after controller reload",
                },
            ],
        }
    }

    /// Look up a blocking fault by code
    pub fn blocking_fault(&self, code: &str) -> Option<&BlockingFault> {
        self.blocking_faults.iter().find(|f| f.code == code)
    }
}
