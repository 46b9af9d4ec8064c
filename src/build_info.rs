//! Build metadata.
//!
//! Provides the crate version plus the git commit, build date, and rustc
//! version captured by `build.rs`.

use serde::Serialize;
use std::fmt;

/// Build information
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub commit: Option<&'static str>,
    pub build_date: Option<&'static str>,
    pub target: &'static str,
    pub rustc_version: Option<&'static str>,
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fabric-precheck {}", self.version)?;

        if let Some(commit) = self.commit {
            writeln!(f, "Commit: {}", commit)?;
        }

        if let Some(date) = self.build_date {
            writeln!(f, "Built: {}", date)?;
        }

        write!(f, "Target: {}", self.target)?;

        if let Some(rustc) = self.rustc_version {
            write!(f, "\nRustc: {}", rustc)?;
        }

        Ok(())
    }
}

/// Get build information
pub fn get_build_info() -> BuildInfo {
    BuildInfo {
        version: env!("CARGO_PKG_VERSION"),
        commit: option_env!("FABRIC_PRECHECK_GIT_HASH"),
        build_date: option_env!("FABRIC_PRECHECK_BUILD_DATE"),
        target: env!("FABRIC_PRECHECK_TARGET"),
        rustc_version: option_env!("FABRIC_PRECHECK_RUSTC_VERSION"),
    }
}
