//! Structured fabric release versions.
//!
//! Versions look like `5.2(3g)`: train `5`, release `2`, maintenance `3`,
//! patch `g`. Patches may carry a numeric suffix (`4.2(7a1)`). Switch images
//! report the same grammar behind an `n9000-` prefix, which is accepted and
//! dropped.
//!
//! Ordering consults the canonical train table first, so `11.x` sorts after
//! `4.x` and an unknown train is rejected instead of guessed.

use crate::data::trains;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:n9000-)?(\d+)\.(\d+)\((\d+)([a-z])(\d+)?\)$").expect("version pattern is valid")
});

/// Version parse failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("malformed version string '{0}'")]
    Malformed(String),

    #[error("unknown release train '{train}' in '{input}'")]
    UnknownTrain { train: String, input: String },

    #[error("numeric field out of range in '{0}'")]
    OutOfRange(String),
}

/// Patch suffix: a letter plus an optional number (`g`, `a1`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Patch {
    pub letter: char,
    pub number: Option<u32>,
}

impl Patch {
    pub fn new(letter: char, number: Option<u32>) -> Self {
        Patch { letter, number }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter)?;
        if let Some(n) = self.number {
            write!(f, "{}", n)?;
        }
        Ok(())
    }
}

/// A parsed fabric version.
///
/// Field order matters: the derived ordering compares train position, then
/// release, maintenance, and patch. An absent patch sorts before any patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VersionId {
    train_index: usize,
    release: u32,
    maintenance: u32,
    patch: Option<Patch>,
}

impl VersionId {
    /// Parse a version string such as `5.2(3g)` or `n9000-15.2(3e)`.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let input = raw.trim();
        let caps = VERSION_RE
            .captures(input)
            .ok_or_else(|| VersionError::Malformed(raw.to_string()))?;

        let train = &caps[1];
        let train_index = trains::train_index(train).ok_or_else(|| VersionError::UnknownTrain {
            train: train.to_string(),
            input: raw.to_string(),
        })?;

        let number = |s: &str| -> Result<u32, VersionError> {
            s.parse().map_err(|_| VersionError::OutOfRange(raw.to_string()))
        };

        let letter = caps[4].chars().next().ok_or_else(|| VersionError::Malformed(raw.to_string()))?;
        let suffix = caps.get(5).map(|m| number(m.as_str())).transpose()?;

        Ok(VersionId {
            train_index,
            release: number(&caps[2])?,
            maintenance: number(&caps[3])?,
            patch: Some(Patch::new(letter, suffix)),
        })
    }

    /// Build a version from its parts. Unlike [`VersionId::parse`], the patch
    /// may be omitted, which is how release-level thresholds are expressed.
    pub fn from_parts(
        train: &str,
        release: u32,
        maintenance: u32,
        patch: Option<Patch>,
    ) -> Result<Self, VersionError> {
        let train_index = trains::train_index(train).ok_or_else(|| VersionError::UnknownTrain {
            train: train.to_string(),
            input: format!("{}.{}({})", train, release, maintenance),
        })?;
        Ok(VersionId {
            train_index,
            release,
            maintenance,
            patch,
        })
    }

    pub fn train(&self) -> &'static str {
        // train_index only ever comes from a successful table lookup
        trains::train_label(self.train_index).unwrap_or("?")
    }

    pub fn release(&self) -> u32 {
        self.release
    }

    pub fn maintenance(&self) -> u32 {
        self.maintenance
    }

    pub fn patch(&self) -> Option<Patch> {
        self.patch
    }

    /// Three-way comparison; identical to [`Ord::cmp`].
    pub fn compare(&self, other: &VersionId) -> Ordering {
        self.cmp(other)
    }

    /// True when `lower <= self < upper_exclusive`.
    pub fn in_range(&self, lower: &VersionId, upper_exclusive: &VersionId) -> bool {
        lower <= self && self < upper_exclusive
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({}", self.train(), self.release, self.maintenance)?;
        if let Some(patch) = self.patch {
            write!(f, "{}", patch)?;
        }
        write!(f, ")")
    }
}

impl FromStr for VersionId {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionId::parse(s)
    }
}

impl Serialize for VersionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
