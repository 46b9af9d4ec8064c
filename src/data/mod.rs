//! Data module for fabric-precheck
//!
//! Contains the canonical train order and the upgrade advisory tables.

pub mod advisories;
pub mod trains;
