//! Fabric controller abstractions.
//!
//! Provides:
//! - Release version parsing and ordering
//! - Inventory API access

pub mod api;
pub mod version;
