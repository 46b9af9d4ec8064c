//! Check execution engine.
//!
//! Provides the deadline-bounded task runner, check dispatch, and result
//! aggregation.

pub mod dispatcher;
pub mod result;
pub mod runner;
