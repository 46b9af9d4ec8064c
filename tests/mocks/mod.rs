//! Mock implementations for testing without a live controller.
//!
//! The inventory mock serves canned resources and can simulate slow or
//! failing queries per resource.


pub use inventory::*;
