// src/dag/mod.rs

//! Work-graph capture and validation.
//!
//! - [`info`] snapshots forward/reverse adjacency from a root work item.
//! - [`validate`] runs the pre-run acyclicity check.

pub mod info;
pub mod validate;

pub use info::DagInfo;
