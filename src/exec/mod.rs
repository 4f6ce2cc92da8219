// src/exec/mod.rs

//! Execution layer.
//!
//! - [`distributor`] owns the worker pool, the completion queue, and the
//!   driving loop that feeds completions back into the scheduler.

pub mod distributor;

pub use distributor::{Distributor, WorkRunner};
