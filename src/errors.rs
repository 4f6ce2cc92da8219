// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Cycle detected in DAG: {0}")]
    DagCycle(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdagError>;
