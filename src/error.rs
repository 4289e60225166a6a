//! Error types shared by the lifecycle core

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// A store call failed for a reason other than "not found".
    #[error("store error: {0}")]
    Store(String),

    /// Rule configuration could not be parsed or is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A reconciliation pass finished but some dashboards failed.
    #[error("reconciliation failed for {failed} dashboard(s)")]
    Reconcile { failed: usize },
}

pub type Result<T> = std::result::Result<T, error_stack::Report<LifecycleError>>;
