//! Tier storage backends

pub mod sqlite;

use chrono::{DateTime, Utc};
use error_stack::Report;
use ondemand::LifecycleError;
use ondemand::store::Tier;

/// Wrap a backend failure as a store error of `tier`
fn store_error(tier: Tier, op: &str, name: Option<&str>) -> LifecycleError {
    match name {
        Some(name) => LifecycleError::Store(format!("{tier} store {op} failed for '{name}'")),
        None => LifecycleError::Store(format!("{tier} store {op} failed")),
    }
}

fn parse_timestamp(tier: Tier, raw: &str) -> ondemand::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| {
            Report::new(LifecycleError::Store(format!(
                "{tier} store holds an invalid timestamp '{raw}': {e}"
            )))
        })
}
