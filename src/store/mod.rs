//! Hot and archive tier store contracts

pub mod memory;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One listed dashboard in either tier
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardEntry {
    pub name: String,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

impl DashboardEntry {
    pub fn new(name: impl Into<String>, last_modified: DateTime<Utc>, size: u64) -> Self {
        Self {
            name: name.into(),
            last_modified,
            size,
        }
    }
}

/// Which of the two tiers a store serves
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Hot,
    Archive,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Hot => write!(f, "hot"),
            Tier::Archive => write!(f, "archive"),
        }
    }
}

/// The live-rendering tier
///
/// A missing entry is `Ok(None)` from [`get_body`](HotStore::get_body);
/// errors are reserved for transport or permission failures.
#[async_trait]
pub trait HotStore: Send + Sync {
    /// Full inventory, every page included
    async fn list(&self) -> Result<Vec<DashboardEntry>>;

    async fn get_body(&self, name: &str) -> Result<Option<String>>;

    /// Create or overwrite
    async fn put_body(&self, name: &str, body: &str) -> Result<()>;

    async fn delete(&self, name: &str) -> Result<()>;
}

/// The durable archive tier
#[async_trait]
pub trait ArchiveStore: Send + Sync {
    /// Full inventory, every page included
    async fn list(&self) -> Result<Vec<DashboardEntry>>;

    async fn get_body(&self, name: &str) -> Result<Option<String>>;

    /// Create or overwrite
    async fn put_body(&self, name: &str, body: &str) -> Result<()>;

    /// Remove the entry including every historical version
    async fn delete(&self, name: &str) -> Result<()>;
}
