//! In-memory tier stores for tests and local runs

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use error_stack::Report;
use parking_lot::Mutex;

use crate::error::{LifecycleError, Result};
use crate::store::{ArchiveStore, DashboardEntry, HotStore, Tier};

#[derive(Clone, Debug)]
struct StoredBody {
    body: String,
    last_modified: DateTime<Utc>,
}

impl StoredBody {
    fn entry(&self, name: &str) -> DashboardEntry {
        DashboardEntry::new(name, self.last_modified, self.body.len() as u64)
    }
}

/// Simulated transport errors, for the whole store or for single names
#[derive(Debug, Default)]
struct FailureSwitch {
    all: AtomicBool,
    names: Mutex<BTreeSet<String>>,
}

impl FailureSwitch {
    fn check(&self, tier: Tier, op: &str, name: Option<&str>) -> Result<()> {
        if self.all.load(Ordering::Relaxed) {
            return Err(Report::new(LifecycleError::Store(format!(
                "{tier} store unavailable during {op}"
            ))));
        }
        if let Some(name) = name.filter(|name| self.names.lock().contains(*name)) {
            return Err(Report::new(LifecycleError::Store(format!(
                "{tier} store rejected {op} of '{name}'"
            ))));
        }
        Ok(())
    }

    fn set_all(&self, failing: bool) {
        self.all.store(failing, Ordering::Relaxed);
    }

    fn set_name(&self, name: &str, failing: bool) {
        let mut names = self.names.lock();
        if failing {
            names.insert(name.to_string());
        } else {
            names.remove(name);
        }
    }
}

/// In-memory hot tier
#[derive(Debug, Default)]
pub struct MemoryHotStore {
    dashboards: DashMap<String, StoredBody>,
    failing: FailureSwitch,
}

impl MemoryHotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry with an explicit modification time
    pub fn insert_at(&self, name: &str, body: &str, last_modified: DateTime<Utc>) {
        self.dashboards.insert(
            name.to_string(),
            StoredBody {
                body: body.to_string(),
                last_modified,
            },
        );
    }

    pub fn body(&self, name: &str) -> Option<String> {
        self.dashboards.get(name).map(|b| b.body.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dashboards.contains_key(name)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set_all(failing);
    }

    /// Make every call that targets `name` fail
    pub fn set_failing_for(&self, name: &str, failing: bool) {
        self.failing.set_name(name, failing);
    }
}

#[async_trait]
impl HotStore for MemoryHotStore {
    async fn list(&self) -> Result<Vec<DashboardEntry>> {
        self.failing.check(Tier::Hot, "list", None)?;
        Ok(self
            .dashboards
            .iter()
            .map(|item| item.value().entry(item.key()))
            .collect())
    }

    async fn get_body(&self, name: &str) -> Result<Option<String>> {
        self.failing.check(Tier::Hot, "get", Some(name))?;
        Ok(self.body(name))
    }

    async fn put_body(&self, name: &str, body: &str) -> Result<()> {
        self.failing.check(Tier::Hot, "put", Some(name))?;
        self.insert_at(name, body, Utc::now());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.failing.check(Tier::Hot, "delete", Some(name))?;
        self.dashboards.remove(name);
        Ok(())
    }
}

/// In-memory archive tier keeping every written version
#[derive(Debug, Default)]
pub struct MemoryArchiveStore {
    versions: Mutex<BTreeMap<String, Vec<StoredBody>>>,
    failing: FailureSwitch,
}

impl MemoryArchiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a version with an explicit modification time
    pub fn insert_at(&self, name: &str, body: &str, last_modified: DateTime<Utc>) {
        self.versions
            .lock()
            .entry(name.to_string())
            .or_default()
            .push(StoredBody {
                body: body.to_string(),
                last_modified,
            });
    }

    /// Body of the current version
    pub fn body(&self, name: &str) -> Option<String> {
        self.versions
            .lock()
            .get(name)
            .and_then(|versions| versions.last())
            .map(|v| v.body.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.versions.lock().contains_key(name)
    }

    pub fn version_count(&self, name: &str) -> usize {
        self.versions.lock().get(name).map_or(0, Vec::len)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.set_all(failing);
    }

    /// Make every call that targets `name` fail
    pub fn set_failing_for(&self, name: &str, failing: bool) {
        self.failing.set_name(name, failing);
    }
}

#[async_trait]
impl ArchiveStore for MemoryArchiveStore {
    async fn list(&self) -> Result<Vec<DashboardEntry>> {
        self.failing.check(Tier::Archive, "list", None)?;
        Ok(self
            .versions
            .lock()
            .iter()
            .filter_map(|(name, versions)| versions.last().map(|v| v.entry(name)))
            .collect())
    }

    async fn get_body(&self, name: &str) -> Result<Option<String>> {
        self.failing.check(Tier::Archive, "get", Some(name))?;
        Ok(self.body(name))
    }

    async fn put_body(&self, name: &str, body: &str) -> Result<()> {
        self.failing.check(Tier::Archive, "put", Some(name))?;
        self.insert_at(name, body, Utc::now());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.failing.check(Tier::Archive, "delete", Some(name))?;
        self.versions.lock().remove(name);
        Ok(())
    }
}
