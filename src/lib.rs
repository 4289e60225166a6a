//! Lifecycle management for dashboards kept across a hot tier and an archive tier.
//!
//! A list of [`Rule`](rule::Rule)s decides, per dashboard, whether it may be
//! archived, re-activated, deleted or expired after a TTL. The
//! [`DashboardManager`](manager::DashboardManager) derives a snapshot per
//! dashboard from both store inventories and executes the tier migrations
//! that bring the stores in line with the rules.

pub mod action;
pub mod error;
pub mod manager;
pub mod presets;
pub mod redirect;
pub mod rule;
pub mod snapshot;
pub mod store;
pub mod time;

pub use error::{LifecycleError, Result};

pub mod prelude {
    pub use crate::action::*;
    pub use crate::error::*;
    pub use crate::manager::*;
    pub use crate::presets::*;
    pub use crate::redirect::*;
    pub use crate::rule::*;
    pub use crate::snapshot::*;
    pub use crate::store::memory::{MemoryArchiveStore, MemoryHotStore};
    pub use crate::store::*;
    pub use crate::time::*;
}
