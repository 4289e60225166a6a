//! Tier-migration actions and the state machine that performs them

use std::fmt;

use error_stack::ResultExt;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LifecycleError, Result};
use crate::store::{ArchiveStore, HotStore};

/// Intent to move one dashboard between tiers, or to run a reconciliation pass
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// Copy the hot body into the archive; hot is left in place.
    Enable {
        #[serde(rename = "dashboardName")]
        dashboard_name: String,
    },
    /// Take the dashboard out of archive management, keeping it hot.
    Disable {
        #[serde(rename = "dashboardName")]
        dashboard_name: String,
    },
    /// Bring an archived dashboard back into the hot tier.
    Activate {
        #[serde(rename = "dashboardName")]
        dashboard_name: String,
    },
    /// Archive the hot body and remove it from the hot tier.
    Deactivate {
        #[serde(rename = "dashboardName")]
        dashboard_name: String,
    },
    /// Remove the archive copy and all of its versions.
    Delete {
        #[serde(rename = "dashboardName")]
        dashboard_name: String,
    },
    /// Periodic reconciliation tick
    ScheduledJob,
}

impl Action {
    pub fn enable(name: impl Into<String>) -> Self {
        Action::Enable {
            dashboard_name: name.into(),
        }
    }

    pub fn disable(name: impl Into<String>) -> Self {
        Action::Disable {
            dashboard_name: name.into(),
        }
    }

    pub fn activate(name: impl Into<String>) -> Self {
        Action::Activate {
            dashboard_name: name.into(),
        }
    }

    pub fn deactivate(name: impl Into<String>) -> Self {
        Action::Deactivate {
            dashboard_name: name.into(),
        }
    }

    pub fn delete(name: impl Into<String>) -> Self {
        Action::Delete {
            dashboard_name: name.into(),
        }
    }

    /// Target dashboard, `None` for [`Action::ScheduledJob`]
    pub fn dashboard_name(&self) -> Option<&str> {
        match self {
            Action::Enable { dashboard_name }
            | Action::Disable { dashboard_name }
            | Action::Activate { dashboard_name }
            | Action::Deactivate { dashboard_name }
            | Action::Delete { dashboard_name } => Some(dashboard_name),
            Action::ScheduledJob => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Enable { .. } => "Enable",
            Action::Disable { .. } => "Disable",
            Action::Activate { .. } => "Activate",
            Action::Deactivate { .. } => "Deactivate",
            Action::Delete { .. } => "Delete",
            Action::ScheduledJob => "ScheduledJob",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dashboard_name() {
            Some(name) => write!(f, "{} '{}'", self.kind(), name),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// Performs tier transitions against the two stores.
///
/// Preconditions are not checked here: a transition whose source body is
/// missing does nothing for that step, so a tier that changed since the
/// snapshot was taken never causes a failure.
pub struct TierMover<'a> {
    hot: &'a dyn HotStore,
    archive: &'a dyn ArchiveStore,
}

impl<'a> TierMover<'a> {
    pub fn new(hot: &'a dyn HotStore, archive: &'a dyn ArchiveStore) -> Self {
        Self { hot, archive }
    }

    /// Run a single-dashboard transition.
    ///
    /// [`Action::ScheduledJob`] is not a tier transition and is ignored here.
    pub async fn transition(&self, action: &Action) -> Result<()> {
        let result = match action {
            Action::Enable { dashboard_name } => self.hot_to_archive(dashboard_name).await,
            Action::Disable { dashboard_name } => {
                self.archive_to_hot(dashboard_name).await?;
                self.archive.delete(dashboard_name).await
            }
            Action::Deactivate { dashboard_name } => {
                self.hot_to_archive(dashboard_name).await?;
                self.hot.delete(dashboard_name).await
            }
            Action::Activate { dashboard_name } => self.archive_to_hot(dashboard_name).await,
            Action::Delete { dashboard_name } => self.archive.delete(dashboard_name).await,
            Action::ScheduledJob => Ok(()),
        };
        result.change_context_lazy(|| LifecycleError::Store(format!("{action} failed")))
    }

    /// Copy the hot body into the archive when it exists
    pub async fn hot_to_archive(&self, name: &str) -> Result<()> {
        match self.hot.get_body(name).await? {
            Some(body) => self.archive.put_body(name, &body).await,
            None => {
                debug!(dashboard = name, "no hot body to archive");
                Ok(())
            }
        }
    }

    /// Bring hot and archive in line.
    ///
    /// With both present the archive is refreshed from hot; with only the
    /// archive present the hot tier is restored from it.
    pub async fn archive_to_hot(&self, name: &str) -> Result<()> {
        let (hot, archive) =
            futures::try_join!(self.hot.get_body(name), self.archive.get_body(name))?;
        match (hot, archive) {
            (Some(hot), Some(_)) => self.archive.put_body(name, &hot).await,
            (None, Some(archive)) => self.hot.put_body(name, &archive).await,
            (_, None) => {
                debug!(dashboard = name, "no archive body to restore");
                Ok(())
            }
        }
    }
}
