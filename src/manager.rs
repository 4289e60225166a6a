//! Reconciliation engine: derives snapshots, applies policy, executes actions

use std::sync::Arc;

use chrono::{DateTime, Utc};
use error_stack::Report;
use futures::future::join_all;
use tracing::{debug, error, info};

use crate::action::{Action, TierMover};
use crate::error::{LifecycleError, Result};
use crate::rule::Rule;
use crate::snapshot::{DashboardSnapshot, LiveState, derive_snapshots};
use crate::store::{ArchiveStore, HotStore};

/// Default name of the on-demand admin dashboard
pub const DEFAULT_ON_DEMAND_NAME: &str = "OnDemandDashboardAdmin";

/// Process-wide policy configuration, fixed at startup
#[derive(Clone, Debug)]
pub struct ManagerContext {
    pub rules: Vec<Rule>,
    pub on_demand_name: String,
    pub default_rule: Rule,
}

impl ManagerContext {
    pub fn new(rules: Vec<Rule>, on_demand_name: impl Into<String>) -> Self {
        Self {
            rules,
            on_demand_name: on_demand_name.into(),
            default_rule: Rule::builtin(),
        }
    }
}

impl Default for ManagerContext {
    fn default() -> Self {
        Self::new(Vec::new(), DEFAULT_ON_DEMAND_NAME)
    }
}

/// Decide the corrective action for one snapshot, if any.
///
/// Checked in order: forced enable, forced disable, TTL expiry.
pub fn plan_reconciliation(snapshot: &DashboardSnapshot, now: DateTime<Utc>) -> Option<Action> {
    let name = &snapshot.dashboard_name;
    if snapshot.is_forced_enabled && snapshot.live_state == LiveState::Disabled {
        return Some(Action::enable(name.clone()));
    }
    if snapshot.is_forced_disabled && snapshot.live_state != LiveState::Disabled {
        return Some(Action::disable(name.clone()));
    }
    match snapshot.deactivate_at {
        Some(deadline) if deadline < now => Some(Action::deactivate(name.clone())),
        _ => None,
    }
}

/// Lifecycle manager over a hot store and an archive store
pub struct DashboardManager {
    context: ManagerContext,
    hot: Arc<dyn HotStore>,
    archive: Arc<dyn ArchiveStore>,
}

impl DashboardManager {
    pub fn new(
        context: ManagerContext,
        hot: Arc<dyn HotStore>,
        archive: Arc<dyn ArchiveStore>,
    ) -> Self {
        Self {
            context,
            hot,
            archive,
        }
    }

    pub fn context(&self) -> &ManagerContext {
        &self.context
    }

    fn mover(&self) -> TierMover<'_> {
        TierMover::new(self.hot.as_ref(), self.archive.as_ref())
    }

    /// Fetch both inventories and derive the sorted snapshot list
    pub async fn get_info(&self) -> Result<Vec<DashboardSnapshot>> {
        let (hot, archive) = futures::try_join!(self.hot.list(), self.archive.list())?;
        debug!(
            hot = hot.len(),
            archive = archive.len(),
            "loaded tier inventories"
        );
        Ok(derive_snapshots(
            &hot,
            &archive,
            &self.context.rules,
            &self.context.default_rule,
            &self.context.on_demand_name,
        ))
    }

    /// Snapshot list that reflects any policy correction it triggered.
    ///
    /// Applies rules once; if anything changed, inventories are re-read a
    /// single time.
    pub async fn get_stable_info(&self) -> Result<Vec<DashboardSnapshot>> {
        let info = self.get_info().await?;
        if !self.apply_rules(&info, Utc::now()).await? {
            return Ok(info);
        }
        self.get_info().await
    }

    /// Apply forced-policy and TTL transitions to every snapshot.
    ///
    /// Dashboards are handled concurrently and independently; a failing
    /// dashboard does not stop the others. Returns whether any action fired,
    /// or an error counting the dashboards whose action failed.
    pub async fn apply_rules(
        &self,
        snapshots: &[DashboardSnapshot],
        now: DateTime<Utc>,
    ) -> Result<bool> {
        if snapshots.is_empty() {
            return Ok(false);
        }

        let planned: Vec<Action> = snapshots
            .iter()
            .filter_map(|snapshot| plan_reconciliation(snapshot, now))
            .collect();
        if planned.is_empty() {
            return Ok(false);
        }

        let outcomes = join_all(planned.iter().map(|action| self.transition(action))).await;
        let failed = outcomes.iter().filter(|outcome| outcome.is_err()).count();

        info!(actions = planned.len(), failed, "Applied rules");
        if failed > 0 {
            return Err(Report::new(LifecycleError::Reconcile { failed }));
        }
        Ok(true)
    }

    /// Execute a user or scheduler action and wait for its store effects
    pub async fn execute(&self, action: &Action) -> Result<()> {
        match action {
            Action::ScheduledJob => {
                info!(action = %action, "Execute Action");
                let info = self.get_info().await?;
                self.apply_rules(&info, Utc::now()).await?;
                Ok(())
            }
            _ => self.transition(action).await,
        }
    }

    async fn transition(&self, action: &Action) -> Result<()> {
        info!(action = %action, "Execute Action");
        self.mover().transition(action).await.inspect_err(|report| {
            error!(action = %action, error = ?report, "action failed");
        })
    }
}
