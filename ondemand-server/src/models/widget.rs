//! Request and response shapes of the dashboard API

use ondemand::action::Action;
use ondemand::snapshot::DashboardSnapshot;
use ondemand::time::format_local;
use serde::{Deserialize, Serialize};

/// Viewer timezone reported by the widget host
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timezone {
    /// "Local" or "UTC"
    pub label: String,
    pub offset_in_minutes: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct WidgetContext {
    pub timezone: Timezone,
}

/// Widget invocation: an optional action, then a render when a context is given
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetRequest {
    pub action: Option<Action>,
    pub widget_context: Option<WidgetContext>,
}

/// Query parameters for listing dashboards
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListQuery {
    /// Viewer offset in minutes (UTC minus local)
    pub offset_minutes: Option<i64>,
}

/// A snapshot plus the columns the table view needs
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,

    /// `deactivateAt` rendered in the viewer's timezone, empty when unset
    pub deactivate_at_local: String,

    /// Link that activates the dashboard and redirects to it
    pub redirect_path: String,
}

impl SnapshotView {
    pub fn new(
        snapshot: DashboardSnapshot,
        offset_minutes: Option<i64>,
        redirect_path: String,
    ) -> Self {
        Self {
            deactivate_at_local: format_local(snapshot.deactivate_at, offset_minutes),
            snapshot,
            redirect_path,
        }
    }
}
