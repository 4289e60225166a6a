//! Dashboard lifecycle REST API handlers

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
};
use ondemand::action::Action;
use tracing::{debug, info};

use crate::AppState;
use crate::error::Result;
use crate::models::{ListQuery, SnapshotView, WidgetRequest};

/// Build the dashboard API router
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboards", get(list_dashboards))
        .route("/actions", post(execute_action))
        .route("/widget", post(widget))
}

async fn stable_views(
    state: &AppState,
    offset_minutes: Option<i64>,
) -> Result<Vec<SnapshotView>> {
    let info = state.manager.get_stable_info().await?;
    Ok(info
        .into_iter()
        .map(|snapshot| {
            let redirect_path = state.config.redirect_path(&snapshot.dashboard_name);
            SnapshotView::new(snapshot, offset_minutes, redirect_path)
        })
        .collect())
}

/// GET /api/v1/dashboards - Reconciled state of every dashboard
async fn list_dashboards(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SnapshotView>>> {
    Ok(Json(stable_views(&state, query.offset_minutes).await?))
}

/// POST /api/v1/actions - Execute an action and wait for it to complete
async fn execute_action(
    State(state): State<Arc<AppState>>,
    Json(action): Json<Action>,
) -> Result<StatusCode> {
    state.manager.execute(&action).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/widget - Run an optional action, then render when asked
async fn widget(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WidgetRequest>,
) -> Result<Json<Vec<SnapshotView>>> {
    if let Some(action) = &req.action {
        info!(action = %action, "widget action");
        state.manager.execute(action).await?;
    }
    let Some(context) = req.widget_context else {
        return Ok(Json(Vec::new()));
    };
    debug!(timezone = %context.timezone.label, "rendering widget");
    Ok(Json(
        stable_views(&state, Some(context.timezone.offset_in_minutes)).await?,
    ))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, header};
    use chrono::{TimeDelta, Utc};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::{TestApp, test_app};

    async fn call(
        app: &TestApp,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        let request = match body {
            Some(body) => request.body(Body::from(body.to_string())).unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };
        let response = app.router().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    #[tokio::test]
    async fn list_reconciles_before_answering() {
        let app = test_app(
            r#"[{"ruleName": "All Enabled", "archive": "Enabled", "matchAll": true,
            "allowActivate": true, "allowDeactivate": true, "allowDelete": true}]"#,
        );
        app.hot.insert_at("dash", "body", Utc::now());

        let (status, body) = call(&app, "GET", "/api/v1/dashboards", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["dashboardName"], "dash");
        assert_eq!(body[0]["liveState"], "Active");
        assert_eq!(body[0]["redirectPath"], "/dashboards/dash");
        assert_eq!(body[0]["deactivateAtLocal"], "");
    }

    #[tokio::test]
    async fn extreme_offsets_render_blank_deadlines() {
        let app = test_app(
            r#"[{"ruleName": "Manual", "archive": "Manual", "matchAll": true,
            "allowActivate": true, "allowDeactivate": true, "allowDelete": true,
            "ttl": 60000}]"#,
        );
        let now = Utc::now();
        app.hot.insert_at("dash", "body", now);
        app.archive.insert_at("dash", "body", now);

        let uri = "/api/v1/dashboards?offset_minutes=1000000000000";
        let (status, body) = call(&app, "GET", uri, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["deactivateAtLocal"], "");
        assert!(body[0]["deactivateAt"].is_string());
    }

    #[tokio::test]
    async fn actions_run_synchronously() {
        let app = test_app("[]");
        app.hot.insert_at("dash", "body", Utc::now());

        let (status, _) = call(
            &app,
            "POST",
            "/api/v1/actions",
            Some(json!({"type": "Deactivate", "dashboardName": "dash"})),
        )
        .await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(!app.hot.contains("dash"));
        assert_eq!(app.archive.body("dash").as_deref(), Some("body"));
    }

    #[tokio::test]
    async fn store_failures_surface_as_server_errors() {
        let app = test_app("[]");
        app.hot.set_failing(true);

        let (status, body) = call(&app, "GET", "/api/v1/dashboards", None).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn widget_without_context_renders_nothing() {
        let app = test_app("[]");
        app.archive.insert_at("dash", "body", Utc::now());

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/widget",
            Some(json!({"action": {"type": "Activate", "dashboardName": "dash"}})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
        assert!(app.hot.contains("dash"));
    }

    #[tokio::test]
    async fn widget_renders_deadline_in_viewer_timezone() {
        let app = test_app(
            r#"[{"ruleName": "Manual", "archive": "Manual", "matchAll": true,
            "allowActivate": true, "allowDeactivate": true, "allowDelete": true,
            "ttl": 86400000}]"#,
        );
        let now = Utc::now();
        app.hot.insert_at("dash", "body", now);
        app.archive.insert_at("dash", "body", now);

        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/widget",
            Some(json!({
                "widgetContext": {"timezone": {"label": "Local", "offsetInMinutes": -540}}
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let expected = (now + TimeDelta::days(1) + TimeDelta::hours(9))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        assert_eq!(body[0]["deactivateAtLocal"], expected);
        assert_eq!(body[0]["canDeactivate"], true);
    }
}
