//! Redirect endpoint: activate a dashboard, then send the browser to it

use std::sync::Arc;

use axum::{
    extract::State,
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use ondemand::action::Action;
use ondemand::redirect::parse_dashboard_name;
use tracing::info;

use crate::AppState;
use crate::error::{Result, ServerError};

/// Any request under the redirect base
///
/// Only `GET {base}/{name}` is served: the dashboard is activated and the
/// response is a 303 to the console. Rejections never touch a store.
pub async fn redirect(
    State(state): State<Arc<AppState>>,
    method: Method,
    uri: Uri,
) -> Result<Response> {
    if method != Method::GET {
        return Err(ServerError::MethodNotAllowed);
    }
    let name = parse_dashboard_name(uri.path(), &state.config.redirect_base)
        .ok_or(ServerError::NotFound)?;

    state.manager.execute(&Action::activate(name)).await?;

    let location = state.config.redirect_location(name);
    info!(dashboard = name, location = %location, "Redirect");
    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, location)],
        name.to_string(),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use tower::ServiceExt;

    use super::*;
    use crate::test_support::test_app;

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn activates_and_redirects() {
        let app = test_app("[]");
        app.archive.insert_at("my-dash", "archived", Utc::now());

        let response = app
            .router()
            .oneshot(request(Method::GET, "/dashboards/my-dash"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.ends_with("name=my-dash"));
        assert_eq!(app.hot.body("my-dash").as_deref(), Some("archived"));
        assert!(app.archive.contains("my-dash"));
    }

    #[tokio::test]
    async fn other_methods_are_rejected_without_store_access() {
        let app = test_app("[]");
        app.archive.insert_at("my-dash", "archived", Utc::now());
        app.hot.set_failing(true);
        app.archive.set_failing(true);

        let response = app
            .router()
            .oneshot(request(Method::POST, "/dashboards/my-dash"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert!(!app.hot.contains("my-dash"));
    }

    #[tokio::test]
    async fn unparsable_names_are_not_found() {
        let app = test_app("[]");
        app.hot.set_failing(true);
        app.archive.set_failing(true);

        for uri in ["/dashboards/my-dash/", "/dashboards/a/b", "/dashboards/", "/a/b", "/"] {
            let response = app.router().oneshot(request(Method::GET, uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }
}
