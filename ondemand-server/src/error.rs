//! Error types for the server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use error_stack::Report;
use ondemand::LifecycleError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Not Found")]
    NotFound,

    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Lifecycle error: {0}")]
    Lifecycle(Report<LifecycleError>),
}

impl From<Report<LifecycleError>> for ServerError {
    fn from(report: Report<LifecycleError>) -> Self {
        ServerError::Lifecycle(report)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServerError::NotFound => StatusCode::NOT_FOUND,
            ServerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::Lifecycle(report) => {
                error!(error = ?report, "request failed");
                match report.current_context() {
                    LifecycleError::Config(_) => StatusCode::BAD_REQUEST,
                    LifecycleError::Store(_) | LifecycleError::Reconcile { .. } => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                }
            }
        };

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
