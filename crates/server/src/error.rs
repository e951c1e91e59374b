use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use menuscan_core::EditError;
use menuscan_export::ExportError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Edit(#[from] EditError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Edit(e) => {
                json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_edit", e.to_string())
            }
            ApiError::Export(e @ ExportError::Unavailable(_)) => {
                json_error(StatusCode::BAD_REQUEST, "format_unavailable", e.to_string())
            }
            ApiError::Export(e) => {
                tracing::error!(error = %e, "export failed");
                json_error(StatusCode::INTERNAL_SERVER_ERROR, "export_error", e.to_string())
            }
        }
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
