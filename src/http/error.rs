//! Handler errors and their HTTP mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use crate::buffer::BufferError;
use crate::stock::Shortfall;
use crate::store::rpc::RpcError;
use crate::store::supabase::SupabaseError;
use crate::validate::ValidationError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Insufficient stock")]
    InsufficientStock(Vec<Shortfall>),

    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Backend error: {0}")]
    Backend(#[from] SupabaseError),
}

impl From<RpcError> for AppError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::InsufficientStock(shortfalls) => AppError::InsufficientStock(shortfalls),
            RpcError::Backend(inner) => AppError::Backend(inner),
        }
    }
}

impl From<BufferError> for AppError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Full { .. } | BufferError::FlushInProgress => AppError::Conflict(err.to_string()),
            BufferError::NotFound(_) => AppError::NotFound(err.to_string()),
        }
    }
}

impl AppError {
    /// Backend failures the caller can act on keep their status; the rest become 500
    fn backend_response(err: &SupabaseError) -> (StatusCode, String) {
        let body = err.postgrest();
        let message = body
            .as_ref()
            .map(|b| b.message.clone())
            .filter(|m| !m.is_empty());

        match err.status() {
            Some(401) => (StatusCode::UNAUTHORIZED, "Session rejected by backend".to_string()),
            Some(403) => (StatusCode::FORBIDDEN, "Not permitted".to_string()),
            Some(404) => (StatusCode::NOT_FOUND, message.unwrap_or_else(|| "Not found".to_string())),
            Some(400 | 409 | 422) if message.is_some() => (
                StatusCode::UNPROCESSABLE_ENTITY,
                message.unwrap_or_default(),
            ),
            _ => {
                error!(error = %err, "Backend call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::InsufficientStock(shortfalls) => {
                let body = serde_json::json!({
                    "error": "Insufficient stock",
                    "shortfalls": shortfalls,
                });
                return (StatusCode::CONFLICT, Json(body)).into_response();
            }
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg.clone()),
            AppError::UnsupportedMediaType(msg) => (StatusCode::UNSUPPORTED_MEDIA_TYPE, msg.clone()),
            AppError::Backend(err) => Self::backend_response(err),
        };

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_of(ValidationError::new("price", "bad").into()), StatusCode::BAD_REQUEST);
        assert_eq!(status_of(AppError::InsufficientStock(vec![])), StatusCode::CONFLICT);
        assert_eq!(
            status_of(BufferError::Full { capacity: 1 }.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(BufferError::FlushInProgress.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(BufferError::NotFound(uuid::Uuid::nil()).into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn backend_constraint_errors_surface_their_message() {
        let err = SupabaseError::Api {
            status: 409,
            body: r#"{"code":"23505","message":"duplicate key value violates unique constraint \"recipe_ingredients_menu_item_id_ingredient_id_key\""}"#.to_string(),
        };
        assert_eq!(status_of(err.into()), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn opaque_backend_failures_become_internal_errors() {
        let err = SupabaseError::Api { status: 502, body: "upstream".to_string() };
        assert_eq!(status_of(err.into()), StatusCode::INTERNAL_SERVER_ERROR);

        let err = SupabaseError::Api { status: 403, body: String::new() };
        assert_eq!(status_of(err.into()), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn shortfalls_are_returned_in_body() {
        let response = AppError::InsufficientStock(vec![Shortfall {
            ingredient_id: None,
            ingredient_name: "Flour".to_string(),
            required: Some(2.0),
            available: Some(1.0),
            unit: Some("kg".to_string()),
        }])
        .into_response();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["shortfalls"][0]["ingredient_name"], "Flour");
        assert_eq!(body["error"], "Insufficient stock");
    }
}
