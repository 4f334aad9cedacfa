//! Error types for the HTTP server.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Server error type.
///
/// Every resolution branch terminates in one of these or a 200; there is
/// no other error surface toward the client.
#[derive(Debug, thiserror::Error)]
pub(crate) enum ServerError {
    /// No servable content at the request path.
    #[error("route not found: {0}")]
    RouteNotFound(String),

    /// Internal failure (directory-tree lookup miss during indexing).
    #[error("internal server error")]
    Internal,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::RouteNotFound(path) => (
                StatusCode::NOT_FOUND,
                json!({
                    "message": format!("Route GET:{path} not found"),
                    "error": "Not Found",
                }),
            ),
            Self::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "message": "Error 500 - Internal Server Error",
                    "error": "Internal Server Error",
                }),
            ),
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_body_shape() {
        let response = ServerError::RouteNotFound("/missing".to_owned()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = tokio_test::block_on(axum::body::to_bytes(response.into_body(), usize::MAX))
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Route GET:/missing not found");
        assert_eq!(value["error"], "Not Found");
    }

    #[test]
    fn test_internal_body_shape() {
        let response = ServerError::Internal.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = tokio_test::block_on(axum::body::to_bytes(response.into_body(), usize::MAX))
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["message"], "Error 500 - Internal Server Error");
        assert_eq!(value["error"], "Internal Server Error");
    }
}
