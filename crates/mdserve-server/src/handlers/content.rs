//! Dynamic content handler.
//!
//! Catch-all GET handler feeding the content resolver and mapping its
//! outcomes onto HTTP responses.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::Response;

use mdserve_content::{RequestContext, Resolution};

use crate::error::ServerError;
use crate::state::AppState;

/// Handle a content request.
pub(crate) async fn serve_content(
    State(state): State<Arc<AppState>>,
    req: Request<Body>,
) -> Result<Response, ServerError> {
    let path = req.uri().path().to_owned();
    if req.method() != Method::GET {
        return Err(ServerError::RouteNotFound(path));
    }

    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost")
        .to_owned();
    let ctx = RequestContext {
        scheme: &state.scheme,
        host: &host,
    };

    let resolution = state.resolver.resolve(&path, &ctx).map_err(|error| {
        tracing::error!(path = %path, %error, "Directory indexing failed");
        ServerError::Internal
    })?;

    match resolution {
        Resolution::NotFound => Err(ServerError::RouteNotFound(path)),
        Resolution::Page { html, disposition } => {
            Ok(build_response("text/html", disposition, Body::from(html)))
        }
        Resolution::Body {
            bytes,
            content_type,
            disposition,
        } => Ok(build_response(&content_type, disposition, Body::from(bytes))),
        Resolution::Raw {
            location,
            content_type,
            disposition,
        } => match tokio::fs::read(&location).await {
            Ok(bytes) => Ok(build_response(&content_type, disposition, Body::from(bytes))),
            Err(error) => {
                tracing::warn!(location = %location.display(), %error, "Unreadable file");
                Err(ServerError::RouteNotFound(path))
            }
        },
    }
}

fn build_response(content_type: &str, disposition: Option<String>, body: Body) -> Response {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type);
    if let Some(value) = disposition {
        builder = builder.header(header::CONTENT_DISPOSITION, value);
    }
    builder.body(body).unwrap()
}
