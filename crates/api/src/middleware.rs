use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use rollcall_auth::Authenticator;

use crate::app::errors::ApiError;

/// Authenticate the request and attach the resolved `Principal`.
///
/// Requests that fail authentication never reach a handler.
pub async fn auth_middleware(
    State(authenticator): State<Arc<Authenticator>>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let path = req.uri().path().to_string();
    let authorization = authorization_header(req.headers()).map(str::to_owned);

    match authenticator.authenticate(authorization.as_deref()).await {
        Ok(principal) => {
            tracing::debug!(%path, user_id = %principal.id, role = %principal.role, "authenticated");
            req.extensions_mut().insert(principal);
            next.run(req).await
        }
        Err(err) => {
            tracing::info!(%path, error = %err, "request rejected by authenticator");
            ApiError(err).into_response()
        }
    }
}

/// Raw `Authorization` header value; a non-UTF-8 value counts as absent.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}
