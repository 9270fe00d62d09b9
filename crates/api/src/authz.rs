//! Route-level guard layers.
//!
//! A [`Guard`] is attached per method route, so each verb on a path can
//! carry its own policy. The layer runs after routing (path parameters are
//! matched) and after the auth middleware (the `Principal` is attached).

use std::collections::HashMap;

use axum::{
    Extension,
    extract::{Path, Request, State},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::MethodRouter,
};

use rollcall_auth::{Guard, Principal};

use crate::app::errors::ApiError;

/// Wrap a method route with a guard.
pub fn guarded(route: MethodRouter, guard: Guard) -> MethodRouter {
    route.route_layer(from_fn_with_state(guard, enforce))
}

async fn enforce(
    State(guard): State<Guard>,
    principal: Option<Extension<Principal>>,
    params: Option<Path<HashMap<String, String>>>,
    req: Request,
    next: Next,
) -> Response {
    let principal = principal.map(|Extension(p)| p);
    let params = params.map(|Path(p)| p).unwrap_or_default();

    match guard.check(principal.as_ref(), &params) {
        Ok(()) => next.run(req).await,
        Err(err) => {
            tracing::info!(path = %req.uri().path(), guard = ?guard, "request rejected by guard");
            ApiError(err).into_response()
        }
    }
}
