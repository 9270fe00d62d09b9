//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: backend wiring (identity service, stores, authenticator)
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request DTOs
//! - `errors.rs`: error → response mapping

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(wiring: services::Wiring) -> Router {
    let services = Arc::new(wiring.services);
    let authenticator = Arc::new(wiring.authenticator);

    // Protected routes: every request is authenticated before guards run.
    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        authenticator,
        middleware::auth_middleware,
    ));

    Router::new()
        .route("/health", get(routes::system::health))
        .nest("/auth", routes::auth::router())
        .merge(protected)
        .layer(ServiceBuilder::new().layer(Extension(services)))
}
