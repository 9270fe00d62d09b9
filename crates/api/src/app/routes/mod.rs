use axum::{Router, routing::get};

pub mod auth;
pub mod students;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/students", students::router())
}
