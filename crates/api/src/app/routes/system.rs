use axum::{Extension, Json, http::StatusCode, response::IntoResponse};

use rollcall_auth::Principal;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(serde_json::json!({ "user": principal }))
}
