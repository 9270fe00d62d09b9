//! Public `/auth/*` endpoints: thin wrappers over the identity service plus
//! the password-reset audit trail.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, rejection::JsonRejection},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde_json::json;

use rollcall_auth::{SignUp, UserMetadata, extract_bearer};
use rollcall_core::{PasswordResetLogEntry, Role, UserId};

use crate::app::{dto, errors, services::AppServices};
use crate::middleware::authorization_header;

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route("/forgot-password", post(forgot_password))
}

pub async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    dto::JsonBody(body): dto::JsonBody<dto::RegisterRequest>,
) -> Response {
    let role = match body.role.as_deref().map(str::parse::<Role>).transpose() {
        Ok(role) => role.unwrap_or_default(),
        Err(e) => return errors::bad_request(e.to_string()),
    };

    let request = SignUp {
        email: body.email,
        password: body.password,
        metadata: UserMetadata::new(body.full_name.unwrap_or_default(), role),
        redirect_to: services.login_redirect(),
    };

    match services.identity.sign_up(request).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, %role, "user registered");
            (StatusCode::OK, Json(json!({ "success": true, "user": user }))).into_response()
        }
        Err(e) => {
            tracing::info!(error = %e, "registration rejected");
            errors::bad_request(e.to_string())
        }
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    dto::JsonBody(body): dto::JsonBody<dto::LoginRequest>,
) -> Response {
    match services
        .identity
        .sign_in_with_password(&body.email, &body.password)
        .await
    {
        Ok(session) => {
            tracing::info!(user_id = %session.user.id, "user signed in");
            (StatusCode::OK, Json(json!({ "success": true, "session": session }))).into_response()
        }
        Err(e) => {
            tracing::info!(error = %e, "sign-in rejected");
            errors::bad_request(e.to_string())
        }
    }
}

/// Revokes the presented token; without one there is nothing to end.
pub async fn logout(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> Response {
    if let Ok(token) = extract_bearer(authorization_header(&headers)) {
        if let Err(e) = services.identity.revoke_token(token).await {
            tracing::warn!(error = %e, "token revocation failed");
            return errors::bad_request(e.to_string());
        }
    }
    (StatusCode::OK, Json(json!({ "success": true }))).into_response()
}

/// The identity record behind the presented token (no profile required).
pub async fn me(Extension(services): Extension<Arc<AppServices>>, headers: HeaderMap) -> Response {
    let token = match extract_bearer(authorization_header(&headers)) {
        Ok(token) => token,
        Err(e) => return errors::bad_request(e.label()),
    };

    match services.identity.validate_token(token).await {
        Ok(user) => (StatusCode::OK, Json(json!({ "user": user }))).into_response(),
        Err(e) => errors::bad_request(e.to_string()),
    }
}

/// Request a password-reset email. Every attempt with an email leaves
/// exactly one audit entry, whether or not sending succeeded.
pub async fn forgot_password(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::ForgotPasswordRequest>, JsonRejection>,
) -> Response {
    let body = match body {
        Ok(Json(body)) => body,
        // A form posted without a JSON body reads as an empty one.
        Err(JsonRejection::MissingJsonContentType(_)) => dto::ForgotPasswordRequest::default(),
        Err(rejection) => return errors::bad_request(rejection.body_text()),
    };

    let email = match body.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => return errors::bad_request("Email is required"),
    };

    // Sending is never gated on a match; callers cannot tell whether an account exists.
    let user_id = lookup_profile_id(&services, &email).await;

    let redirect = services.reset_password_redirect();
    match services
        .identity
        .reset_password_for_email(&email, &redirect)
        .await
    {
        Ok(()) => {
            record_attempt(
                &services,
                PasswordResetLogEntry::requested(user_id, email.as_str(), Utc::now()),
            )
            .await;
            (
                StatusCode::OK,
                Json(json!({ "success": true, "message": "Password reset email sent" })),
            )
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "password reset request failed");
            record_attempt(
                &services,
                PasswordResetLogEntry::failed(email.as_str(), Utc::now()),
            )
            .await;
            errors::bad_request(e.to_string())
        }
    }
}

async fn lookup_profile_id(services: &AppServices, email: &str) -> Option<UserId> {
    match services.profiles.find_profile_id_by_email(email).await {
        Ok(found) => found,
        Err(e) => {
            tracing::warn!(error = %e, "profile lookup for password reset failed");
            None
        }
    }
}

/// Audit append failures are logged, never surfaced to the caller.
async fn record_attempt(services: &AppServices, entry: PasswordResetLogEntry) {
    let status = entry.status;
    match services.reset_log.append(entry).await {
        Ok(()) => tracing::info!(status = status.as_str(), "password reset attempt logged"),
        Err(e) => tracing::error!(error = %e, status = status.as_str(), "failed to log password reset attempt"),
    }
}
