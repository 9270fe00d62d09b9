use axum::{
    Json, async_trait,
    extract::{FromRequest, Request},
    response::Response,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use rollcall_infra::NewStudent;

use crate::app::errors;

/// `Json<T>` whose rejections use the `400 {"error": ...}` body.
#[derive(Debug)]
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => {
                tracing::debug!(status = %rejection.status(), "request body rejected");
                Err(errors::bad_request(rejection.body_text()))
            }
        }
    }
}

// -------------------------
// Auth
// -------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

impl core::fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("full_name", &self.full_name)
            .field("role", &self.role)
            .finish()
    }
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl core::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
}

// -------------------------
// Students
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateStudentRequest {
    pub full_name: String,
    pub email: String,
    pub roll_number: String,
    pub grade: String,
}

impl From<CreateStudentRequest> for NewStudent {
    fn from(body: CreateStudentRequest) -> Self {
        NewStudent {
            full_name: body.full_name,
            email: body.email,
            roll_number: body.roll_number,
            grade: body.grade,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateGradeRequest {
    pub grade: String,
}
