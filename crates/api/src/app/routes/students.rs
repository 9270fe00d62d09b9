//! Student records. Handlers are plain pass-throughs; access policy is
//! attached per verb with guard layers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;

use rollcall_auth::{Guard, Principal};
use rollcall_core::{Role, StudentId};

use crate::app::errors;
use crate::app::{dto, services::AppServices};
use crate::authz::guarded;

const READERS: [Role; 3] = [Role::Admin, Role::Teacher, Role::Student];
const EDITORS: [Role; 2] = [Role::Admin, Role::Teacher];

pub fn router() -> Router {
    Router::new()
        .route("/", guarded(get(list_students), Guard::roles(&READERS)))
        .route("/", guarded(post(create_student), Guard::roles(&EDITORS)))
        .route("/me/:id", guarded(get(get_own_record), Guard::ownership("id")))
        .route("/:id", guarded(get(get_student), Guard::roles(&READERS)))
        .route("/:id", guarded(put(update_grade), Guard::roles(&EDITORS)))
        .route("/:id", guarded(delete(delete_student), Guard::roles(&[Role::Admin])))
}

pub async fn list_students(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.students.list().await {
        Ok(students) => (StatusCode::OK, Json(students)).into_response(),
        Err(e) => errors::student_store_error(e),
    }
}

pub async fn get_student(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> Response {
    match services.students.get(&StudentId::new(id)).await {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => errors::student_store_error(e),
    }
}

/// Self-service read: the ownership guard has already matched `:id`
/// against the caller (staff pass regardless).
pub async fn get_own_record(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    tracing::debug!(user_id = %principal.id, resource_id = %id, "self-service student read");
    get_student(Extension(services), Path(id)).await
}

pub async fn create_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    dto::JsonBody(body): dto::JsonBody<dto::CreateStudentRequest>,
) -> Response {
    match services.students.insert(body.into()).await {
        Ok(student) => {
            tracing::info!(user_id = %principal.id, student_id = %student.id, "student created");
            (StatusCode::OK, Json(student)).into_response()
        }
        Err(e) => errors::student_store_error(e),
    }
}

pub async fn update_grade(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    dto::JsonBody(body): dto::JsonBody<dto::UpdateGradeRequest>,
) -> Response {
    match services
        .students
        .update_grade(&StudentId::new(id), body.grade)
        .await
    {
        Ok(student) => (StatusCode::OK, Json(student)).into_response(),
        Err(e) => errors::student_store_error(e),
    }
}

pub async fn delete_student(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Response {
    match services.students.delete(&StudentId::new(id)).await {
        Ok(student) => {
            tracing::info!(user_id = %principal.id, student_id = %student.id, "student deleted");
            (
                StatusCode::OK,
                Json(json!({
                    "message": "Student deleted successfully",
                    "student": student,
                })),
            )
                .into_response()
        }
        Err(e) => errors::student_store_error(e),
    }
}
