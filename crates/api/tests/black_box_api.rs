use reqwest::StatusCode;
use serde_json::{Value, json};

use rollcall_api::app::{build_app, services::InMemoryBackend};
use rollcall_auth::{ProfileStore, UserMetadata};
use rollcall_core::{Profile, ResetStatus, Role, UserId};
use rollcall_infra::{NewStudent, Operation, StudentStore};

struct TestServer {
    base_url: String,
    backend: InMemoryBackend,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod, in-memory backend, ephemeral port.
        let backend = InMemoryBackend::new(b"test-secret");
        let app = build_app(backend.wire("http://localhost:5173"));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            backend,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Create an identity user with a profile row and return (id, token).
    async fn seed_user(&self, email: &str, role: Role) -> (UserId, String) {
        let user = self.backend.identity.create_user(
            email,
            "pw",
            UserMetadata::new(email.to_uppercase(), role),
            true,
        );
        self.backend
            .profiles
            .insert_profile(Profile::default_for(user.id.clone(), email, Some("Seeded"), Some(role)))
            .await
            .unwrap();
        let session = self.backend.identity.issue_session(&user.id).unwrap();
        (user.id, session.access_token)
    }

    async fn seed_student(&self, email: &str, roll: &str) -> String {
        self.backend
            .students
            .insert(NewStudent {
                full_name: "Sam Student".into(),
                email: email.into(),
                roll_number: roll.into(),
                grade: "7".into(),
            })
            .await
            .unwrap()
            .id
            .to_string()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn new_student_body(email: &str, roll: &str) -> Value {
    json!({
        "full_name": "New Student",
        "email": email,
        "roll_number": roll,
        "grade": "5",
    })
}

#[tokio::test]
async fn health_is_public() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn missing_token_is_401_with_login_hint() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client.get(srv.url("/students")).send().await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "No token provided");
    assert_eq!(body["message"], "Please login to continue");
}

#[tokio::test]
async fn invalid_token_is_401() {
    let srv = TestServer::spawn().await;

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or expired token");
    assert_eq!(body["message"], "Please login again");
}

#[tokio::test]
async fn valid_token_without_profile_is_403() {
    let srv = TestServer::spawn().await;
    let user = srv
        .backend
        .identity
        .create_user("ghost@school.test", "pw", UserMetadata::default(), true);
    let token = srv.backend.identity.issue_session(&user.id).unwrap().access_token;

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Profile not found");
    assert_eq!(body["message"], "User profile does not exist. Please contact admin.");
}

#[tokio::test]
async fn profile_store_outage_is_403_without_detail() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.seed_user("t@school.test", Role::Teacher).await;
    srv.backend.profiles.set_unavailable(true);

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Profile error");
    assert!(!body.to_string().contains("unavailable"));
}

#[tokio::test]
async fn whoami_reports_resolved_principal() {
    let srv = TestServer::spawn().await;
    let (id, token) = srv.seed_user("a@school.test", Role::Admin).await;

    let client = reqwest::Client::new();
    let body: Value = client
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["user"]["id"], id.as_str());
    assert_eq!(body["user"]["role"], "admin");
    assert_eq!(body["user"]["fullName"], "Seeded");
}

#[tokio::test]
async fn concurrent_student_posts_are_forbidden_and_store_untouched() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.seed_user("s@school.test", Role::Student).await;

    let client = reqwest::Client::new();
    let post = |email: &'static str, roll: &'static str| {
        client
            .post(srv.url("/students"))
            .bearer_auth(&token)
            .json(&new_student_body(email, roll))
            .send()
    };
    let (a, b) = tokio::join!(post("x@school.test", "R1"), post("y@school.test", "R2"));

    for res in [a.unwrap(), b.unwrap()] {
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Access denied");
        assert_eq!(
            body["message"],
            "This action requires one of these roles: admin, teacher. Your role: student"
        );
    }
    assert!(srv.backend.students.is_empty());
}

#[tokio::test]
async fn student_lifecycle_follows_role_policy() {
    let srv = TestServer::spawn().await;
    let (_, teacher) = srv.seed_user("t@school.test", Role::Teacher).await;
    let (_, admin) = srv.seed_user("a@school.test", Role::Admin).await;
    let (_, student) = srv.seed_user("s@school.test", Role::Student).await;
    let client = reqwest::Client::new();

    // Teacher creates.
    let res = client
        .post(srv.url("/students"))
        .bearer_auth(&teacher)
        .json(&new_student_body("kid@school.test", "R-100"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created: Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    // Student reads.
    let res = client
        .get(srv.url("/students"))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let list: Value = res.json().await.unwrap();
    assert_eq!(list.as_array().unwrap().len(), 1);

    // Teacher updates the grade.
    let res = client
        .put(srv.url(&format!("/students/{id}")))
        .bearer_auth(&teacher)
        .json(&json!({ "grade": "6" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["grade"], "6");

    // Teacher may not delete.
    let res = client
        .delete(srv.url(&format!("/students/{id}")))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(srv.backend.students.len(), 1);

    // Admin deletes.
    let res = client
        .delete(srv.url(&format!("/students/{id}")))
        .bearer_auth(&admin)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Student deleted successfully");
    assert_eq!(body["student"]["id"], id.as_str());
    assert!(srv.backend.students.is_empty());
}

#[tokio::test]
async fn duplicate_student_is_400() {
    let srv = TestServer::spawn().await;
    let (_, admin) = srv.seed_user("a@school.test", Role::Admin).await;
    srv.seed_student("kid@school.test", "R-1").await;

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/students"))
        .bearer_auth(&admin)
        .json(&new_student_body("kid@school.test", "R-2"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Email or Roll Number already exists");
}

#[tokio::test]
async fn missing_student_is_400() {
    let srv = TestServer::spawn().await;
    let (_, teacher) = srv.seed_user("t@school.test", Role::Teacher).await;

    let client = reqwest::Client::new();
    let res = client
        .get(srv.url("/students/does-not-exist"))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Record not found");
}

#[tokio::test]
async fn self_service_route_enforces_ownership() {
    let srv = TestServer::spawn().await;
    let (own_id, student) = srv.seed_user("s@school.test", Role::Student).await;
    let (_, teacher) = srv.seed_user("t@school.test", Role::Teacher).await;
    let record = srv.seed_student("kid@school.test", "R-1").await;
    let client = reqwest::Client::new();

    let res = client
        .get(srv.url(&format!("/students/me/{record}")))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["message"], "You can only access your own resources");

    // Own id passes the guard (no student row carries it, so the store says so).
    let res = client
        .get(srv.url(&format!("/students/me/{own_id}")))
        .bearer_auth(&student)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Staff pass ownership checks for any id.
    let res = client
        .get(srv.url(&format!("/students/me/{record}")))
        .bearer_auth(&teacher)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_login_me_logout_round() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({
            "email": "new@school.test",
            "password": "hunter22",
            "fullName": "New Teacher",
            "role": "teacher",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["user_metadata"]["role"], "teacher");
    // No profile row at registration time.
    assert!(srv.backend.profiles.is_empty());

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "new@school.test", "password": "hunter22" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let token = body["session"]["access_token"].as_str().unwrap().to_string();

    let res = client
        .get(srv.url("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user"]["email"], "new@school.test");

    let res = client
        .post(srv.url("/auth/logout"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(srv.url("/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn auth_endpoints_report_failures_as_400() {
    let srv = TestServer::spawn().await;
    srv.seed_user("s@school.test", Role::Student).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/login"))
        .json(&json!({ "email": "s@school.test", "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid login credentials");

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "s@school.test", "password": "pw", "role": "student" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/auth/register"))
        .json(&json!({ "email": "x@school.test", "password": "pw", "role": "principal" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Logging out without a token has nothing to revoke.
    let res = client.post(srv.url("/auth/logout")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn forgot_password_logs_one_entry_per_attempt() {
    let srv = TestServer::spawn().await;
    let (id, _) = srv.seed_user("s@school.test", Role::Student).await;
    let client = reqwest::Client::new();

    // Known email: requested, linked to the profile.
    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "s@school.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Password reset email sent");

    let entries = srv.backend.reset_log.entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].status, ResetStatus::Requested);
    assert_eq!(entries[0].user_id, Some(id));

    // Unknown email: still sent, no user link.
    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "nobody@school.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let entries = srv.backend.reset_log.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[1].user_id, None);
    assert_eq!(entries[1].status, ResetStatus::Requested);

    // Identity service failure: failed entry, 400.
    srv.backend.identity.inject_failure(Operation::ResetPassword);
    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "s@school.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let entries = srv.backend.reset_log.entries();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[2].status, ResetStatus::Failed);
    assert_eq!(entries[2].user_id, None);
    assert_eq!(entries[2].email, "s@school.test");
}

#[tokio::test]
async fn forgot_password_without_email_is_rejected_unlogged() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for body in [json!({}), json!({ "email": "   " })] {
        let res = client
            .post(srv.url("/auth/forgot-password"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "Email is required");
    }
    assert!(srv.backend.reset_log.entries().is_empty());
}

#[tokio::test]
async fn reset_log_outage_does_not_fail_the_request() {
    let srv = TestServer::spawn().await;
    srv.backend.reset_log.set_unavailable(true);

    let client = reqwest::Client::new();
    let res = client
        .post(srv.url("/auth/forgot-password"))
        .json(&json!({ "email": "s@school.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn forgot_password_without_json_body_asks_for_email() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/auth/forgot-password"))
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_eq!(res.headers()["content-type"], "application/json");
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Email is required");
    assert!(srv.backend.reset_log.entries().is_empty());
}

#[tokio::test]
async fn malformed_json_is_a_json_400() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    for path in ["/auth/forgot-password", "/auth/login", "/auth/register"] {
        let res = client
            .post(srv.url(path))
            .header("content-type", "application/json")
            .body("{\"email\": ")
            .send()
            .await
            .unwrap();

        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{path}");
        assert_eq!(res.headers()["content-type"], "application/json", "{path}");
        let body: Value = res.json().await.unwrap();
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()), "{path}");
    }
    assert!(srv.backend.reset_log.entries().is_empty());
}

#[tokio::test]
async fn incomplete_student_body_is_a_json_400() {
    let srv = TestServer::spawn().await;
    let (_, teacher) = srv.seed_user("t@school.test", Role::Teacher).await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/students"))
        .bearer_auth(&teacher)
        .json(&json!({ "email": "half@school.test" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].as_str().is_some_and(|e| e.contains("full_name")));

    let res = client
        .post(srv.url("/students"))
        .bearer_auth(&teacher)
        .body("grade=5")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert!(body["error"].is_string());

    assert!(srv.backend.students.list().await.unwrap().is_empty());
}
