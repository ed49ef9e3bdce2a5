//! API integration tests.
//!
//! These tests drive the full `/api` application, including the auth
//! middleware, against a mock database.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use cozum_api::{AppState, app};
use cozum_common::{IdGenerator, LocalStorage, SharedStorage, config::AuthConfig};
use cozum_core::{
    AccountService, AuthService, CategoryService, CommentService, MediaConfig, MediaService,
    ReportService, TeamService, TokenType, UserService, hash_password,
};
use cozum_db::{
    entities::user::{self, Role},
    repositories::{
        CategoryRepository, CommentRepository, MediaRepository, ReportRepository, TeamRepository,
        UserRepository,
    },
    test_utils,
};
use sea_orm::{DatabaseBackend, DatabaseConnection, DbErr, MockDatabase, Value};
use serde_json::Value as Json;
use tower::ServiceExt;

const SERVER_URL: &str = "https://cozum.example.com";

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "integration-test-secret".to_string(),
        access_token_minutes: 60,
        refresh_token_days: 1,
    }
}

/// Build the application over `db` with storage in a fresh temp directory.
fn create_app(db: DatabaseConnection) -> Router {
    let db = Arc::new(db);
    let dir = std::env::temp_dir().join(format!("cozum-api-{}", IdGenerator::new().generate()));
    let storage: SharedStorage = Arc::new(LocalStorage::new(dir, "/media".to_string()));

    let user_repo = UserRepository::new(Arc::clone(&db));
    let team_repo = TeamRepository::new(Arc::clone(&db));
    let category_repo = CategoryRepository::new(Arc::clone(&db));
    let report_repo = ReportRepository::new(Arc::clone(&db));
    let media_repo = MediaRepository::new(Arc::clone(&db));
    let comment_repo = CommentRepository::new(Arc::clone(&db));

    let auth = AuthService::new(&auth_config()).unwrap();
    let comment_service = CommentService::new(
        comment_repo.clone(),
        report_repo.clone(),
        user_repo.clone(),
        team_repo.clone(),
    );

    let state = AppState {
        account_service: AccountService::new(user_repo.clone(), team_repo.clone(), auth),
        user_service: UserService::new(user_repo.clone(), team_repo.clone()),
        category_service: CategoryService::new(category_repo.clone()),
        team_service: TeamService::new(team_repo.clone(), user_repo.clone()),
        report_service: ReportService::new(
            report_repo,
            user_repo,
            category_repo,
            team_repo,
            media_repo,
            comment_repo,
            comment_service.clone(),
            Arc::clone(&storage),
            MediaService::new(MediaConfig::default()),
        ),
        comment_service,
        storage,
        db,
        server_url: SERVER_URL.to_string(),
    };

    app(state)
}

fn mock() -> MockDatabase {
    MockDatabase::new(DatabaseBackend::Postgres)
}

fn access_token(user: &user::Model) -> String {
    AuthService::new(&auth_config())
        .unwrap()
        .issue(user, TokenType::Access)
        .unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("GET")
        .header(header::HOST, "cozum.example.com");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: &Json) -> Request<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

const BOUNDARY: &str = "cozum-test-boundary";

/// One part of a multipart form: a text field, or a file when `file_name` is set.
struct Part<'a> {
    name: &'a str,
    file_name: Option<&'a str>,
    data: &'a [u8],
}

impl<'a> Part<'a> {
    fn text(name: &'a str, value: &'a str) -> Self {
        Self {
            name,
            file_name: None,
            data: value.as_bytes(),
        }
    }

    fn file(name: &'a str, file_name: &'a str, data: &'a [u8]) -> Self {
        Self {
            name,
            file_name: Some(file_name),
            data,
        }
    }
}

fn post_multipart(uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part.file_name {
            Some(file_name) => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
            None => body.extend_from_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                )
                .as_bytes(),
            ),
        }
        body.extend_from_slice(part.data);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .uri(uri)
        .method("POST")
        .header(header::HOST, "cozum.example.com")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body))
        .unwrap()
}

/// Bytes that carry a JPEG signature but do not decode.
const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

async fn body_json(response: Response) -> Json {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_reports_service_and_storage() {
    let app = create_app(mock().into_connection());

    let response = app.oneshot(get("/api/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["service"], "cozum-var-backend");
    assert_eq!(body["storage"]["backend"], "local");
    assert!(body["status"] == "healthy" || body["status"] == "degraded");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = create_app(mock().into_connection());

    let response = app.oneshot(get("/api/categories", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_garbage_token_is_invalid() {
    let app = create_app(mock().into_connection());

    let response = app
        .oneshot(get("/api/categories", Some("not-a-jwt")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_token_for_deleted_user_is_invalid() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(get("/api/auth/me", Some(&access_token(&citizen))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_list_categories_with_and_without_trailing_slash() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let token = access_token(&citizen);

    for uri in ["/api/categories", "/api/categories/"] {
        let db = mock()
            .append_query_results([vec![citizen.clone()]])
            .append_query_results([vec![
                test_utils::category("c1", "Roads"),
                test_utils::category("c2", "Water"),
            ]])
            .into_connection();
        let app = create_app(db);

        let response = app.oneshot(get(uri, Some(&token))).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK, "{uri}");
        let body = body_json(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Roads", "Water"]);
    }
}

#[tokio::test]
async fn test_citizen_cannot_create_category() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_json(
            "/api/categories",
            Some(&access_token(&citizen)),
            &serde_json::json!({ "name": "Parks" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_staff_creates_category() {
    let admin = test_utils::staff("admin");
    let db = mock()
        .append_query_results([vec![admin.clone()]])
        .append_query_results([vec![test_utils::category("c9", "Parks")]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_json(
            "/api/categories",
            Some(&access_token(&admin)),
            &serde_json::json!({ "name": "Parks", "description": "Green spaces" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["name"], "Parks");
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn test_citizen_cannot_list_users() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(get("/api/users", Some(&access_token(&citizen))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
}

#[tokio::test]
async fn test_login_unknown_email() {
    let db = mock()
        .append_query_results([Vec::<user::Model>::new()])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            None,
            &serde_json::json!({ "email": "nobody@example.com", "password": "whatever" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");
}

#[tokio::test]
async fn test_login_issues_token_pair() {
    let mut citizen = test_utils::user("u1", Role::Citizen);
    citizen.password_hash = hash_password("correct horse").unwrap();
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .append_query_results([vec![citizen.clone()]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_json(
            "/api/auth/login",
            None,
            &serde_json::json!({ "email": "u1@example.com", "password": "correct horse" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert!(body["access"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh"].as_str().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn test_register_password_mismatch() {
    let app = create_app(mock().into_connection());

    let response = app
        .oneshot(post_json(
            "/api/auth/register",
            None,
            &serde_json::json!({
                "email": "new@example.com",
                "username": "newbie",
                "password": "longenough1",
                "password_confirm": "different1",
                "first_name": "New",
                "last_name": "Citizen"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_citizen_lists_own_reports_with_absolute_media_urls() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .append_query_results([vec![test_utils::report("r1", "u1", "c1")]])
        .append_query_results([vec![test_utils::media("m1", "r1")]])
        .append_query_results([vec![BTreeMap::from([
            ("report_id", Value::from("r1")),
            ("count", Value::BigInt(Some(2))),
        ])]])
        .append_query_results([vec![citizen.clone()]])
        .append_query_results([vec![test_utils::category("c1", "Roads")]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(get("/api/reports", Some(&access_token(&citizen))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let reports = body.as_array().unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0]["id"], "r1");
    assert_eq!(reports[0]["media_count"], 1);
    assert_eq!(reports[0]["comment_count"], 2);
    assert_eq!(
        reports[0]["first_media_url"],
        "https://cozum.example.com/media/reports/2025/06/01/r1/photo.jpg"
    );
    assert_eq!(reports[0]["reporter"]["username"], "u1");
    assert_eq!(reports[0]["category"]["id"], "c1");
    assert_eq!(reports[0]["category"]["name"], "Roads");
    assert!(reports[0]["assigned_team"].is_null());
}

#[tokio::test]
async fn test_report_not_found() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .append_query_results([Vec::<cozum_db::entities::report::Model>::new()])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(get("/api/reports/missing", Some(&access_token(&citizen))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_endpoint_returns_404() {
    let app = create_app(mock().into_connection());

    let response = app
        .oneshot(get("/api/nonexistent/endpoint", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_token_check_database_failure_is_server_error() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_errors([DbErr::Custom("connection reset".to_string())])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(get("/api/auth/me", Some(&access_token(&citizen))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "DATABASE_ERROR");
}

#[tokio::test]
async fn test_citizen_files_report_with_photo() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let mut report = test_utils::report("r1", "u1", "c1");
    report.latitude = Some(41.0082);
    report.longitude = Some(28.9784);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .append_query_results([vec![test_utils::category("c1", "Roads")]])
        .append_query_results([vec![report]])
        .append_query_results([vec![test_utils::media("m1", "r1")]])
        .append_query_results([vec![citizen.clone()]])
        .append_query_results([vec![test_utils::category("c1", "Roads")]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_multipart(
            "/api/reports",
            &access_token(&citizen),
            &[
                Part::text("title", "Pothole"),
                Part::text("description", "Deep pothole on the main road"),
                Part::text("category_id", "c1"),
                Part::text("latitude", "41.0082"),
                Part::text("longitude", " 28.9784 "),
                Part::file("images", "pothole.jpg", FAKE_JPEG),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body["status"], "PENDING");
    assert_eq!(body["media_files"].as_array().unwrap().len(), 1);
    assert_eq!(body["category"]["name"], "Roads");
    assert_eq!(body["reporter"]["id"], "u1");
    assert_eq!(body["latitude"], 41.0082);
}

#[tokio::test]
async fn test_create_report_rejects_executable_upload() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .append_query_results([vec![test_utils::category("c1", "Roads")]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_multipart(
            "/api/reports",
            &access_token(&citizen),
            &[
                Part::text("title", "Pothole"),
                Part::text("description", "Deep pothole"),
                Part::text("category", "c1"),
                Part::file("media_files", "setup.exe", b"MZ\x90\x00"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let message = body["error"]["fields"]["media_files"][0].as_str().unwrap();
    assert!(message.contains("setup.exe"), "{message}");
}

#[tokio::test]
async fn test_create_report_requires_category() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_multipart(
            "/api/reports",
            &access_token(&citizen),
            &[
                Part::text("title", "Pothole"),
                Part::text("description", "Deep pothole"),
                Part::text("category_id", "   "),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["fields"]["category"][0], "This field is required.");
}

#[tokio::test]
async fn test_create_report_rejects_empty_file() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_multipart(
            "/api/reports",
            &access_token(&citizen),
            &[
                Part::text("title", "Pothole"),
                Part::text("category", "c1"),
                Part::file("file", "blank.jpg", b""),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"]["fields"]["media_files"][0],
        "The submitted file is empty: blank.jpg"
    );
}

#[tokio::test]
async fn test_create_report_rejects_malformed_coordinate() {
    let citizen = test_utils::user("u1", Role::Citizen);
    let db = mock()
        .append_query_results([vec![citizen.clone()]])
        .into_connection();
    let app = create_app(db);

    let response = app
        .oneshot(post_multipart(
            "/api/reports",
            &access_token(&citizen),
            &[
                Part::text("title", "Pothole"),
                Part::text("category", "c1"),
                Part::text("latitude", "north-ish"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(
        body["error"]["fields"]["latitude"][0],
        "A valid number is required."
    );
}
