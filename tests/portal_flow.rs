//! End-to-end flows against an in-process stub of the platform API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use eduportal::app::{Portal, PortalError};
use eduportal::config::PortalConfig;
use eduportal::net::http::ApiClient;
use eduportal::net::identity::HttpIdentityGateway;
use eduportal::net::platform::PlatformClient;
use eduportal::pages::{Notice, View};
use eduportal::routes::Route;
use eduportal::session::forms::Registration;
use eduportal::session::store::{AUTH_TOKEN_KEY, FileStore, SessionStore, USER_KEY, save_json};
use eduportal::session::{RestorePhase, SessionContext};
use records::{ApiResponse, Role, User, UserStatus};
use serde_json::{Value, json};
use time::macros::date;

const TEACHER_EMAIL: &str = "teacher@school.edu";
const TEACHER_PASSWORD: &str = "correct-horse";

// =============================================================================
// STUB PLATFORM
// =============================================================================

#[derive(Clone, Default)]
struct Stub {
    registrations: Arc<Mutex<Vec<Value>>>,
    logouts: Arc<AtomicUsize>,
}

type Reply = (StatusCode, Json<Value>);

fn ok(data: Value) -> Reply {
    (StatusCode::OK, Json(json!(ApiResponse::ok(data))))
}

fn unauthorized(message: &str) -> Reply {
    (StatusCode::UNAUTHORIZED, Json(json!(ApiResponse::<Value>::failure(message))))
}

fn teacher() -> Value {
    json!({
        "id": "t-1",
        "email": TEACHER_EMAIL,
        "fullName": "Tess Teacher",
        "role": "teacher",
        "status": "active"
    })
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

async fn login(Json(body): Json<Value>) -> Reply {
    if body["email"] == TEACHER_EMAIL && body["password"] == TEACHER_PASSWORD {
        ok(json!({ "user": teacher(), "token": "tok-teacher" }))
    } else {
        unauthorized("Invalid email or password")
    }
}

async fn register(State(stub): State<Stub>, Json(body): Json<Value>) -> Reply {
    stub.registrations.lock().unwrap().push(body.clone());
    let user = json!({
        "id": "s-new",
        "email": body["email"],
        "fullName": body["fullName"],
        "role": body["role"],
        "status": body["status"]
    });
    ok(json!({ "user": user, "token": "tok-new" }))
}

async fn me(headers: HeaderMap) -> Reply {
    match bearer(&headers) {
        Some("tok-teacher") => ok(teacher()),
        _ => unauthorized("Invalid token"),
    }
}

async fn logout(State(stub): State<Stub>) -> Reply {
    stub.logouts.fetch_add(1, Ordering::SeqCst);
    (StatusCode::OK, Json(json!({ "success": true })))
}

async fn classes(headers: HeaderMap) -> Reply {
    if bearer(&headers) != Some("tok-teacher") {
        return unauthorized("Invalid token");
    }
    ok(json!({
        "data": [
            { "id": "c2", "title": "Physics Lab", "teacherName": "Tess Teacher", "date": "2025-01-16", "startTime": "14:00", "status": "scheduled" },
            { "id": "c1", "title": "Algebra", "teacherName": "Tess Teacher", "date": "2025-01-16", "startTime": "09:00", "status": "live" }
        ],
        "total": 2, "page": 1, "limit": 10, "totalPages": 1
    }))
}

async fn spawn_stub(stub: Stub) -> String {
    let router = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/me", get(me))
        .route("/api/auth/logout", post(logout))
        .route("/api/classes", get(classes))
        .with_state(stub);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, router).await.unwrap() });
    format!("http://{addr}/api")
}

fn portal(base_url: &str, state_dir: &std::path::Path) -> Portal {
    let config = PortalConfig::for_base_url(base_url, state_dir).unwrap();
    let api = ApiClient::new(&config).unwrap();
    let session = SessionContext::new(
        Arc::new(HttpIdentityGateway::new(api.clone())),
        Arc::new(FileStore::new(config.session_file())),
    );
    Portal::new(session, PlatformClient::new(api), date!(2025 - 01 - 15))
}

fn session_store(state_dir: &std::path::Path) -> FileStore {
    FileStore::new(state_dir.join("session.json"))
}

// =============================================================================
// FLOWS
// =============================================================================

#[tokio::test]
async fn teacher_login_persists_and_survives_a_new_process() {
    let base = spawn_stub(Stub::default()).await;
    let dir = tempfile::tempdir().unwrap();

    let mut first = portal(&base, dir.path());
    let target = first
        .login(TEACHER_EMAIL, TEACHER_PASSWORD, true, Some("/classes"))
        .await
        .unwrap();
    assert_eq!(target, "/classes");

    let page = first.open(&target).await;
    let View::Classes(view) = &page.view else { panic!("expected classes, got {:?}", page.view) };
    let ids: Vec<&str> = view.classes.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(ids, vec!["c1", "c2"]);
    assert!(view.can_create);
    assert_eq!(session_store(dir.path()).get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("tok-teacher"));

    let mut second = portal(&base, dir.path());
    let page = second.open("/admin").await;
    assert_eq!(page.route, Route::Unauthorized);
    assert_eq!(second.session().phase(), RestorePhase::Verified);
    assert_eq!(second.session().user().map(|u| u.role), Some(Role::Teacher));
}

#[tokio::test]
async fn rejected_login_surfaces_platform_message() {
    let base = spawn_stub(Stub::default()).await;
    let dir = tempfile::tempdir().unwrap();
    let mut portal = portal(&base, dir.path());

    let err = portal
        .login(TEACHER_EMAIL, "wrong-password", false, None)
        .await
        .unwrap_err();

    match err {
        PortalError::Auth(failure) => assert_eq!(failure.message, "Invalid email or password"),
        other => panic!("expected auth failure, got {other:?}"),
    }
    assert!(session_store(dir.path()).get(AUTH_TOKEN_KEY).unwrap().is_none());
}

#[tokio::test]
async fn new_student_is_registered_pending_and_sees_pending_notice() {
    let stub = Stub::default();
    let base = spawn_stub(stub.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let mut portal = portal(&base, dir.path());

    let registration = Registration {
        email: "sam@school.edu".to_owned(),
        password: "long-enough".to_owned(),
        full_name: "Sam Student".to_owned(),
        role: Some(Role::Student),
        ..Registration::default()
    };
    let target = portal.register(registration).await.unwrap();
    let page = portal.open(&target).await;

    assert_eq!(page.view, View::Notice(Notice::PendingApproval));
    let sent = stub.registrations.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["role"], "student");
    assert_eq!(sent[0]["status"], "pending");
}

#[tokio::test]
async fn revoked_token_clears_storage_and_redirects_to_login() {
    let base = spawn_stub(Stub::default()).await;
    let dir = tempfile::tempdir().unwrap();

    let stale = User {
        id: "t-1".to_owned(),
        email: TEACHER_EMAIL.to_owned(),
        full_name: "Tess Teacher".to_owned(),
        role: Role::Teacher,
        status: UserStatus::Active,
        profile_data: serde_json::Map::new(),
        created_at: String::new(),
        updated_at: String::new(),
        last_login_at: None,
    };
    let store = session_store(dir.path());
    store.set(AUTH_TOKEN_KEY, "revoked").unwrap();
    save_json(&store, USER_KEY, &stale).unwrap();

    let mut portal = portal(&base, dir.path());
    let page = portal.open("/classes").await;

    assert_eq!(page.route, Route::Login);
    let View::Login(view) = &page.view else { panic!("expected login, got {:?}", page.view) };
    assert_eq!(view.from.as_deref(), Some("/classes"));
    assert_eq!(portal.session().phase(), RestorePhase::Invalid);
    assert!(store.get(AUTH_TOKEN_KEY).unwrap().is_none());
    assert!(store.get(USER_KEY).unwrap().is_none());
}

#[tokio::test]
async fn logout_reaches_platform_and_clears_session_file() {
    let stub = Stub::default();
    let base = spawn_stub(stub.clone()).await;
    let dir = tempfile::tempdir().unwrap();

    let mut portal = portal(&base, dir.path());
    portal
        .login(TEACHER_EMAIL, TEACHER_PASSWORD, false, None)
        .await
        .unwrap();
    portal.logout().await;

    assert_eq!(stub.logouts.load(Ordering::SeqCst), 1);
    assert!(session_store(dir.path()).get(AUTH_TOKEN_KEY).unwrap().is_none());

    let mut fresh = self::portal(&base, dir.path());
    assert!(fresh.whoami().await.is_none());
}
