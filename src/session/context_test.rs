use super::*;
use crate::session::forms::Registration;
use crate::session::store::MemoryStore;
use crate::session::test_helpers::{MockGateway, context, seeded_store, user};
use records::UserStatus;

fn stored_token(store: &MemoryStore) -> Option<String> {
    store.get(AUTH_TOKEN_KEY).unwrap()
}

// =========================================================================
// restore
// =========================================================================

#[test]
fn fresh_context_is_loading_until_restored() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    let ctx = context(&gateway, &store);

    assert_eq!(ctx.phase(), RestorePhase::Unknown);
    assert!(ctx.snapshot().loading);
}

#[tokio::test]
async fn restore_without_stored_session_is_anonymous() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    let mut ctx = context(&gateway, &store);

    assert_eq!(ctx.restore().await, RestorePhase::Anonymous);
    assert!(!ctx.is_loading());
    assert!(ctx.user().is_none());
    assert_eq!(gateway.current_user_calls(), 0);
}

#[test]
fn begin_restore_exposes_cached_user_while_loading() {
    let cached = user(Role::Teacher, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(cached.clone()));
    let store = seeded_store("tok-1", &cached);
    let mut ctx = context(&gateway, &store);

    assert_eq!(ctx.begin_restore(), RestorePhase::Optimistic);
    let snapshot = ctx.snapshot();
    assert!(snapshot.loading);
    assert_eq!(snapshot.user, Some(cached));
    assert_eq!(ctx.token(), Some("tok-1"));
    assert_eq!(gateway.current_user_calls(), 0);
}

#[tokio::test]
async fn verified_restore_replaces_cached_user_with_fresh_record() {
    let cached = user(Role::Teacher, UserStatus::Pending);
    let fresh = user(Role::Teacher, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(fresh.clone()));
    let store = seeded_store("tok-1", &cached);
    let mut ctx = context(&gateway, &store);

    assert_eq!(ctx.restore().await, RestorePhase::Verified);
    assert_eq!(ctx.user(), Some(&fresh));
    let persisted: Option<User> = load_json(store.as_ref(), USER_KEY).unwrap();
    assert_eq!(persisted, Some(fresh));
}

#[tokio::test]
async fn restoring_twice_from_same_token_yields_same_user() {
    let account = user(Role::Student, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(account.clone()));
    let store = seeded_store("tok-1", &account);

    let mut first = context(&gateway, &store);
    first.restore().await;
    let mut second = context(&gateway, &store);
    second.restore().await;

    assert_eq!(first.snapshot(), second.snapshot());
    assert_eq!(second.user(), Some(&account));
    assert_eq!(gateway.current_user_calls(), 2);
}

#[tokio::test]
async fn rejected_token_clears_storage_and_user() {
    let cached = user(Role::Parent, UserStatus::Active);
    let gateway = Arc::new(MockGateway::rejecting());
    let store = seeded_store("tok-stale", &cached);
    let mut ctx = context(&gateway, &store);

    assert_eq!(ctx.restore().await, RestorePhase::Invalid);
    assert!(ctx.user().is_none());
    assert!(ctx.token().is_none());
    assert!(store.is_empty());
    assert!(!ctx.snapshot().loading);
}

#[tokio::test]
async fn unreachable_platform_invalidates_stored_session() {
    let cached = user(Role::Parent, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(cached.clone()));
    *gateway.current_user.lock().unwrap() = Err(ApiError::Transport("connection refused".to_owned()));
    let store = seeded_store("tok-1", &cached);
    let mut ctx = context(&gateway, &store);

    assert_eq!(ctx.restore().await, RestorePhase::Invalid);
    assert!(store.is_empty());
}

#[test]
fn corrupt_stored_user_clears_storage() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "tok-1").unwrap();
    store.set(USER_KEY, "{ not json").unwrap();
    let mut ctx = context(&gateway, &store);

    assert_eq!(ctx.begin_restore(), RestorePhase::Anonymous);
    assert!(store.is_empty());
}

#[test]
fn token_without_user_clears_storage() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    store.set(AUTH_TOKEN_KEY, "tok-1").unwrap();
    let mut ctx = context(&gateway, &store);

    assert_eq!(ctx.begin_restore(), RestorePhase::Anonymous);
    assert_eq!(stored_token(&store), None);
}

#[tokio::test]
async fn finish_restore_is_a_no_op_outside_optimistic_phase() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    let mut ctx = context(&gateway, &store);

    assert_eq!(ctx.finish_restore().await, RestorePhase::Unknown);
    assert_eq!(gateway.current_user_calls(), 0);
}

// =========================================================================
// login / register / logout
// =========================================================================

#[tokio::test]
async fn login_stores_user_and_token() {
    let account = user(Role::Teacher, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(account.clone()));
    let store = Arc::new(MemoryStore::new());
    let mut ctx = context(&gateway, &store);
    ctx.restore().await;

    ctx.login(&LoginCredentials::new("teacher@example.edu", "pw")).await.unwrap();

    assert_eq!(ctx.phase(), RestorePhase::Verified);
    assert_eq!(ctx.user(), Some(&account));
    assert_eq!(stored_token(&store).as_deref(), Some("tok-fresh"));
    assert!(ctx.is_teacher());
    assert!(!ctx.is_admin());
}

#[tokio::test]
async fn failed_login_leaves_state_unchanged() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    let mut ctx = context(&gateway, &store);
    ctx.restore().await;

    let err = ctx.login(&LoginCredentials::new("x@example.edu", "bad")).await.unwrap_err();

    assert_eq!(err.message, "Invalid email or password");
    assert_eq!(ctx.phase(), RestorePhase::Anonymous);
    assert!(ctx.user().is_none());
    assert!(store.is_empty());
}

#[tokio::test]
async fn register_requests_pending_status_for_students() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    let mut ctx = context(&gateway, &store);

    let form = Registration {
        email: "kid@example.edu".to_owned(),
        password: "long-enough".to_owned(),
        full_name: "Kid Student".to_owned(),
        role: Some(Role::Student),
        ..Registration::default()
    };
    ctx.register(form).await.unwrap();

    let sent = gateway.register.lock().unwrap().clone().unwrap();
    assert_eq!(sent.status, UserStatus::Pending);
    assert!(ctx.user().unwrap().is_pending());
    assert_eq!(stored_token(&store).as_deref(), Some("tok-new"));
}

#[tokio::test]
async fn register_validation_failure_never_reaches_gateway() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    let mut ctx = context(&gateway, &store);

    let form = Registration { email: "nope".to_owned(), ..Registration::default() };
    let err = ctx.register(form).await.unwrap_err();

    assert_eq!(err.message, "Enter a valid email address");
    assert!(gateway.register.lock().unwrap().is_none());
}

#[tokio::test]
async fn logout_clears_memory_and_storage() {
    let account = user(Role::Admin, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(account.clone()));
    let store = seeded_store("tok-1", &account);
    let mut ctx = context(&gateway, &store);
    ctx.restore().await;

    ctx.logout().await;

    assert_eq!(gateway.logout_calls(), 1);
    assert_eq!(ctx.phase(), RestorePhase::Anonymous);
    assert!(ctx.user().is_none());
    assert!(store.is_empty());

    let mut fresh = context(&gateway, &store);
    assert_eq!(fresh.restore().await, RestorePhase::Anonymous);
}

#[tokio::test]
async fn logout_clears_local_state_even_if_remote_fails() {
    let account = user(Role::Admin, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(account.clone()));
    *gateway.logout.lock().unwrap() = Err(ApiError::Transport("timeout".to_owned()));
    let store = seeded_store("tok-1", &account);
    let mut ctx = context(&gateway, &store);
    ctx.restore().await;

    ctx.logout().await;

    assert!(ctx.user().is_none());
    assert!(store.is_empty());
}

// =========================================================================
// expire / profile / roles
// =========================================================================

#[tokio::test]
async fn expire_clears_session_and_sets_notice() {
    let account = user(Role::Student, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(account.clone()));
    let store = seeded_store("tok-1", &account);
    let mut ctx = context(&gateway, &store);
    ctx.restore().await;

    ctx.expire();

    assert_eq!(ctx.phase(), RestorePhase::Invalid);
    assert_eq!(ctx.notice(), Some(SESSION_EXPIRED));
    assert!(store.is_empty());

    ctx.login(&LoginCredentials::new("student@example.edu", "pw")).await.unwrap();
    assert!(ctx.notice().is_none());
}

#[tokio::test]
async fn update_profile_replaces_stored_user() {
    let account = user(Role::Parent, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(account.clone()));
    let store = seeded_store("tok-1", &account);
    let mut ctx = context(&gateway, &store);
    ctx.restore().await;

    let update = ProfileUpdate { full_name: Some("Renamed Parent".to_owned()), profile_data: None };
    let updated = ctx.update_profile(&update).await.unwrap();
    assert_eq!(updated.full_name, "Renamed Parent");

    let persisted: Option<User> = load_json(store.as_ref(), USER_KEY).unwrap();
    assert_eq!(persisted.unwrap().full_name, "Renamed Parent");
}

#[tokio::test]
async fn update_profile_with_rejected_token_expires_session() {
    let account = user(Role::Parent, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(account.clone()));
    let store = seeded_store("tok-1", &account);
    let mut ctx = context(&gateway, &store);
    ctx.restore().await;
    *gateway.current_user.lock().unwrap() = Err(ApiError::Unauthorized { message: None });

    let err = ctx.update_profile(&ProfileUpdate::default()).await.unwrap_err();

    assert!(err.is_unauthorized());
    assert_eq!(ctx.notice(), Some(SESSION_EXPIRED));
    assert!(store.is_empty());
}

#[tokio::test]
async fn update_profile_requires_a_session() {
    let gateway = Arc::new(MockGateway::rejecting());
    let store = Arc::new(MemoryStore::new());
    let mut ctx = context(&gateway, &store);

    assert!(ctx.update_profile(&ProfileUpdate::default()).await.unwrap_err().is_unauthorized());
}

#[tokio::test]
async fn has_role_matches_any_listed_role() {
    let account = user(Role::Student, UserStatus::Active);
    let gateway = Arc::new(MockGateway::accepting(account.clone()));
    let store = seeded_store("tok-1", &account);
    let mut ctx = context(&gateway, &store);
    assert!(!ctx.has_role(&[Role::Student]));

    ctx.restore().await;

    assert!(ctx.has_role(&[Role::Teacher, Role::Student]));
    assert!(!ctx.has_role(&[Role::Admin]));
    assert!(!ctx.has_role(&[]));
    assert!(ctx.is_student());
    assert!(!ctx.is_parent());
}
