//! Client-side session: persisted storage, form validation and the owned
//! session context.

pub mod context;
pub mod forms;
pub mod store;

pub use context::{RestorePhase, SessionContext, SessionSnapshot};

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use records::{AuthGrant, LoginCredentials, ProfileUpdate, RegisterRequest, Role, User, UserStatus};

    use super::SessionContext;
    use super::store::{AUTH_TOKEN_KEY, MemoryStore, SessionStore, USER_KEY, save_json};
    use crate::net::http::ApiError;
    use crate::net::identity::{AuthFailure, IdentityGateway};

    /// A platform user with a predictable id.
    #[must_use]
    pub fn user(role: Role, status: UserStatus) -> User {
        User {
            id: format!("u-{role}"),
            email: format!("{role}@example.edu"),
            full_name: format!("Test {}", role.label()),
            role,
            status,
            profile_data: serde_json::Map::new(),
            created_at: "2025-01-01T00:00:00Z".to_owned(),
            updated_at: "2025-01-01T00:00:00Z".to_owned(),
            last_login_at: None,
        }
    }

    /// Scripted identity gateway.
    pub struct MockGateway {
        pub login: Mutex<Result<AuthGrant, AuthFailure>>,
        pub register: Mutex<Option<RegisterRequest>>,
        pub current_user: Mutex<Result<User, ApiError>>,
        pub logout: Mutex<Result<(), ApiError>>,
        pub current_user_calls: AtomicUsize,
        pub logout_calls: AtomicUsize,
    }

    impl MockGateway {
        #[must_use]
        pub fn accepting(user: User) -> Self {
            Self {
                login: Mutex::new(Ok(AuthGrant { user: user.clone(), token: "tok-fresh".to_owned() })),
                register: Mutex::new(None),
                current_user: Mutex::new(Ok(user)),
                logout: Mutex::new(Ok(())),
                current_user_calls: AtomicUsize::new(0),
                logout_calls: AtomicUsize::new(0),
            }
        }

        #[must_use]
        pub fn rejecting() -> Self {
            let gateway = Self::accepting(user(Role::Student, UserStatus::Active));
            *gateway.login.lock().unwrap() = Err(AuthFailure::new("Invalid email or password"));
            *gateway.current_user.lock().unwrap() = Err(ApiError::Unauthorized { message: None });
            gateway
        }

        pub fn current_user_calls(&self) -> usize {
            self.current_user_calls.load(Ordering::SeqCst)
        }

        pub fn logout_calls(&self) -> usize {
            self.logout_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl IdentityGateway for MockGateway {
        async fn login(&self, _credentials: &LoginCredentials) -> Result<AuthGrant, AuthFailure> {
            self.login.lock().unwrap().clone()
        }

        async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant, AuthFailure> {
            *self.register.lock().unwrap() = Some(request.clone());
            let mut account = user(request.role, request.status);
            account.email.clone_from(&request.email);
            account.full_name.clone_from(&request.full_name);
            Ok(AuthGrant { user: account, token: "tok-new".to_owned() })
        }

        async fn logout(&self, _token: &str) -> Result<(), ApiError> {
            self.logout_calls.fetch_add(1, Ordering::SeqCst);
            self.logout.lock().unwrap().clone()
        }

        async fn current_user(&self, _token: &str) -> Result<User, ApiError> {
            self.current_user_calls.fetch_add(1, Ordering::SeqCst);
            self.current_user.lock().unwrap().clone()
        }

        async fn update_profile(&self, _token: &str, user_id: &str, update: &ProfileUpdate) -> Result<User, ApiError> {
            let mut account = self.current_user.lock().unwrap().clone()?;
            account.id = user_id.to_owned();
            if let Some(name) = &update.full_name {
                account.full_name.clone_from(name);
            }
            Ok(account)
        }
    }

    /// Store pre-seeded with a token and user, as left by an earlier login.
    #[must_use]
    pub fn seeded_store(token: &str, account: &User) -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.set(AUTH_TOKEN_KEY, token).unwrap();
        save_json(store.as_ref(), USER_KEY, account).unwrap();
        store
    }

    #[must_use]
    pub fn context(gateway: &Arc<MockGateway>, store: &Arc<MemoryStore>) -> SessionContext {
        SessionContext::new(gateway.clone(), store.clone())
    }
}
