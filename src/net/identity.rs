//! Identity gateway: the platform's authentication endpoints.
//!
//! SYSTEM CONTEXT
//! ==============
//! Only the session context calls this module. It owns no state: every
//! operation is one request, and every failure is reported as a message the
//! login and register views can show verbatim.
//!
//! TRADE-OFFS
//! ==========
//! The gateway is a trait so the session context can be exercised against
//! in-process fakes; the HTTP implementation is a few lines per endpoint.

use records::{AuthGrant, LoginCredentials, ProfileUpdate, RegisterRequest, Role, User};

use super::http::{ApiClient, ApiError, path_segment};

pub const LOGIN_FAILED: &str = "Login failed";
pub const REGISTRATION_FAILED: &str = "Registration failed";

// =============================================================================
// FAILURE
// =============================================================================

/// A user-facing authentication failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct AuthFailure {
    pub message: String,
}

impl AuthFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// Platform reason from `err`, or `fallback` when none was given.
    #[must_use]
    pub fn from_api(err: &ApiError, fallback: &str) -> Self {
        Self::new(err.platform_message().unwrap_or(fallback))
    }
}

// =============================================================================
// GATEWAY
// =============================================================================

/// Authentication operations against the platform.
#[async_trait::async_trait]
pub trait IdentityGateway: Send + Sync {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthGrant, AuthFailure>;

    async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant, AuthFailure>;

    /// Invalidate `token` server-side.
    async fn logout(&self, token: &str) -> Result<(), ApiError>;

    /// Fetch the account `token` belongs to.
    async fn current_user(&self, token: &str) -> Result<User, ApiError>;

    async fn update_profile(&self, token: &str, user_id: &str, update: &ProfileUpdate) -> Result<User, ApiError>;
}

pub struct HttpIdentityGateway {
    api: ApiClient,
}

impl HttpIdentityGateway {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl IdentityGateway for HttpIdentityGateway {
    async fn login(&self, credentials: &LoginCredentials) -> Result<AuthGrant, AuthFailure> {
        self.api
            .post("/auth/login", credentials, None)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, email = %credentials.email, "login rejected");
                AuthFailure::from_api(&e, LOGIN_FAILED)
            })
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthGrant, AuthFailure> {
        self.api
            .post("/auth/register", request, None)
            .await
            .map_err(|e| {
                tracing::debug!(error = %e, email = %request.email, role = %request.role, "registration rejected");
                AuthFailure::from_api(&e, REGISTRATION_FAILED)
            })
    }

    async fn logout(&self, token: &str) -> Result<(), ApiError> {
        self.api.post_unit("/auth/logout", Some(token)).await
    }

    async fn current_user(&self, token: &str) -> Result<User, ApiError> {
        self.api.get("/auth/me", Some(token)).await
    }

    async fn update_profile(&self, token: &str, user_id: &str, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.api
            .put(&format!("/users/{}", path_segment(user_id)), update, Some(token))
            .await
    }
}

// =============================================================================
// ROLE PREDICATES
// =============================================================================

#[must_use]
pub fn has_role(user: Option<&User>, role: Role) -> bool {
    user.is_some_and(|u| u.role == role)
}

/// Approve, reject and list accounts.
#[must_use]
pub fn can_manage_users(user: Option<&User>) -> bool {
    has_role(user, Role::Admin)
}

#[must_use]
pub fn can_create_classes(user: Option<&User>) -> bool {
    user.is_some_and(|u| matches!(u.role, Role::Admin | Role::Teacher))
}

#[must_use]
pub fn can_upload_materials(user: Option<&User>) -> bool {
    user.is_some_and(|u| matches!(u.role, Role::Admin | Role::Teacher))
}

#[must_use]
pub fn can_create_assessments(user: Option<&User>) -> bool {
    user.is_some_and(|u| matches!(u.role, Role::Admin | Role::Teacher))
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
