//! Session context: the single owned writer of the current user and token.
//!
//! SYSTEM CONTEXT
//! ==============
//! The portal owns one `SessionContext` per page load. The route guard reads
//! [`SessionSnapshot`]s; only the methods here mutate the user/token pair,
//! and they keep memory and the session store in step.
//!
//! DESIGN
//! ======
//! Restore is a phase machine:
//!
//! ```text
//! Unknown --begin_restore--> Optimistic --finish_restore--> Verified
//!    |                            |
//!    |                            +------------------------> Invalid
//!    +--(nothing stored)--> Anonymous
//! ```
//!
//! `Optimistic` exposes the cached user while still loading so the first
//! render can greet the user before the remote check returns. Logout moves
//! to `Anonymous`; a 401 from any authenticated call moves to `Invalid`.
//!
//! ERROR HANDLING
//! ==============
//! Store failures are logged and never block authentication: the session
//! works for the current page load even if it cannot be persisted.

use std::sync::Arc;

use records::{AuthGrant, LoginCredentials, ProfileUpdate, Role, User};

use super::forms::Registration;
use super::store::{AUTH_TOKEN_KEY, SessionStore, StoreError, USER_KEY, load_json, save_json};
use crate::net::http::ApiError;
use crate::net::identity::{AuthFailure, IdentityGateway};

pub const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestorePhase {
    /// Storage has not been read yet.
    Unknown,
    /// A stored user is shown while the token is being verified.
    Optimistic,
    /// The token was confirmed by the platform or just issued.
    Verified,
    /// The token was rejected; storage has been cleared.
    Invalid,
    /// No session exists.
    Anonymous,
}

/// Read-only copy of the session consumed by the route guard.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionSnapshot {
    pub loading: bool,
    pub user: Option<User>,
}

pub struct SessionContext {
    gateway: Arc<dyn IdentityGateway>,
    store: Arc<dyn SessionStore>,
    phase: RestorePhase,
    user: Option<User>,
    token: Option<String>,
    notice: Option<String>,
}

impl SessionContext {
    pub fn new(gateway: Arc<dyn IdentityGateway>, store: Arc<dyn SessionStore>) -> Self {
        Self { gateway, store, phase: RestorePhase::Unknown, user: None, token: None, notice: None }
    }

    // =========================================================================
    // READS
    // =========================================================================

    #[must_use]
    pub fn phase(&self) -> RestorePhase {
        self.phase
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// True until the stored session has been verified or ruled out.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self.phase, RestorePhase::Unknown | RestorePhase::Optimistic)
    }

    /// Message to show on the login view, such as a session expiry.
    #[must_use]
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot { loading: self.is_loading(), user: self.user.clone() }
    }

    #[must_use]
    pub fn has_role(&self, roles: &[Role]) -> bool {
        self.user.as_ref().is_some_and(|u| roles.contains(&u.role))
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.has_role(&[Role::Admin])
    }

    #[must_use]
    pub fn is_teacher(&self) -> bool {
        self.has_role(&[Role::Teacher])
    }

    #[must_use]
    pub fn is_student(&self) -> bool {
        self.has_role(&[Role::Student])
    }

    #[must_use]
    pub fn is_parent(&self) -> bool {
        self.has_role(&[Role::Parent])
    }

    // =========================================================================
    // RESTORE
    // =========================================================================

    /// Phase one: read the stored token and user without touching the network.
    ///
    /// A token without a user, a user without a token, or a user record that
    /// no longer decodes clears storage and leaves the session anonymous.
    pub fn begin_restore(&mut self) -> RestorePhase {
        if self.phase != RestorePhase::Unknown {
            return self.phase;
        }

        let token = match self.store.get(AUTH_TOKEN_KEY) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(error = %e, "session store unreadable; starting anonymous");
                None
            }
        };
        let user = load_json::<User>(self.store.as_ref(), USER_KEY);

        self.phase = match (token, user) {
            (Some(token), Ok(Some(user))) => {
                tracing::debug!(user_id = %user.id, "restored cached session");
                self.token = Some(token);
                self.user = Some(user);
                RestorePhase::Optimistic
            }
            (None, Ok(None)) => RestorePhase::Anonymous,
            (_, Err(StoreError::Corrupt { reason, .. })) => {
                tracing::warn!(%reason, "stored user is corrupt; clearing session");
                self.clear_storage();
                RestorePhase::Anonymous
            }
            (_, Err(e)) => {
                tracing::warn!(error = %e, "session store unreadable; starting anonymous");
                RestorePhase::Anonymous
            }
            (Some(_), Ok(None)) | (None, Ok(Some(_))) => {
                tracing::debug!("partial session in store; clearing");
                self.clear_storage();
                RestorePhase::Anonymous
            }
        };
        self.phase
    }

    /// Phase two: confirm the cached token with the platform.
    ///
    /// Any failure to confirm, including an unreachable platform, invalidates
    /// the session.
    pub async fn finish_restore(&mut self) -> RestorePhase {
        if self.phase != RestorePhase::Optimistic {
            return self.phase;
        }
        let Some(token) = self.token.clone() else {
            self.phase = RestorePhase::Anonymous;
            return self.phase;
        };

        match self.gateway.current_user(&token).await {
            Ok(user) => {
                tracing::debug!(user_id = %user.id, "session verified");
                self.persist_user(&user);
                self.user = Some(user);
                self.phase = RestorePhase::Verified;
            }
            Err(e) => {
                tracing::info!(error = %e, "stored session rejected");
                self.reset(RestorePhase::Invalid);
            }
        }
        self.phase
    }

    /// Run both restore phases.
    pub async fn restore(&mut self) -> RestorePhase {
        self.begin_restore();
        self.finish_restore().await
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    /// Sign in and persist the session.
    ///
    /// # Errors
    ///
    /// Returns the platform's reason, or a fixed fallback, leaving the
    /// current session untouched.
    pub async fn login(&mut self, credentials: &LoginCredentials) -> Result<(), AuthFailure> {
        let grant = self.gateway.login(credentials).await?;
        tracing::info!(user_id = %grant.user.id, role = %grant.user.role, "signed in");
        self.establish(grant);
        Ok(())
    }

    /// Validate the form locally, register, and persist the new session.
    ///
    /// # Errors
    ///
    /// Returns a validation message or the platform's reason.
    pub async fn register(&mut self, registration: Registration) -> Result<(), AuthFailure> {
        let request = registration
            .into_request()
            .map_err(|e| AuthFailure::new(e.to_string()))?;
        let grant = self.gateway.register(&request).await?;
        tracing::info!(user_id = %grant.user.id, role = %grant.user.role, status = %grant.user.status, "registered");
        self.establish(grant);
        Ok(())
    }

    /// Invalidate the remote session and clear local state.
    ///
    /// A failed remote logout is logged; local state is cleared regardless.
    pub async fn logout(&mut self) {
        if let Some(token) = self.token.clone() {
            if let Err(e) = self.gateway.logout(&token).await {
                tracing::warn!(error = %e, "remote logout failed");
            }
        }
        self.reset(RestorePhase::Anonymous);
        self.notice = None;
    }

    /// Drop a session the platform no longer accepts.
    pub fn expire(&mut self) {
        if let Some(user) = &self.user {
            tracing::info!(user_id = %user.id, "session expired");
        }
        self.reset(RestorePhase::Invalid);
        self.notice = Some(SESSION_EXPIRED.to_owned());
    }

    /// Update the signed-in user's profile and replace the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Unauthorized`] when nobody is signed in or the
    /// token was rejected; the latter also expires the session.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<&User, ApiError> {
        let (Some(token), Some(user_id)) = (self.token.clone(), self.user.as_ref().map(|u| u.id.clone())) else {
            return Err(ApiError::Unauthorized { message: None });
        };

        match self.gateway.update_profile(&token, &user_id, update).await {
            Ok(user) => {
                self.persist_user(&user);
                Ok(self.user.insert(user))
            }
            Err(e) => {
                if e.is_unauthorized() {
                    self.expire();
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // INTERNALS
    // =========================================================================

    fn establish(&mut self, grant: AuthGrant) {
        let AuthGrant { user, token } = grant;
        if let Err(e) = self.store.set(AUTH_TOKEN_KEY, &token) {
            tracing::warn!(error = %e, "failed to persist token");
        }
        self.persist_user(&user);
        self.user = Some(user);
        self.token = Some(token);
        self.phase = RestorePhase::Verified;
        self.notice = None;
    }

    fn persist_user(&self, user: &User) {
        if let Err(e) = save_json(self.store.as_ref(), USER_KEY, user) {
            tracing::warn!(error = %e, "failed to persist user");
        }
    }

    fn reset(&mut self, phase: RestorePhase) {
        self.user = None;
        self.token = None;
        self.phase = phase;
        self.clear_storage();
    }

    fn clear_storage(&self) {
        for key in [AUTH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.store.remove(key) {
                tracing::warn!(error = %e, key, "failed to clear session key");
            }
        }
    }
}

#[cfg(test)]
#[path = "context_test.rs"]
mod tests;
