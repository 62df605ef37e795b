//! Route guard: admission decisions for protected views.
//!
//! SYSTEM CONTEXT
//! ==============
//! The portal evaluates the guard for every protected route before any data
//! is loaded. The decision is a pure function of a session snapshot, the
//! route's required roles and the requested path, so every branch is covered
//! by plain unit tests.

use records::{Role, User};

use crate::session::SessionSnapshot;

// =============================================================================
// ROLE SET
// =============================================================================

/// A set of roles. Empty means "any signed-in user".
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const ANY: Self = Self(0);

    const fn bit(role: Role) -> u8 {
        match role {
            Role::Admin => 1,
            Role::Teacher => 1 << 1,
            Role::Student => 1 << 2,
            Role::Parent => 1 << 3,
        }
    }

    #[must_use]
    pub const fn of(roles: &[Role]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= Self::bit(roles[i]);
            i += 1;
        }
        Self(bits)
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn contains(self, role: Role) -> bool {
        self.0 & Self::bit(role) != 0
    }

    /// Whether `role` may pass: an empty set admits every role.
    #[must_use]
    pub const fn admits(self, role: Role) -> bool {
        self.is_empty() || self.contains(role)
    }

    /// Members in display order.
    pub fn iter(self) -> impl Iterator<Item = Role> {
        Role::ALL.into_iter().filter(move |r| self.contains(*r))
    }
}

// =============================================================================
// ADMISSION
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Admission {
    /// The session is still being restored.
    Loading,
    /// Nobody is signed in; return to `from` after login.
    RedirectToLogin { from: String },
    /// The account exists but an administrator has not approved it.
    PendingApproval,
    /// Signed in, but the role is outside the route's set.
    RedirectToUnauthorized,
    Render,
}

/// Decide whether `path`, guarded by `required`, may render.
///
/// Checks run in a fixed order: loading, signed out, pending, role. A
/// pending account therefore sees the pending notice regardless of role.
#[must_use]
pub fn evaluate(snapshot: &SessionSnapshot, required: RoleSet, path: &str) -> Admission {
    if snapshot.loading {
        return Admission::Loading;
    }
    let Some(user) = &snapshot.user else {
        return Admission::RedirectToLogin { from: path.to_owned() };
    };
    admit_user(user, required)
}

fn admit_user(user: &User, required: RoleSet) -> Admission {
    if user.is_pending() {
        return Admission::PendingApproval;
    }
    if !required.admits(user.role) {
        return Admission::RedirectToUnauthorized;
    }
    Admission::Render
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
