//! Administrator user management: search, filters, status counts.

use std::fmt;

use records::{DashboardStats, Role, User, UserFilter, UserStatus};

use super::{LoadContext, contains_ci, heading};
use crate::net::http::ApiError;
use crate::net::identity::can_manage_users;

/// Page size requested from `/users`.
const USER_PAGE_LIMIT: u32 = 100;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UserQuery {
    pub search: String,
    pub status: Option<UserStatus>,
    pub role: Option<Role>,
}

impl UserQuery {
    /// Read `search`, `status` and `role`; `all` or an unknown value leaves
    /// that filter off.
    #[must_use]
    pub fn from_location(location: &crate::routes::Location) -> Self {
        Self {
            search: location.param("search").unwrap_or_default().trim().to_owned(),
            status: location.param("status").and_then(|s| s.parse().ok()),
            role: location.param("role").and_then(|r| r.parse().ok()),
        }
    }
}

/// Users matching `query`: search over name and email, then status and role.
#[must_use]
pub fn filter_users(users: &[User], query: &UserQuery) -> Vec<User> {
    users
        .iter()
        .filter(|u| contains_ci(&u.full_name, &query.search) || contains_ci(&u.email, &query.search))
        .filter(|u| query.status.is_none_or(|s| u.status == s))
        .filter(|u| query.role.is_none_or(|r| u.role == r))
        .cloned()
        .collect()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub active: usize,
    pub pending: usize,
    pub inactive: usize,
}

impl StatusCounts {
    #[must_use]
    pub fn of(users: &[User]) -> Self {
        users.iter().fold(Self::default(), |mut counts, u| {
            match u.status {
                UserStatus::Active => counts.active += 1,
                UserStatus::Pending => counts.pending += 1,
                UserStatus::Inactive => counts.inactive += 1,
            }
            counts
        })
    }

    #[must_use]
    pub fn total(self) -> usize {
        self.active + self.pending + self.inactive
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AdminView {
    pub query: UserQuery,
    pub counts: StatusCounts,
    pub stats: DashboardStats,
    pub users: Vec<User>,
    pub can_manage: bool,
}

pub async fn load(cx: &LoadContext) -> Result<AdminView, ApiError> {
    let filter = UserFilter { limit: Some(USER_PAGE_LIMIT), ..UserFilter::default() };
    let (page, stats) = tokio::try_join!(
        cx.platform.users(&cx.token, &filter),
        cx.platform.dashboard_stats(&cx.token)
    )?;
    let query = UserQuery::from_location(&cx.location);

    Ok(AdminView {
        counts: StatusCounts::of(&page.data),
        users: filter_users(&page.data, &query),
        query,
        stats,
        can_manage: can_manage_users(Some(&cx.user)),
    })
}

impl fmt::Display for AdminView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "User management")?;
        writeln!(
            f,
            "Total users: {} | Active classes: {} | Subjects: {} | Pending approvals: {}",
            self.stats.total_users, self.stats.active_classes, self.stats.total_subjects, self.stats.pending_approvals
        )?;
        writeln!(
            f,
            "Loaded: {} ({} active, {} pending, {} inactive)",
            self.counts.total(),
            self.counts.active,
            self.counts.pending,
            self.counts.inactive
        )?;
        writeln!(
            f,
            "Filters: status {} | role {}",
            self.query.status.map_or("all", UserStatus::as_str),
            self.query.role.map_or("all", Role::as_str)
        )?;
        writeln!(f)?;

        if self.users.is_empty() {
            writeln!(f, "No users found.")?;
            writeln!(f, "Try adjusting your search or filter criteria.")?;
        }
        for u in &self.users {
            writeln!(f, "[{}] {} <{}> {} | id {}", u.status, u.full_name, u.email, u.role.label(), u.id)?;
        }

        if self.can_manage && self.counts.pending > 0 {
            writeln!(f)?;
            writeln!(f, "Approve: eduportal admin approve <USER ID>")?;
            writeln!(f, "Reject:  eduportal admin reject <USER ID>")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod tests;
