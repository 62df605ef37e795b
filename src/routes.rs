//! Route table: path resolution, legacy aliases, login redirects and the
//! role-aware menu.
//!
//! ARCHITECTURE
//! ============
//! A requested location (`/classes?status=live`) is split into a normalized
//! path and decoded query parameters, then resolved to a [`Route`]. Aliases
//! resolve to their targets before guarding, so `/admin-dashboard` is guarded
//! exactly like `/admin`.

use std::collections::BTreeMap;
use std::fmt;

use records::Role;

use crate::guard::RoleSet;

pub const DEFAULT_AFTER_LOGIN: &str = "/dashboard";

// =============================================================================
// LOCATION
// =============================================================================

/// A requested path plus its decoded query parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Location {
    pub path: String,
    pub query: BTreeMap<String, String>,
}

impl Location {
    /// Parse `raw` into a normalized path and decoded query.
    ///
    /// Missing leading slashes are added and trailing slashes dropped;
    /// undecodable query pairs are skipped.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let (path, query) = raw.split_once('?').unwrap_or((raw, ""));
        let path = path.split('#').next().unwrap_or_default();
        let query = query.split('#').next().unwrap_or_default();

        let trimmed = path.trim_matches('/');
        let path = if trimmed.is_empty() { "/".to_owned() } else { format!("/{trimmed}") };

        let query = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .filter_map(|pair| {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                Some((decode(key)?, decode(value)?))
            })
            .collect();

        Self { path, query }
    }

    #[must_use]
    pub fn param(&self, key: &str) -> Option<&str> {
        self.query
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    /// Path and query re-encoded for use as a `from` target.
    #[must_use]
    pub fn to_target(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect();
        format!("{}?{}", self.path, query.join("&"))
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(&raw.replace('+', " ")).ok().map(|s| s.into_owned())
}

// =============================================================================
// ROUTE
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Unauthorized,
    Dashboard,
    Admin,
    Classes,
    Materials,
    Assessments,
    Curriculum,
    NotFound { path: String },
}

impl Route {
    /// Routes listed in the navigation menu, in order.
    pub const MENU: [Self; 6] =
        [Self::Dashboard, Self::Classes, Self::Materials, Self::Assessments, Self::Curriculum, Self::Admin];

    /// Resolve a normalized path, following legacy aliases.
    #[must_use]
    pub fn resolve(path: &str) -> Self {
        match path {
            "/" => Self::Home,
            "/login" => Self::Login,
            "/register" => Self::Register,
            "/unauthorized" => Self::Unauthorized,
            "/dashboard" | "/teacher" | "/student" | "/parent" => Self::Dashboard,
            "/admin" | "/admin-dashboard" => Self::Admin,
            "/classes" => Self::Classes,
            "/materials" => Self::Materials,
            "/assessments" => Self::Assessments,
            "/curriculum" => Self::Curriculum,
            other => Self::NotFound { path: other.to_owned() },
        }
    }

    /// Canonical path.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Unauthorized => "/unauthorized",
            Self::Dashboard => "/dashboard",
            Self::Admin => "/admin",
            Self::Classes => "/classes",
            Self::Materials => "/materials",
            Self::Assessments => "/assessments",
            Self::Curriculum => "/curriculum",
            Self::NotFound { path } => path,
        }
    }

    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::Home => "Home",
            Self::Login => "Sign in",
            Self::Register => "Create account",
            Self::Unauthorized => "Access denied",
            Self::Dashboard => "Dashboard",
            Self::Admin => "User management",
            Self::Classes => "Classes",
            Self::Materials => "Materials",
            Self::Assessments => "Assessments",
            Self::Curriculum => "Curriculum",
            Self::NotFound { .. } => "Not found",
        }
    }

    /// Roles allowed to open the route, or `None` for a public route.
    #[must_use]
    pub fn required_roles(&self) -> Option<RoleSet> {
        match self {
            Self::Home | Self::Login | Self::Register | Self::Unauthorized | Self::NotFound { .. } => None,
            Self::Dashboard => Some(RoleSet::ANY),
            Self::Admin => Some(RoleSet::of(&[Role::Admin])),
            Self::Classes | Self::Materials | Self::Assessments => Some(RoleSet::of(&[Role::Teacher, Role::Student])),
            Self::Curriculum => Some(RoleSet::of(&[Role::Teacher, Role::Student, Role::Parent])),
        }
    }

    #[must_use]
    pub fn is_protected(&self) -> bool {
        self.required_roles().is_some()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// =============================================================================
// REDIRECTS
// =============================================================================

/// Login location that returns to `from` afterwards.
#[must_use]
pub fn login_redirect(from: &str) -> String {
    format!("/login?from={}", urlencoding::encode(from))
}

/// Where to go after a successful login.
///
/// Only same-site absolute paths are honoured, and a `from` pointing back at
/// the login or register form falls back to the dashboard.
#[must_use]
pub fn after_login_target(from: Option<&str>) -> String {
    let Some(from) = from.map(str::trim).filter(|f| f.starts_with('/') && !f.starts_with("//")) else {
        return DEFAULT_AFTER_LOGIN.to_owned();
    };
    match Route::resolve(&Location::parse(from).path) {
        Route::Login | Route::Register => DEFAULT_AFTER_LOGIN.to_owned(),
        _ => from.to_owned(),
    }
}

/// Menu entries `role` may open.
#[must_use]
pub fn menu_for(role: Role) -> Vec<Route> {
    Route::MENU
        .into_iter()
        .filter(|route| route.required_roles().is_some_and(|set| set.admits(role)))
        .collect()
}

#[cfg(test)]
#[path = "routes_test.rs"]
mod tests;
