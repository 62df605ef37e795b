//! Public pages and status notices.

use std::fmt;

use records::Role;

use super::heading;
use crate::session::forms::MIN_PASSWORD_LEN;

const FEATURES: [(&str, &str); 6] = [
    ("Smart Class Management", "Class scheduling with booking and automated notifications."),
    ("Resource Library", "Course materials organised by class and subject, downloadable anywhere."),
    ("Assessment Tools", "Quizzes with instant scoring and per-student submissions."),
    ("Curriculum Planning", "A shared calendar of lectures, labs, seminars and workshops."),
    ("Communication Hub", "Notifications connecting administrators, teachers, students and parents."),
    ("Role-Based Access", "Every page is scoped to what your role needs."),
];

fn role_blurb(role: Role) -> &'static str {
    match role {
        Role::Admin => "Complete control and oversight of your institution",
        Role::Teacher => "Schedule classes, share materials and run assessments",
        Role::Student => "Join classes, study materials and take assessments",
        Role::Parent => "Stay connected with your child's schedule and progress",
    }
}

// =============================================================================
// HOME
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HomeView {
    pub signed_in: bool,
}

impl fmt::Display for HomeView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Education, organised")?;
        writeln!(f, "One place for classes, materials, assessments and the curriculum calendar.")?;
        writeln!(f)?;
        for (title, blurb) in FEATURES {
            writeln!(f, "* {title}: {blurb}")?;
        }
        writeln!(f)?;
        for role in Role::ALL {
            writeln!(f, "For {}s: {}", role.label(), role_blurb(role))?;
        }
        writeln!(f)?;
        if self.signed_in {
            writeln!(f, "Continue to your dashboard: /dashboard")
        } else {
            writeln!(f, "Sign in: /login    Create an account: /register")
        }
    }
}

// =============================================================================
// LOGIN / REGISTER
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoginView {
    /// Where a successful login returns to.
    pub from: Option<String>,
    /// Session notice, such as an expiry.
    pub notice: Option<String>,
    /// Error from the last attempt.
    pub error: Option<String>,
}

impl fmt::Display for LoginView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Sign in")?;
        if let Some(notice) = &self.notice {
            writeln!(f, "! {notice}")?;
        }
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }
        writeln!(f, "Usage: eduportal login --email <EMAIL> --password <PASSWORD>")?;
        if let Some(from) = &self.from {
            writeln!(f, "After signing in you will return to {from}")?;
        }
        writeln!(f, "No account yet? /register")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RegisterView {
    pub error: Option<String>,
}

impl fmt::Display for RegisterView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Create account")?;
        if let Some(error) = &self.error {
            writeln!(f, "Error: {error}")?;
        }
        writeln!(
            f,
            "Usage: eduportal register --email <EMAIL> --password <PASSWORD> --name <FULL NAME> --role <ROLE>"
        )?;
        writeln!(f, "Passwords need at least {MIN_PASSWORD_LEN} characters.")?;
        let roles: Vec<&str> = Role::ALL.iter().map(|r| r.as_str()).collect();
        writeln!(f, "Roles: {}", roles.join(", "))?;
        writeln!(f, "New teacher, student and parent accounts wait for administrator approval.")
    }
}

// =============================================================================
// NOTICES
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    Loading,
    PendingApproval,
    Unauthorized,
    NotFound { path: String },
    LoadFailed { page: String, reason: String },
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loading => writeln!(f, "Loading..."),
            Self::PendingApproval => {
                heading(f, "Account Pending Approval")?;
                writeln!(f, "Your account is currently being reviewed by an administrator.")?;
                writeln!(f, "You'll receive an email notification once approved.")?;
                writeln!(f, "Run the command again to refresh.")
            }
            Self::Unauthorized => {
                heading(f, "Access denied")?;
                writeln!(f, "Your role does not have access to this page.")?;
                writeln!(f, "Back to your dashboard: /dashboard")
            }
            Self::NotFound { path } => {
                heading(f, "Page not found")?;
                writeln!(f, "Nothing lives at {path}.")?;
                writeln!(f, "Home: /")
            }
            Self::LoadFailed { page, reason } => {
                heading(f, "Could not load page")?;
                writeln!(f, "{page} could not be loaded: {reason}")?;
                writeln!(f, "Try again in a moment.")
            }
        }
    }
}

#[cfg(test)]
#[path = "public_test.rs"]
mod tests;
