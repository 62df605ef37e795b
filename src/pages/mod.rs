//! Views rendered by the portal.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each protected view has an async `load` that reads through the platform
//! data client and a plain data struct that renders itself as text through
//! `Display`. Filtering, sorting and calendar arithmetic are pure functions
//! over loaded records so they are tested without a platform.
//!
//! `LoadContext` is owned so a load can run on its own task and be aborted
//! by the portal when the navigation that started it is dropped.

pub mod admin;
pub mod assessments;
pub mod classes;
pub mod curriculum;
pub mod dashboard;
pub mod materials;
pub mod public;

use std::fmt;

use records::{Class, ClassStatus, User};
use time::Date;
use time::macros::format_description;

use crate::net::http::ApiError;
use crate::net::platform::PlatformClient;
use crate::routes::{Location, Route};

pub use public::{HomeView, LoginView, Notice, RegisterView};

/// Everything a view load needs, owned.
#[derive(Clone)]
pub struct LoadContext {
    pub platform: PlatformClient,
    pub token: String,
    pub user: User,
    pub location: Location,
    pub today: Date,
}

#[derive(Clone, Debug, PartialEq)]
pub enum View {
    Home(HomeView),
    Login(LoginView),
    Register(RegisterView),
    Notice(Notice),
    Dashboard(dashboard::DashboardView),
    Classes(classes::ClassesView),
    Materials(materials::MaterialsView),
    Assessments(assessments::AssessmentsView),
    Curriculum(curriculum::CurriculumView),
    Admin(admin::AdminView),
}

/// Load the data behind a protected route.
///
/// Public routes have nothing to load and return `None`.
pub async fn load(route: &Route, cx: LoadContext) -> Result<Option<View>, ApiError> {
    let view = match route {
        Route::Dashboard => View::Dashboard(dashboard::load(&cx).await?),
        Route::Admin => View::Admin(admin::load(&cx).await?),
        Route::Classes => View::Classes(classes::load(&cx).await?),
        Route::Materials => View::Materials(materials::load(&cx).await?),
        Route::Assessments => View::Assessments(assessments::load(&cx).await?),
        Route::Curriculum => View::Curriculum(curriculum::load(&cx).await?),
        Route::Home | Route::Login | Route::Register | Route::Unauthorized | Route::NotFound { .. } => return Ok(None),
    };
    Ok(Some(view))
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home(v) => fmt::Display::fmt(v, f),
            Self::Login(v) => fmt::Display::fmt(v, f),
            Self::Register(v) => fmt::Display::fmt(v, f),
            Self::Notice(v) => fmt::Display::fmt(v, f),
            Self::Dashboard(v) => fmt::Display::fmt(v, f),
            Self::Classes(v) => fmt::Display::fmt(v, f),
            Self::Materials(v) => fmt::Display::fmt(v, f),
            Self::Assessments(v) => fmt::Display::fmt(v, f),
            Self::Curriculum(v) => fmt::Display::fmt(v, f),
            Self::Admin(v) => fmt::Display::fmt(v, f),
        }
    }
}

// =============================================================================
// PAGE FRAME
// =============================================================================

/// A rendered page: header with the signed-in user and menu, then the view.
#[derive(Clone, Debug, PartialEq)]
pub struct Page {
    pub route: Route,
    pub user: Option<User>,
    pub menu: Vec<Route>,
    pub view: View,
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => writeln!(f, "EduPortal | {} ({})", user.full_name, user.role.label())?,
            None => writeln!(f, "EduPortal")?,
        }
        if !self.menu.is_empty() {
            let items: Vec<String> = self
                .menu
                .iter()
                .map(|r| if *r == self.route { format!("[{}]", r.title()) } else { r.title().to_owned() })
                .collect();
            writeln!(f, "{}", items.join(" | "))?;
        }
        writeln!(f, "{}", "=".repeat(60))?;
        write!(f, "{}", self.view)
    }
}

// =============================================================================
// SHARED HELPERS
// =============================================================================

/// Case-insensitive substring match; an empty needle matches everything.
pub(crate) fn contains_ci(haystack: &str, needle: &str) -> bool {
    needle.is_empty() || haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Parse a `YYYY-MM-DD` date.
pub(crate) fn parse_date(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Format a date as `YYYY-MM-DD`.
pub(crate) fn format_date(date: Date) -> String {
    date.format(format_description!("[year]-[month]-[day]"))
        .unwrap_or_default()
}

/// Classes from today onward that have not finished, soonest first.
pub(crate) fn upcoming_classes(all: &[Class], today: Date, limit: usize) -> Vec<Class> {
    let mut upcoming: Vec<Class> = all
        .iter()
        .filter(|c| matches!(c.status, ClassStatus::Scheduled | ClassStatus::Live))
        .filter(|c| parse_date(&c.date).is_some_and(|d| d >= today))
        .cloned()
        .collect();
    classes::sort_by_schedule(&mut upcoming);
    upcoming.truncate(limit);
    upcoming
}

/// Section heading with an underline.
pub(crate) fn heading(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{title}")?;
    writeln!(f, "{}", "-".repeat(title.chars().count()))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
