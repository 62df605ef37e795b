//! Class list: search, status filter and schedule ordering.

use std::fmt;

use records::{Class, ClassFilter, ClassStatus, Role};

use super::{LoadContext, contains_ci, heading};
use crate::net::http::ApiError;
use crate::net::identity::can_create_classes;

/// Filters read from the location's query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassQuery {
    pub search: String,
    /// `None` means every status.
    pub status: Option<ClassStatus>,
}

impl ClassQuery {
    /// Read `search` and `status` parameters; `status=all` or an unknown
    /// status shows every class.
    #[must_use]
    pub fn from_location(location: &crate::routes::Location) -> Self {
        Self {
            search: location.param("search").unwrap_or_default().trim().to_owned(),
            status: location.param("status").and_then(parse_status),
        }
    }
}

fn parse_status(raw: &str) -> Option<ClassStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "scheduled" | "upcoming" => Some(ClassStatus::Scheduled),
        "live" => Some(ClassStatus::Live),
        "completed" => Some(ClassStatus::Completed),
        "cancelled" | "canceled" => Some(ClassStatus::Cancelled),
        _ => None,
    }
}

/// Order by date, then start time. Zero-padded wire values sort lexically.
pub fn sort_by_schedule(classes: &mut [Class]) {
    classes.sort_by(|a, b| (&a.date, &a.start_time).cmp(&(&b.date, &b.start_time)));
}

/// Classes matching `query`, in schedule order.
#[must_use]
pub fn filter_classes(classes: &[Class], query: &ClassQuery) -> Vec<Class> {
    let mut matched: Vec<Class> = classes
        .iter()
        .filter(|c| contains_ci(&c.title, &query.search) || contains_ci(&c.teacher_name, &query.search))
        .filter(|c| query.status.is_none_or(|s| c.status == s))
        .cloned()
        .collect();
    sort_by_schedule(&mut matched);
    matched
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClassesView {
    pub query: ClassQuery,
    pub classes: Vec<Class>,
    pub total: usize,
    pub can_create: bool,
    pub can_enroll: bool,
}

pub async fn load(cx: &LoadContext) -> Result<ClassesView, ApiError> {
    let filter = match cx.user.role {
        Role::Teacher => ClassFilter { teacher_id: Some(cx.user.id.clone()), ..ClassFilter::default() },
        Role::Admin | Role::Student | Role::Parent => ClassFilter::default(),
    };
    let page = cx.platform.classes(&cx.token, &filter).await?;
    let query = ClassQuery::from_location(&cx.location);
    let classes = filter_classes(&page.data, &query);

    Ok(ClassesView {
        query,
        classes,
        total: page.data.len(),
        can_create: can_create_classes(Some(&cx.user)),
        can_enroll: cx.user.role == Role::Student,
    })
}

impl fmt::Display for ClassesView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Classes")?;
        let status = self.query.status.map_or("all", ClassStatus::as_str);
        writeln!(f, "Showing {} of {} (status: {status})", self.classes.len(), self.total)?;
        if !self.query.search.is_empty() {
            writeln!(f, "Search: \"{}\"", self.query.search)?;
        }
        writeln!(f)?;

        if self.classes.is_empty() {
            writeln!(f, "No classes found.")?;
            writeln!(f, "Try adjusting your search or filter criteria.")?;
        }
        for class in &self.classes {
            writeln!(f, "[{}] {} ({})", class.status.as_str(), class.title, class.subject)?;
            writeln!(f, "    {} {}-{} | {}", class.date, class.start_time, class.end_time, class.location)?;
            writeln!(
                f,
                "    Teacher: {} | {}/{} enrolled | id {}",
                class.teacher_name, class.enrolled_count, class.max_students, class.id
            )?;
            if let Some(link) = &class.zoom_link {
                writeln!(f, "    Join: {link}")?;
            }
        }

        writeln!(f)?;
        if self.can_create {
            writeln!(f, "Schedule a class: eduportal classes create --title <TITLE> --date <YYYY-MM-DD> ...")?;
        }
        if self.can_enroll {
            writeln!(f, "Enroll: eduportal classes enroll <CLASS ID>")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "classes_test.rs"]
mod tests;
