//! Role dashboards.
//!
//! DESIGN
//! ======
//! One variant per role. Each variant's load issues its requests together
//! with `tokio::try_join!`, so the first failure (a 401 in particular)
//! cancels the rest and surfaces to the portal.

use std::fmt;

use records::{
    Assessment, AssessmentFilter, Class, ClassFilter, DashboardStats, Material, MaterialFilter, Notification, Role,
    User, UserFilter, UserStatus,
};

use super::{LoadContext, heading, upcoming_classes};
use super::assessments::is_open;
use super::materials::format_file_size;
use crate::net::http::ApiError;

/// Rows shown per dashboard list.
pub const LIST_LIMIT: usize = 5;

#[derive(Clone, Debug, PartialEq)]
pub enum DashboardView {
    Admin { name: String, stats: DashboardStats, pending: Vec<User> },
    Teacher { name: String, stats: DashboardStats, upcoming: Vec<Class>, materials: Vec<Material> },
    Student {
        name: String,
        stats: DashboardStats,
        upcoming: Vec<Class>,
        materials: Vec<Material>,
        open_assessments: Vec<Assessment>,
    },
    Parent { name: String, upcoming: Vec<Class>, unread: Vec<Notification> },
}

pub async fn load(cx: &LoadContext) -> Result<DashboardView, ApiError> {
    let name = cx.user.first_name().to_owned();
    let token = cx.token.as_str();
    let platform = &cx.platform;

    let view = match cx.user.role {
        Role::Admin => {
            let pending_filter = UserFilter { status: Some(UserStatus::Pending), ..UserFilter::default() };
            let (stats, pending) =
                tokio::try_join!(platform.dashboard_stats(token), platform.users(token, &pending_filter))?;
            DashboardView::Admin { name, stats, pending: first(pending.data) }
        }
        Role::Teacher => {
            let classes = ClassFilter { teacher_id: Some(cx.user.id.clone()), ..ClassFilter::default() };
            let materials = MaterialFilter { teacher_id: Some(cx.user.id.clone()), ..MaterialFilter::default() };
            let (stats, classes, materials) = tokio::try_join!(
                platform.dashboard_stats(token),
                platform.classes(token, &classes),
                platform.materials(token, &materials)
            )?;
            DashboardView::Teacher {
                name,
                stats,
                upcoming: upcoming_classes(&classes.data, cx.today, LIST_LIMIT),
                materials: recent(materials.data),
            }
        }
        Role::Student => {
            let assessments = AssessmentFilter { student_id: Some(cx.user.id.clone()), ..AssessmentFilter::default() };
            let class_filter = ClassFilter::default();
            let material_filter = MaterialFilter::default();
            let (stats, classes, materials, assessments) = tokio::try_join!(
                platform.dashboard_stats(token),
                platform.classes(token, &class_filter),
                platform.materials(token, &material_filter),
                platform.assessments(token, &assessments)
            )?;
            let mut open: Vec<Assessment> =
                assessments.data.into_iter().filter(|a| is_open(a, cx.today)).collect();
            open.sort_by(|a, b| a.due_date.cmp(&b.due_date));
            DashboardView::Student {
                name,
                stats,
                upcoming: upcoming_classes(&classes.data, cx.today, LIST_LIMIT),
                materials: recent(materials.data),
                open_assessments: first(open),
            }
        }
        Role::Parent => {
            let class_filter = ClassFilter::default();
            let (classes, notifications) = tokio::try_join!(
                platform.classes(token, &class_filter),
                platform.notifications(token, None, None)
            )?;
            let unread = notifications.data.into_iter().filter(|n| !n.read).collect();
            DashboardView::Parent {
                name,
                upcoming: upcoming_classes(&classes.data, cx.today, LIST_LIMIT),
                unread: first(unread),
            }
        }
    };
    Ok(view)
}

fn first<T>(mut items: Vec<T>) -> Vec<T> {
    items.truncate(LIST_LIMIT);
    items
}

/// Newest materials first.
fn recent(mut materials: Vec<Material>) -> Vec<Material> {
    materials.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    first(materials)
}

// =============================================================================
// RENDERING
// =============================================================================

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin { name, stats, pending } => {
                heading(f, &format!("Welcome back, {name}"))?;
                write_platform_stats(f, stats)?;
                writeln!(f)?;
                heading(f, "Pending approvals")?;
                if pending.is_empty() {
                    writeln!(f, "Nothing waiting for approval.")?;
                }
                for user in pending {
                    writeln!(f, "{} <{}> {} | id {}", user.full_name, user.email, user.role.label(), user.id)?;
                }
                Ok(())
            }
            Self::Teacher { name, stats, upcoming, materials } => {
                heading(f, &format!("Welcome back, {name}"))?;
                writeln!(f, "Active classes: {} | Subjects: {}", stats.active_classes, stats.total_subjects)?;
                writeln!(f)?;
                write_upcoming(f, upcoming)?;
                writeln!(f)?;
                write_materials(f, "Your materials", materials)
            }
            Self::Student { name, stats, upcoming, materials, open_assessments } => {
                heading(f, &format!("Welcome back, {name}"))?;
                write_learner_stats(f, stats)?;
                writeln!(f)?;
                write_upcoming(f, upcoming)?;
                writeln!(f)?;
                write_materials(f, "Recent materials", materials)?;
                writeln!(f)?;
                heading(f, "Pending assessments")?;
                if open_assessments.is_empty() {
                    writeln!(f, "You're all caught up.")?;
                }
                for a in open_assessments {
                    let due = if a.due_date.is_empty() { "no due date" } else { a.due_date.as_str() };
                    writeln!(f, "{} ({}) | due {due} | id {}", a.title, a.subject, a.id)?;
                }
                Ok(())
            }
            Self::Parent { name, upcoming, unread } => {
                heading(f, &format!("Welcome back, {name}"))?;
                write_upcoming(f, upcoming)?;
                writeln!(f)?;
                heading(f, &format!("Unread notifications ({})", unread.len()))?;
                for n in unread {
                    writeln!(f, "{}: {}", n.title, n.message)?;
                }
                Ok(())
            }
        }
    }
}

fn write_platform_stats(f: &mut fmt::Formatter<'_>, stats: &DashboardStats) -> fmt::Result {
    writeln!(f, "Total users:       {}", stats.total_users)?;
    writeln!(f, "Active classes:    {}", stats.active_classes)?;
    writeln!(f, "Subjects:          {}", stats.total_subjects)?;
    writeln!(f, "Pending approvals: {}", stats.pending_approvals)
}

fn write_learner_stats(f: &mut fmt::Formatter<'_>, stats: &DashboardStats) -> fmt::Result {
    let completed = stats.completed_assignments.map_or_else(|| "-".to_owned(), |c| c.to_string());
    let attendance = stats.attendance_rate.map_or_else(|| "-".to_owned(), |r| format!("{r:.0}%"));
    let grade = stats.average_grade.map_or_else(|| "-".to_owned(), |g| format!("{g:.1}%"));
    writeln!(f, "Completed assignments: {completed} | Attendance: {attendance} | Average grade: {grade}")
}

fn write_upcoming(f: &mut fmt::Formatter<'_>, upcoming: &[Class]) -> fmt::Result {
    heading(f, "Upcoming classes")?;
    if upcoming.is_empty() {
        writeln!(f, "No upcoming classes.")?;
    }
    for class in upcoming {
        writeln!(
            f,
            "{} {}-{} {} ({}) | {}",
            class.date, class.start_time, class.end_time, class.title, class.subject, class.location
        )?;
    }
    Ok(())
}

fn write_materials(f: &mut fmt::Formatter<'_>, title: &str, materials: &[Material]) -> fmt::Result {
    heading(f, title)?;
    if materials.is_empty() {
        writeln!(f, "No materials yet.")?;
    }
    for m in materials {
        writeln!(f, "{} [{}] {}", m.title, m.subject, format_file_size(m.file_size))?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
