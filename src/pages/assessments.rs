//! Assessments: listing, local scoring and timer formatting.

use std::collections::BTreeMap;
use std::fmt;

use records::{Assessment, AssessmentFilter, AssessmentStatus, Role};
use serde_json::Value;
use time::Date;

use super::{LoadContext, heading, parse_date};
use crate::net::http::ApiError;
use crate::net::identity::can_create_assessments;

// =============================================================================
// SCORING
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Score {
    pub correct: usize,
    pub total: usize,
    /// `correct / total` as a whole percentage, rounded half up.
    pub percentage: u32,
    pub points: u32,
    pub max_points: u32,
}

/// Score `answers` (keyed by question id) against the assessment's keys.
///
/// Unanswered questions count as wrong. An assessment without questions
/// scores zero.
#[must_use]
pub fn score_answers(assessment: &Assessment, answers: &BTreeMap<String, Value>) -> Score {
    let mut score = Score { total: assessment.questions.len(), max_points: assessment.max_points(), ..Score::default() };
    for question in &assessment.questions {
        if answers.get(&question.id).is_some_and(|a| question.correct_answer.matches(a)) {
            score.correct += 1;
            score.points += question.points;
        }
    }
    score.percentage = rounded_percentage(score.correct, score.total);
    score
}

fn rounded_percentage(correct: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let pct = (correct * 200 + total) / (total * 2);
    u32::try_from(pct).unwrap_or(u32::MAX)
}

/// `m:ss` for a countdown of `seconds`.
#[must_use]
pub fn format_clock(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Published and not yet past due. An assessment without a due date stays open.
#[must_use]
pub fn is_open(assessment: &Assessment, today: Date) -> bool {
    assessment.status == AssessmentStatus::Published
        && (assessment.due_date.trim().is_empty()
            || due_date(assessment).is_none_or(|due| due >= today))
}

fn due_date(assessment: &Assessment) -> Option<Date> {
    let date_part = assessment.due_date.get(..10).unwrap_or(&assessment.due_date);
    parse_date(date_part)
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub struct AssessmentsView {
    pub assessments: Vec<Assessment>,
    pub today: Date,
    pub can_create: bool,
    pub can_submit: bool,
}

impl AssessmentsView {
    /// Assessments still open for submission.
    #[must_use]
    pub fn open(&self) -> Vec<&Assessment> {
        self.assessments.iter().filter(|a| is_open(a, self.today)).collect()
    }
}

pub async fn load(cx: &LoadContext) -> Result<AssessmentsView, ApiError> {
    let filter = match cx.user.role {
        Role::Teacher => AssessmentFilter { teacher_id: Some(cx.user.id.clone()), ..AssessmentFilter::default() },
        Role::Student => AssessmentFilter { student_id: Some(cx.user.id.clone()), ..AssessmentFilter::default() },
        Role::Admin | Role::Parent => AssessmentFilter::default(),
    };
    let page = cx.platform.assessments(&cx.token, &filter).await?;
    let mut assessments = page.data;
    assessments.sort_by(|a, b| a.due_date.cmp(&b.due_date));

    Ok(AssessmentsView {
        assessments,
        today: cx.today,
        can_create: can_create_assessments(Some(&cx.user)),
        can_submit: cx.user.role == Role::Student,
    })
}

fn status_label(status: AssessmentStatus) -> &'static str {
    match status {
        AssessmentStatus::Draft => "draft",
        AssessmentStatus::Published => "published",
        AssessmentStatus::Closed => "closed",
    }
}

impl fmt::Display for AssessmentsView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        heading(f, "Assessments")?;
        writeln!(f, "{} total, {} open", self.assessments.len(), self.open().len())?;
        writeln!(f)?;

        if self.assessments.is_empty() {
            writeln!(f, "No assessments yet.")?;
        }
        for a in &self.assessments {
            let due = if a.due_date.is_empty() { "no due date" } else { a.due_date.as_str() };
            writeln!(f, "[{}] {} ({})", status_label(a.status), a.title, a.subject)?;
            writeln!(
                f,
                "    {} questions | {} points | time limit {} | due {due}",
                a.questions.len(),
                a.max_points(),
                format_clock(u64::from(a.time_limit) * 60)
            )?;
            writeln!(f, "    Class: {} | Teacher: {} | id {}", a.class_name, a.teacher_name, a.id)?;
        }

        writeln!(f)?;
        if self.can_submit {
            writeln!(f, "Submit: eduportal assessments submit <ASSESSMENT ID> --answer <QUESTION ID>=<ANSWER> ...")?;
        }
        if self.can_create {
            writeln!(f, "Submissions: eduportal assessments submissions <ASSESSMENT ID>")?;
        }
        Ok(())
    }
}

/// Local result shown after answering, before the platform grades it.
impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} correct ({}%), {}/{} points",
            self.correct, self.total, self.percentage, self.points, self.max_points
        )
    }
}

#[cfg(test)]
#[path = "assessments_test.rs"]
mod tests;
