//! Classes, materials, assessments and curriculum schedule entries.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// CLASSES
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassStatus {
    #[default]
    Scheduled,
    Live,
    Completed,
    Cancelled,
}

impl ClassStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Live => "live",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

/// A scheduled class session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Class {
    pub id: String,
    pub title: String,
    pub description: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub subject: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    /// Local start time, `HH:MM`.
    pub start_time: String,
    /// Local end time, `HH:MM`.
    pub end_time: String,
    pub location: String,
    pub max_students: u32,
    pub enrolled_count: u32,
    pub status: ClassStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom_link: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Class {
    /// Seats left before the class is full.
    #[must_use]
    pub fn seats_left(&self) -> u32 {
        self.max_students.saturating_sub(self.enrolled_count)
    }
}

/// Body of `POST /classes`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewClass {
    pub title: String,
    pub description: String,
    pub teacher_id: String,
    pub subject: String,
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    pub max_students: u32,
    pub status: ClassStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_link: Option<String>,
}

/// Body of `PUT /classes/{id}`. Absent fields are left untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClassStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zoom_link: Option<String>,
}

/// Query filter for `GET /classes`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ClassStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// =============================================================================
// MATERIALS
// =============================================================================

/// An uploaded course material.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Material {
    pub id: String,
    pub title: String,
    pub description: String,
    pub file_name: String,
    pub file_url: String,
    /// Size in bytes.
    pub file_size: u64,
    pub file_type: String,
    pub class_id: String,
    pub class_name: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub subject: String,
    pub download_count: u32,
    pub created_at: String,
    pub updated_at: String,
}

/// Metadata sent alongside the file part of `POST /materials`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMaterial {
    pub title: String,
    pub description: String,
    pub class_id: String,
    pub subject: String,
}

/// Query filter for `GET /materials`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

// =============================================================================
// ASSESSMENTS
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    #[default]
    MultipleChoice,
    TrueFalse,
    ShortAnswer,
    Essay,
}

/// Expected answer: an option index for choice questions, text otherwise.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerKey {
    Index(u32),
    Text(String),
}

impl AnswerKey {
    /// Whether a submitted answer matches this key.
    ///
    /// Text answers compare trimmed and case-insensitively; an index key also
    /// accepts its decimal string form.
    #[must_use]
    pub fn matches(&self, answer: &Value) -> bool {
        match (self, answer) {
            (Self::Index(expected), Value::Number(n)) => n.as_u64() == Some(u64::from(*expected)),
            (Self::Index(expected), Value::String(s)) => s.trim().parse::<u32>().ok() == Some(*expected),
            (Self::Text(expected), Value::String(s)) => s.trim().eq_ignore_ascii_case(expected.trim()),
            (Self::Text(expected), Value::Bool(b)) => {
                expected.trim().eq_ignore_ascii_case(if *b { "true" } else { "false" })
            }
            _ => false,
        }
    }
}

impl Default for AnswerKey {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentQuestion {
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    pub correct_answer: AnswerKey,
    pub points: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssessmentStatus {
    #[default]
    Draft,
    Published,
    Closed,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Assessment {
    pub id: String,
    pub title: String,
    pub description: String,
    pub teacher_id: String,
    pub teacher_name: String,
    pub class_id: String,
    pub class_name: String,
    pub subject: String,
    pub questions: Vec<AssessmentQuestion>,
    /// Minutes allowed once started.
    pub time_limit: u32,
    pub max_attempts: u32,
    pub due_date: String,
    pub status: AssessmentStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl Assessment {
    /// Sum of question points.
    #[must_use]
    pub fn max_points(&self) -> u32 {
        self.questions.iter().map(|q| q.points).sum()
    }
}

/// Body of `POST /assessments`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewAssessment {
    pub title: String,
    pub description: String,
    pub teacher_id: String,
    pub class_id: String,
    pub subject: String,
    pub questions: Vec<AssessmentQuestion>,
    pub time_limit: u32,
    pub max_attempts: u32,
    pub due_date: String,
    pub status: AssessmentStatus,
}

/// Query filter for `GET /assessments`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

/// A graded or pending attempt at an assessment.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssessmentSubmission {
    pub id: String,
    pub assessment_id: String,
    pub student_id: String,
    pub student_name: String,
    /// Answers keyed by question id.
    pub answers: BTreeMap<String, Value>,
    pub score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub submitted_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graded_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

// =============================================================================
// CURRICULUM
// =============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    #[default]
    Lecture,
    Lab,
    Seminar,
    Workshop,
    #[serde(other)]
    Other,
}

/// One entry of the curriculum calendar.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleEntry {
    pub id: String,
    pub title: String,
    pub teacher: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
    pub start_time: String,
    pub end_time: String,
    pub location: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
}

/// Query filter for `GET /curriculum/schedule`.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}
