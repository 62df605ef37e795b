//! Notifications and dashboard aggregates.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Class,
    Assessment,
    Material,
    #[default]
    System,
    Announcement,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Notification {
    pub id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub recipient_id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub read: bool,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Body of `POST /notifications`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub recipient_id: String,
    pub sender_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

/// Aggregates served by `GET /dashboard/stats`. The optional fields are only
/// reported for learner-facing roles.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_users: u64,
    pub active_classes: u64,
    pub total_subjects: u64,
    pub pending_approvals: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_assignments: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendance_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_grade: Option<f64>,
}
