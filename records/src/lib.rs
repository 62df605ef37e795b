//! Shared record schema for the education platform's REST boundary.
//!
//! This crate owns the JSON representation used by the identity gateway, the
//! platform data client and the views. Field names follow the platform's
//! camelCase wire format; optional or backend-specific fields default so a
//! sparse response still decodes.

mod academics;
mod identity;
mod messaging;

pub use academics::{
    AnswerKey, Assessment, AssessmentFilter, AssessmentQuestion, AssessmentStatus, AssessmentSubmission, Class,
    ClassFilter, ClassStatus, ClassUpdate, Material, MaterialFilter, NewAssessment, NewClass, NewMaterial,
    QuestionKind, ScheduleEntry, ScheduleFilter, SessionKind,
};
pub use identity::{
    AuthGrant, LoginCredentials, ParseRecordError, ProfileUpdate, RegisterRequest, Role, User, UserFilter, UserStatus,
};
pub use messaging::{DashboardStats, NewNotification, Notification, NotificationKind};

use serde::{Deserialize, Serialize};

// =============================================================================
// ENVELOPES
// =============================================================================

/// Response envelope wrapped around every platform payload.
///
/// `success == false` responses carry a human-readable reason in either
/// `message` or `error` depending on which backend produced them.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self { success: true, data: Some(data), message: None, error: None }
    }

    /// Failed envelope carrying `message`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self { success: false, data: None, message: Some(message.into()), error: None }
    }

    /// Reason reported by the platform, preferring `message` over `error`.
    #[must_use]
    pub fn failure_message(&self) -> Option<&str> {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.error.as_deref().filter(|e| !e.trim().is_empty()))
    }
}

/// One page of a paginated list endpoint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total_pages: u32,
}

impl<T> Paginated<T> {
    /// Single page holding every item.
    #[must_use]
    pub fn single(data: Vec<T>) -> Self {
        let total = data.len() as u64;
        let limit = u32::try_from(data.len()).unwrap_or(u32::MAX);
        Self { data, total, page: 1, limit, total_pages: 1 }
    }
}

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;
