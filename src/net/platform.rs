//! Platform data client: users, classes, materials, assessments,
//! notifications, dashboard stats and the curriculum schedule.
//!
//! Every call is authenticated with the caller's bearer token; a 401 comes
//! back as [`ApiError::Unauthorized`] and is handled by the portal, not here.

use std::collections::BTreeMap;

use records::{
    Assessment, AssessmentFilter, AssessmentSubmission, Class, ClassFilter, ClassUpdate, DashboardStats, Material,
    MaterialFilter, NewAssessment, NewClass, NewMaterial, NewNotification, Notification, Paginated, ScheduleEntry,
    ScheduleFilter, User, UserFilter,
};
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;

use super::http::{ApiClient, ApiError, Download, path_segment};

/// A local file to attach to a material upload.
#[derive(Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

#[derive(Serialize)]
struct PageQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    limit: Option<u32>,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    answers: &'a BTreeMap<String, Value>,
}

#[derive(Clone)]
pub struct PlatformClient {
    api: ApiClient,
}

impl PlatformClient {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    // =========================================================================
    // USERS
    // =========================================================================

    pub async fn users(&self, token: &str, filter: &UserFilter) -> Result<Paginated<User>, ApiError> {
        self.api.get_query("/users", filter, Some(token)).await
    }

    pub async fn approve_user(&self, token: &str, user_id: &str) -> Result<User, ApiError> {
        self.api
            .put_empty(&format!("/users/{}/approve", path_segment(user_id)), Some(token))
            .await
    }

    pub async fn reject_user(&self, token: &str, user_id: &str) -> Result<(), ApiError> {
        self.api
            .put_unit(&format!("/users/{}/reject", path_segment(user_id)), Some(token))
            .await
    }

    // =========================================================================
    // CLASSES
    // =========================================================================

    pub async fn classes(&self, token: &str, filter: &ClassFilter) -> Result<Paginated<Class>, ApiError> {
        self.api.get_query("/classes", filter, Some(token)).await
    }

    pub async fn create_class(&self, token: &str, class: &NewClass) -> Result<Class, ApiError> {
        self.api.post("/classes", class, Some(token)).await
    }

    pub async fn update_class(&self, token: &str, class_id: &str, update: &ClassUpdate) -> Result<Class, ApiError> {
        self.api
            .put(&format!("/classes/{}", path_segment(class_id)), update, Some(token))
            .await
    }

    pub async fn enroll(&self, token: &str, class_id: &str) -> Result<(), ApiError> {
        self.api
            .post_unit(&format!("/classes/{}/enroll", path_segment(class_id)), Some(token))
            .await
    }

    // =========================================================================
    // MATERIALS
    // =========================================================================

    pub async fn materials(&self, token: &str, filter: &MaterialFilter) -> Result<Paginated<Material>, ApiError> {
        self.api.get_query("/materials", filter, Some(token)).await
    }

    /// Upload `file` with its metadata as one multipart request.
    pub async fn upload_material(
        &self,
        token: &str,
        material: &NewMaterial,
        file: FileUpload,
    ) -> Result<Material, ApiError> {
        let form = material_form(material, file)?;
        self.api.post_multipart("/materials", form, Some(token)).await
    }

    pub async fn download_material(&self, token: &str, material_id: &str) -> Result<Download, ApiError> {
        self.api
            .download(&format!("/materials/{}/download", path_segment(material_id)), Some(token))
            .await
    }

    // =========================================================================
    // ASSESSMENTS
    // =========================================================================

    pub async fn assessments(
        &self,
        token: &str,
        filter: &AssessmentFilter,
    ) -> Result<Paginated<Assessment>, ApiError> {
        self.api.get_query("/assessments", filter, Some(token)).await
    }

    pub async fn create_assessment(&self, token: &str, assessment: &NewAssessment) -> Result<Assessment, ApiError> {
        self.api.post("/assessments", assessment, Some(token)).await
    }

    /// Submit answers keyed by question id.
    pub async fn submit_assessment(
        &self,
        token: &str,
        assessment_id: &str,
        answers: &BTreeMap<String, Value>,
    ) -> Result<AssessmentSubmission, ApiError> {
        self.api
            .post(
                &format!("/assessments/{}/submit", path_segment(assessment_id)),
                &SubmitBody { answers },
                Some(token),
            )
            .await
    }

    pub async fn submissions(&self, token: &str, assessment_id: &str) -> Result<Vec<AssessmentSubmission>, ApiError> {
        self.api
            .get(&format!("/assessments/{}/submissions", path_segment(assessment_id)), Some(token))
            .await
    }

    // =========================================================================
    // NOTIFICATIONS
    // =========================================================================

    pub async fn notifications(
        &self,
        token: &str,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Paginated<Notification>, ApiError> {
        self.api
            .get_query("/notifications", &PageQuery { page, limit }, Some(token))
            .await
    }

    pub async fn mark_notification_read(&self, token: &str, notification_id: &str) -> Result<(), ApiError> {
        self.api
            .put_unit(&format!("/notifications/{}/read", path_segment(notification_id)), Some(token))
            .await
    }

    pub async fn create_notification(
        &self,
        token: &str,
        notification: &NewNotification,
    ) -> Result<Notification, ApiError> {
        self.api.post("/notifications", notification, Some(token)).await
    }

    // =========================================================================
    // AGGREGATES
    // =========================================================================

    pub async fn dashboard_stats(&self, token: &str) -> Result<DashboardStats, ApiError> {
        self.api.get("/dashboard/stats", Some(token)).await
    }

    pub async fn schedule(&self, token: &str, filter: &ScheduleFilter) -> Result<Vec<ScheduleEntry>, ApiError> {
        self.api
            .get_query("/curriculum/schedule", filter, Some(token))
            .await
    }
}

fn material_form(material: &NewMaterial, file: FileUpload) -> Result<Form, ApiError> {
    let mut part = Part::bytes(file.bytes).file_name(file.file_name);
    if let Some(content_type) = file.content_type {
        part = part
            .mime_str(&content_type)
            .map_err(|e| ApiError::ClientBuild(format!("invalid content type '{content_type}': {e}")))?;
    }

    Ok(Form::new()
        .text("title", material.title.clone())
        .text("description", material.description.clone())
        .text("classId", material.class_id.clone())
        .text("subject", material.subject.clone())
        .part("file", part))
}
