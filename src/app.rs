//! Portal: one navigation per invocation, from stored session to rendered page.
//!
//! SYSTEM CONTEXT
//! ==============
//! The binary builds a [`Portal`] around a session context and the platform
//! data client, then asks it to open a location or run an action. Opening a
//! location runs the full flow:
//!
//! ```text
//! restore session -> resolve route -> guard -> spawn load -> page
//!                                       |
//!                                       +-> login / pending / unauthorized
//! ```
//!
//! DESIGN
//! ======
//! A protected view's load runs on its own task behind a [`PendingLoad`].
//! Dropping the pending load aborts the task, and with it the in-flight
//! request, so a navigation that is superseded or torn down never completes
//! in the background.
//!
//! ERROR HANDLING
//! ==============
//! A 401 from any authenticated call expires the session and sends the user
//! to the login view with an expiry notice. Other load failures are logged
//! and rendered as a "could not load" notice. Actions return
//! [`PortalError`] so the binary can report them and exit non-zero.

use std::collections::BTreeMap;
use std::future::Future;

use records::{
    Assessment, AssessmentFilter, AssessmentSubmission, Class, ClassUpdate, Material, NewAssessment, NewClass,
    NewMaterial, NewNotification, Notification, Paginated, ProfileUpdate, Role, ScheduleFilter, User,
};
use serde_json::Value;
use time::{Date, PrimitiveDateTime};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::Instrument;

use crate::guard::{self, Admission, RoleSet};
use crate::net::http::{ApiError, Download};
use crate::net::identity::AuthFailure;
use crate::net::platform::{FileUpload, PlatformClient};
use crate::pages::assessments::{Score, score_answers};
use crate::pages::curriculum::{Reminder, pending_reminders};
use crate::pages::{self, HomeView, LoadContext, LoginView, Notice, Page, RegisterView, View};
use crate::routes::{DEFAULT_AFTER_LOGIN, Location, Route, after_login_target, login_redirect, menu_for};
use crate::session::context::SESSION_EXPIRED;
use crate::session::forms::{FormError, Registration, login_credentials};
use crate::session::{RestorePhase, SessionContext};

const TEACHING: RoleSet = RoleSet::of(&[Role::Admin, Role::Teacher]);
const LEARNING: RoleSet = RoleSet::of(&[Role::Student]);
const ADMINISTRATION: RoleSet = RoleSet::of(&[Role::Admin]);
const CALENDAR: RoleSet = RoleSet::of(&[Role::Teacher, Role::Student, Role::Parent]);

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PortalError {
    #[error("you are not signed in; run `eduportal login` first")]
    SignedOut,

    #[error("{}", SESSION_EXPIRED)]
    SessionExpired,

    #[error("your account is waiting for administrator approval")]
    PendingApproval,

    #[error("your role cannot {action}")]
    Forbidden { action: &'static str },

    #[error(transparent)]
    Form(#[from] FormError),

    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("page load was cancelled")]
    Cancelled,

    #[error("page load crashed: {0}")]
    LoadPanicked(String),
}

// =============================================================================
// NAVIGATION
// =============================================================================

/// Result of starting a navigation.
pub enum Navigation {
    /// Nothing to load; the page is final.
    Ready(Page),
    /// A protected view is loading.
    Loading(PendingLoad),
}

/// A view load running on its own task. Dropping it aborts the load.
pub struct PendingLoad {
    route: Route,
    location: Location,
    handle: JoinHandle<Result<Option<View>, ApiError>>,
}

impl PendingLoad {
    fn spawn(route: Route, cx: LoadContext) -> Self {
        let location = cx.location.clone();
        let span = tracing::info_span!("load", route = %route);
        let task_route = route.clone();
        let handle = tokio::spawn(async move { pages::load(&task_route, cx).await }.instrument(span));
        Self { route, location, handle }
    }

    #[must_use]
    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Handle for observing or cancelling the load from elsewhere.
    #[must_use]
    pub fn abort_handle(&self) -> AbortHandle {
        self.handle.abort_handle()
    }

    /// Wait for the load.
    ///
    /// # Errors
    ///
    /// Returns the load's [`ApiError`], [`PortalError::Cancelled`] if it was
    /// aborted, or [`PortalError::LoadPanicked`].
    pub async fn finish(mut self) -> Result<Option<View>, PortalError> {
        match (&mut self.handle).await {
            Ok(result) => Ok(result?),
            Err(e) if e.is_cancelled() => Err(PortalError::Cancelled),
            Err(e) => Err(PortalError::LoadPanicked(e.to_string())),
        }
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            tracing::debug!(route = %self.route, "aborting page load");
            self.handle.abort();
        }
    }
}

/// Outcome of an assessment submission: the platform's record plus a local
/// score when the answer keys were available.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmitOutcome {
    pub preview: Option<Score>,
    pub submission: AssessmentSubmission,
}

// =============================================================================
// PORTAL
// =============================================================================

pub struct Portal {
    session: SessionContext,
    platform: PlatformClient,
    today: Date,
}

impl Portal {
    pub fn new(session: SessionContext, platform: PlatformClient, today: Date) -> Self {
        Self { session, platform, today }
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Restore the stored session once; later calls are no-ops.
    pub async fn restore(&mut self) -> RestorePhase {
        self.session.restore().await
    }

    /// Restore, then open `raw` to a finished page.
    pub async fn open(&mut self, raw: &str) -> Page {
        self.restore().await;
        match self.begin(raw) {
            Navigation::Ready(page) => page,
            Navigation::Loading(pending) => self.complete(pending).await,
        }
    }

    /// Resolve and guard `raw` against the current session.
    ///
    /// Public routes and guard redirects are final; an admitted protected
    /// route starts its load.
    pub fn begin(&self, raw: &str) -> Navigation {
        let location = Location::parse(raw);
        let route = Route::resolve(&location.path);

        let Some(required) = route.required_roles() else {
            return Navigation::Ready(self.public_page(route, &location));
        };

        match guard::evaluate(&self.session.snapshot(), required, &location.to_target()) {
            Admission::Loading => Navigation::Ready(self.page(route, View::Notice(Notice::Loading))),
            Admission::RedirectToLogin { from } => {
                tracing::debug!(to = %login_redirect(&from), "not signed in; redirecting");
                Navigation::Ready(self.login_page(Some(from)))
            }
            Admission::PendingApproval => Navigation::Ready(self.page(route, View::Notice(Notice::PendingApproval))),
            Admission::RedirectToUnauthorized => {
                tracing::debug!(route = %route, "role not admitted");
                Navigation::Ready(self.page(Route::Unauthorized, View::Notice(Notice::Unauthorized)))
            }
            Admission::Render => match self.load_context(location) {
                Some(cx) => Navigation::Loading(PendingLoad::spawn(route, cx)),
                None => Navigation::Ready(self.login_page(Some(route.path().to_owned()))),
            },
        }
    }

    /// Wait for a pending load and turn its outcome into a page.
    pub async fn complete(&mut self, pending: PendingLoad) -> Page {
        let route = pending.route.clone();
        let from = pending.location.to_target();

        match pending.finish().await {
            Ok(Some(view)) => self.page(route, view),
            Ok(None) => {
                let path = route.path().to_owned();
                self.page(route, View::Notice(Notice::NotFound { path }))
            }
            Err(PortalError::Api(e)) if e.is_unauthorized() => {
                self.session.expire();
                self.login_page(Some(from))
            }
            Err(e) => {
                tracing::error!(route = %route, error = %e, "page load failed");
                let notice = Notice::LoadFailed { page: route.title().to_owned(), reason: e.to_string() };
                self.page(route, View::Notice(notice))
            }
        }
    }

    fn load_context(&self, location: Location) -> Option<LoadContext> {
        Some(LoadContext {
            platform: self.platform.clone(),
            token: self.session.token()?.to_owned(),
            user: self.session.user()?.clone(),
            location,
            today: self.today,
        })
    }

    fn public_page(&self, route: Route, location: &Location) -> Page {
        let view = match &route {
            Route::Home => View::Home(HomeView { signed_in: self.session.user().is_some() }),
            Route::Login => return self.login_page(location.param("from").map(str::to_owned)),
            Route::Register => View::Register(RegisterView::default()),
            Route::Unauthorized => View::Notice(Notice::Unauthorized),
            Route::NotFound { path } => View::Notice(Notice::NotFound { path: path.clone() }),
            Route::Dashboard
            | Route::Admin
            | Route::Classes
            | Route::Materials
            | Route::Assessments
            | Route::Curriculum => View::Notice(Notice::Loading),
        };
        self.page(route, view)
    }

    fn login_page(&self, from: Option<String>) -> Page {
        let view = LoginView { from, notice: self.session.notice().map(str::to_owned), error: None };
        self.page(Route::Login, View::Login(view))
    }

    fn page(&self, route: Route, view: View) -> Page {
        let user = self.session.user().cloned();
        let menu = user
            .as_ref()
            .filter(|u| !u.is_pending())
            .map(|u| menu_for(u.role))
            .unwrap_or_default();
        Page { route, user, menu, view }
    }

    // =========================================================================
    // AUTH ACTIONS
    // =========================================================================

    /// Sign in and return the location to open next.
    ///
    /// # Errors
    ///
    /// Returns a form error before any request, or the platform's reason.
    pub async fn login(
        &mut self,
        email: &str,
        password: &str,
        remember_me: bool,
        from: Option<&str>,
    ) -> Result<String, PortalError> {
        let credentials = login_credentials(email, password, remember_me)?;
        self.session.login(&credentials).await?;
        Ok(after_login_target(from))
    }

    /// Register and return the location to open next.
    ///
    /// # Errors
    ///
    /// Returns a validation message or the platform's reason.
    pub async fn register(&mut self, registration: Registration) -> Result<String, PortalError> {
        self.session.register(registration).await?;
        Ok(DEFAULT_AFTER_LOGIN.to_owned())
    }

    pub async fn logout(&mut self) {
        self.restore().await;
        self.session.logout().await;
    }

    /// The verified signed-in user, if any.
    pub async fn whoami(&mut self) -> Option<&User> {
        self.restore().await;
        self.session.user()
    }

    /// # Errors
    ///
    /// Returns [`PortalError::SignedOut`] without a session and
    /// [`PortalError::SessionExpired`] when the token is rejected.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<&User, PortalError> {
        self.restore().await;
        if self.session.user().is_none() {
            return Err(PortalError::SignedOut);
        }
        self.session.update_profile(update).await.map_err(|e| {
            if e.is_unauthorized() { PortalError::SessionExpired } else { PortalError::Api(e) }
        })
    }

    // =========================================================================
    // DATA ACTIONS
    // =========================================================================

    /// Check that the session may run an action reserved for `roles`.
    ///
    /// # Errors
    ///
    /// Returns why the action is refused.
    pub async fn authorize(&mut self, roles: RoleSet, action: &'static str) -> Result<String, PortalError> {
        self.restore().await;
        match guard::evaluate(&self.session.snapshot(), roles, action) {
            Admission::Render => self.session.token().map(str::to_owned).ok_or(PortalError::SignedOut),
            Admission::Loading | Admission::RedirectToLogin { .. } => Err(PortalError::SignedOut),
            Admission::PendingApproval => Err(PortalError::PendingApproval),
            Admission::RedirectToUnauthorized => Err(PortalError::Forbidden { action }),
        }
    }

    /// Run an authenticated platform call, expiring the session on a 401.
    async fn call<T, F, Fut>(&mut self, roles: RoleSet, action: &'static str, request: F) -> Result<T, PortalError>
    where
        F: FnOnce(PlatformClient, String) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let token = self.authorize(roles, action).await?;
        match request(self.platform.clone(), token).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_unauthorized() => {
                self.session.expire();
                Err(PortalError::SessionExpired)
            }
            Err(e) => {
                tracing::warn!(action, error = %e, "platform call failed");
                Err(PortalError::Api(e))
            }
        }
    }

    pub async fn create_class(&mut self, class: &NewClass) -> Result<Class, PortalError> {
        self.call(TEACHING, "schedule classes", |p, t| async move { p.create_class(&t, class).await })
            .await
    }

    pub async fn update_class(&mut self, class_id: &str, update: &ClassUpdate) -> Result<Class, PortalError> {
        self.call(TEACHING, "edit classes", |p, t| async move { p.update_class(&t, class_id, update).await })
            .await
    }

    pub async fn enroll(&mut self, class_id: &str) -> Result<(), PortalError> {
        self.call(LEARNING, "enroll in classes", |p, t| async move { p.enroll(&t, class_id).await })
            .await
    }

    pub async fn upload_material(&mut self, material: &NewMaterial, file: FileUpload) -> Result<Material, PortalError> {
        self.call(TEACHING, "upload materials", |p, t| async move { p.upload_material(&t, material, file).await })
            .await
    }

    pub async fn download_material(&mut self, material_id: &str) -> Result<Download, PortalError> {
        self.call(RoleSet::ANY, "download materials", |p, t| async move {
            p.download_material(&t, material_id).await
        })
        .await
    }

    pub async fn create_assessment(&mut self, assessment: &NewAssessment) -> Result<Assessment, PortalError> {
        self.call(TEACHING, "create assessments", |p, t| async move { p.create_assessment(&t, assessment).await })
            .await
    }

    /// Submit answers and score them locally against the assessment's keys.
    ///
    /// # Errors
    ///
    /// Fails when the submission fails; a missing local preview is not an
    /// error.
    pub async fn submit_assessment(
        &mut self,
        assessment_id: &str,
        answers: &BTreeMap<String, Value>,
    ) -> Result<SubmitOutcome, PortalError> {
        self.authorize(LEARNING, "take assessments").await?;
        let student_id = self.session.user().map(|u| u.id.clone());
        let filter = AssessmentFilter { student_id, ..AssessmentFilter::default() };
        let listed = self
            .call(LEARNING, "take assessments", |p, t| async move { p.assessments(&t, &filter).await })
            .await?;
        let preview = listed
            .data
            .iter()
            .find(|a| a.id == assessment_id)
            .map(|a| score_answers(a, answers));

        let submission = self
            .call(LEARNING, "take assessments", |p, t| async move {
                p.submit_assessment(&t, assessment_id, answers).await
            })
            .await?;
        Ok(SubmitOutcome { preview, submission })
    }

    pub async fn submissions(&mut self, assessment_id: &str) -> Result<Vec<AssessmentSubmission>, PortalError> {
        self.call(TEACHING, "review submissions", |p, t| async move { p.submissions(&t, assessment_id).await })
            .await
    }

    pub async fn notifications(
        &mut self,
        page: Option<u32>,
        limit: Option<u32>,
    ) -> Result<Paginated<Notification>, PortalError> {
        self.call(RoleSet::ANY, "read notifications", |p, t| async move { p.notifications(&t, page, limit).await })
            .await
    }

    pub async fn mark_notification_read(&mut self, notification_id: &str) -> Result<(), PortalError> {
        self.call(RoleSet::ANY, "read notifications", |p, t| async move {
            p.mark_notification_read(&t, notification_id).await
        })
        .await
    }

    /// Send a notification from the signed-in user.
    ///
    /// # Errors
    ///
    /// Fails when the session may not send notifications or the platform
    /// rejects the message.
    pub async fn create_notification(&mut self, notification: NewNotification) -> Result<Notification, PortalError> {
        self.authorize(TEACHING, "send notifications").await?;
        let sender_id = self.session.user().map(|u| u.id.clone()).unwrap_or_default();
        let notification = NewNotification { sender_id, ..notification };
        self.call(TEACHING, "send notifications", |p, t| async move {
            p.create_notification(&t, &notification).await
        })
        .await
    }

    pub async fn approve_user(&mut self, user_id: &str) -> Result<User, PortalError> {
        self.call(ADMINISTRATION, "approve accounts", |p, t| async move { p.approve_user(&t, user_id).await })
            .await
    }

    pub async fn reject_user(&mut self, user_id: &str) -> Result<(), PortalError> {
        self.call(ADMINISTRATION, "reject accounts", |p, t| async move { p.reject_user(&t, user_id).await })
            .await
    }

    /// Reminders for scheduled sessions that have not fired yet.
    pub async fn reminders(&mut self, now: PrimitiveDateTime) -> Result<Vec<Reminder>, PortalError> {
        let entries = self
            .call(CALENDAR, "view the curriculum", |p, t| async move {
                p.schedule(&t, &ScheduleFilter::default()).await
            })
            .await?;
        let mut reminders = pending_reminders(&entries, now);
        reminders.sort_by_key(|r| r.at);
        Ok(reminders)
    }
}

#[cfg(test)]
#[path = "app_test.rs"]
mod tests;
