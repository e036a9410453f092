//! `reqwest` client for the Studyflow REST API
//!
//! All endpoints live under `<api_url>/api/`. Every call made after login
//! carries `Authorization: Bearer <token>`, taken from the client's
//! [`RequestContext`]. The context is an explicit value: it is set on login
//! or restore, cleared on logout, and can be inspected in tests.
//!
//! # Status mapping
//!
//! - `401` on an authenticated call: [`StudyflowError::SessionExpired`]
//! - `401` / `400` on login or register: [`StudyflowError::Authentication`]
//! - `403`: [`StudyflowError::Forbidden`]
//! - `404`: [`StudyflowError::NotFound`]
//! - anything else non-2xx: [`StudyflowError::Api`]
//!
//! The `detail` field of FastAPI error bodies is surfaced as the message.

use std::sync::Arc;
use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;

use crate::api::types::{
    Announcement, ChatSession, ChatTurn, DoubtAnswer, DoubtRequest, ImageAnalysisRequest,
    ImageFeedback, LeaderboardEntry, LoginRequest, Message, NewAnnouncement, NewMessage,
    NewStudent, NewSubmission, NewTask, Progress, RegisterRequest, Role, Submission,
    SubmissionReview, Task, TaskUpdate, TokenResponse, User,
};
use crate::api::ChatApi;
use crate::error::{Result, StudyflowError};

/// Per-client request settings: where to send requests and which bearer
/// token (if any) to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Base URL of the API, always ending in `/api/`
    pub api_base: Url,
    /// Bearer token; `None` before login and after logout
    pub token: Option<String>,
}

impl RequestContext {
    /// Build a context for a backend root URL such as `http://localhost:8000`.
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::Config`] if the URL cannot be a base URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use studyflow::api::RequestContext;
    ///
    /// let ctx = RequestContext::new("http://localhost:8000").unwrap();
    /// assert_eq!(ctx.api_base.as_str(), "http://localhost:8000/api/");
    /// assert!(ctx.token.is_none());
    /// ```
    pub fn new(api_url: &str) -> Result<Self> {
        let mut root = Url::parse(api_url)
            .map_err(|e| StudyflowError::Config(format!("Invalid api_url {}: {}", api_url, e)))?;
        if root.cannot_be_a_base() {
            return Err(StudyflowError::Config(format!("api_url is not a base URL: {}", api_url)).into());
        }
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }
        let api_base = root
            .join("api/")
            .map_err(|e| StudyflowError::Config(format!("Invalid api_url {}: {}", api_url, e)))?;
        Ok(Self {
            api_base,
            token: None,
        })
    }

    /// Resolve an endpoint path relative to the API base.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.api_base
            .join(path.trim_start_matches('/'))
            .map_err(|e| StudyflowError::Config(format!("Invalid endpoint {}: {}", path, e)).into())
    }
}

/// Async client for every REST endpoint the application consumes.
///
/// Cloning is cheap and clones share the same [`RequestContext`], so a
/// logout performed through one handle is seen by all of them.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use studyflow::api::ApiClient;
///
/// # async fn example() -> studyflow::error::Result<()> {
/// let client = ApiClient::new("http://localhost:8000", Duration::from_secs(10))?;
/// let token = client.login("admin@example.com", "secret").await?;
/// client.set_token(Some(token.access_token)).await;
/// let students = client.students().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    context: Arc<RwLock<RequestContext>>,
}

impl ApiClient {
    /// Create a client for the backend at `api_url`.
    ///
    /// # Arguments
    ///
    /// * `api_url` - Backend root URL (the `/api` prefix is added here)
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::Config`] for an unusable URL and
    /// [`StudyflowError::Http`] if the HTTP client cannot be built.
    pub fn new(api_url: &str, timeout: Duration) -> Result<Self> {
        let context = RequestContext::new(api_url)?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(StudyflowError::Http)?;
        Ok(Self {
            http,
            context: Arc::new(RwLock::new(context)),
        })
    }

    /// Snapshot of the current request context.
    pub async fn context(&self) -> RequestContext {
        self.context.read().await.clone()
    }

    /// Replace the bearer token (`None` clears it).
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use studyflow::api::ApiClient;
    ///
    /// # tokio_test::block_on(async {
    /// let client = ApiClient::new("http://localhost:8000", Duration::from_secs(5)).unwrap();
    /// let other = client.clone();
    /// client.set_token(Some("tok".to_string())).await;
    /// assert!(other.has_token().await);
    /// client.set_token(None).await;
    /// assert!(!other.has_token().await);
    /// # });
    /// ```
    pub async fn set_token(&self, token: Option<String>) {
        let mut ctx = self.context.write().await;
        ctx.token = token;
    }

    /// Returns `true` when a bearer token is set.
    pub async fn has_token(&self) -> bool {
        self.context.read().await.token.is_some()
    }

    // -- auth ---------------------------------------------------------------

    /// `POST /auth/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse> {
        let body = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        self.call(Method::POST, "auth/login", &[], Some(&body), false)
            .await
    }

    /// `POST /auth/register`
    pub async fn register(
        &self,
        email: &str,
        name: &str,
        password: &str,
        role: Role,
    ) -> Result<TokenResponse> {
        let body = RegisterRequest {
            email: email.to_string(),
            name: name.to_string(),
            password: password.to_string(),
            role,
        };
        self.call(Method::POST, "auth/register", &[], Some(&body), false)
            .await
    }

    // -- users --------------------------------------------------------------

    /// `GET /users/me`
    pub async fn me(&self) -> Result<User> {
        self.get("users/me").await
    }

    /// `GET /users/students` (admin only)
    pub async fn students(&self) -> Result<Vec<User>> {
        self.get("users/students").await
    }

    /// `POST /users/students` (admin only)
    pub async fn create_student(&self, student: &NewStudent) -> Result<User> {
        self.call(Method::POST, "users/students", &[], Some(student), true)
            .await
    }

    // -- tasks --------------------------------------------------------------

    /// `GET /tasks/`: all tasks for admins, assigned tasks for students.
    pub async fn tasks(&self) -> Result<Vec<Task>> {
        self.get("tasks/").await
    }

    /// `GET /tasks/today` (students only)
    pub async fn today_tasks(&self) -> Result<Vec<Task>> {
        self.get("tasks/today").await
    }

    /// `POST /tasks/`
    pub async fn create_task(&self, task: &NewTask) -> Result<Task> {
        self.call(Method::POST, "tasks/", &[], Some(task), true)
            .await
    }

    /// `PUT /tasks/{id}`
    pub async fn update_task(&self, task_id: &str, update: &TaskUpdate) -> Result<Task> {
        let path = format!("tasks/{}", task_id);
        self.call(Method::PUT, &path, &[], Some(update), true).await
    }

    /// `DELETE /tasks/{id}`
    pub async fn delete_task(&self, task_id: &str) -> Result<()> {
        let path = format!("tasks/{}", task_id);
        self.call_discard(Method::DELETE, &path, &[]).await
    }

    // -- submissions --------------------------------------------------------

    /// `GET /submissions/`
    pub async fn submissions(&self) -> Result<Vec<Submission>> {
        self.get("submissions/").await
    }

    /// `POST /submissions/`
    pub async fn submit(&self, submission: &NewSubmission) -> Result<Submission> {
        self.call(Method::POST, "submissions/", &[], Some(submission), true)
            .await
    }

    /// `PUT /submissions/{id}` (admin review)
    pub async fn review_submission(
        &self,
        submission_id: &str,
        review: &SubmissionReview,
    ) -> Result<Submission> {
        let path = format!("submissions/{}", submission_id);
        self.call(Method::PUT, &path, &[], Some(review), true).await
    }

    /// `POST /submissions/{id}/like`
    pub async fn like_submission(&self, submission_id: &str) -> Result<()> {
        let path = format!("submissions/{}/like", submission_id);
        self.call_discard(Method::POST, &path, &[]).await
    }

    // -- chat ---------------------------------------------------------------

    /// `GET /chat/sessions`
    pub async fn chat_sessions(&self) -> Result<Vec<ChatSession>> {
        self.get("chat/sessions").await
    }

    /// `POST /chat/sessions?student_id=` (admin only, get-or-create)
    pub async fn create_chat_session(&self, student_id: &str) -> Result<ChatSession> {
        let body: Option<&()> = None;
        self.call(
            Method::POST,
            "chat/sessions",
            &[("student_id", student_id.to_string())],
            body,
            true,
        )
        .await
    }

    /// `GET /chat/messages/{chat_id}`
    pub async fn messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        let path = format!("chat/messages/{}", chat_id);
        self.get(&path).await
    }

    /// `POST /chat/messages`: REST fallback for sending; the chat view
    /// publishes over the event channel instead.
    pub async fn post_message(&self, message: &NewMessage) -> Result<Message> {
        self.call(Method::POST, "chat/messages", &[], Some(message), true)
            .await
    }

    /// `DELETE /chat/messages/{id}?delete_for_everyone=`
    pub async fn remove_message(&self, message_id: &str, for_everyone: bool) -> Result<()> {
        let path = format!("chat/messages/{}", message_id);
        self.call_discard(
            Method::DELETE,
            &path,
            &[("delete_for_everyone", for_everyone.to_string())],
        )
        .await
    }

    // -- progress -----------------------------------------------------------

    /// `GET /progress/me` (students only)
    pub async fn my_progress(&self) -> Result<Progress> {
        self.get("progress/me").await
    }

    /// `GET /progress/leaderboard` (admin only)
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        self.get("progress/leaderboard").await
    }

    /// `GET /progress/student/{id}` (admin only)
    pub async fn student_progress(&self, student_id: &str) -> Result<Progress> {
        let path = format!("progress/student/{}", student_id);
        self.get(&path).await
    }

    // -- announcements ------------------------------------------------------

    /// `GET /announcements/`
    pub async fn announcements(&self) -> Result<Vec<Announcement>> {
        self.get("announcements/").await
    }

    /// `POST /announcements/`
    pub async fn create_announcement(&self, announcement: &NewAnnouncement) -> Result<Announcement> {
        self.call(Method::POST, "announcements/", &[], Some(announcement), true)
            .await
    }

    /// `DELETE /announcements/{id}`
    pub async fn delete_announcement(&self, announcement_id: &str) -> Result<()> {
        let path = format!("announcements/{}", announcement_id);
        self.call_discard(Method::DELETE, &path, &[]).await
    }

    // -- ai -----------------------------------------------------------------

    /// `POST /ai/doubt-solver`
    pub async fn ask_doubt(&self, question: &str, history: &[ChatTurn]) -> Result<String> {
        let body = DoubtRequest {
            question: question.to_string(),
            chat_history: history.to_vec(),
        };
        let answer: DoubtAnswer = self
            .call(Method::POST, "ai/doubt-solver", &[], Some(&body), true)
            .await?;
        Ok(answer.answer)
    }

    /// `POST /ai/analyze-image`
    pub async fn analyze_image(&self, image_base64: String, prompt: &str) -> Result<String> {
        let body = ImageAnalysisRequest {
            image_base64,
            prompt: prompt.to_string(),
        };
        let feedback: ImageFeedback = self
            .call(Method::POST, "ai/analyze-image", &[], Some(&body), true)
            .await?;
        Ok(feedback.feedback)
    }

    // -- plumbing -----------------------------------------------------------

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let body: Option<&()> = None;
        self.call(Method::GET, path, &[], body, true).await
    }

    /// Issue a request whose response body is irrelevant.
    async fn call_discard(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<()> {
        let body: Option<&()> = None;
        let _: serde_json::Value = self.call(method, path, query, body, true).await?;
        Ok(())
    }

    async fn call<B, T>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        authenticated: bool,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let ctx = self.context().await;
        let url = ctx.endpoint(path)?;

        let mut req = self.http.request(method.clone(), url);
        if !query.is_empty() {
            req = req.query(query);
        }
        if authenticated {
            let token = ctx.token.as_deref().ok_or(StudyflowError::NotAuthenticated)?;
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        tracing::debug!(method = %method, path, "API request");
        let response = req.send().await.map_err(StudyflowError::Http)?;
        let status = response.status();
        let text = response.text().await.map_err(StudyflowError::Http)?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), path, "API request failed");
            return Err(map_status(status.as_u16(), &text, authenticated).into());
        }

        // DELETE endpoints may answer with an empty body.
        let text = if text.trim().is_empty() { "null" } else { &text };
        serde_json::from_str(text).map_err(|e| StudyflowError::Serialization(e).into())
    }
}

/// Translate a non-success response into a [`StudyflowError`].
fn map_status(status: u16, body: &str, authenticated: bool) -> StudyflowError {
    let detail = error_detail(body);
    match status {
        401 if authenticated => StudyflowError::SessionExpired(detail),
        401 | 400 if !authenticated => StudyflowError::Authentication(detail),
        403 => StudyflowError::Forbidden(detail),
        404 => StudyflowError::NotFound(detail),
        _ => StudyflowError::Api { status, detail },
    }
}

/// Extract the human-readable `detail` of a FastAPI error body.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(value) => match value.get("detail") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => body.to_string(),
        },
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait::async_trait]
impl ChatApi for ApiClient {
    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        self.chat_sessions().await
    }

    async fn get_or_create_session(&self, student_id: &str) -> Result<ChatSession> {
        self.create_chat_session(student_id).await
    }

    async fn fetch_messages(&self, chat_id: &str) -> Result<Vec<Message>> {
        self.messages(chat_id).await
    }

    async fn delete_message(&self, message_id: &str, for_everyone: bool) -> Result<()> {
        self.remove_message(message_id, for_everyone).await
    }

    async fn list_students(&self) -> Result<Vec<User>> {
        self.students().await
    }
}
