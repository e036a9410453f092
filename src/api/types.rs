//! Wire types for the Studyflow REST API
//!
//! Every struct here mirrors a JSON payload exchanged with the backend.
//! Request bodies are separate `New*` / `*Update` structs so that server
//! assigned fields (ids, timestamps, counters) never have to be invented on
//! the client.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Users and authentication
// ---------------------------------------------------------------------------

/// Account role. Only administrators may create tasks, announcements and
/// chat sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator (teacher / mentor)
    Admin,
    /// Student
    Student,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::Student => write!(f, "student"),
        }
    }
}

impl Role {
    /// Parse a role from a string
    ///
    /// # Examples
    ///
    /// ```
    /// use studyflow::api::types::Role;
    ///
    /// assert_eq!(Role::parse_str("Admin").unwrap(), Role::Admin);
    /// assert!(Role::parse_str("teacher").is_err());
    /// ```
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "student" => Ok(Self::Student),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// A registered user as returned by `/users/me` and `/users/students`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Backend-assigned user id
    pub id: String,
    /// Login email
    pub email: String,
    /// Display name
    pub name: String,
    /// Account role
    pub role: Role,
    /// Account creation time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// Returns `true` when the user is an administrator.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /auth/register`.
#[derive(Debug, Clone, Serialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

/// Body of `POST /users/students` (admin creates a student account).
#[derive(Debug, Clone, Serialize)]
pub struct NewStudent {
    pub email: String,
    pub name: String,
    pub password: String,
}

/// Response of the login and register endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer token to attach to every subsequent request
    pub access_token: String,
    /// Always `"bearer"`
    pub token_type: String,
    /// The authenticated user
    pub user: User,
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// The conversation between one admin and one student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub admin_id: String,
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl ChatSession {
    /// Returns the id of the other participant, from `user_id`'s point of
    /// view.
    ///
    /// For a user that is not a participant the student id is returned,
    /// since that is the key the admin-side views index sessions by.
    ///
    /// # Examples
    ///
    /// ```
    /// use studyflow::api::types::ChatSession;
    ///
    /// let session = ChatSession {
    ///     id: "c1".into(),
    ///     admin_id: "a1".into(),
    ///     student_id: "s1".into(),
    ///     created_at: None,
    /// };
    /// assert_eq!(session.counterpart("a1"), "s1");
    /// assert_eq!(session.counterpart("s1"), "a1");
    /// ```
    pub fn counterpart(&self, user_id: &str) -> &str {
        if self.student_id == user_id {
            &self.admin_id
        } else {
            &self.student_id
        }
    }

    /// Returns `true` when `user_id` is one of the two participants.
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.admin_id == user_id || self.student_id == user_id
    }
}

/// Message payload kind. Only `text` is produced by this client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Text,
    Image,
    /// Any tag this client does not know about
    #[serde(other)]
    Other,
}

/// A chat message.
///
/// `id` is assigned by the backend on persistence; it is only absent for a
/// message that has not been echoed back yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    #[serde(default)]
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub is_deleted: bool,
    #[serde(default)]
    pub is_read: bool,
}

/// Body of `POST /chat/messages`.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub chat_id: String,
    pub sender_id: String,
    pub content: String,
    pub message_type: MessageType,
}

// ---------------------------------------------------------------------------
// Tasks and submissions
// ---------------------------------------------------------------------------

/// Task difficulty as displayed to students.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Parse a difficulty, case-insensitively
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(format!("Unknown difficulty: {}", other)),
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
        };
        write!(f, "{}", s)
    }
}

/// What kind of proof a task expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionType {
    Image,
    Text,
    Video,
    Link,
}

impl SubmissionType {
    /// Parse a submission type, case-insensitively
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "image" => Ok(Self::Image),
            "text" => Ok(Self::Text),
            "video" => Ok(Self::Video),
            "link" => Ok(Self::Link),
            other => Err(format!("Unknown submission type: {}", other)),
        }
    }
}

impl fmt::Display for SubmissionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Image => "image",
            Self::Text => "text",
            Self::Video => "video",
            Self::Link => "link",
        };
        write!(f, "{}", s)
    }
}

/// A task assigned to one or more students.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub submission_type: SubmissionType,
    pub deadline: DateTime<Utc>,
    pub created_by: String,
    #[serde(default)]
    pub assigned_to: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// The caller's own submission; only attached for students
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission: Option<Submission>,
}

/// Body of `POST /tasks/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub submission_type: SubmissionType,
    pub deadline: DateTime<Utc>,
    pub assigned_to: Vec<String>,
}

/// Body of `PUT /tasks/{id}`. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_type: Option<SubmissionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Vec<String>>,
}

/// Review state of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubmissionStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl SubmissionStatus {
    /// Parse a review status, case-insensitively
    pub fn parse_str(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            other => Err(format!("Unknown submission status: {}", other)),
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// A student's answer to a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub task_id: String,
    pub content: String,
    pub submission_type: SubmissionType,
    pub student_id: String,
    #[serde(default)]
    pub status: SubmissionStatus,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub ai_feedback: Option<String>,
    pub submitted_at: DateTime<Utc>,
    #[serde(default)]
    pub is_late: bool,
    #[serde(default)]
    pub likes: u32,
}

/// Body of `POST /submissions/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewSubmission {
    pub task_id: String,
    pub content: String,
    pub submission_type: SubmissionType,
}

/// Body of `PUT /submissions/{id}` (admin review).
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionReview {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

// ---------------------------------------------------------------------------
// Announcements, progress, AI
// ---------------------------------------------------------------------------

/// A broadcast notice from an admin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: String,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body of `POST /announcements/`.
#[derive(Debug, Clone, Serialize)]
pub struct NewAnnouncement {
    pub title: String,
    pub content: String,
}

/// Per-student completion counters and streaks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    #[serde(default)]
    pub id: Option<String>,
    pub student_id: String,
    #[serde(default)]
    pub completed_tasks: u32,
    #[serde(default)]
    pub total_tasks: u32,
    #[serde(default)]
    pub current_streak: u32,
    #[serde(default)]
    pub longest_streak: u32,
    #[serde(default)]
    pub badges: Vec<String>,
    #[serde(default)]
    pub last_activity: Option<DateTime<Utc>>,
    #[serde(default)]
    pub streak_dates: Vec<String>,
}

impl Progress {
    /// Completion percentage in `0.0..=100.0`; zero when nothing is assigned.
    ///
    /// # Examples
    ///
    /// ```
    /// use studyflow::api::types::Progress;
    ///
    /// let progress: Progress = serde_json::from_value(serde_json::json!({
    ///     "student_id": "s1",
    ///     "completed_tasks": 3,
    ///     "total_tasks": 4
    /// })).unwrap();
    /// assert_eq!(progress.completion_rate(), 75.0);
    /// ```
    pub fn completion_rate(&self) -> f64 {
        if self.total_tasks == 0 {
            0.0
        } else {
            self.completed_tasks as f64 / self.total_tasks as f64 * 100.0
        }
    }
}

/// One row of `GET /progress/leaderboard`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub student_id: String,
    pub name: String,
    pub completed_tasks: u32,
    pub total_tasks: u32,
    pub completion_rate: f64,
    pub current_streak: u32,
    #[serde(default)]
    pub badges: Vec<String>,
}

/// A turn in the AI doubt-solver conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    /// `"user"` or `"assistant"`
    pub role: String,
    pub content: String,
}

/// Body of `POST /ai/doubt-solver`.
#[derive(Debug, Clone, Serialize)]
pub struct DoubtRequest {
    pub question: String,
    pub chat_history: Vec<ChatTurn>,
}

/// Response of `POST /ai/doubt-solver`.
#[derive(Debug, Clone, Deserialize)]
pub struct DoubtAnswer {
    pub answer: String,
}

/// Body of `POST /ai/analyze-image`.
#[derive(Debug, Clone, Serialize)]
pub struct ImageAnalysisRequest {
    pub image_base64: String,
    pub prompt: String,
}

/// Response of `POST /ai/analyze-image`.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageFeedback {
    pub feedback: String,
}
