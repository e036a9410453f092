//! REST collaborator client
//!
//! The backend owns all durable state. This module provides:
//!
//! - `types`   -- request and response payloads
//! - `client`  -- [`ApiClient`], a `reqwest` client covering every endpoint
//!   the application uses, authenticated through an explicit
//!   [`RequestContext`]
//!
//! The [`ChatApi`] trait is the narrow seam the chat components depend on, so
//! that session resolution and history hydration can be driven by a mock in
//! tests and by [`ApiClient`] in production.

pub mod client;
pub mod types;

pub use client::{ApiClient, RequestContext};

use crate::api::types::{ChatSession, Message, User};
use crate::error::Result;

/// The subset of the REST API used by the real-time chat components.
///
/// Implemented by [`ApiClient`]; mocked in unit tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /chat/sessions`: sessions the caller participates in.
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;

    /// `POST /chat/sessions?student_id=`: get-or-create the session between
    /// the calling admin and `student_id`.
    async fn get_or_create_session(&self, student_id: &str) -> Result<ChatSession>;

    /// `GET /chat/messages/{chat_id}`: full history in backend order.
    async fn fetch_messages(&self, chat_id: &str) -> Result<Vec<Message>>;

    /// `DELETE /chat/messages/{id}?delete_for_everyone=`.
    async fn delete_message(&self, message_id: &str, for_everyone: bool) -> Result<()>;

    /// `GET /users/students`: the admin's contact list.
    async fn list_students(&self) -> Result<Vec<User>>;
}
