//! Session resolution
//!
//! Maps "who is the local user talking to" onto a [`ChatSession`]. Admins
//! get-or-create the session for a chosen student; students use the first
//! session they already participate in and never create one.

use std::sync::Arc;

use crate::api::types::{ChatSession, Role, User};
use crate::api::ChatApi;
use crate::error::{Result, StudyflowError};

/// Outcome of resolving the student's own session.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// A session exists and can be opened.
    Ready(ChatSession),
    /// No admin has started a conversation yet.
    NotAvailable,
}

/// Resolves chat sessions through the REST collaborator.
#[derive(Clone)]
pub struct SessionResolver {
    api: Arc<dyn ChatApi>,
    local_user: User,
}

impl SessionResolver {
    /// Create a resolver acting as `local_user`.
    pub fn new(api: Arc<dyn ChatApi>, local_user: User) -> Self {
        Self { api, local_user }
    }

    /// Get-or-create the session between the local admin and `student_id`.
    ///
    /// Calling this twice for the same student yields the same session, as
    /// the backend creates at most one session per pair.
    ///
    /// # Errors
    ///
    /// - [`StudyflowError::Forbidden`] if the local user is not an admin
    ///   (checked before any request is made)
    /// - [`StudyflowError::ChatLoad`] if the request fails or the backend
    ///   returns a session for a different student
    pub async fn resolve_for_student(&self, student_id: &str) -> Result<ChatSession> {
        if self.local_user.role != Role::Admin {
            return Err(StudyflowError::Forbidden(
                "only admins can open a chat with a student".to_string(),
            )
            .into());
        }

        let session = self
            .api
            .get_or_create_session(student_id)
            .await
            .map_err(|e| StudyflowError::ChatLoad(e.to_string()))?;

        if session.student_id != student_id {
            return Err(StudyflowError::ChatLoad(format!(
                "session {} belongs to student {}, not {}",
                session.id, session.student_id, student_id
            ))
            .into());
        }

        tracing::debug!(chat_id = %session.id, student_id, "Resolved admin session");
        Ok(session)
    }

    /// Resolve the local student's own session.
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::ChatLoad`] if the session list cannot be
    /// fetched.
    pub async fn resolve_own(&self) -> Result<Resolution> {
        let sessions = self
            .api
            .list_sessions()
            .await
            .map_err(|e| StudyflowError::ChatLoad(e.to_string()))?;

        match sessions.into_iter().next() {
            Some(session) => {
                tracing::debug!(chat_id = %session.id, "Resolved own session");
                Ok(Resolution::Ready(session))
            }
            None => Ok(Resolution::NotAvailable),
        }
    }
}
