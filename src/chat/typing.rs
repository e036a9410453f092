//! Presence / typing tracker
//!
//! Two independent halves:
//!
//! - local: every keystroke emits `typing=true` and re-arms an idle
//!   deadline; when the deadline passes, `typing=false` is emitted once.
//! - remote: the other participant's signals drive a single boolean.
//!
//! Time is passed in by the caller so that the idle timeout can be checked
//! with a paused Tokio clock.

use std::time::Duration;

use tokio::time::Instant;

use crate::chat::events::TypingSignal;

/// Default idle time before the local typing state clears.
pub const DEFAULT_TYPING_TIMEOUT: Duration = Duration::from_millis(2000);

/// Typing state for the active session.
#[derive(Debug)]
pub struct TypingTracker {
    local_user: String,
    timeout: Duration,
    active: Option<String>,
    deadline: Option<Instant>,
    remote_typing: bool,
}

impl TypingTracker {
    /// Create a tracker for `local_user` with the given idle timeout.
    pub fn new(local_user: impl Into<String>, timeout: Duration) -> Self {
        Self {
            local_user: local_user.into(),
            timeout,
            active: None,
            deadline: None,
            remote_typing: false,
        }
    }

    /// Bind the tracker to `chat_id`, clearing all state.
    pub fn activate(&mut self, chat_id: &str) {
        self.active = Some(chat_id.to_string());
        self.deadline = None;
        self.remote_typing = false;
    }

    /// Unbind from any session, clearing all state.
    pub fn reset(&mut self) {
        self.active = None;
        self.deadline = None;
        self.remote_typing = false;
    }

    /// Whether the other participant is currently typing.
    pub fn remote_typing(&self) -> bool {
        self.remote_typing
    }

    /// When the pending `typing=false` is due, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    fn signal(&self, is_typing: bool) -> Option<TypingSignal> {
        self.active.as_ref().map(|chat_id| TypingSignal {
            chat_id: chat_id.clone(),
            user_id: self.local_user.clone(),
            is_typing,
        })
    }

    /// The local user changed the input at `now`.
    ///
    /// Emits `typing=true` on every call and re-arms the idle deadline.
    /// Returns `None` when no session is active.
    pub fn on_local_input(&mut self, now: Instant) -> Option<TypingSignal> {
        let signal = self.signal(true)?;
        self.deadline = Some(now + self.timeout);
        Some(signal)
    }

    /// Emit `typing=false` once the idle deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<TypingSignal> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                self.signal(false)
            }
            _ => None,
        }
    }

    /// The local user sent a message: clear the typing state immediately.
    pub fn on_local_send(&mut self) -> Option<TypingSignal> {
        self.deadline = None;
        self.signal(false)
    }

    /// Apply a signal from the server.
    ///
    /// Signals from the local user or for another session are ignored.
    /// Returns `true` if the remote flag changed.
    pub fn on_remote_signal(&mut self, signal: &TypingSignal) -> bool {
        if signal.user_id == self.local_user {
            return false;
        }
        if self.active.as_deref() != Some(signal.chat_id.as_str()) {
            return false;
        }
        let changed = self.remote_typing != signal.is_typing;
        self.remote_typing = signal.is_typing;
        changed
    }
}
