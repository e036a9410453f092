//! Message store for the active chat session
//!
//! Holds the visible, ordered message sequence for exactly one session and
//! the per-counterpart unread counters for every other session.
//!
//! Ordering is arrival order: history first (in backend order), then live
//! messages as they are received. Messages are never re-sorted by
//! timestamp. A message id is shown at most once.
//!
//! While history is being fetched the store is *hydrating*: live messages
//! for the active session are buffered, and replayed after the history when
//! [`MessageStore::hydrate`] runs.

use std::collections::{HashMap, HashSet};

use crate::api::types::{ChatSession, Message};

/// What [`MessageStore::append`] did with a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Pushed to the tail of the visible sequence.
    Appended,
    /// Held until the history arrives.
    Buffered,
    /// Already visible (or already buffered); ignored.
    Duplicate,
    /// Belongs to another session; the counterpart's unread count went up.
    Unread { counterpart: String },
    /// Belongs to a session this store knows nothing about.
    Dropped,
}

/// Ordered messages of the active session plus unread bookkeeping.
#[derive(Debug, Default)]
pub struct MessageStore {
    active: Option<String>,
    hydrating: bool,
    buffer: Vec<Message>,
    messages: Vec<Message>,
    seen: HashSet<String>,
    /// chat id -> the other participant
    directory: HashMap<String, String>,
    /// counterpart id -> unread count
    unread: HashMap<String, u32>,
}

impl MessageStore {
    /// An empty store with no active session.
    pub fn new() -> Self {
        Self::default()
    }

    /// The visible messages, in order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Session whose messages are visible.
    pub fn active_chat(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Returns `true` while waiting for history.
    pub fn is_hydrating(&self) -> bool {
        self.hydrating
    }

    /// Make `chat_id` the active session and start buffering its live
    /// messages. The visible sequence is cleared.
    pub fn begin_hydration(&mut self, chat_id: &str) {
        self.active = Some(chat_id.to_string());
        self.hydrating = true;
        self.buffer.clear();
        self.messages.clear();
        self.seen.clear();
    }

    /// Replace the visible sequence with `history`, then replay buffered
    /// live messages in arrival order, skipping ids already present.
    ///
    /// Returns `false` (and changes nothing) if `chat_id` is not the active
    /// session.
    pub fn hydrate(&mut self, chat_id: &str, history: Vec<Message>) -> bool {
        if self.active.as_deref() != Some(chat_id) {
            tracing::debug!(chat_id, "Ignoring history for inactive session");
            return false;
        }

        self.messages.clear();
        self.seen.clear();
        for message in history {
            self.push(message);
        }

        let buffered = std::mem::take(&mut self.buffer);
        let replayed = buffered.len();
        for message in buffered {
            self.push(message);
        }
        self.hydrating = false;

        tracing::debug!(
            chat_id,
            visible = self.messages.len(),
            replayed,
            "Hydrated message store"
        );
        true
    }

    /// Add a live message.
    pub fn append(&mut self, message: Message) -> AppendOutcome {
        if self.active.as_deref() != Some(message.chat_id.as_str()) {
            return self.record_unread(&message);
        }

        if self.hydrating {
            let already_buffered = message.id.as_ref().is_some_and(|id| {
                self.buffer.iter().any(|m| m.id.as_ref() == Some(id))
            });
            if already_buffered {
                return AppendOutcome::Duplicate;
            }
            self.buffer.push(message);
            return AppendOutcome::Buffered;
        }

        if self.push(message) {
            AppendOutcome::Appended
        } else {
            AppendOutcome::Duplicate
        }
    }

    /// Count `message` as unread for the counterpart of its session.
    pub fn record_unread(&mut self, message: &Message) -> AppendOutcome {
        match self.directory.get(&message.chat_id) {
            Some(counterpart) => {
                *self.unread.entry(counterpart.clone()).or_insert(0) += 1;
                AppendOutcome::Unread {
                    counterpart: counterpart.clone(),
                }
            }
            None => {
                tracing::debug!(chat_id = %message.chat_id, "Dropping message for unknown session");
                AppendOutcome::Dropped
            }
        }
    }

    fn push(&mut self, message: Message) -> bool {
        if let Some(id) = &message.id {
            if !self.seen.insert(id.clone()) {
                return false;
            }
        }
        self.messages.push(message);
        true
    }

    /// Learn which counterpart each session belongs to, from `local_user_id`'s
    /// point of view.
    pub fn register_sessions<'a, I>(&mut self, sessions: I, local_user_id: &str)
    where
        I: IntoIterator<Item = &'a ChatSession>,
    {
        for session in sessions {
            self.directory.insert(
                session.id.clone(),
                session.counterpart(local_user_id).to_string(),
            );
        }
    }

    /// Unread count for one counterpart.
    pub fn unread(&self, counterpart: &str) -> u32 {
        self.unread.get(counterpart).copied().unwrap_or(0)
    }

    /// Unread count across all counterparts.
    pub fn total_unread(&self) -> u32 {
        self.unread.values().sum()
    }

    /// Reset the unread count for `counterpart`.
    pub fn clear_unread(&mut self, counterpart: &str) {
        self.unread.remove(counterpart);
    }

    /// Apply a read receipt: every visible message not sent by `reader_id`
    /// becomes read. Returns how many changed.
    pub fn mark_read_by(&mut self, reader_id: &str) -> usize {
        let mut changed = 0;
        for message in self
            .messages
            .iter_mut()
            .filter(|m| m.sender_id != reader_id && !m.is_read)
        {
            message.is_read = true;
            changed += 1;
        }
        changed
    }

    /// Remove a message from the visible sequence.
    pub fn remove(&mut self, message_id: &str) -> bool {
        let before = self.messages.len();
        self.messages
            .retain(|m| m.id.as_deref() != Some(message_id));
        self.messages.len() != before
    }

    /// Forget the active session and its messages. Unread counters and the
    /// session directory are kept.
    pub fn reset(&mut self) {
        self.active = None;
        self.hydrating = false;
        self.buffer.clear();
        self.messages.clear();
        self.seen.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::MessageType;
    use chrono::{TimeZone, Utc};

    fn msg(id: &str, chat_id: &str, sender: &str, content: &str) -> Message {
        Message {
            id: Some(id.to_string()),
            chat_id: chat_id.to_string(),
            sender_id: sender.to_string(),
            content: content.to_string(),
            message_type: MessageType::Text,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap(),
            is_deleted: false,
            is_read: false,
        }
    }

    fn contents(store: &MessageStore) -> Vec<&str> {
        store.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_hydrate_then_append_preserves_order() {
        let mut store = MessageStore::new();
        store.begin_hydration("c1");
        store.hydrate(
            "c1",
            vec![msg("h1", "c1", "a", "one"), msg("h2", "c1", "b", "two")],
        );

        for (i, text) in ["three", "four", "five"].iter().enumerate() {
            let outcome = store.append(msg(&format!("l{}", i), "c1", "a", text));
            assert_eq!(outcome, AppendOutcome::Appended);
        }

        assert_eq!(store.messages().len(), 5);
        assert_eq!(contents(&store), vec!["one", "two", "three", "four", "five"]);
    }

    #[test]
    fn test_no_timestamp_resort() {
        let mut store = MessageStore::new();
        store.begin_hydration("c1");
        store.hydrate("c1", vec![]);

        let mut late = msg("m1", "c1", "a", "sent later");
        late.created_at = Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap();
        let mut early = msg("m2", "c1", "b", "sent earlier");
        early.created_at = Utc.with_ymd_and_hms(2024, 12, 31, 0, 0, 0).unwrap();

        store.append(late);
        store.append(early);
        assert_eq!(contents(&store), vec!["sent later", "sent earlier"]);
    }

    #[test]
    fn test_live_messages_during_hydration_are_merged_without_duplicates() {
        let mut store = MessageStore::new();
        store.begin_hydration("c1");

        // m2 arrives live and is also part of the history snapshot.
        assert_eq!(store.append(msg("m2", "c1", "b", "two")), AppendOutcome::Buffered);
        assert_eq!(store.append(msg("m3", "c1", "a", "three")), AppendOutcome::Buffered);
        assert_eq!(store.append(msg("m3", "c1", "a", "three")), AppendOutcome::Duplicate);
        assert!(store.messages().is_empty());

        assert!(store.hydrate(
            "c1",
            vec![msg("m1", "c1", "a", "one"), msg("m2", "c1", "b", "two")],
        ));
        assert!(!store.is_hydrating());
        assert_eq!(contents(&store), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_duplicate_live_message_ignored() {
        let mut store = MessageStore::new();
        store.begin_hydration("c1");
        store.hydrate("c1", vec![msg("m1", "c1", "a", "one")]);
        assert_eq!(store.append(msg("m1", "c1", "a", "one")), AppendOutcome::Duplicate);
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn test_hydrate_for_inactive_session_is_ignored() {
        let mut store = MessageStore::new();
        store.begin_hydration("c2");
        assert!(!store.hydrate("c1", vec![msg("m1", "c1", "a", "stale")]));
        assert!(store.messages().is_empty());
        assert!(store.is_hydrating());
    }

    #[test]
    fn test_other_session_counts_unread_for_counterpart() {
        let sessions = vec![
            ChatSession {
                id: "c1".into(),
                admin_id: "admin".into(),
                student_id: "s1".into(),
                created_at: None,
            },
            ChatSession {
                id: "c2".into(),
                admin_id: "admin".into(),
                student_id: "s2".into(),
                created_at: None,
            },
        ];
        let mut store = MessageStore::new();
        store.register_sessions(&sessions, "admin");
        store.begin_hydration("c1");
        store.hydrate("c1", vec![]);

        assert_eq!(
            store.append(msg("x1", "c2", "s2", "hey")),
            AppendOutcome::Unread {
                counterpart: "s2".into()
            }
        );
        store.append(msg("x2", "c2", "s2", "you there?"));
        assert_eq!(store.unread("s2"), 2);
        assert_eq!(store.unread("s1"), 0);
        assert_eq!(store.total_unread(), 2);
        assert!(store.messages().is_empty());

        store.clear_unread("s2");
        assert_eq!(store.total_unread(), 0);

        assert_eq!(store.append(msg("x3", "c9", "s9", "?")), AppendOutcome::Dropped);
    }

    #[test]
    fn test_mark_read_by_counterpart() {
        let mut store = MessageStore::new();
        store.begin_hydration("c1");
        store.hydrate(
            "c1",
            vec![msg("m1", "c1", "me", "mine"), msg("m2", "c1", "them", "theirs")],
        );
        // "them" read the conversation: my messages become read.
        assert_eq!(store.mark_read_by("them"), 1);
        assert!(store.messages()[0].is_read);
        assert!(!store.messages()[1].is_read);
        assert_eq!(store.mark_read_by("them"), 0);
    }

    #[test]
    fn test_remove_message() {
        let mut store = MessageStore::new();
        store.begin_hydration("c1");
        store.hydrate("c1", vec![msg("m1", "c1", "a", "one"), msg("m2", "c1", "a", "two")]);
        assert!(store.remove("m1"));
        assert!(!store.remove("m1"));
        assert_eq!(contents(&store), vec!["two"]);
    }

    #[test]
    fn test_reset_keeps_unread() {
        let session = ChatSession {
            id: "c2".into(),
            admin_id: "admin".into(),
            student_id: "s2".into(),
            created_at: None,
        };
        let mut store = MessageStore::new();
        store.register_sessions([&session], "admin");
        store.append(msg("x1", "c2", "s2", "hey"));
        store.begin_hydration("c1");
        store.reset();
        assert!(store.active_chat().is_none());
        assert_eq!(store.unread("s2"), 1);
    }
}
