//! Event channel membership
//!
//! The client is subscribed to at most one session room at a time:
//!
//! ```text
//! Unjoined --join(S)--> Joined(S) --leave(S)--> Unjoined
//! ```
//!
//! There is no direct `Joined(A) -> Joined(B)` edge; [`Membership::switch_to`]
//! goes through `Unjoined`. Dropping a joined [`Membership`] emits
//! `leave_chat`, so the subscription is released on every exit path.

use tokio::sync::mpsc;

use crate::chat::events::ClientEvent;
use crate::error::{Result, StudyflowError};

/// Current subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipState {
    Unjoined,
    Joined {
        chat_id: String,
        user_id: String,
        /// Incremented on every join.
        epoch: u64,
    },
}

/// Owner of the room subscription and of the outbound event sender.
#[derive(Debug)]
pub struct Membership {
    outbound: mpsc::UnboundedSender<ClientEvent>,
    state: MembershipState,
    epoch: u64,
}

impl Membership {
    /// Create an unjoined membership emitting on `outbound`.
    pub fn new(outbound: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self {
            outbound,
            state: MembershipState::Unjoined,
            epoch: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> &MembershipState {
        &self.state
    }

    /// Joined session id, if any.
    pub fn joined(&self) -> Option<&str> {
        match &self.state {
            MembershipState::Joined { chat_id, .. } => Some(chat_id),
            MembershipState::Unjoined => None,
        }
    }

    /// Whether events tagged `chat_id` belong to the joined session.
    pub fn accepts(&self, chat_id: &str) -> bool {
        self.joined() == Some(chat_id)
    }

    /// Emit an event on the channel.
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::Transport`] if the channel task is gone.
    pub fn emit(&self, event: ClientEvent) -> Result<()> {
        self.outbound.send(event).map_err(|e| {
            anyhow::anyhow!(StudyflowError::Transport(format!(
                "event channel closed: {}",
                e.0.name()
            )))
        })
    }

    /// Subscribe to `chat_id`.
    ///
    /// Joining the session already joined is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`StudyflowError::Membership`] when joined to a different
    /// session, or a transport error if `join_chat` cannot be emitted.
    pub fn join(&mut self, chat_id: &str, user_id: &str) -> Result<()> {
        if let Some(current) = self.joined() {
            if current == chat_id {
                return Ok(());
            }
            return Err(StudyflowError::Membership(format!(
                "already joined to {}; leave it before joining {}",
                current, chat_id
            ))
            .into());
        }

        self.emit(ClientEvent::JoinChat {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
        })?;
        self.epoch += 1;
        self.state = MembershipState::Joined {
            chat_id: chat_id.to_string(),
            user_id: user_id.to_string(),
            epoch: self.epoch,
        };
        tracing::debug!(chat_id, epoch = self.epoch, "Joined chat");
        Ok(())
    }

    /// Unsubscribe from `chat_id`. A no-op when not joined to it.
    ///
    /// The state becomes `Unjoined` even if `leave_chat` cannot be emitted.
    pub fn leave(&mut self, chat_id: &str) -> Result<()> {
        if !self.accepts(chat_id) {
            return Ok(());
        }
        self.state = MembershipState::Unjoined;
        tracing::debug!(chat_id, "Left chat");
        self.emit(ClientEvent::LeaveChat {
            chat_id: chat_id.to_string(),
        })
    }

    /// Leave whatever is joined, then join `chat_id`.
    pub fn switch_to(&mut self, chat_id: &str, user_id: &str) -> Result<()> {
        if self.accepts(chat_id) {
            return Ok(());
        }
        if let Some(current) = self.joined().map(str::to_string) {
            self.leave(&current)?;
        }
        self.join(chat_id, user_id)
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        if let MembershipState::Joined { chat_id, .. } = &self.state {
            let _ = self.outbound.send(ClientEvent::LeaveChat {
                chat_id: chat_id.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(rx: &mut mpsc::UnboundedReceiver<ClientEvent>) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_join_leave_join_and_accepts() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut membership = Membership::new(tx);

        membership.join("A", "u1").unwrap();
        assert!(membership.accepts("A"));
        membership.leave("A").unwrap();
        assert!(!membership.accepts("A"));
        membership.join("B", "u1").unwrap();
        assert!(!membership.accepts("A"));
        assert!(membership.accepts("B"));

        let names: Vec<_> = drain(&mut rx).iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["join_chat", "leave_chat", "join_chat"]);
    }

    #[test]
    fn test_direct_switch_is_rejected() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut membership = Membership::new(tx);
        membership.join("A", "u1").unwrap();

        let err = membership.join("B", "u1").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StudyflowError>(),
            Some(StudyflowError::Membership(_))
        ));
        assert_eq!(membership.joined(), Some("A"));
    }

    #[test]
    fn test_rejoin_same_and_leave_other_are_noops() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut membership = Membership::new(tx);
        membership.join("A", "u1").unwrap();
        membership.join("A", "u1").unwrap();
        membership.leave("B").unwrap();
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_switch_to_leaves_then_joins() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut membership = Membership::new(tx);
        membership.switch_to("A", "u1").unwrap();
        membership.switch_to("B", "u1").unwrap();

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                ClientEvent::JoinChat {
                    chat_id: "A".into(),
                    user_id: "u1".into()
                },
                ClientEvent::LeaveChat { chat_id: "A".into() },
                ClientEvent::JoinChat {
                    chat_id: "B".into(),
                    user_id: "u1".into()
                },
            ]
        );
        assert!(matches!(
            membership.state(),
            MembershipState::Joined { epoch: 2, .. }
        ));
    }

    #[test]
    fn test_drop_while_joined_emits_leave() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut membership = Membership::new(tx);
            membership.join("A", "u1").unwrap();
        }
        let events = drain(&mut rx);
        assert_eq!(
            events.last(),
            Some(&ClientEvent::LeaveChat { chat_id: "A".into() })
        );
    }

    #[test]
    fn test_drop_while_unjoined_emits_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        drop(Membership::new(tx));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_join_fails_when_channel_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut membership = Membership::new(tx);
        assert!(membership.join("A", "u1").is_err());
        assert_eq!(membership.state(), &MembershipState::Unjoined);
    }
}
