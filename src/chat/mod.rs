//! Real-time chat between an admin and a student
//!
//! Layers, bottom up:
//!
//! - [`codec`]: Engine.IO / Socket.IO text framing
//! - [`transport`]: raw frame transports and the protocol task
//!   ([`transport::start_channel`])
//! - [`events`]: typed client and server events
//! - [`resolver`]: which session the local user is talking in
//! - [`membership`]: the single joined room
//! - [`store`]: ordered, de-duplicated message list with hydration
//! - [`typing`]: local and remote typing state
//! - [`controller`]: the view state machine tying them together

pub mod codec;
pub mod controller;
pub mod events;
pub mod membership;
pub mod resolver;
pub mod store;
pub mod transport;
pub mod typing;

pub use controller::{ChatCommand, ChatController, ChatUpdate, ChatView};
pub use events::{ClientEvent, ServerEvent, TypingSignal};
pub use membership::Membership;
pub use resolver::{Resolution, SessionResolver};
pub use store::{AppendOutcome, MessageStore};
pub use transport::{start_channel, EventChannel, EventTransport};
pub use typing::TypingTracker;
