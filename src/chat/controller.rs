//! The chat view controller
//!
//! One [`ChatController`] drives one chat view. It owns the
//! [`Membership`], [`MessageStore`] and [`TypingTracker`] and changes them
//! only from a single task, so there is no shared mutable state.
//!
//! Opening a conversation:
//!
//! 1. resolve the session through the REST collaborator;
//! 2. join the session's room;
//! 3. fetch history while live messages for the room are buffered;
//! 4. hydrate: history replaces the visible list, buffered live messages
//!    follow.
//!
//! Every selection bumps an epoch. REST results carry the epoch they were
//! issued under and are discarded when a newer selection has happened since.
//!
//! The state transitions (`handle_*`, `send`, `tick`) are synchronous; REST
//! calls run in spawned tasks whose results come back as [`LoadResult`]s.
//! [`ChatController::run`] is the event loop that feeds all inputs in.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::api::types::{ChatSession, Message, MessageType, User};
use crate::api::ChatApi;
use crate::chat::events::{ClientEvent, ServerEvent, TypingSignal};
use crate::chat::membership::Membership;
use crate::chat::resolver::{Resolution, SessionResolver};
use crate::chat::store::{AppendOutcome, MessageStore};
use crate::chat::typing::TypingTracker;
use crate::config::ChatConfig;
use crate::error::{Result, StudyflowError};

/// What the chat view is showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatView {
    /// Nothing selected yet.
    Idle,
    /// Resolving the session or fetching history.
    Loading,
    /// The student has no session yet. Terminal until reopened.
    NotAvailable,
    /// Messages are visible and live.
    Ready,
    /// Loading failed.
    Failed(String),
}

/// Inputs from the user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Admin: open the conversation with a student.
    SelectStudent(String),
    /// Student: open the own conversation.
    OpenOwn,
    /// Admin: refresh the contact list.
    ListStudents,
    /// The message input changed.
    Input,
    /// Send the given text.
    Send(String),
    /// Delete a message.
    Delete {
        message_id: String,
        for_everyone: bool,
    },
    /// Tell the other participant everything has been read.
    MarkRead,
}

/// Outputs for the user interface.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatUpdate {
    /// The view state changed.
    View(ChatView),
    /// A session was resolved and joined; history is on its way.
    Opened(ChatSession),
    /// History arrived; this is the complete visible list.
    Hydrated(Vec<Message>),
    /// A live message was appended.
    Message(Message),
    /// A message was deleted.
    Removed(String),
    /// The other participant started or stopped typing.
    Typing(bool),
    /// `user_id` has read the conversation.
    ReadBy(String),
    /// A message arrived for another conversation.
    Unread { counterpart: String, count: u32 },
    /// The admin's contact list.
    Students(Vec<User>),
    /// A non-fatal problem worth telling the user about.
    Notice(String),
    /// The event channel is gone.
    Disconnected(String),
}

/// Result of a background REST call, tagged with the epoch it was issued
/// under.
#[derive(Debug)]
pub struct LoadResult {
    pub epoch: u64,
    pub kind: LoadKind,
}

/// Payload of a [`LoadResult`].
#[derive(Debug)]
pub enum LoadKind {
    Session(Result<ChatSession>),
    Own(Result<Resolution>),
    History {
        chat_id: String,
        result: Result<Vec<Message>>,
    },
    Students {
        students: Result<Vec<User>>,
        sessions: Vec<ChatSession>,
    },
    Deleted {
        message_id: String,
        result: Result<()>,
    },
}

/// Controller for one chat view.
pub struct ChatController {
    api: Arc<dyn ChatApi>,
    resolver: SessionResolver,
    local_user: User,
    membership: Membership,
    store: MessageStore,
    typing: TypingTracker,
    view: ChatView,
    session: Option<ChatSession>,
    epoch: u64,
    loads_tx: mpsc::UnboundedSender<LoadResult>,
    loads_rx: mpsc::UnboundedReceiver<LoadResult>,
    updates: mpsc::UnboundedSender<ChatUpdate>,
}

impl ChatController {
    /// Create a controller acting as `local_user`.
    ///
    /// # Arguments
    ///
    /// * `api` - REST collaborator
    /// * `outbound` - Sender of the event channel
    /// * `local_user` - The logged-in user
    /// * `config` - Chat settings (typing timeout)
    ///
    /// # Returns
    ///
    /// The controller and the receiver of its [`ChatUpdate`]s.
    pub fn new(
        api: Arc<dyn ChatApi>,
        outbound: mpsc::UnboundedSender<ClientEvent>,
        local_user: User,
        config: &ChatConfig,
    ) -> (Self, mpsc::UnboundedReceiver<ChatUpdate>) {
        let (loads_tx, loads_rx) = mpsc::unbounded_channel();
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        let controller = Self {
            resolver: SessionResolver::new(Arc::clone(&api), local_user.clone()),
            api,
            typing: TypingTracker::new(
                local_user.id.clone(),
                Duration::from_millis(config.typing_timeout_ms),
            ),
            local_user,
            membership: Membership::new(outbound),
            store: MessageStore::new(),
            view: ChatView::Idle,
            session: None,
            epoch: 0,
            loads_tx,
            loads_rx,
            updates: updates_tx,
        };
        (controller, updates_rx)
    }

    // -- accessors ----------------------------------------------------------

    /// Current view state.
    pub fn view(&self) -> &ChatView {
        &self.view
    }

    /// The open session, once one has been resolved.
    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    /// Messages of the open session in arrival order.
    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    /// The message store, including unread counters for other chats.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// The room membership backing the open session.
    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    /// Returns `true` while the counterpart is shown as typing.
    pub fn remote_typing(&self) -> bool {
        self.typing.remote_typing()
    }

    /// Selection counter; loads tagged with an older value are discarded.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Wait for the next background REST result.
    pub async fn next_load(&mut self) -> Option<LoadResult> {
        self.loads_rx.recv().await
    }

    // -- selection ----------------------------------------------------------

    /// Admin: open the conversation with `student_id`, creating the session
    /// if needed.
    pub fn select_student(&mut self, student_id: &str) {
        let epoch = self.begin_selection();
        let resolver = self.resolver.clone();
        let student_id = student_id.to_string();
        self.spawn_load(epoch, async move {
            LoadKind::Session(resolver.resolve_for_student(&student_id).await)
        });
    }

    /// Student: open the own conversation, if one exists.
    pub fn open_own(&mut self) {
        let epoch = self.begin_selection();
        let resolver = self.resolver.clone();
        self.spawn_load(epoch, async move { LoadKind::Own(resolver.resolve_own().await) });
    }

    /// Admin: fetch the contact list (and the sessions used for unread
    /// attribution).
    pub fn list_students(&mut self) {
        let api = Arc::clone(&self.api);
        self.spawn_load(self.epoch, async move {
            let students = api.list_students().await;
            let sessions = match api.list_sessions().await {
                Ok(sessions) => sessions,
                Err(e) => {
                    tracing::warn!("Failed to list chat sessions: {}", e);
                    Vec::new()
                }
            };
            LoadKind::Students { students, sessions }
        });
    }

    fn begin_selection(&mut self) -> u64 {
        self.epoch += 1;
        if let Some(joined) = self.membership.joined().map(str::to_string) {
            if let Err(e) = self.membership.leave(&joined) {
                tracing::warn!("Failed to leave {}: {}", joined, e);
            }
        }
        self.session = None;
        self.store.reset();
        self.typing.reset();
        self.set_view(ChatView::Loading);
        self.epoch
    }

    fn spawn_load<F>(&self, epoch: u64, load: F)
    where
        F: std::future::Future<Output = LoadKind> + Send + 'static,
    {
        let tx = self.loads_tx.clone();
        tokio::spawn(async move {
            let kind = load.await;
            let _ = tx.send(LoadResult { epoch, kind });
        });
    }

    // -- transitions --------------------------------------------------------

    /// Apply a background REST result.
    pub fn handle_load(&mut self, load: LoadResult) {
        let stale = load.epoch != self.epoch;
        match load.kind {
            LoadKind::Session(_) | LoadKind::Own(_) | LoadKind::History { .. } if stale => {
                tracing::debug!(
                    epoch = load.epoch,
                    current = self.epoch,
                    "Discarding stale chat load"
                );
            }
            LoadKind::Session(Ok(session)) => self.open_session(session),
            LoadKind::Own(Ok(Resolution::Ready(session))) => self.open_session(session),
            LoadKind::Own(Ok(Resolution::NotAvailable)) => {
                tracing::info!("No chat session available yet");
                self.set_view(ChatView::NotAvailable);
            }
            LoadKind::Session(Err(e)) | LoadKind::Own(Err(e)) => self.fail(&e),
            LoadKind::History { chat_id, result } => match result {
                Ok(history) => self.finish_hydration(&chat_id, history),
                Err(e) => {
                    if let Err(leave_err) = self.membership.leave(&chat_id) {
                        tracing::warn!("Failed to leave {}: {}", chat_id, leave_err);
                    }
                    self.store.reset();
                    self.fail(&StudyflowError::ChatLoad(e.to_string()).into());
                }
            },
            LoadKind::Students { students, sessions } => {
                self.store.register_sessions(&sessions, &self.local_user.id);
                match students {
                    Ok(students) => self.publish(ChatUpdate::Students(students)),
                    Err(e) => self.notice(format!("Failed to load students: {}", e)),
                }
            }
            LoadKind::Deleted { message_id, result } => match result {
                Ok(()) => {
                    if self.store.remove(&message_id) {
                        self.publish(ChatUpdate::Removed(message_id));
                    }
                }
                Err(e) => self.notice(format!("Failed to delete message: {}", e)),
            },
        }
    }

    fn open_session(&mut self, session: ChatSession) {
        let chat_id = session.id.clone();
        if let Err(e) = self.membership.switch_to(&chat_id, &self.local_user.id) {
            self.fail(&e);
            return;
        }

        let counterpart = session.counterpart(&self.local_user.id).to_string();
        self.store.register_sessions([&session], &self.local_user.id);
        self.store.clear_unread(&counterpart);
        self.store.begin_hydration(&chat_id);
        self.typing.activate(&chat_id);
        tracing::info!(chat_id = %chat_id, counterpart = %counterpart, "Opened chat");

        self.session = Some(session.clone());
        self.publish(ChatUpdate::Opened(session));

        let api = Arc::clone(&self.api);
        self.spawn_load(self.epoch, async move {
            let result = api.fetch_messages(&chat_id).await;
            LoadKind::History { chat_id, result }
        });
    }

    fn finish_hydration(&mut self, chat_id: &str, history: Vec<Message>) {
        if !self.store.hydrate(chat_id, history) {
            return;
        }
        self.publish(ChatUpdate::Hydrated(self.store.messages().to_vec()));
        self.set_view(ChatView::Ready);
    }

    fn fail(&mut self, err: &anyhow::Error) {
        tracing::warn!("Failed to load chat: {}", err);
        self.set_view(ChatView::Failed(err.to_string()));
    }

    /// Apply an event from the server.
    pub fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::NewMessage(message) => {
                if !self.membership.accepts(&message.chat_id) {
                    if let AppendOutcome::Unread { counterpart } = self.store.record_unread(&message)
                    {
                        let count = self.store.unread(&counterpart);
                        self.publish(ChatUpdate::Unread { counterpart, count });
                    }
                    return;
                }
                match self.store.append(message.clone()) {
                    AppendOutcome::Appended => self.publish(ChatUpdate::Message(message)),
                    outcome => tracing::trace!(?outcome, "Live message not rendered yet"),
                }
            }
            ServerEvent::UserTyping { user_id, is_typing } => {
                // The payload carries no chat id, so a signal still in flight
                // for the previous room lands on the joined one.
                let Some(chat_id) = self.membership.joined().map(str::to_string) else {
                    return;
                };
                let signal = TypingSignal {
                    chat_id,
                    user_id,
                    is_typing,
                };
                if self.typing.on_remote_signal(&signal) {
                    self.publish(ChatUpdate::Typing(is_typing));
                }
            }
            ServerEvent::MessagesRead { user_id } => {
                if self.store.mark_read_by(&user_id) > 0 {
                    self.publish(ChatUpdate::ReadBy(user_id));
                }
            }
            ServerEvent::Connected => tracing::debug!("Event channel ready"),
            ServerEvent::Disconnected { reason } => {
                tracing::warn!("Event channel disconnected: {}", reason);
                self.publish(ChatUpdate::Disconnected(reason));
            }
            ServerEvent::Unknown { name } => tracing::debug!(event = %name, "Ignoring event"),
        }
    }

    /// Apply a command from the user interface.
    pub fn handle_command(&mut self, command: ChatCommand) {
        match command {
            ChatCommand::SelectStudent(student_id) => self.select_student(&student_id),
            ChatCommand::OpenOwn => self.open_own(),
            ChatCommand::ListStudents => self.list_students(),
            ChatCommand::Input => self.input(Instant::now()),
            ChatCommand::Send(content) => {
                self.send(&content);
            }
            ChatCommand::Delete {
                message_id,
                for_everyone,
            } => self.delete_message(&message_id, for_everyone),
            ChatCommand::MarkRead => self.mark_read(),
        }
    }

    /// The input changed at `now`.
    pub fn input(&mut self, now: Instant) {
        if let Some(signal) = self.typing.on_local_input(now) {
            self.emit(ClientEvent::Typing(signal));
        }
    }

    /// Publish `content` to the active session.
    ///
    /// The message is not rendered until the server echoes it back as
    /// `new_message`. Returns `false` when nothing was sent (blank content
    /// or no session).
    pub fn send(&mut self, content: &str) -> bool {
        let content = content.trim();
        if content.is_empty() {
            return false;
        }
        let Some(session) = &self.session else {
            tracing::debug!("Ignoring send without an open session");
            return false;
        };

        let event = ClientEvent::SendMessage {
            chat_id: session.id.clone(),
            sender_id: self.local_user.id.clone(),
            content: content.to_string(),
            message_type: MessageType::Text,
        };
        self.emit(event);
        if let Some(signal) = self.typing.on_local_send() {
            self.emit(ClientEvent::Typing(signal));
        }
        true
    }

    /// Delete a message through the REST API, then remove it locally.
    pub fn delete_message(&mut self, message_id: &str, for_everyone: bool) {
        let api = Arc::clone(&self.api);
        let message_id = message_id.to_string();
        self.spawn_load(self.epoch, async move {
            let result = api.delete_message(&message_id, for_everyone).await;
            LoadKind::Deleted { message_id, result }
        });
    }

    /// Emit a read receipt for the active session.
    pub fn mark_read(&mut self) {
        let Some(session) = &self.session else {
            return;
        };
        let event = ClientEvent::MarkRead {
            chat_id: session.id.clone(),
            user_id: self.local_user.id.clone(),
        };
        self.emit(event);
    }

    /// Advance timers to `now`.
    pub fn tick(&mut self, now: Instant) {
        if let Some(signal) = self.typing.poll(now) {
            self.emit(ClientEvent::Typing(signal));
        }
    }

    fn emit(&mut self, event: ClientEvent) {
        if let Err(e) = self.membership.emit(event) {
            self.notice(e.to_string());
        }
    }

    fn set_view(&mut self, view: ChatView) {
        if self.view != view {
            self.view = view.clone();
            self.publish(ChatUpdate::View(view));
        }
    }

    fn notice(&self, text: String) {
        tracing::warn!("{}", text);
        self.publish(ChatUpdate::Notice(text));
    }

    fn publish(&self, update: ChatUpdate) {
        let _ = self.updates.send(update);
    }

    // -- event loop ---------------------------------------------------------

    /// Run the view until cancelled, until the UI drops its command sender,
    /// or until the event channel disconnects.
    ///
    /// The membership is released when the controller is dropped at the end.
    pub async fn run(
        mut self,
        mut inbound: mpsc::UnboundedReceiver<ServerEvent>,
        mut commands: mpsc::UnboundedReceiver<ChatCommand>,
        cancellation: CancellationToken,
    ) -> Result<()> {
        loop {
            let deadline = self.typing.deadline();
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => break,

                Some(load) = self.loads_rx.recv() => self.handle_load(load),

                maybe_event = inbound.recv() => match maybe_event {
                    Some(event) => {
                        let closing = matches!(event, ServerEvent::Disconnected { .. });
                        self.handle_server_event(event);
                        if closing {
                            break;
                        }
                    }
                    None => {
                        self.publish(ChatUpdate::Disconnected("event channel closed".to_string()));
                        break;
                    }
                },

                maybe_command = commands.recv() => match maybe_command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },

                _ = wait_until(deadline) => self.tick(Instant::now()),
            }
        }

        if self.typing.deadline().is_some() {
            if let Some(signal) = self.typing.on_local_send() {
                let _ = self.membership.emit(ClientEvent::Typing(signal));
            }
        }
        tracing::debug!("Chat view closed");
        Ok(())
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
