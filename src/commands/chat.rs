//! Interactive real-time chat
//!
//! Wires the pieces together for one terminal session:
//!
//! - a [`WebSocketTransport`] under the protocol task from [`start_channel`]
//! - a [`ChatController`] running its event loop
//! - a render task printing [`ChatUpdate`]s
//! - a blocking `rustyline` thread turning input lines into [`ChatCommand`]s
//!
//! Leaving the prompt (`/quit`, Ctrl-D) drops the command sender, which ends
//! the controller; its membership is released and the channel is then shut
//! down.

use std::sync::Arc;

use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{format_time, require, truncate};
use crate::api::types::{ChatSession, Message, MessageType, NewMessage, User};
use crate::api::ChatApi;
use crate::auth::AuthSession;
use crate::chat::transport::websocket::WebSocketTransport;
use crate::chat::{
    start_channel, ChatCommand, ChatController, ChatUpdate, ChatView, Resolution, SessionResolver,
};
use crate::config::Config;
use crate::error::{Result, StudyflowError};

/// A parsed line of chat input.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatInput {
    Command(ChatCommand),
    Help,
    Quit,
    Unknown(String),
    Empty,
}

/// Parse one line typed at the chat prompt.
///
/// Lines starting with `/` are commands; anything else is a message.
pub fn parse_input(line: &str, is_admin: bool) -> ChatInput {
    let line = line.trim();
    if line.is_empty() {
        return ChatInput::Empty;
    }
    let Some(command) = line.strip_prefix('/') else {
        return ChatInput::Command(ChatCommand::Send(line.to_string()));
    };

    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next();
    match (name, arg) {
        ("quit" | "exit", _) => ChatInput::Quit,
        ("help", _) => ChatInput::Help,
        ("read", _) => ChatInput::Command(ChatCommand::MarkRead),
        ("delete", Some(id)) => ChatInput::Command(ChatCommand::Delete {
            message_id: id.to_string(),
            for_everyone: false,
        }),
        ("unsend", Some(id)) => ChatInput::Command(ChatCommand::Delete {
            message_id: id.to_string(),
            for_everyone: true,
        }),
        ("students", _) if is_admin => ChatInput::Command(ChatCommand::ListStudents),
        ("open", Some(id)) if is_admin => {
            ChatInput::Command(ChatCommand::SelectStudent(id.to_string()))
        }
        _ => ChatInput::Unknown(line.to_string()),
    }
}

fn print_help(is_admin: bool) {
    println!("{}", "Chat commands:".bold());
    if is_admin {
        println!("  /students        list students");
        println!("  /open <id>       chat with a student");
    }
    println!("  /delete <id>     delete a message for yourself");
    println!("  /unsend <id>     delete a message for everyone");
    println!("  /read            mark the conversation as read");
    println!("  /quit            leave the chat");
}

/// Format one message line.
pub(crate) fn render_message(message: &Message, local_user_id: &str) -> String {
    let who = if message.sender_id == local_user_id {
        "you".green().bold()
    } else {
        truncate(&message.sender_id, 12).cyan().bold()
    };
    let id = message.id.as_deref().unwrap_or("-");
    let receipt = if message.sender_id == local_user_id && message.is_read {
        " ✓".dimmed().to_string()
    } else {
        String::new()
    };
    format!(
        "[{}] {}: {}{} {}",
        format_time(&message.created_at).dimmed(),
        who,
        message.content,
        receipt,
        id.dimmed()
    )
}

/// Turn a controller update into terminal output, if it has any.
pub(crate) fn render_update(update: &ChatUpdate, local_user_id: &str, history_limit: usize) -> Option<String> {
    let text = match update {
        ChatUpdate::View(ChatView::Idle) => return None,
        ChatUpdate::View(ChatView::Loading) => "Loading chat...".dimmed().to_string(),
        ChatUpdate::View(ChatView::NotAvailable) => {
            "No conversation yet. Your admin will start one.".yellow().to_string()
        }
        ChatUpdate::View(ChatView::Ready) => {
            "Ready. Type a message, or /help for commands.".dimmed().to_string()
        }
        ChatUpdate::View(ChatView::Failed(reason)) => reason.red().to_string(),
        ChatUpdate::Opened(session) => format!(
            "{} {}",
            "Chatting with".bold(),
            session.counterpart(local_user_id).cyan()
        ),
        ChatUpdate::Hydrated(messages) => {
            let skip = messages.len().saturating_sub(history_limit);
            if messages.is_empty() {
                "No messages yet.".dimmed().to_string()
            } else {
                messages[skip..]
                    .iter()
                    .map(|m| render_message(m, local_user_id))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        }
        ChatUpdate::Message(message) => render_message(message, local_user_id),
        ChatUpdate::Removed(id) => format!("message {} deleted", id).dimmed().to_string(),
        ChatUpdate::Typing(true) => "typing...".dimmed().italic().to_string(),
        ChatUpdate::Typing(false) => return None,
        ChatUpdate::ReadBy(user_id) if user_id != local_user_id => {
            "✓ read".dimmed().to_string()
        }
        ChatUpdate::ReadBy(_) => return None,
        ChatUpdate::Unread { counterpart, count } => {
            format!("● {} unread from {}", count, counterpart).yellow().to_string()
        }
        ChatUpdate::Students(students) => render_students(students),
        ChatUpdate::Notice(text) => text.yellow().to_string(),
        ChatUpdate::Disconnected(reason) => format!("Disconnected: {}", reason).red().to_string(),
    };
    Some(text)
}

fn render_students(students: &[User]) -> String {
    if students.is_empty() {
        return "No students yet.".yellow().to_string();
    }
    let mut lines = vec!["Students (use /open <id>):".bold().to_string()];
    for student in students {
        lines.push(format!("  {}  {} <{}>", student.id.cyan(), student.name, student.email));
    }
    lines.join("\n")
}

/// `studyflow chat [--student ID] --message TEXT`
///
/// Posts one message through `POST /chat/messages` without opening the
/// event channel. The message reaches the other side on their next history
/// load or live event.
pub async fn post_once(session: &AuthSession, student: Option<String>, text: &str) -> Result<()> {
    let user = require(session, None)?;
    let content = text.trim();
    if content.is_empty() {
        return Err(StudyflowError::Config("Message is empty".to_string()).into());
    }

    let api: Arc<dyn ChatApi> = Arc::new(session.api().clone());
    let resolver = SessionResolver::new(api, user.clone());
    let chat = resolve_target(&resolver, &user, student).await?;

    let sent = session
        .api()
        .post_message(&outgoing(&chat, &user, content))
        .await?;
    println!(
        "{}",
        format!("Sent to {} ({})", chat.counterpart(&user.id), sent.id.as_deref().unwrap_or("-"))
            .green()
    );
    Ok(())
}

async fn resolve_target(
    resolver: &SessionResolver,
    user: &User,
    student: Option<String>,
) -> Result<ChatSession> {
    match (user.is_admin(), student) {
        (true, Some(student_id)) => resolver.resolve_for_student(&student_id).await,
        (true, None) => Err(StudyflowError::Config(
            "Admins must pass --student to send a message".to_string(),
        )
        .into()),
        (false, _) => match resolver.resolve_own().await? {
            Resolution::Ready(chat) => Ok(chat),
            Resolution::NotAvailable => Err(StudyflowError::ChatLoad(
                "No conversation yet. Your admin will start one.".to_string(),
            )
            .into()),
        },
    }
}

fn outgoing(chat: &ChatSession, user: &User, content: &str) -> NewMessage {
    NewMessage {
        chat_id: chat.id.clone(),
        sender_id: user.id.clone(),
        content: content.to_string(),
        message_type: MessageType::Text,
    }
}

/// `studyflow chat [--student ID]`
pub async fn run_chat(config: &Config, session: &AuthSession, student: Option<String>) -> Result<()> {
    let user = require(session, None)?;
    let token = session.api().context().await.token;

    let transport = WebSocketTransport::connect(config.server.socket_url(), token.as_deref()).await?;
    let cancellation = CancellationToken::new();
    let channel = start_channel(Arc::new(transport), cancellation.clone());

    let api: Arc<dyn ChatApi> = Arc::new(session.api().clone());
    let (controller, mut updates) =
        ChatController::new(api, channel.outbound, user.clone(), &config.chat);
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();

    let first = match (user.is_admin(), student) {
        (true, Some(student_id)) => ChatCommand::SelectStudent(student_id),
        (true, None) => ChatCommand::ListStudents,
        (false, _) => ChatCommand::OpenOwn,
    };
    let _ = commands_tx.send(first);

    let controller_task = tokio::spawn(controller.run(
        channel.inbound,
        commands_rx,
        cancellation.child_token(),
    ));

    let local_id = user.id.clone();
    let history_limit = config.chat.history_limit;
    let render_task = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            if let Some(text) = render_update(&update, &local_id, history_limit) {
                println!("{}", text);
            }
        }
    });

    let is_admin = user.is_admin();
    let input_task = tokio::task::spawn_blocking(move || -> Result<()> {
        let mut rl = DefaultEditor::new()?;
        loop {
            match rl.readline("> ") {
                Ok(line) => match parse_input(&line, is_admin) {
                    ChatInput::Command(command) => {
                        let _ = rl.add_history_entry(line.as_str());
                        if commands_tx.send(command).is_err() {
                            break;
                        }
                    }
                    ChatInput::Help => print_help(is_admin),
                    ChatInput::Quit => break,
                    ChatInput::Unknown(text) => {
                        println!("{}", format!("Unknown command: {}", text).yellow())
                    }
                    ChatInput::Empty => {}
                },
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    });

    let input_result = input_task.await;
    // The controller stops when the command sender is dropped with the
    // input thread, or earlier if the channel went away.
    let controller_result = controller_task.await;
    cancellation.cancel();
    if let Err(e) = channel.task.await {
        tracing::warn!("Event channel task failed: {}", e);
    }
    let _ = render_task.await;

    input_result??;
    controller_result??;
    Ok(())
}
