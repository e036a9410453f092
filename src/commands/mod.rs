/*!
Command handlers for the CLI

Each subcommand of [`crate::cli::Commands`] maps onto one handler in a
submodule:

- `auth`: login, register, logout, whoami
- `students`: admin student management
- `tasks`: task listing, creation, editing, deletion, submissions and review
- `announcements`: announcement board
- `progress`: personal progress and leaderboard
- `ai`: doubt solver and image feedback
- `chat`: interactive real-time chat

Handlers print to STDOUT and return errors to the entry point, which lets
[`AuthSession::handle_error`] decide whether the user must log in again.
*/

use chrono::{DateTime, Local, Utc};

use crate::api::types::{Role, User};
use crate::auth::{AuthSession, GuardOutcome, Route};
use crate::cli::Commands;
use crate::config::Config;
use crate::error::{Result, StudyflowError};

pub mod ai;
pub mod announcements;
pub mod auth;
pub mod chat;
pub mod progress;
pub mod students;
pub mod tasks;

/// Run one CLI command.
///
/// # Arguments
///
/// * `command` - Parsed subcommand
/// * `config` - Validated configuration
/// * `session` - Restored (possibly anonymous) session
pub async fn dispatch(command: Commands, config: &Config, session: &mut AuthSession) -> Result<()> {
    match command {
        Commands::Login { email, password } => auth::login(session, &email, password).await,
        Commands::Register {
            email,
            name,
            password,
            role,
        } => auth::register(session, &email, &name, password, &role).await,
        Commands::Logout => auth::logout(session).await,
        Commands::Whoami => auth::whoami(session),
        Commands::Students { command } => students::handle_students(session, command).await,
        Commands::Tasks { command } => tasks::handle_tasks(session, command).await,
        Commands::Submit {
            task,
            content,
            kind,
        } => tasks::submit(session, &task, &content, &kind).await,
        Commands::Submissions { command } => tasks::handle_submissions(session, command).await,
        Commands::Announcements { command } => {
            announcements::handle_announcements(session, command).await
        }
        Commands::Progress { command } => progress::handle_progress(session, command).await,
        Commands::Ask { question } => ai::ask(session, question).await,
        Commands::Analyze { image, prompt } => ai::analyze(session, &image, &prompt).await,
        Commands::Chat {
            student,
            message: Some(text),
        } => chat::post_once(session, student, &text).await,
        Commands::Chat { student, message: None } => chat::run_chat(config, session, student).await,
    }
}

/// Require a logged-in user, optionally with a specific role.
///
/// # Errors
///
/// - [`StudyflowError::NotAuthenticated`] when nobody is logged in
/// - [`StudyflowError::Forbidden`] when the role does not match
pub(crate) fn require(session: &AuthSession, role: Option<Role>) -> Result<User> {
    match session.guard(role) {
        GuardOutcome::Allow => session
            .user()
            .cloned()
            .ok_or_else(|| StudyflowError::NotAuthenticated.into()),
        GuardOutcome::Redirect(Route::Login) => Err(StudyflowError::NotAuthenticated.into()),
        GuardOutcome::Redirect(_) => Err(StudyflowError::Forbidden(format!(
            "this command requires the {} role",
            role.map(|r| r.to_string()).unwrap_or_default()
        ))
        .into()),
    }
}

/// Read one line from the terminal.
pub(crate) fn prompt_line(prompt: &str) -> Result<String> {
    let mut rl = rustyline::DefaultEditor::new()?;
    let line = rl.readline(prompt)?;
    Ok(line.trim().to_string())
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`.
pub(crate) fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", kept)
}

/// Render a timestamp in local time.
pub(crate) fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}
