use colored::Colorize;

use super::{format_time, require};
use crate::api::types::{Announcement, NewAnnouncement, Role};
use crate::auth::AuthSession;
use crate::cli::AnnouncementCommand;
use crate::error::Result;

/// Handle `studyflow announcements ...`
pub async fn handle_announcements(session: &AuthSession, command: AnnouncementCommand) -> Result<()> {
    match command {
        AnnouncementCommand::List => {
            require(session, None)?;
            let announcements = session.api().announcements().await?;
            if announcements.is_empty() {
                println!("{}", "No announcements.".yellow());
            }
            for announcement in &announcements {
                println!("{}\n", render(announcement));
            }
        }
        AnnouncementCommand::Create { title, content } => {
            require(session, Some(Role::Admin))?;
            let created = session
                .api()
                .create_announcement(&NewAnnouncement { title, content })
                .await?;
            println!("{}", format!("Posted announcement {}", created.id).green());
        }
        AnnouncementCommand::Delete { id } => {
            require(session, Some(Role::Admin))?;
            session.api().delete_announcement(&id).await?;
            println!("{}", format!("Deleted announcement {}", id).green());
        }
    }
    Ok(())
}

fn render(announcement: &Announcement) -> String {
    let when = announcement
        .created_at
        .as_ref()
        .map(format_time)
        .unwrap_or_default();
    format!(
        "{} {}\n{}\n{}",
        announcement.title.bold(),
        when.dimmed(),
        announcement.content,
        announcement.id.dimmed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_title_and_content() {
        colored::control::set_override(false);
        let text = render(&Announcement {
            id: "n1".into(),
            title: "Exam moved".into(),
            content: "Now on Friday".into(),
            created_by: "a1".into(),
            created_at: None,
        });
        assert!(text.starts_with("Exam moved"));
        assert!(text.contains("Now on Friday"));
        assert!(text.ends_with("n1"));
    }
}
