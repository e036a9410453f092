use colored::Colorize;
use prettytable::{format, row, Table};

use super::require;
use crate::api::types::{LeaderboardEntry, Progress, Role};
use crate::auth::AuthSession;
use crate::cli::ProgressCommand;
use crate::error::Result;

/// Handle `studyflow progress ...`
pub async fn handle_progress(session: &AuthSession, command: ProgressCommand) -> Result<()> {
    match command {
        ProgressCommand::Me => {
            require(session, Some(Role::Student))?;
            print_progress(&session.api().my_progress().await?);
        }
        ProgressCommand::Leaderboard => {
            require(session, None)?;
            let entries = session.api().leaderboard().await?;
            if entries.is_empty() {
                println!("{}", "Leaderboard is empty.".yellow());
                return Ok(());
            }
            leaderboard_table(&entries).printstd();
        }
        ProgressCommand::Student { id } => {
            require(session, Some(Role::Admin))?;
            print_progress(&session.api().student_progress(&id).await?);
        }
    }
    Ok(())
}

fn print_progress(progress: &Progress) {
    println!(
        "Completed: {}/{} ({:.0}%)",
        progress.completed_tasks,
        progress.total_tasks,
        progress.completion_rate()
    );
    println!(
        "Streak:    {} day(s), longest {}",
        progress.current_streak.to_string().bold(),
        progress.longest_streak
    );
    if !progress.badges.is_empty() {
        println!("Badges:    {}", progress.badges.join(", ").cyan());
    }
}

pub(crate) fn leaderboard_table(entries: &[LeaderboardEntry]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["#", "Name", "Done", "Rate", "Streak", "Badges"]);
    for (rank, entry) in entries.iter().enumerate() {
        table.add_row(row![
            rank + 1,
            entry.name,
            format!("{}/{}", entry.completed_tasks, entry.total_tasks),
            format!("{:.0}%", entry.completion_rate),
            entry.current_streak,
            entry.badges.len()
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leaderboard_ranks_in_given_order() {
        let entry = |name: &str, rate: f64| LeaderboardEntry {
            student_id: name.to_lowercase(),
            name: name.to_string(),
            completed_tasks: 3,
            total_tasks: 4,
            completion_rate: rate,
            current_streak: 2,
            badges: vec![],
        };
        let table = leaderboard_table(&[entry("Ann", 75.0), entry("Ben", 50.0)]);
        let text = table.to_string();
        assert_eq!(table.len(), 2);
        assert!(text.find("Ann").unwrap() < text.find("Ben").unwrap());
        assert!(text.contains("75%"));
    }
}
