use colored::Colorize;
use prettytable::{format, row, Table};

use super::{format_time, require};
use crate::api::types::{NewStudent, Role, User};
use crate::auth::AuthSession;
use crate::cli::StudentCommand;
use crate::error::Result;

/// Handle `studyflow students ...` (admin only)
pub async fn handle_students(session: &AuthSession, command: StudentCommand) -> Result<()> {
    require(session, Some(Role::Admin))?;

    match command {
        StudentCommand::List => {
            let students = session.api().students().await?;
            if students.is_empty() {
                println!("{}", "No students yet.".yellow());
                return Ok(());
            }
            students_table(&students).printstd();
        }
        StudentCommand::Add {
            email,
            name,
            password,
        } => {
            let student = session
                .api()
                .create_student(&NewStudent {
                    email,
                    name,
                    password,
                })
                .await?;
            println!(
                "{}",
                format!("Created student {} ({})", student.name, student.id).green()
            );
        }
    }
    Ok(())
}

pub(crate) fn students_table(students: &[User]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["ID", "Name", "Email", "Joined"]);
    for student in students {
        let joined = student
            .created_at
            .as_ref()
            .map(format_time)
            .unwrap_or_else(|| "-".to_string());
        table.add_row(row![student.id, student.name, student.email, joined]);
    }
    table
}
