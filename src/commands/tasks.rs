//! Task and submission commands

use chrono::{DateTime, NaiveDate, Utc};
use colored::Colorize;
use prettytable::{format, row, Table};

use super::{format_time, require, truncate};
use crate::api::types::{
    Difficulty, NewSubmission, NewTask, Role, Submission, SubmissionReview, SubmissionStatus,
    SubmissionType, Task, TaskUpdate,
};
use crate::auth::AuthSession;
use crate::cli::{SubmissionCommand, TaskCommand};
use crate::error::{Result, StudyflowError};

/// Handle `studyflow tasks ...`
pub async fn handle_tasks(session: &AuthSession, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::List => {
            require(session, None)?;
            print_tasks(&session.api().tasks().await?, "No tasks.");
        }
        TaskCommand::Today => {
            require(session, None)?;
            print_tasks(&session.api().today_tasks().await?, "Nothing due today.");
        }
        TaskCommand::Create {
            title,
            description,
            difficulty,
            submission_type,
            deadline,
            assign,
        } => {
            require(session, Some(Role::Admin))?;
            let task = NewTask {
                title,
                description,
                difficulty: Difficulty::parse_str(&difficulty).map_err(StudyflowError::Config)?,
                submission_type: SubmissionType::parse_str(&submission_type)
                    .map_err(StudyflowError::Config)?,
                deadline: parse_deadline(&deadline)?,
                assigned_to: assign,
            };
            let created = session.api().create_task(&task).await?;
            println!(
                "{}",
                format!(
                    "Created task {} ({}), assigned to {} student(s)",
                    created.title,
                    created.id,
                    created.assigned_to.len()
                )
                .green()
            );
        }
        TaskCommand::Update {
            id,
            title,
            description,
            difficulty,
            submission_type,
            deadline,
            assign,
        } => {
            require(session, Some(Role::Admin))?;
            let update = TaskUpdate {
                title,
                description,
                difficulty: difficulty
                    .as_deref()
                    .map(Difficulty::parse_str)
                    .transpose()
                    .map_err(StudyflowError::Config)?,
                submission_type: submission_type
                    .as_deref()
                    .map(SubmissionType::parse_str)
                    .transpose()
                    .map_err(StudyflowError::Config)?,
                deadline: deadline.as_deref().map(parse_deadline).transpose()?,
                assigned_to: (!assign.is_empty()).then_some(assign),
            };
            if is_empty_update(&update) {
                return Err(StudyflowError::Config(
                    "Nothing to update: pass at least one field".to_string(),
                )
                .into());
            }
            let updated = session.api().update_task(&id, &update).await?;
            println!("{}", format!("Updated task {} ({})", updated.title, updated.id).green());
        }
        TaskCommand::Delete { id } => {
            require(session, Some(Role::Admin))?;
            session.api().delete_task(&id).await?;
            println!("{}", format!("Deleted task {}", id).green());
        }
    }
    Ok(())
}

/// `studyflow submit` (students)
///
/// On failure the error is returned as-is so the caller can retry with the
/// same content.
pub async fn submit(session: &AuthSession, task_id: &str, content: &str, kind: &str) -> Result<()> {
    require(session, Some(Role::Student))?;
    let submission = NewSubmission {
        task_id: task_id.to_string(),
        content: content.to_string(),
        submission_type: SubmissionType::parse_str(kind).map_err(StudyflowError::Config)?,
    };
    let created = session.api().submit(&submission).await?;
    let note = if created.is_late { " (late)" } else { "" };
    println!(
        "{}{}",
        format!("Submitted {} for task {}", created.id, created.task_id).green(),
        note.yellow()
    );
    Ok(())
}

/// Handle `studyflow submissions ...`
pub async fn handle_submissions(session: &AuthSession, command: SubmissionCommand) -> Result<()> {
    match command {
        SubmissionCommand::List => {
            require(session, None)?;
            let submissions = session.api().submissions().await?;
            if submissions.is_empty() {
                println!("{}", "No submissions.".yellow());
            } else {
                submissions_table(&submissions).printstd();
            }
        }
        SubmissionCommand::Review {
            id,
            status,
            feedback,
        } => {
            require(session, Some(Role::Admin))?;
            let review = build_review(&status, feedback)?;
            let reviewed = session.api().review_submission(&id, &review).await?;
            println!(
                "{}",
                format!("Submission {} is now {}", reviewed.id, reviewed.status).green()
            );
        }
        SubmissionCommand::Like { id } => {
            require(session, None)?;
            session.api().like_submission(&id).await?;
            println!("{}", format!("Liked submission {}", id).green());
        }
    }
    Ok(())
}

/// Build a review body. Rejections must carry feedback for the student.
pub(crate) fn build_review(status: &str, feedback: Option<String>) -> Result<SubmissionReview> {
    let status = SubmissionStatus::parse_str(status).map_err(StudyflowError::Config)?;
    let feedback = feedback.map(|f| f.trim().to_string()).filter(|f| !f.is_empty());
    if status == SubmissionStatus::Rejected && feedback.is_none() {
        return Err(
            StudyflowError::Config("Feedback is required when rejecting".to_string()).into(),
        );
    }
    Ok(SubmissionReview {
        status: Some(status),
        feedback,
    })
}

fn is_empty_update(update: &TaskUpdate) -> bool {
    update.title.is_none()
        && update.description.is_none()
        && update.difficulty.is_none()
        && update.submission_type.is_none()
        && update.deadline.is_none()
        && update.assigned_to.is_none()
}

/// Parse a deadline given either as RFC 3339 or as a plain `YYYY-MM-DD`
/// date (end of that day, UTC).
pub(crate) fn parse_deadline(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(input) {
        return Ok(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| {
            StudyflowError::Config(format!(
                "Invalid deadline '{}': use YYYY-MM-DD or RFC 3339",
                input
            ))
            .into()
        })
}

fn status_of(task: &Task) -> String {
    match &task.submission {
        Some(submission) => submission.status.to_string(),
        None if task.deadline < Utc::now() => "overdue".to_string(),
        None => "-".to_string(),
    }
}

pub(crate) fn tasks_table(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["ID", "Title", "Difficulty", "Type", "Deadline", "Status"]);
    for task in tasks {
        table.add_row(row![
            task.id,
            truncate(&task.title, 40),
            task.difficulty,
            task.submission_type,
            format_time(&task.deadline),
            status_of(task)
        ]);
    }
    table
}

pub(crate) fn submissions_table(submissions: &[Submission]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);
    table.set_titles(row!["ID", "Task", "Student", "Submitted", "Status", "Likes", "Content"]);
    for submission in submissions {
        let submitted = if submission.is_late {
            format!("{} (late)", format_time(&submission.submitted_at))
        } else {
            format_time(&submission.submitted_at)
        };
        table.add_row(row![
            submission.id,
            submission.task_id,
            submission.student_id,
            submitted,
            submission.status,
            submission.likes,
            truncate(&submission.content, 30)
        ]);
    }
    table
}

fn print_tasks(tasks: &[Task], empty: &str) {
    if tasks.is_empty() {
        println!("{}", empty.yellow());
        return;
    }
    tasks_table(tasks).printstd();
}
