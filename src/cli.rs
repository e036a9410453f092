//! Command-line interface definition for Studyflow
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for authentication, tasks, announcements, progress,
//! the AI helpers and real-time chat.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Studyflow - student task platform client
///
/// Manage tasks, submissions and announcements, track progress, and chat
/// in real time with your admin or students.
#[derive(Parser, Debug, Clone)]
#[command(name = "studyflow")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the backend URL from config
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Studyflow
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Log in and store the session token
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Password (prompted when omitted)
        #[arg(short, long)]
        password: Option<String>,

        /// Account role
        #[arg(short, long, default_value = "student", value_parser = ["admin", "student"])]
        role: String,
    },

    /// Forget the stored session token
    Logout,

    /// Show the logged-in user
    Whoami,

    /// Manage students (admin)
    Students {
        /// Student subcommand
        #[command(subcommand)]
        command: StudentCommand,
    },

    /// Manage and view tasks
    Tasks {
        /// Task subcommand
        #[command(subcommand)]
        command: TaskCommand,
    },

    /// Submit work for a task (student)
    Submit {
        /// Task identifier
        #[arg(short, long)]
        task: String,

        /// Submission content (text, link or file reference)
        #[arg(short, long)]
        content: String,

        /// Submission type (text, file, link, image)
        #[arg(short = 'k', long, default_value = "text")]
        kind: String,
    },

    /// Review and browse submissions
    Submissions {
        /// Submission subcommand
        #[command(subcommand)]
        command: SubmissionCommand,
    },

    /// Manage and view announcements
    Announcements {
        /// Announcement subcommand
        #[command(subcommand)]
        command: AnnouncementCommand,
    },

    /// Show progress and rankings
    Progress {
        /// Progress subcommand
        #[command(subcommand)]
        command: ProgressCommand,
    },

    /// Ask the AI doubt solver a question
    Ask {
        /// The question; omit to start an interactive session
        question: Option<String>,
    },

    /// Get AI feedback on an image of your work
    Analyze {
        /// Image file to upload
        image: PathBuf,

        /// Instructions for the analysis
        #[arg(
            short,
            long,
            default_value = "Analyze this student work and provide constructive feedback"
        )]
        prompt: String,
    },

    /// Open the real-time chat
    Chat {
        /// Student to chat with (admins only); students always open their own chat
        #[arg(short, long)]
        student: Option<String>,

        /// Post one message over REST and exit instead of opening the live chat
        #[arg(short, long)]
        message: Option<String>,
    },
}

/// Student management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum StudentCommand {
    /// List students
    List,

    /// Create a student account
    Add {
        /// Student email
        #[arg(short, long)]
        email: String,

        /// Student name
        #[arg(short, long)]
        name: String,

        /// Initial password
        #[arg(short, long)]
        password: String,
    },
}

/// Task subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum TaskCommand {
    /// List tasks visible to you
    List,

    /// List tasks due today (students)
    Today,

    /// Create a task (admin)
    Create {
        /// Task title
        #[arg(short, long)]
        title: String,

        /// Task description
        #[arg(short, long)]
        description: String,

        /// Difficulty (Easy, Medium, Hard)
        #[arg(long, default_value = "Medium")]
        difficulty: String,

        /// Expected submission type (text, file, link, image)
        #[arg(long, default_value = "text")]
        submission_type: String,

        /// Deadline (RFC 3339, e.g. 2025-06-01T17:00:00Z)
        #[arg(long)]
        deadline: String,

        /// Student ids to assign (repeatable)
        #[arg(short, long = "assign")]
        assign: Vec<String>,
    },

    /// Edit a task (admin); only the given fields change
    Update {
        /// Task identifier
        id: String,

        /// New title
        #[arg(short, long)]
        title: Option<String>,

        /// New description
        #[arg(short, long)]
        description: Option<String>,

        /// New difficulty (Easy, Medium, Hard)
        #[arg(long)]
        difficulty: Option<String>,

        /// New submission type (text, file, link, image)
        #[arg(long)]
        submission_type: Option<String>,

        /// New deadline (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        deadline: Option<String>,

        /// Replace the assigned students (repeatable)
        #[arg(short, long = "assign")]
        assign: Vec<String>,
    },

    /// Delete a task (admin)
    Delete {
        /// Task identifier
        id: String,
    },
}

/// Submission subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SubmissionCommand {
    /// List submissions (all for admins, your own for students)
    List,

    /// Approve or reject a submission (admin)
    Review {
        /// Submission identifier
        id: String,

        /// New status (approved, rejected, pending)
        #[arg(short, long, value_parser = ["approved", "rejected", "pending"])]
        status: String,

        /// Feedback for the student; required when rejecting
        #[arg(short, long)]
        feedback: Option<String>,
    },

    /// Like a submission
    Like {
        /// Submission identifier
        id: String,
    },
}

/// Announcement subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AnnouncementCommand {
    /// List announcements
    List,

    /// Post an announcement (admin)
    Create {
        /// Announcement title
        #[arg(short, long)]
        title: String,

        /// Announcement body
        #[arg(short, long)]
        content: String,
    },

    /// Delete an announcement (admin)
    Delete {
        /// Announcement identifier
        id: String,
    },
}

/// Progress subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProgressCommand {
    /// Your own progress (students)
    Me,

    /// Student leaderboard (admin)
    Leaderboard,

    /// One student's progress (admin)
    Student {
        /// Student identifier
        id: String,
    },
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            verbose: false,
            api_url: None,
            command: Commands::Whoami,
        }
    }
}
