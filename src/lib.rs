//! Studyflow - client library for the Studyflow student task platform
//!
//! This library provides the REST client, authentication state, and the
//! real-time chat session client used by the `studyflow` binary.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `api`: REST client with an explicit request context, and wire types
//! - `auth`: token persistence, session restore, route guard
//! - `chat`: Socket.IO event channel, session resolution, message store,
//!   typing tracker, membership, and the chat view controller
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `logging`: tracing subscriber setup
//! - `cli` / `commands`: Command-line interface and its handlers
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use studyflow::{auth, ApiClient, AuthSession, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let api = ApiClient::new(&config.server.api_url, Duration::from_secs(30))?;
//!     let mut session = AuthSession::new(api, auth::build_token_store(&config)?);
//!     if let Some(user) = session.restore().await? {
//!         println!("Welcome back, {}", user.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod chat;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use api::ApiClient;
pub use auth::AuthSession;
pub use chat::{ChatController, ChatUpdate, ChatView};
pub use config::Config;
pub use error::{Result, StudyflowError};
