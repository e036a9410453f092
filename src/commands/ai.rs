//! AI helper commands: the doubt solver and image feedback

use std::path::Path;

use base64::Engine as _;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use super::require;
use crate::api::types::ChatTurn;
use crate::auth::AuthSession;
use crate::error::{Result, StudyflowError};

/// `studyflow ask [QUESTION]`
///
/// With a question, prints one answer. Without, starts a conversation where
/// earlier turns are sent along as context; an empty line or Ctrl-D ends it.
pub async fn ask(session: &AuthSession, question: Option<String>) -> Result<()> {
    require(session, None)?;

    if let Some(question) = question {
        let answer = session.api().ask_doubt(&question, &[]).await?;
        println!("{}", answer);
        return Ok(());
    }

    let mut rl = DefaultEditor::new()?;
    let mut history: Vec<ChatTurn> = Vec::new();
    println!("{}", "Ask a question (empty line to finish).".dimmed());

    loop {
        let question = match rl.readline(&format!("{} ", "?".cyan().bold())) {
            Ok(line) => line.trim().to_string(),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        if question.is_empty() {
            break;
        }
        let _ = rl.add_history_entry(question.as_str());

        match session.api().ask_doubt(&question, &history).await {
            Ok(answer) => {
                println!("{}\n", answer);
                record_turn(&mut history, question, answer);
            }
            Err(e) => {
                // Keep the conversation going; the question can be re-asked.
                eprintln!("{}", format!("Error: {}", e).red());
                if crate::error::classify(&e).is_some_and(|e| e.requires_login()) {
                    return Err(e);
                }
            }
        }
    }
    Ok(())
}

fn record_turn(history: &mut Vec<ChatTurn>, question: String, answer: String) {
    history.push(ChatTurn {
        role: "user".to_string(),
        content: question,
    });
    history.push(ChatTurn {
        role: "assistant".to_string(),
        content: answer,
    });
}

/// `studyflow analyze IMAGE`
pub async fn analyze(session: &AuthSession, image: &Path, prompt: &str) -> Result<()> {
    require(session, None)?;
    let encoded = encode_image(image).await?;
    tracing::debug!(path = %image.display(), bytes = encoded.len(), "Uploading image for analysis");
    let feedback = session.api().analyze_image(encoded, prompt).await?;
    println!("{}", feedback);
    Ok(())
}

/// Read an image file and encode it as standard base64.
pub(crate) async fn encode_image(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        StudyflowError::Config(format!("Cannot read image {}: {}", path.display(), e))
    })?;
    if bytes.is_empty() {
        return Err(StudyflowError::Config(format!("Image {} is empty", path.display())).into());
    }
    Ok(base64::engine::general_purpose::STANDARD.encode(bytes))
}
