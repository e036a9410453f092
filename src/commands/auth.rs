//! Login, registration and identity commands

use colored::Colorize;

use super::{prompt_line, require};
use crate::api::types::Role;
use crate::auth::{AuthSession, Route};
use crate::error::{Result, StudyflowError};

fn password_or_prompt(password: Option<String>) -> Result<String> {
    match password {
        Some(p) => Ok(p),
        None => prompt_line("Password: "),
    }
}

/// `studyflow login`
pub async fn login(session: &mut AuthSession, email: &str, password: Option<String>) -> Result<()> {
    let password = password_or_prompt(password)?;
    let user = session.login(email, &password).await?;
    println!(
        "{} {} ({})",
        "Logged in as".green(),
        user.name.bold(),
        user.role
    );
    println!("Home: {}", Route::home_for(user.role).to_string().cyan());
    Ok(())
}

/// `studyflow register`
pub async fn register(
    session: &mut AuthSession,
    email: &str,
    name: &str,
    password: Option<String>,
    role: &str,
) -> Result<()> {
    let role = Role::parse_str(role).map_err(StudyflowError::Config)?;
    let password = password_or_prompt(password)?;
    let user = session.register(email, name, &password, role).await?;
    println!(
        "{} {} ({})",
        "Registered and logged in as".green(),
        user.name.bold(),
        user.role
    );
    Ok(())
}

/// `studyflow logout`
pub async fn logout(session: &mut AuthSession) -> Result<()> {
    session.logout().await?;
    println!("{}", "Logged out.".green());
    Ok(())
}

/// `studyflow whoami`
pub fn whoami(session: &AuthSession) -> Result<()> {
    let user = require(session, None)?;
    println!("Name:  {}", user.name.bold());
    println!("Email: {}", user.email);
    println!("Role:  {}", user.role.to_string().cyan());
    println!("ID:    {}", user.id.dimmed());
    Ok(())
}
