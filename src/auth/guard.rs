//! Route guard for the authenticated / not-authenticated split
//!
//! Mirrors the single navigation rule the application has: no user means
//! the login screen; a user with the wrong role is sent to their own home.

use std::fmt;

use crate::api::types::{Role, User};

/// Top-level destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Login / registration screen
    Login,
    /// Administrator home
    Admin,
    /// Student home
    Dashboard,
}

impl Route {
    /// Home route for a role.
    pub fn home_for(role: Role) -> Self {
        match role {
            Role::Admin => Route::Admin,
            Role::Student => Route::Dashboard,
        }
    }

    /// Path of the route.
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Admin => "/admin",
            Route::Dashboard => "/dashboard",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Result of checking access to a protected area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Proceed
    Allow,
    /// Navigate elsewhere instead
    Redirect(Route),
}

/// Decide whether `user` may enter an area that requires `required`.
///
/// # Examples
///
/// ```
/// use studyflow::auth::guard::{check, GuardOutcome, Route};
/// use studyflow::api::types::Role;
///
/// assert_eq!(check(None, Some(Role::Admin)), GuardOutcome::Redirect(Route::Login));
/// ```
pub fn check(user: Option<&User>, required: Option<Role>) -> GuardOutcome {
    let Some(user) = user else {
        return GuardOutcome::Redirect(Route::Login);
    };
    match required {
        Some(role) if user.role != role => GuardOutcome::Redirect(Route::home_for(user.role)),
        _ => GuardOutcome::Allow,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: Role) -> User {
        User {
            id: "u1".to_string(),
            email: "u1@example.com".to_string(),
            name: "U One".to_string(),
            role,
            created_at: None,
        }
    }

    #[test]
    fn test_anonymous_is_sent_to_login() {
        assert_eq!(check(None, None), GuardOutcome::Redirect(Route::Login));
        assert_eq!(
            check(None, Some(Role::Student)),
            GuardOutcome::Redirect(Route::Login)
        );
    }

    #[test]
    fn test_matching_role_is_allowed() {
        assert_eq!(check(Some(&user(Role::Admin)), Some(Role::Admin)), GuardOutcome::Allow);
        assert_eq!(check(Some(&user(Role::Student)), None), GuardOutcome::Allow);
    }

    #[test]
    fn test_role_mismatch_redirects_home() {
        assert_eq!(
            check(Some(&user(Role::Student)), Some(Role::Admin)),
            GuardOutcome::Redirect(Route::Dashboard)
        );
        assert_eq!(
            check(Some(&user(Role::Admin)), Some(Role::Student)),
            GuardOutcome::Redirect(Route::Admin)
        );
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Login.to_string(), "/login");
        assert_eq!(Route::home_for(Role::Admin).path(), "/admin");
    }
}
