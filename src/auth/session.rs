use actix_session::Session;

use crate::errors::AppError;
use crate::models::user::{Role, User};

/// Session ids older than this are regenerated.
pub const REGENERATE_AFTER_SECS: i64 = 1800;
/// Authenticated sessions idle longer than this are destroyed.
pub const IDLE_TIMEOUT_SECS: i64 = 3600;

const CREATED_KEY: &str = "created";
const LAST_ACTIVITY_KEY: &str = "last_activity";

/// The authenticated caller as recorded in the session at login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_organizer(&self) -> bool {
        self.role.at_least(Role::Organizer)
    }
}

pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn get_user_id(session: &Session) -> Option<i64> {
    session.get::<i64>("user_id").unwrap_or(None)
}

pub fn get_role(session: &Session) -> Option<Role> {
    session
        .get::<String>("role")
        .unwrap_or(None)
        .and_then(|r| r.parse().ok())
}

pub fn current_user(session: &Session) -> Option<CurrentUser> {
    let id = get_user_id(session)?;
    let role = get_role(session)?;
    let username = session.get::<String>("username").unwrap_or(None).unwrap_or_default();
    let email = session.get::<String>("email").unwrap_or(None).unwrap_or_default();
    Some(CurrentUser { id, username, email, role })
}

/// The authenticated caller, or `AppError::Session` (redirect to login).
pub fn require_user(session: &Session) -> Result<CurrentUser, AppError> {
    current_user(session).ok_or_else(|| AppError::Session("Not logged in".to_string()))
}

/// The authenticated caller if their role is at least `min`.
pub fn require_role(session: &Session, min: Role) -> Result<CurrentUser, AppError> {
    let user = require_user(session)?;
    if user.role.at_least(min) {
        Ok(user)
    } else {
        Err(AppError::PermissionDenied(format!("requires role '{min}'")))
    }
}

/// Regenerate the session id and populate it for a freshly authenticated user.
pub fn establish(session: &Session, user: &User) {
    session.renew();
    let now = now();
    let _ = session.insert(CREATED_KEY, now);
    let _ = session.insert(LAST_ACTIVITY_KEY, now);
    let _ = session.insert("user_id", user.id);
    let _ = session.insert("username", &user.username);
    let _ = session.insert("email", &user.email);
    let _ = session.insert("role", user.role.as_str());
}

/// Record the session's creation time, regenerating the id once it is older than
/// `REGENERATE_AFTER_SECS`. Runs on every request.
pub fn rotate_if_stale(session: &Session, now: i64) {
    match session.get::<i64>(CREATED_KEY).unwrap_or(None) {
        None => {
            let _ = session.insert(CREATED_KEY, now);
        }
        Some(created) if needs_regeneration(created, now) => {
            session.renew();
            let _ = session.insert(CREATED_KEY, now);
        }
        Some(_) => {}
    }
}

/// Idle-timeout check for authenticated routes. Returns `false` (after purging)
/// when the session has expired, otherwise refreshes the activity timestamp.
pub fn touch(session: &Session, now: i64) -> bool {
    let last = session.get::<i64>(LAST_ACTIVITY_KEY).unwrap_or(None);
    if is_idle_expired(last, now) {
        session.purge();
        return false;
    }
    let _ = session.insert(LAST_ACTIVITY_KEY, now);
    true
}

pub fn needs_regeneration(created: i64, now: i64) -> bool {
    now - created > REGENERATE_AFTER_SECS
}

pub fn is_idle_expired(last_activity: Option<i64>, now: i64) -> bool {
    last_activity.is_some_and(|t| now - t > IDLE_TIMEOUT_SECS)
}

pub fn set_flash(session: &Session, message: &str) {
    let _ = session.insert("flash", message);
}

pub fn take_flash(session: &Session) -> Option<String> {
    let flash = session.get::<String>("flash").unwrap_or(None);
    if flash.is_some() {
        session.remove("flash");
    }
    flash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn regeneration_after_thirty_minutes() {
        assert!(!needs_regeneration(0, REGENERATE_AFTER_SECS));
        assert!(needs_regeneration(0, REGENERATE_AFTER_SECS + 1));
    }

    #[test]
    fn idle_timeout_needs_previous_activity() {
        assert!(!is_idle_expired(None, 1_000_000));
        assert!(!is_idle_expired(Some(100), 100 + IDLE_TIMEOUT_SECS));
        assert!(is_idle_expired(Some(100), 101 + IDLE_TIMEOUT_SECS));
    }

    #[test]
    fn role_helpers() {
        let mut u = CurrentUser {
            id: 1,
            username: "o".into(),
            email: "o@example.com".into(),
            role: Role::Organizer,
        };
        assert!(u.is_organizer());
        assert!(!u.is_admin());
        u.role = Role::Admin;
        assert!(u.is_organizer() && u.is_admin());
        u.role = Role::User;
        assert!(!u.is_organizer());
    }
}
