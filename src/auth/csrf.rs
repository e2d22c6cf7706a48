use actix_session::Session;
use rand::Rng;

use crate::errors::AppError;

/// Tokens older than this are replaced when a form is rendered and rejected on submit.
pub const TOKEN_TTL_SECS: i64 = 3600;

const TOKEN_KEY: &str = "csrf_token";
const TOKEN_TIME_KEY: &str = "csrf_token_time";

/// Get the CSRF token from the session, or generate a new one if missing or expired.
pub fn get_or_create_token(session: &Session) -> String {
    get_or_create_token_at(session, chrono::Utc::now().timestamp())
}

fn get_or_create_token_at(session: &Session, now: i64) -> String {
    let stored = session.get::<String>(TOKEN_KEY).unwrap_or(None);
    let issued = session.get::<i64>(TOKEN_TIME_KEY).unwrap_or(None);
    if let (Some(token), Some(issued)) = (stored, issued) {
        if !is_expired(issued, now) {
            return token;
        }
    }
    let token = generate_token();
    let _ = session.insert(TOKEN_KEY, &token);
    let _ = session.insert(TOKEN_TIME_KEY, now);
    token
}

/// Validate the submitted CSRF token against the session token.
pub fn validate_csrf(session: &Session, submitted: &str) -> Result<(), AppError> {
    let stored = session.get::<String>(TOKEN_KEY).unwrap_or(None);
    let issued = session.get::<i64>(TOKEN_TIME_KEY).unwrap_or(None);
    if token_matches(
        stored.as_deref(),
        issued,
        submitted,
        chrono::Utc::now().timestamp(),
    ) {
        Ok(())
    } else {
        Err(AppError::Csrf)
    }
}

/// Pure validation rule: a stored, unexpired token equal to the submitted one.
pub fn token_matches(stored: Option<&str>, issued: Option<i64>, submitted: &str, now: i64) -> bool {
    let Some(stored) = stored else {
        return false;
    };
    if stored.is_empty() || submitted.is_empty() {
        return false;
    }
    if issued.is_some_and(|t| is_expired(t, now)) {
        return false;
    }
    constant_time_eq(stored, submitted)
}

fn is_expired(issued: i64, now: i64) -> bool {
    now - issued > TOKEN_TTL_SECS
}

/// Generate a random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
