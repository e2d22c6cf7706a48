//! Field-level validation and normalisation shared by the form handlers.
//!
//! Validators return `Some(message)` on failure so callers can collect or
//! short-circuit as the form requires. Output escaping is left to the
//! template engine; these helpers only trim and bound input.

/// Validate a username: 3-50 chars.
pub fn validate_username(username: &str) -> Option<String> {
    let len = username.trim().chars().count();
    if len < 3 {
        return Some("Username must be at least 3 characters!".to_string());
    }
    if len > 50 {
        return Some("Username is too long (max 50 characters)!".to_string());
    }
    None
}

/// Whether `email` looks like a deliverable address: one `@`, a non-empty
/// local part, and a dotted domain without empty labels or whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.len() > 64 || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2
        && labels.iter().all(|l| {
            !l.is_empty()
                && !l.starts_with('-')
                && !l.ends_with('-')
                && l.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

pub fn validate_email(email: &str) -> Option<String> {
    if is_valid_email(email.trim()) {
        None
    } else {
        Some("Invalid email address!".to_string())
    }
}

/// Validate password strength: at least `min_len` characters.
pub fn validate_password(password: &str, min_len: usize) -> Option<String> {
    if password.chars().count() < min_len {
        return Some(format!("Password must be at least {min_len} characters!"));
    }
    None
}

/// Validate that a trimmed value's length lies within `min..=max` characters.
pub fn validate_length(value: &str, field_name: &str, min: usize, max: usize) -> Option<String> {
    let len = value.trim().chars().count();
    if len < min || len > max {
        return Some(format!("{field_name} must be between {min} and {max} characters!"));
    }
    None
}

/// Trim and cap a free-text field at `max_chars` characters.
pub fn sanitize_text(value: &str, max_chars: usize) -> String {
    value.trim().chars().take(max_chars).collect()
}

/// Lenient integer parse for numeric form fields; junk becomes 0.
pub fn sanitize_int(value: &str) -> i64 {
    let digits: String = value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '-' || *c == '+')
        .collect();
    digits.parse().unwrap_or(0)
}

/// Strip everything but the characters allowed in an email address.
pub fn sanitize_email(value: &str) -> String {
    value
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || "!#$%&'*+-=?^_`{|}~@.[]".contains(*c))
        .collect()
}
