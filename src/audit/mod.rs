//! Security audit trail.
//!
//! Every security-relevant event becomes one line in an append-only log file
//! and is mirrored through the `log` facade:
//!
//! ```text
//! [2026-03-01 14:02:11] [LOGIN_FAILED] [IP: 203.0.113.7] [User: Guest] Failed password for user: ana
//! ```

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEvent {
    CsrfValidationFailed,
    InvalidRequestOrigin,
    RateLimitExceeded,
    LoginSuccess,
    LoginFailed,
    Logout,
    RegisterSuccess,
    RegisterFailed,
    RegisterError,
    RecaptchaFailed,
    UnauthorizedAccess,
    SessionTimeout,
    EventCreated,
    EventCreateError,
    EventUpdated,
    EventDeleted,
    EventRegistration,
    EventUnregistration,
    RegistrationError,
    UnregistrationError,
    ContactFormSubmitted,
    ContactFormError,
    UserRoleChanged,
    UserDeleted,
}

impl SecurityEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityEvent::CsrfValidationFailed => "CSRF_VALIDATION_FAILED",
            SecurityEvent::InvalidRequestOrigin => "INVALID_REQUEST_ORIGIN",
            SecurityEvent::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            SecurityEvent::LoginSuccess => "LOGIN_SUCCESS",
            SecurityEvent::LoginFailed => "LOGIN_FAILED",
            SecurityEvent::Logout => "LOGOUT",
            SecurityEvent::RegisterSuccess => "REGISTER_SUCCESS",
            SecurityEvent::RegisterFailed => "REGISTER_FAILED",
            SecurityEvent::RegisterError => "REGISTER_ERROR",
            SecurityEvent::RecaptchaFailed => "RECAPTCHA_FAILED",
            SecurityEvent::UnauthorizedAccess => "UNAUTHORIZED_ACCESS",
            SecurityEvent::SessionTimeout => "SESSION_TIMEOUT",
            SecurityEvent::EventCreated => "EVENT_CREATED",
            SecurityEvent::EventCreateError => "EVENT_CREATE_ERROR",
            SecurityEvent::EventUpdated => "EVENT_UPDATED",
            SecurityEvent::EventDeleted => "EVENT_DELETED",
            SecurityEvent::EventRegistration => "EVENT_REGISTRATION",
            SecurityEvent::EventUnregistration => "EVENT_UNREGISTRATION",
            SecurityEvent::RegistrationError => "REGISTRATION_ERROR",
            SecurityEvent::UnregistrationError => "UNREGISTRATION_ERROR",
            SecurityEvent::ContactFormSubmitted => "CONTACT_FORM_SUBMITTED",
            SecurityEvent::ContactFormError => "CONTACT_FORM_ERROR",
            SecurityEvent::UserRoleChanged => "USER_ROLE_CHANGED",
            SecurityEvent::UserDeleted => "USER_DELETED",
        }
    }

    /// Events that indicate a rejected or failed request.
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            SecurityEvent::CsrfValidationFailed
                | SecurityEvent::InvalidRequestOrigin
                | SecurityEvent::RateLimitExceeded
                | SecurityEvent::LoginFailed
                | SecurityEvent::RegisterFailed
                | SecurityEvent::RegisterError
                | SecurityEvent::RecaptchaFailed
                | SecurityEvent::UnauthorizedAccess
                | SecurityEvent::EventCreateError
                | SecurityEvent::RegistrationError
                | SecurityEvent::UnregistrationError
                | SecurityEvent::ContactFormError
        )
    }
}

/// Format one audit line (without trailing newline).
pub fn format_line(timestamp: &str, event: SecurityEvent, ip: &str, user_id: Option<i64>, details: &str) -> String {
    let user = user_id.map_or_else(|| "Guest".to_string(), |id| id.to_string());
    // Keep one event per line even if details carry user input.
    let details = details.replace(['\r', '\n'], " ");
    format!("[{timestamp}] [{}] [IP: {ip}] [User: {user}] {details}", event.as_str())
}

pub struct SecurityLog {
    path: Option<PathBuf>,
    lock: Mutex<()>,
}

impl SecurityLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            lock: Mutex::new(()),
        }
    }

    /// Logger-only variant, no file output.
    pub fn without_file() -> Self {
        Self {
            path: None,
            lock: Mutex::new(()),
        }
    }

    pub fn write(&self, event: SecurityEvent, ip: &str, user_id: Option<i64>, details: &str) {
        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
        let line = format_line(&timestamp, event, ip, user_id, details);

        if event.is_failure() {
            log::warn!(target: "security", "{line}");
        } else {
            log::info!(target: "security", "{line}");
        }

        let Some(path) = &self.path else {
            return;
        };
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = append_line(path, &line) {
            log::error!("Could not write security log {}: {e}", path.display());
        }
    }
}

fn append_line(path: &PathBuf, line: &str) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")
}
