use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role. Ordering matters: each role includes the rights of those below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    User,
    Organizer,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::User, Role::Organizer, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Organizer => "organizer",
            Role::Admin => "admin",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Organizer => "Organizer",
            Role::Admin => "Administrator",
        }
    }

    pub fn at_least(self, min: Role) -> bool {
        self >= min
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "user" => Ok(Role::User),
            "organizer" => Ok(Role::Organizer),
            "admin" => Ok(Role::Admin),
            other => Err(format!("Unknown role '{other}'")),
        }
    }
}

/// Internal user struct for authentication; includes password hash.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Role,
    pub created_at: String,
}

/// Safe version for templates, without the password hash.
#[derive(Debug, Clone, FromRow)]
pub struct UserDisplay {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
}

/// Row of the admin user table.
#[derive(Debug, Clone, FromRow)]
pub struct UserWithCounts {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub created_at: String,
    pub events_count: i64,
    pub registrations_count: i64,
}

pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Already hashed.
    pub password: String,
    pub role: Role,
}

/// Form data for self-service registration.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(rename = "g-recaptcha-response", default)]
    pub recaptcha_response: String,
}
