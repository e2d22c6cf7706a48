//! Shared test infrastructure for model and HTTP tests.
//!
//! # Test Database Setup
//! - `setup_test_db()` - migrated SQLite database in a temp directory
//! - `create_user()` / `create_event()` - fixture rows

#![allow(dead_code)]

use tempfile::TempDir;

use eventmanager::db::{self, DbPool};
use eventmanager::models::event::{self, EventInput};
use eventmanager::models::user::{self, NewUser, Role};

// ============================================================================
// TEST CONSTANTS
// ============================================================================

/// Reference "now" for queries that take the current time as a parameter.
pub const NOW: &str = "2030-06-01 12:00:00";
pub const FUTURE_DATE: &str = "2030-07-01 18:00:00";
pub const PAST_DATE: &str = "2030-05-01 18:00:00";

/// Stand-in password hash for model tests that never log in.
pub const FAKE_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$aGFzaGhhc2g";

// ============================================================================
// DATABASE SETUP
// ============================================================================

/// A migrated database that lives as long as this value.
pub struct TestDb {
    _dir: TempDir,
    pool: DbPool,
}

impl TestDb {
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

/// Setup a test database with the full schema and no rows.
pub async fn setup_test_db() -> TestDb {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("test.db").display());
    let pool = db::init_pool(&url).await.expect("Failed to open test DB");
    db::run_migrations(&pool).await.expect("Failed to run migrations");
    TestDb { _dir: dir, pool }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub async fn create_user(pool: &DbPool, username: &str, role: Role) -> i64 {
    create_user_with_hash(pool, username, role, FAKE_HASH).await
}

pub async fn create_user_with_hash(pool: &DbPool, username: &str, role: Role, hash: &str) -> i64 {
    let new_user = NewUser {
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password: hash.to_string(),
        role,
    };
    user::create(pool, &new_user).await.expect("Failed to create user")
}

pub fn event_input(title: &str, date: &str, max_participants: i64) -> EventInput {
    EventInput {
        title: title.to_string(),
        description: format!("{title} description text"),
        date: date.to_string(),
        location: "Main Hall".to_string(),
        category: "Meetup".to_string(),
        max_participants,
    }
}

pub async fn create_event(pool: &DbPool, organizer_id: i64, title: &str, date: &str, max_participants: i64) -> i64 {
    event::create(pool, organizer_id, &event_input(title, date, max_participants))
        .await
        .expect("Failed to create event")
}
