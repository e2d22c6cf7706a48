use sqlx::{FromRow, SqlitePool};

use crate::models::event::types::short_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered,
    AlreadyRegistered,
    Full,
    EventPast,
    EventNotFound,
}

impl RegisterOutcome {
    /// Message shown to the user for this outcome.
    pub fn message(self) -> &'static str {
        match self {
            RegisterOutcome::Registered => "You have successfully registered for this event!",
            RegisterOutcome::AlreadyRegistered => "You are already registered for this event!",
            RegisterOutcome::Full => "Sorry, this event is full!",
            RegisterOutcome::EventPast => "You cannot register for past events!",
            RegisterOutcome::EventNotFound => "Event not found!",
        }
    }
}

/// A participant of an event, as listed on the event page.
#[derive(Debug, Clone, FromRow)]
pub struct Participant {
    pub user_id: i64,
    pub username: String,
    pub email: String,
    pub registration_date: String,
}

/// One of the caller's registrations with event context.
#[derive(Debug, Clone, FromRow)]
pub struct UserRegistration {
    pub event_id: i64,
    pub title: String,
    pub description: String,
    pub date: String,
    pub location: String,
    pub category: String,
    pub max_participants: i64,
    pub registration_date: String,
    pub organizer_name: String,
    pub current_participants: i64,
}

impl UserRegistration {
    pub fn date_short(&self) -> &str {
        short_datetime(&self.date)
    }

    pub fn is_past(&self, now: &str) -> bool {
        self.date.as_str() < now
    }
}

/// Register `user_id` for `event_id`. The capacity and date checks run in the
/// same statement as the insert, so concurrent registrations cannot overfill
/// an event. `now` is in storage format.
pub async fn register(pool: &SqlitePool, user_id: i64, event_id: i64, now: &str) -> Result<RegisterOutcome, sqlx::Error> {
    let inserted = sqlx::query(
        "INSERT INTO registrations (user_id, event_id) \
         SELECT ?, e.id FROM events e \
         WHERE e.id = ? \
           AND e.date >= ? \
           AND (e.max_participants = 0 \
                OR (SELECT COUNT(*) FROM registrations r WHERE r.event_id = e.id) < e.max_participants)",
    )
    .bind(user_id)
    .bind(event_id)
    .bind(now)
    .execute(pool)
    .await;

    match inserted {
        Ok(result) if result.rows_affected() > 0 => return Ok(RegisterOutcome::Registered),
        Ok(_) => {}
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            return Ok(RegisterOutcome::AlreadyRegistered);
        }
        Err(e) => return Err(e),
    }

    // Nothing inserted: work out which condition refused it.
    let event: Option<(String,)> = sqlx::query_as("SELECT date FROM events WHERE id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    let Some((date,)) = event else {
        return Ok(RegisterOutcome::EventNotFound);
    };
    if is_registered(pool, user_id, event_id).await? {
        return Ok(RegisterOutcome::AlreadyRegistered);
    }
    if date.as_str() < now {
        return Ok(RegisterOutcome::EventPast);
    }
    Ok(RegisterOutcome::Full)
}

/// Returns `false` when there was no such registration.
pub async fn unregister(pool: &SqlitePool, user_id: i64, event_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM registrations WHERE user_id = ? AND event_id = ?")
        .bind(user_id)
        .bind(event_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn is_registered(pool: &SqlitePool, user_id: i64, event_id: i64) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE user_id = ? AND event_id = ?")
        .bind(user_id)
        .bind(event_id)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn count_for_event(pool: &SqlitePool, event_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM registrations WHERE event_id = ?")
        .bind(event_id)
        .fetch_one(pool)
        .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM registrations").fetch_one(pool).await
}

/// Participants of an event, newest registration first.
pub async fn participants(pool: &SqlitePool, event_id: i64) -> Result<Vec<Participant>, sqlx::Error> {
    sqlx::query_as::<_, Participant>(
        "SELECT u.id AS user_id, u.username, u.email, r.registration_date \
         FROM registrations r JOIN users u ON r.user_id = u.id \
         WHERE r.event_id = ? \
         ORDER BY r.registration_date DESC, r.id DESC",
    )
    .bind(event_id)
    .fetch_all(pool)
    .await
}

/// A user's registrations ordered by event date.
pub async fn find_by_user(pool: &SqlitePool, user_id: i64) -> Result<Vec<UserRegistration>, sqlx::Error> {
    sqlx::query_as::<_, UserRegistration>(
        "SELECT e.id AS event_id, e.title, e.description, e.date, e.location, e.category, \
                e.max_participants, r.registration_date, \
                u.username AS organizer_name, \
                (SELECT COUNT(*) FROM registrations r2 WHERE r2.event_id = e.id) AS current_participants \
         FROM registrations r \
         JOIN events e ON r.event_id = e.id \
         JOIN users u ON e.organizer_id = u.id \
         WHERE r.user_id = ? \
         ORDER BY e.date ASC, e.id ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
