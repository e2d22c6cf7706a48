use sqlx::SqlitePool;

use super::types::{NewUser, Role, User, UserDisplay, UserWithCounts};

const SELECT_USER_DISPLAY: &str = "SELECT id, username, email, role, created_at FROM users";

/// Find a user by username or email for authentication. An exact username
/// match wins over an email match.
pub async fn find_by_login(pool: &SqlitePool, username_or_email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT id, username, email, password, role, created_at \
         FROM users \
         WHERE username = ? OR email = ? \
         ORDER BY (username = ?) DESC, id \
         LIMIT 1",
    )
    .bind(username_or_email)
    .bind(username_or_email)
    .bind(username_or_email)
    .fetch_optional(pool)
    .await
}

pub async fn exists_username_or_email(pool: &SqlitePool, username: &str, email: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
        .bind(username)
        .bind(email)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

pub async fn find_display_by_id(pool: &SqlitePool, id: i64) -> Result<Option<UserDisplay>, sqlx::Error> {
    sqlx::query_as::<_, UserDisplay>(&format!("{SELECT_USER_DISPLAY} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Most recently created users, newest first.
pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<UserDisplay>, sqlx::Error> {
    sqlx::query_as::<_, UserDisplay>(&format!("{SELECT_USER_DISPLAY} ORDER BY created_at DESC, id DESC LIMIT ?"))
        .bind(limit)
        .fetch_all(pool)
        .await
}

/// All users with the number of events they organize and registrations they hold.
pub async fn find_all_with_counts(pool: &SqlitePool) -> Result<Vec<UserWithCounts>, sqlx::Error> {
    sqlx::query_as::<_, UserWithCounts>(
        "SELECT u.id, u.username, u.email, u.role, u.created_at, \
                (SELECT COUNT(*) FROM events e WHERE e.organizer_id = u.id) AS events_count, \
                (SELECT COUNT(*) FROM registrations r WHERE r.user_id = u.id) AS registrations_count \
         FROM users u \
         ORDER BY u.created_at DESC, u.id DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(pool).await
}

/// Users whose role is at least organizer.
pub async fn count_organizers(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role IN ('admin', 'organizer')")
        .fetch_one(pool)
        .await
}

/// Users created within the last `days` days.
pub async fn count_created_since_days(pool: &SqlitePool, days: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT COUNT(*) FROM users \
         WHERE created_at >= strftime('%Y-%m-%d %H:%M:%S', 'now', '-' || ? || ' days')",
    )
    .bind(days)
    .fetch_one(pool)
    .await
}

pub async fn create(pool: &SqlitePool, new: &NewUser) -> Result<i64, sqlx::Error> {
    let result = sqlx::query("INSERT INTO users (username, email, password, role) VALUES (?, ?, ?, ?)")
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.password)
        .bind(new.role)
        .execute(pool)
        .await?;
    Ok(result.last_insert_rowid())
}

/// Returns `false` when no user has this id.
pub async fn update_role(pool: &SqlitePool, id: i64, role: Role) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET role = ? WHERE id = ?")
        .bind(role)
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete a user. Their events and registrations go with them (ON DELETE CASCADE).
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
