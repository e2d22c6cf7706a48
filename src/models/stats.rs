use sqlx::{FromRow, SqlitePool};

use crate::models::event::{self, EventSummary};
use crate::models::user::{self, UserDisplay};
use crate::models::registration;

/// Totals and recent activity for the admin dashboard.
pub struct DashboardStats {
    pub total_users: i64,
    pub total_events: i64,
    pub total_registrations: i64,
    pub total_organizers: i64,
    pub upcoming_events: i64,
    pub new_users_30_days: i64,
    pub recent_events: Vec<EventSummary>,
    pub recent_users: Vec<UserDisplay>,
}

#[derive(Debug, Clone, FromRow)]
pub struct LabelCount {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct TopEvent {
    pub id: i64,
    pub title: String,
    pub date: String,
    pub max_participants: i64,
    pub registrations_count: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct TopOrganizer {
    pub id: i64,
    pub username: String,
    pub events_count: i64,
}

pub struct SiteStats {
    pub users_by_role: Vec<LabelCount>,
    pub events_by_category: Vec<LabelCount>,
    pub top_events: Vec<TopEvent>,
    pub top_organizers: Vec<TopOrganizer>,
    pub events_by_month: Vec<LabelCount>,
    pub registrations_by_month: Vec<LabelCount>,
    pub avg_registrations_per_event: f64,
    pub full_events_percent: f64,
}

pub async fn load_dashboard(pool: &SqlitePool, now: &str) -> Result<DashboardStats, sqlx::Error> {
    Ok(DashboardStats {
        total_users: user::count(pool).await?,
        total_events: event::count(pool).await?,
        total_registrations: registration::count(pool).await?,
        total_organizers: user::count_organizers(pool).await?,
        upcoming_events: event::count_upcoming(pool, now).await?,
        new_users_30_days: user::count_created_since_days(pool, 30).await?,
        recent_events: event::find_recent(pool, 5).await?,
        recent_users: user::find_recent(pool, 5).await?,
    })
}

pub async fn load(pool: &SqlitePool) -> Result<SiteStats, sqlx::Error> {
    let users_by_role = sqlx::query_as::<_, LabelCount>(
        "SELECT role AS label, COUNT(*) AS count FROM users GROUP BY role ORDER BY count DESC, role",
    )
    .fetch_all(pool)
    .await?;

    let events_by_category = sqlx::query_as::<_, LabelCount>(
        "SELECT category AS label, COUNT(*) AS count FROM events \
         WHERE category != '' GROUP BY category ORDER BY count DESC, category",
    )
    .fetch_all(pool)
    .await?;

    let top_events = sqlx::query_as::<_, TopEvent>(
        "SELECT e.id, e.title, e.date, e.max_participants, COUNT(r.id) AS registrations_count \
         FROM events e LEFT JOIN registrations r ON r.event_id = e.id \
         GROUP BY e.id ORDER BY registrations_count DESC, e.id LIMIT 5",
    )
    .fetch_all(pool)
    .await?;

    let top_organizers = sqlx::query_as::<_, TopOrganizer>(
        "SELECT u.id, u.username, COUNT(e.id) AS events_count \
         FROM users u JOIN events e ON e.organizer_id = u.id \
         GROUP BY u.id ORDER BY events_count DESC, u.id LIMIT 5",
    )
    .fetch_all(pool)
    .await?;

    let events_by_month = per_month(pool, "events").await?;
    let registrations_by_month = per_month(pool, "registrations").await?;

    let total_events = event::count(pool).await?;
    let total_registrations = registration::count(pool).await?;

    let limited_events: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE max_participants > 0")
        .fetch_one(pool)
        .await?;
    let full_events: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM events e WHERE e.max_participants > 0 \
         AND (SELECT COUNT(*) FROM registrations r WHERE r.event_id = e.id) >= e.max_participants",
    )
    .fetch_one(pool)
    .await?;

    Ok(SiteStats {
        users_by_role,
        events_by_category,
        top_events,
        top_organizers,
        events_by_month,
        registrations_by_month,
        avg_registrations_per_event: ratio(total_registrations, total_events, 1.0),
        full_events_percent: ratio(full_events, limited_events, 100.0),
    })
}

/// Rows created per `YYYY-MM` over the last six months, oldest first.
/// `table` is one of our own table names, never user input.
async fn per_month(pool: &SqlitePool, table: &str) -> Result<Vec<LabelCount>, sqlx::Error> {
    let sql = format!(
        "SELECT strftime('%Y-%m', created_at) AS label, COUNT(*) AS count FROM {table} \
         WHERE created_at >= strftime('%Y-%m-%d %H:%M:%S', 'now', '-6 months') \
         GROUP BY label ORDER BY label"
    );
    sqlx::query_as::<_, LabelCount>(&sql).fetch_all(pool).await
}

/// `part / whole * scale`, rounded to two decimals; 0 when `whole` is 0.
pub fn ratio(part: i64, whole: i64, scale: f64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    (part as f64 / whole as f64 * scale * 100.0).round() / 100.0
}
