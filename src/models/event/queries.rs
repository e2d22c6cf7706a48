use sqlx::SqlitePool;

use super::types::{
    DateFilter, Event, EventDetail, EventFilter, EventInput, EventListItem, EventPage, EventSummary,
};

/// SQL for event list rows: event + organizer name + registration count.
const SELECT_EVENT_LIST: &str = "\
    SELECT e.id, e.title, e.description, e.date, e.location, e.category, \
           e.max_participants, e.organizer_id, \
           u.username AS organizer_name, \
           (SELECT COUNT(*) FROM registrations r WHERE r.event_id = e.id) AS registrations_count \
    FROM events e \
    JOIN users u ON e.organizer_id = u.id";

const SELECT_EVENT: &str = "\
    SELECT id, title, description, date, location, category, max_participants, organizer_id, created_at \
    FROM events";

/// Build the WHERE clause (leading " WHERE ..." or empty) and its bind values.
fn build_where(
    category: Option<&str>,
    search: Option<&str>,
    search_columns: &[&str],
    date: DateFilter,
    now: &str,
) -> (String, Vec<String>) {
    let mut filters = Vec::new();
    let mut params = Vec::new();

    if let Some(cat) = category {
        filters.push("e.category = ?".to_string());
        params.push(cat.to_string());
    }

    if let Some(q) = search {
        let pattern = format!("%{q}%");
        let clause = search_columns
            .iter()
            .map(|col| format!("{col} LIKE ?"))
            .collect::<Vec<_>>()
            .join(" OR ");
        filters.push(format!("({clause})"));
        params.extend(search_columns.iter().map(|_| pattern.clone()));
    }

    match date {
        DateFilter::All => {}
        DateFilter::Upcoming => {
            filters.push("e.date >= ?".to_string());
            params.push(now.to_string());
        }
        DateFilter::Past => {
            filters.push("e.date < ?".to_string());
            params.push(now.to_string());
        }
    }

    let where_clause = if filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", filters.join(" AND "))
    };
    (where_clause, params)
}

/// Public event list: filtered, ordered by date ascending, paginated.
/// `per_page` must already be clamped; `page` is pulled back to the last page.
pub async fn find_paginated(
    pool: &SqlitePool,
    filter: &EventFilter,
    now: &str,
    page: i64,
    per_page: i64,
) -> Result<EventPage, sqlx::Error> {
    let (where_clause, params) = build_where(
        filter.category.as_deref(),
        filter.search.as_deref(),
        &["e.title", "e.description", "e.location"],
        filter.date,
        now,
    );

    let count_sql = format!("SELECT COUNT(*) FROM events e{where_clause}");
    let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
    for p in &params {
        count_query = count_query.bind(p);
    }
    let total_count = count_query.fetch_one(pool).await?;

    let total_pages = ((total_count + per_page - 1) / per_page).max(1);
    let page = page.clamp(1, total_pages);
    let offset = (page - 1) * per_page;

    let sql = format!("{SELECT_EVENT_LIST}{where_clause} ORDER BY e.date ASC, e.id ASC LIMIT ? OFFSET ?");
    let mut query = sqlx::query_as::<_, EventListItem>(&sql);
    for p in &params {
        query = query.bind(p);
    }
    let events = query.bind(per_page).bind(offset).fetch_all(pool).await?;

    Ok(EventPage { events, page, per_page, total_count, total_pages })
}

/// Admin event table: status and title/location search, newest date first.
pub async fn find_for_admin(
    pool: &SqlitePool,
    status: DateFilter,
    search: Option<&str>,
    now: &str,
) -> Result<Vec<EventListItem>, sqlx::Error> {
    let (where_clause, params) = build_where(None, search, &["e.title", "e.location"], status, now);
    let sql = format!("{SELECT_EVENT_LIST}{where_clause} ORDER BY e.date DESC, e.id DESC");
    let mut query = sqlx::query_as::<_, EventListItem>(&sql);
    for p in &params {
        query = query.bind(p);
    }
    query.fetch_all(pool).await
}

/// Next upcoming events for the landing page.
pub async fn find_upcoming(pool: &SqlitePool, now: &str, limit: i64) -> Result<Vec<EventListItem>, sqlx::Error> {
    sqlx::query_as::<_, EventListItem>(&format!(
        "{SELECT_EVENT_LIST} WHERE e.date >= ? ORDER BY e.date ASC, e.id ASC LIMIT ?"
    ))
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await
}

/// Most recently created events.
pub async fn find_recent(pool: &SqlitePool, limit: i64) -> Result<Vec<EventSummary>, sqlx::Error> {
    sqlx::query_as::<_, EventSummary>(
        "SELECT e.id, e.title, e.date, e.location, u.username AS organizer_name \
         FROM events e JOIN users u ON e.organizer_id = u.id \
         ORDER BY e.created_at DESC, e.id DESC LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> Result<Option<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!("{SELECT_EVENT} WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_detail(pool: &SqlitePool, id: i64) -> Result<Option<EventDetail>, sqlx::Error> {
    sqlx::query_as::<_, EventDetail>(
        "SELECT e.id, e.title, e.description, e.date, e.location, e.category, \
                e.max_participants, e.organizer_id, e.created_at, \
                u.username AS organizer_name, u.email AS organizer_email \
         FROM events e JOIN users u ON e.organizer_id = u.id \
         WHERE e.id = ?",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

/// Events organized by a user, latest date first.
pub async fn find_by_organizer(pool: &SqlitePool, organizer_id: i64) -> Result<Vec<Event>, sqlx::Error> {
    sqlx::query_as::<_, Event>(&format!("{SELECT_EVENT} WHERE organizer_id = ? ORDER BY date DESC, id DESC"))
        .bind(organizer_id)
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM events").fetch_one(pool).await
}

pub async fn count_upcoming(pool: &SqlitePool, now: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM events WHERE date >= ?")
        .bind(now)
        .fetch_one(pool)
        .await
}

pub async fn create(pool: &SqlitePool, organizer_id: i64, input: &EventInput) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO events (title, description, date, location, category, max_participants, organizer_id) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.date)
    .bind(&input.location)
    .bind(&input.category)
    .bind(input.max_participants)
    .bind(organizer_id)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

pub async fn update(pool: &SqlitePool, id: i64, input: &EventInput) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE events SET title = ?, description = ?, date = ?, location = ?, category = ?, max_participants = ? \
         WHERE id = ?",
    )
    .bind(&input.title)
    .bind(&input.description)
    .bind(&input.date)
    .bind(&input.location)
    .bind(&input.category)
    .bind(input.max_participants)
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Delete an event and its registrations in one transaction.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<bool, sqlx::Error> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM registrations WHERE event_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM events WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}
