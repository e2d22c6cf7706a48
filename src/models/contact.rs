use serde::Deserialize;
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, Clone, FromRow)]
pub struct ContactMessage {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub ip_address: String,
    pub created_at: String,
}

#[derive(Debug)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub ip_address: String,
}

/// Raw contact form submission.
#[derive(Debug, Default, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub csrf_token: String,
    #[serde(rename = "g-recaptcha-response", default)]
    pub recaptcha_response: String,
}

pub struct ContactMessagePage {
    pub messages: Vec<ContactMessage>,
    pub page: i64,
    pub per_page: i64,
    pub total_count: i64,
    pub total_pages: i64,
}

pub async fn create(pool: &SqlitePool, new: &NewContactMessage) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO contact_messages (name, email, subject, message, ip_address) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.subject)
    .bind(&new.message)
    .bind(&new.ip_address)
    .execute(pool)
    .await?;
    Ok(result.last_insert_rowid())
}

/// Messages newest first. `per_page` is clamped and `page` kept within the existing pages.
pub async fn find_paginated(pool: &SqlitePool, page: i64, per_page: i64) -> Result<ContactMessagePage, sqlx::Error> {
    let per_page = per_page.clamp(1, 100);

    let total_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_messages")
        .fetch_one(pool)
        .await?;
    let total_pages = ((total_count + per_page - 1) / per_page).max(1);
    let page = page.clamp(1, total_pages);
    let offset = (page - 1) * per_page;

    let messages = sqlx::query_as::<_, ContactMessage>(
        "SELECT id, name, email, subject, message, ip_address, created_at \
         FROM contact_messages ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
    )
    .bind(per_page)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(ContactMessagePage { messages, page, per_page, total_count, total_pages })
}
