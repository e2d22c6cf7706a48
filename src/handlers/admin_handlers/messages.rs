use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::auth::Security;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::models::contact;
use crate::models::user::Role;
use crate::templates_structs::{AdminMessagesTemplate, PageContext};

const MESSAGES_PER_PAGE: i64 = 20;

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub page: Option<i64>,
}

pub async fn list(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    query: web::Query<MessagesQuery>,
) -> Result<HttpResponse, AppError> {
    security.require_role(&req, &session, Role::Admin, "contact messages access")?;
    let message_page = contact::find_paginated(&pool, query.page.unwrap_or(1), MESSAGES_PER_PAGE).await?;
    render(AdminMessagesTemplate {
        ctx: PageContext::build(&session, &config),
        message_page,
    })
}
