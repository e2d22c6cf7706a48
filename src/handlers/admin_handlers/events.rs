use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::audit::SecurityEvent;
use crate::auth::{Security, session};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render, see_other};
use crate::handlers::auth_handlers::CsrfOnly;
use crate::models::event::{self, DateFilter, now_string};
use crate::models::user::Role;
use crate::templates_structs::{AdminEventsTemplate, PageContext, SelectOption};

#[derive(Deserialize)]
pub struct AdminEventsQuery {
    pub status: Option<String>,
    pub search: Option<String>,
}

pub async fn list(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    query: web::Query<AdminEventsQuery>,
) -> Result<HttpResponse, AppError> {
    security.require_role(&req, &session, Role::Admin, "event management access")?;

    let status: DateFilter = query.status.as_deref().and_then(|s| s.parse().ok()).unwrap_or_default();
    let search = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let now = now_string();

    let events = event::find_for_admin(&pool, status, search, &now).await?;
    let statuses = SelectOption::list(
        [("all", "All events"), ("upcoming", "Upcoming"), ("past", "Past")],
        status.as_str(),
    );

    render(AdminEventsTemplate {
        ctx: PageContext::build(&session, &config),
        events,
        statuses,
        search: search.unwrap_or_default().to_string(),
        now,
    })
}

pub async fn delete(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    security.require_role(&req, &session, Role::Admin, "event deletion")?;
    security.check_form(&req, &session, &form.csrf_token, "Event deletion")?;
    let id = path.into_inner();

    let existing = event::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    event::delete(&pool, id).await?;

    security.record(
        &req,
        &session,
        SecurityEvent::EventDeleted,
        &format!("Event ID: {id}, Title: {}", existing.title),
    );
    session::set_flash(&session, "Event deleted successfully!");
    Ok(see_other("/admin/events"))
}
