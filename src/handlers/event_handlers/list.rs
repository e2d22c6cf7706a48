use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::auth::session;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::models::event::{self, CATEGORIES, EventFilter, EventListQuery, clamp_paging, now_string};
use crate::models::registration;
use crate::templates_structs::{EventDetailTemplate, EventListTemplate, PageContext, SelectOption};

/// Query string carrying the active filters, without `page`.
fn filter_query(filter: &EventFilter, per_page: i64) -> String {
    let mut pairs: Vec<(&str, String)> = Vec::new();
    if let Some(c) = &filter.category {
        pairs.push(("category", c.clone()));
    }
    if let Some(s) = &filter.search {
        pairs.push(("search", s.clone()));
    }
    pairs.push(("date_filter", filter.date.as_str().to_string()));
    pairs.push(("per_page", per_page.to_string()));
    serde_urlencoded::to_string(&pairs).unwrap_or_default()
}

pub async fn list(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    session: Session,
    query: web::Query<EventListQuery>,
) -> Result<HttpResponse, AppError> {
    let filter = EventFilter::from_query(&query);
    let (page, per_page) = clamp_paging(query.page, query.per_page);
    let now = now_string();

    let event_page = event::find_paginated(&pool, &filter, &now, page, per_page).await?;

    let categories = SelectOption::list(
        std::iter::once(("", "All categories")).chain(CATEGORIES.iter().map(|c| (*c, *c))),
        filter.category.as_deref().unwrap_or(""),
    );
    let date_filters = SelectOption::list(
        [("all", "All dates"), ("upcoming", "Upcoming"), ("past", "Past")],
        filter.date.as_str(),
    );

    let tmpl = EventListTemplate {
        ctx: PageContext::build(&session, &config),
        event_page,
        search: filter.search.clone().unwrap_or_default(),
        categories,
        date_filters,
        filter_query: filter_query(&filter, per_page),
    };
    render(tmpl)
}

pub async fn detail(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let event = event::find_detail(&pool, id).await?.ok_or(AppError::NotFound)?;
    let participants = registration::participants(&pool, id).await?;
    let participant_count = participants.len() as i64;

    let viewer = session::current_user(&session);
    let is_registered = match &viewer {
        Some(u) => registration::is_registered(&pool, u.id, id).await?,
        None => false,
    };
    let can_manage = viewer.as_ref().is_some_and(|u| u.is_admin() || u.id == event.organizer_id);

    let tmpl = EventDetailTemplate {
        ctx: PageContext::build(&session, &config),
        is_past: event.date < now_string(),
        is_full: event.max_participants > 0 && participant_count >= event.max_participants,
        is_registered,
        can_manage,
        participant_count,
        participants,
        event,
    };
    render(tmpl)
}
