use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::NaiveDateTime;

use crate::audit::SecurityEvent;
use crate::auth::session::{self, CurrentUser};
use crate::auth::{Security, validate};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render, see_other};
use crate::handlers::auth_handlers::CsrfOnly;
use crate::models::event::{
    self, CATEGORIES, DATETIME_FORMAT, Event, EventForm, EventInput, input_datetime, is_valid_category,
    parse_event_date,
};
use crate::models::registration;
use crate::models::user::Role;
use crate::templates_structs::{EventDeleteTemplate, EventFormTemplate, PageContext, SelectOption};

const MAX_DESCRIPTION_CHARS: usize = 2000;
const MAX_LOCATION_CHARS: usize = 255;

/// Validate a create/edit submission. `current_registrations` is set on edit
/// and bounds the new capacity; new events must lie after `now`.
pub fn validate_event_form(
    form: &EventForm,
    current_registrations: Option<i64>,
    require_future: bool,
    now: NaiveDateTime,
) -> Result<EventInput, Vec<String>> {
    let title = form.title.trim();
    let description = form.description.trim();
    let location = form.location.trim();
    let category = form.category.trim();

    if title.is_empty() || description.is_empty() || form.date.trim().is_empty() || location.is_empty() {
        return Err(vec!["Title, description, date and location are required!".to_string()]);
    }

    let mut errors = Vec::new();

    if let Some(e) = validate::validate_length(title, "Title", 5, 200) {
        errors.push(e);
    }
    if description.chars().count() < 10 {
        errors.push("Description must be at least 10 characters!".to_string());
    }

    let max_participants = validate::sanitize_int(&form.max_participants);
    if max_participants < 0 {
        errors.push("Maximum participants cannot be negative!".to_string());
    }
    if let Some(current) = current_registrations {
        if max_participants > 0 && max_participants < current {
            errors.push(format!(
                "Maximum participants cannot be less than current registrations ({current})!"
            ));
        }
    }

    if !is_valid_category(category) {
        errors.push("Invalid category!".to_string());
    }

    let date = match parse_event_date(&form.date) {
        None => {
            errors.push("Invalid date format!".to_string());
            None
        }
        Some(dt) if require_future && dt <= now => {
            errors.push("Event date must be in the future!".to_string());
            None
        }
        Some(dt) => Some(dt),
    };

    match date {
        Some(date) if errors.is_empty() => Ok(EventInput {
            title: title.to_string(),
            description: validate::sanitize_text(description, MAX_DESCRIPTION_CHARS),
            date: date.format(DATETIME_FORMAT).to_string(),
            location: validate::sanitize_text(location, MAX_LOCATION_CHARS),
            category: category.to_string(),
            max_participants,
        }),
        _ => Err(errors),
    }
}

fn category_options(current: &str) -> Vec<SelectOption> {
    SelectOption::list(
        std::iter::once(("", "Select category")).chain(CATEGORIES.iter().map(|c| (*c, *c))),
        current,
    )
}

/// Form page, echoing back a rejected submission.
fn render_form(
    session: &Session,
    config: &AppConfig,
    form_action: String,
    form_title: &str,
    form: &EventForm,
    errors: Vec<String>,
) -> Result<HttpResponse, AppError> {
    render(EventFormTemplate {
        ctx: PageContext::build(session, config),
        form_action,
        form_title: form_title.to_string(),
        title: form.title.clone(),
        description: form.description.clone(),
        date: form.date.clone(),
        location: form.location.clone(),
        max_participants: form.max_participants.clone(),
        categories: category_options(form.category.trim()),
        errors,
    })
}

/// The caller if they organize `event` or are an admin.
fn authorize_manage(
    security: &Security,
    req: &HttpRequest,
    session: &Session,
    event: &Event,
    action: &str,
) -> Result<CurrentUser, AppError> {
    let user = session::require_user(session)?;
    if user.is_admin() || user.id == event.organizer_id {
        Ok(user)
    } else {
        Err(security.deny(req, session, &format!("{action} of event {}", event.id)))
    }
}

fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub async fn new_form(
    req: HttpRequest,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    security.require_role(&req, &session, Role::Organizer, "event creation")?;
    render_form(&session, &config, "/events".to_string(), "Create Event", &EventForm::default(), vec![])
}

pub async fn create(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    form: web::Form<EventForm>,
) -> Result<HttpResponse, AppError> {
    let user = security.require_role(&req, &session, Role::Organizer, "event creation")?;
    security.check_form(&req, &session, &form.csrf_token, "Event creation")?;

    let input = match validate_event_form(&form, None, true, local_now()) {
        Ok(input) => input,
        Err(errors) => return render_form(&session, &config, "/events".to_string(), "Create Event", &form, errors),
    };

    match event::create(&pool, user.id, &input).await {
        Ok(id) => {
            security.record(
                &req,
                &session,
                SecurityEvent::EventCreated,
                &format!("Event ID: {id}, Title: {}", input.title),
            );
            session::set_flash(&session, "Event created successfully!");
            Ok(see_other(&format!("/events/{id}")))
        }
        Err(e) => {
            log::error!("Failed to create event: {e}");
            security.record(&req, &session, SecurityEvent::EventCreateError, &format!("Title: {}", input.title));
            render_form(
                &session,
                &config,
                "/events".to_string(),
                "Create Event",
                &form,
                vec!["Failed to create event. Please try again.".to_string()],
            )
        }
    }
}

pub async fn edit_form(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let existing = event::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    authorize_manage(&security, &req, &session, &existing, "edit")?;

    let form = EventForm {
        title: existing.title,
        description: existing.description,
        date: input_datetime(&existing.date),
        location: existing.location,
        category: existing.category,
        max_participants: existing.max_participants.to_string(),
        csrf_token: String::new(),
    };
    render_form(&session, &config, format!("/events/{id}"), "Edit Event", &form, vec![])
}

pub async fn update(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<EventForm>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let existing = event::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    authorize_manage(&security, &req, &session, &existing, "edit")?;
    security.check_form(&req, &session, &form.csrf_token, "Event update")?;

    let current = registration::count_for_event(&pool, id).await?;
    let input = match validate_event_form(&form, Some(current), false, local_now()) {
        Ok(input) => input,
        Err(errors) => return render_form(&session, &config, format!("/events/{id}"), "Edit Event", &form, errors),
    };

    event::update(&pool, id, &input).await?;
    security.record(&req, &session, SecurityEvent::EventUpdated, &format!("Event ID: {id}"));
    session::set_flash(&session, "Event updated successfully!");
    Ok(see_other(&format!("/events/{id}")))
}

pub async fn delete_confirm(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let existing = event::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    authorize_manage(&security, &req, &session, &existing, "deletion")?;
    let registrations_count = registration::count_for_event(&pool, id).await?;

    render(EventDeleteTemplate {
        ctx: PageContext::build(&session, &config),
        event: existing,
        registrations_count,
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
    let id = path.into_inner();
    let existing = event::find_by_id(&pool, id).await?.ok_or(AppError::NotFound)?;
    authorize_manage(&security, &req, &session, &existing, "deletion")?;
    security.check_form(&req, &session, &form.csrf_token, "Event deletion")?;

    event::delete(&pool, id).await?;
    security.record(
        &req,
        &session,
        SecurityEvent::EventDeleted,
        &format!("Event ID: {id}, Title: {}", existing.title),
    );
    session::set_flash(&session, "Event deleted successfully!");
    Ok(see_other("/events"))
}
