use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};

use crate::audit::SecurityEvent;
use crate::auth::{Security, session};
use crate::db::DbPool;
use crate::errors::{AppError, see_other};
use crate::handlers::auth_handlers::CsrfOnly;
use crate::models::event::now_string;
use crate::models::registration::{self, RegisterOutcome};

pub async fn register(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    let user = session::require_user(&session)?;
    security.check_form(&req, &session, &form.csrf_token, "Event registration")?;
    let event_id = path.into_inner();

    match registration::register(&pool, user.id, event_id, &now_string()).await {
        Ok(RegisterOutcome::EventNotFound) => Err(AppError::NotFound),
        Ok(outcome) => {
            if outcome == RegisterOutcome::Registered {
                security.record(&req, &session, SecurityEvent::EventRegistration, &format!("Event ID: {event_id}"));
            }
            session::set_flash(&session, outcome.message());
            Ok(see_other(&format!("/events/{event_id}")))
        }
        Err(e) => {
            log::error!("Registration of user {} for event {event_id} failed: {e}", user.id);
            security.record(&req, &session, SecurityEvent::RegistrationError, &format!("Event ID: {event_id}"));
            session::set_flash(&session, "Registration failed. Please try again.");
            Ok(see_other(&format!("/events/{event_id}")))
        }
    }
}

/// Remove the caller's registration, flash the result and redirect to `back_to`.
pub(crate) async fn cancel_registration(
    req: &HttpRequest,
    pool: &DbPool,
    security: &Security,
    session: &Session,
    event_id: i64,
    back_to: &str,
) -> Result<HttpResponse, AppError> {
    let user = session::require_user(session)?;

    match registration::unregister(pool, user.id, event_id).await {
        Ok(true) => {
            security.record(req, session, SecurityEvent::EventUnregistration, &format!("Event ID: {event_id}"));
            session::set_flash(session, "You have been unregistered from this event.");
        }
        Ok(false) => session::set_flash(session, "You are not registered for this event!"),
        Err(e) => {
            log::error!("Unregistration of user {} from event {event_id} failed: {e}", user.id);
            security.record(req, session, SecurityEvent::UnregistrationError, &format!("Event ID: {event_id}"));
            session::set_flash(session, "Unregistration failed. Please try again.");
        }
    }
    Ok(see_other(back_to))
}

pub async fn unregister(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    security.check_form(&req, &session, &form.csrf_token, "Event unregistration")?;
    let event_id = path.into_inner();
    cancel_registration(&req, &pool, &security, &session, event_id, &format!("/events/{event_id}")).await
}
