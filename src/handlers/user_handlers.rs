use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};

use crate::auth::{Security, session};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::handlers::auth_handlers::CsrfOnly;
use crate::handlers::event_handlers::registration::cancel_registration;
use crate::models::event::{self, now_string};
use crate::models::{registration, user};
use crate::templates_structs::{MyRegistrationsTemplate, PageContext, ProfileTemplate};

pub async fn profile(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let me = session::require_user(&session)?;
    // The account may have been deleted by an admin since login.
    let Some(profile) = user::find_display_by_id(&pool, me.id).await? else {
        session.purge();
        return Err(AppError::Session("User no longer exists".to_string()));
    };

    let registrations = registration::find_by_user(&pool, me.id).await?;
    let organized = if me.is_organizer() {
        event::find_by_organizer(&pool, me.id).await?
    } else {
        Vec::new()
    };

    render(ProfileTemplate {
        ctx: PageContext::build(&session, &config),
        profile,
        registrations,
        organized,
        now: now_string(),
    })
}

pub async fn my_registrations(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let me = session::require_user(&session)?;
    let registrations = registration::find_by_user(&pool, me.id).await?;

    render(MyRegistrationsTemplate {
        ctx: PageContext::build(&session, &config),
        registrations,
        now: now_string(),
    })
}

pub async fn cancel(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    security.check_form(&req, &session, &form.csrf_token, "Registration cancellation")?;
    cancel_registration(&req, &pool, &security, &session, path.into_inner(), "/my-registrations").await
}
