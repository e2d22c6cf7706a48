use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::audit::SecurityEvent;
use crate::auth::{Security, session};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render, see_other};
use crate::handlers::auth_handlers::CsrfOnly;
use crate::models::user::{self, Role};
use crate::templates_structs::{AdminUserRow, AdminUsersTemplate, PageContext, SelectOption};

#[derive(Deserialize)]
pub struct RoleForm {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub csrf_token: String,
}

pub async fn list(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let me = security.require_role(&req, &session, Role::Admin, "user management access")?;

    let rows = user::find_all_with_counts(&pool)
        .await?
        .into_iter()
        .map(|u| AdminUserRow {
            role_options: SelectOption::list(Role::ALL.iter().map(|r| (r.as_str(), r.label())), u.role.as_str()),
            is_self: u.id == me.id,
            user: u,
        })
        .collect();

    render(AdminUsersTemplate {
        ctx: PageContext::build(&session, &config),
        rows,
    })
}

pub async fn change_role(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<RoleForm>,
) -> Result<HttpResponse, AppError> {
    let me = security.require_role(&req, &session, Role::Admin, "role change")?;
    security.check_form(&req, &session, &form.csrf_token, "Role change")?;
    let id = path.into_inner();

    if id == me.id {
        session::set_flash(&session, "You cannot change your own role!");
        return Ok(see_other("/admin/users"));
    }

    let Ok(role) = form.role.parse::<Role>() else {
        session::set_flash(&session, "Invalid role!");
        return Ok(see_other("/admin/users"));
    };

    if !user::update_role(&pool, id, role).await? {
        return Err(AppError::NotFound);
    }

    security.record(
        &req,
        &session,
        SecurityEvent::UserRoleChanged,
        &format!("User ID: {id}, New role: {role}"),
    );
    session::set_flash(&session, "User role updated successfully!");
    Ok(see_other("/admin/users"))
}

pub async fn delete(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    security: web::Data<Security>,
    session: Session,
    path: web::Path<i64>,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    let me = security.require_role(&req, &session, Role::Admin, "user deletion")?;
    security.check_form(&req, &session, &form.csrf_token, "User deletion")?;
    let id = path.into_inner();

    if id == me.id {
        session::set_flash(&session, "You cannot delete your own account!");
        return Ok(see_other("/admin/users"));
    }

    if !user::delete(&pool, id).await? {
        return Err(AppError::NotFound);
    }

    security.record(&req, &session, SecurityEvent::UserDeleted, &format!("User ID: {id}"));
    session::set_flash(&session, "User deleted successfully!");
    Ok(see_other("/admin/users"))
}
