use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};

use crate::auth::Security;
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::models::event::now_string;
use crate::models::stats;
use crate::models::user::Role;
use crate::templates_structs::{AdminDashboardTemplate, AdminStatsTemplate, PageContext};

pub async fn index(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    security.require_role(&req, &session, Role::Admin, "admin dashboard access")?;
    let stats = stats::load_dashboard(&pool, &now_string()).await?;
    render(AdminDashboardTemplate {
        ctx: PageContext::build(&session, &config),
        stats,
    })
}

pub async fn statistics(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    security.require_role(&req, &session, Role::Admin, "statistics access")?;
    let stats = stats::load(&pool).await?;
    render(AdminStatsTemplate {
        ctx: PageContext::build(&session, &config),
        stats,
    })
}
