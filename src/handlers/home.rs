use actix_session::Session;
use actix_web::{HttpResponse, web};

use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render};
use crate::models::event::{self, now_string};
use crate::templates_structs::{HomeTemplate, PageContext};

const UPCOMING_ON_HOME: i64 = 6;

pub async fn index(
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    let upcoming = event::find_upcoming(&pool, &now_string(), UPCOMING_ON_HOME).await?;
    render(HomeTemplate {
        ctx: PageContext::build(&session, &config),
        upcoming,
    })
}
