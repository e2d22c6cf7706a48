use actix_web::{HttpResponse, ResponseError};
use askama::Template;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Db(sqlx::Error),
    Template(askama::Error),
    Hash(String),
    /// No usable authenticated session; the client is sent to the login page.
    Session(String),
    PermissionDenied(String),
    Csrf,
    NotFound,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Template(e) => write!(f, "Template error: {e}"),
            AppError::Hash(e) => write!(f, "Hash error: {e}"),
            AppError::Session(e) => write!(f, "Session error: {e}"),
            AppError::PermissionDenied(what) => write!(f, "Permission denied: {what}"),
            AppError::Csrf => write!(f, "Invalid or missing CSRF token"),
            AppError::NotFound => write!(f, "Not found"),
        }
    }
}

impl std::error::Error for AppError {}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound => HttpResponse::NotFound().body("Not Found"),
            AppError::Session(reason) => {
                log::debug!("Redirecting to login: {reason}");
                HttpResponse::SeeOther()
                    .insert_header(("Location", "/login"))
                    .finish()
            }
            AppError::PermissionDenied(what) => {
                log::warn!("Permission denied: {what}");
                HttpResponse::Forbidden().body("Access denied")
            }
            AppError::Csrf => {
                HttpResponse::Forbidden().body("Invalid security token. Please refresh the page and try again.")
            }
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError().body("Internal Server Error")
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<askama::Error> for AppError {
    fn from(e: askama::Error) -> Self {
        AppError::Template(e)
    }
}

/// Render an askama template into an HTML 200 response.
pub fn render<T: Template>(tmpl: T) -> Result<HttpResponse, AppError> {
    let body = tmpl.render()?;
    Ok(HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(body))
}

/// 303 redirect, the response to every successful form POST.
pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header(("Location", location.to_string()))
        .finish()
}
