use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};
use serde::Deserialize;

use crate::audit::SecurityEvent;
use crate::auth::password::{self, MIN_PASSWORD_LEN};
use crate::auth::rate_limit::RateAction;
use crate::auth::{Security, session, validate};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render, see_other};
use crate::models::user::{self, NewUser, RegisterForm, Role};
use crate::templates_structs::{Captcha, LoginTemplate, PageContext, RegisterTemplate};

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct CsrfOnly {
    #[serde(default)]
    pub csrf_token: String,
}

#[derive(Deserialize)]
pub struct LoginQuery {
    pub timeout: Option<String>,
}

fn login_error(
    session: &Session,
    config: &AppConfig,
    username: &str,
    error: &str,
    show_captcha: bool,
) -> Result<HttpResponse, AppError> {
    render(LoginTemplate {
        ctx: PageContext::build(session, config),
        error: Some(error.to_string()),
        username: username.to_string(),
        timed_out: false,
        captcha: Captcha::shown_if(show_captcha, config),
    })
}

pub async fn login_page(
    session: Session,
    config: web::Data<AppConfig>,
    query: web::Query<LoginQuery>,
) -> Result<HttpResponse, AppError> {
    // If already logged in, redirect home
    if session::get_user_id(&session).is_some() {
        return Ok(see_other("/"));
    }

    render(LoginTemplate {
        ctx: PageContext::build(&session, &config),
        error: None,
        username: String::new(),
        timed_out: query.timeout.is_some(),
        captcha: Captcha::hidden(),
    })
}

pub async fn login_submit(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    form: web::Form<LoginForm>,
) -> Result<HttpResponse, AppError> {
    security.check_form(&req, &session, &form.csrf_token, "Login attempt")?;

    let username = form.username.trim();

    // Rate-limit check BEFORE any database access
    let decision = security.throttle(&req, &session, RateAction::Login);
    if decision.is_limited() {
        let msg = format!(
            "Too many login attempts. Please try again in {} minute(s).",
            decision.retry_after_minutes()
        );
        return login_error(&session, &config, username, &msg, security.captcha.enabled());
    }

    if username.is_empty() || form.password.is_empty() {
        return login_error(&session, &config, username, "All fields are required!", false);
    }

    let Some(found) = user::find_by_login(&pool, username).await? else {
        security.record(&req, &session, SecurityEvent::LoginFailed, &format!("Non-existent user: {username}"));
        return login_error(&session, &config, username, "Username or email does not exist!", false);
    };

    if !password::verify_password_blocking(form.password.clone(), found.password.clone()).await? {
        security.record(
            &req,
            &session,
            SecurityEvent::LoginFailed,
            &format!("Failed password for user: {}", found.username),
        );
        return login_error(&session, &config, username, "Incorrect password!", false);
    }

    session::establish(&session, &found);
    security.reset_throttle(&req, RateAction::Login);
    security.record(&req, &session, SecurityEvent::LoginSuccess, &format!("User: {}", found.username));
    session::set_flash(&session, &format!("Welcome back, {}!", found.username));

    Ok(see_other("/"))
}

pub async fn logout(
    req: HttpRequest,
    security: web::Data<Security>,
    session: Session,
    form: web::Form<CsrfOnly>,
) -> Result<HttpResponse, AppError> {
    security.check_form(&req, &session, &form.csrf_token, "Logout")?;
    let username = session.get::<String>("username").unwrap_or(None).unwrap_or_default();
    security.record(&req, &session, SecurityEvent::Logout, &format!("User: {username}"));
    session.purge();
    Ok(see_other("/login"))
}

/// First failing registration rule, checked in the order users see them.
pub fn validate_registration(form: &RegisterForm) -> Option<String> {
    let username = form.username.trim();
    let email = form.email.trim();
    if username.is_empty() || email.is_empty() || form.password.is_empty() || form.confirm_password.is_empty() {
        return Some("All fields are required!".to_string());
    }
    if let Some(e) = validate::validate_email(email) {
        return Some(e);
    }
    if form.password != form.confirm_password {
        return Some("Passwords do not match!".to_string());
    }
    if username.chars().count() < 3 {
        return validate::validate_username(username);
    }
    if let Some(e) = validate::validate_password(&form.password, MIN_PASSWORD_LEN) {
        return Some(e);
    }
    validate::validate_username(username)
}

fn register_error(
    session: &Session,
    config: &AppConfig,
    security: &Security,
    form: &RegisterForm,
    error: &str,
) -> Result<HttpResponse, AppError> {
    render(RegisterTemplate {
        ctx: PageContext::build(session, config),
        error: Some(error.to_string()),
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        captcha: Captcha::shown_if(security.captcha.enabled(), config),
    })
}

pub async fn register_page(
    session: Session,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
) -> Result<HttpResponse, AppError> {
    if session::get_user_id(&session).is_some() {
        return Ok(see_other("/"));
    }

    render(RegisterTemplate {
        ctx: PageContext::build(&session, &config),
        error: None,
        username: String::new(),
        email: String::new(),
        captcha: Captcha::shown_if(security.captcha.enabled(), &config),
    })
}

pub async fn register_submit(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    form: web::Form<RegisterForm>,
) -> Result<HttpResponse, AppError> {
    security.check_form(&req, &session, &form.csrf_token, "Registration attempt")?;

    let decision = security.throttle(&req, &session, RateAction::Register);
    if decision.is_limited() {
        let msg = format!(
            "Too many registration attempts. Please try again in {} minute(s).",
            decision.retry_after_minutes()
        );
        return register_error(&session, &config, &security, &form, &msg);
    }

    if !security.verify_captcha(&req, &session, &form.recaptcha_response, "registration").await {
        return register_error(&session, &config, &security, &form, "Please complete the reCAPTCHA verification!");
    }

    if let Some(error) = validate_registration(&form) {
        return register_error(&session, &config, &security, &form, &error);
    }

    let username = form.username.trim().to_string();
    let email = validate::sanitize_email(&form.email);

    if user::exists_username_or_email(&pool, &username, &email).await? {
        security.record(
            &req,
            &session,
            SecurityEvent::RegisterFailed,
            &format!("Username or email already exists: {username}"),
        );
        return register_error(&session, &config, &security, &form, "Username or email already exists!");
    }

    let password_hash = password::hash_password_blocking(form.password.clone()).await?;
    let new_user = NewUser { username: username.clone(), email, password: password_hash, role: Role::User };

    match user::create(&pool, &new_user).await {
        Ok(id) => {
            security.record(
                &req,
                &session,
                SecurityEvent::RegisterSuccess,
                &format!("New user: {username} (ID: {id})"),
            );
            session::set_flash(&session, "Registration successful! You can now log in.");
            Ok(see_other("/login"))
        }
        Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
            // Lost a race with a concurrent registration of the same name.
            register_error(&session, &config, &security, &form, "Username or email already exists!")
        }
        Err(e) => {
            log::error!("Failed to create user {username}: {e}");
            security.record(&req, &session, SecurityEvent::RegisterError, &format!("Registration failed for: {username}"));
            register_error(&session, &config, &security, &form, "Registration failed. Please try again.")
        }
    }
}
