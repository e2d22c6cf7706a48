use actix_session::Session;
use actix_web::{HttpRequest, HttpResponse, web};

use crate::audit::SecurityEvent;
use crate::auth::rate_limit::RateAction;
use crate::auth::{Security, session, validate};
use crate::config::AppConfig;
use crate::db::DbPool;
use crate::errors::{AppError, render, see_other};
use crate::models::contact::{self, ContactForm, NewContactMessage};
use crate::templates_structs::{Captcha, ContactTemplate, PageContext};

const MAX_MESSAGE_CHARS: usize = 5000;

/// Check a contact submission and build the row to store.
pub fn validate_contact(form: &ContactForm, ip_address: String) -> Result<NewContactMessage, String> {
    let name = form.name.trim();
    let email = form.email.trim();
    let subject = form.subject.trim();
    let message = form.message.trim();

    if name.is_empty() || email.is_empty() || subject.is_empty() || message.is_empty() {
        return Err("All fields are required!".to_string());
    }
    if let Some(e) = validate::validate_email(email) {
        return Err(e);
    }
    if let Some(e) = validate::validate_length(name, "Name", 2, 100) {
        return Err(e);
    }
    if let Some(e) = validate::validate_length(subject, "Subject", 5, 200) {
        return Err(e);
    }
    if message.chars().count() < 10 {
        return Err("Message must be at least 10 characters!".to_string());
    }

    Ok(NewContactMessage {
        name: name.to_string(),
        email: validate::sanitize_email(email),
        subject: subject.to_string(),
        message: validate::sanitize_text(message, MAX_MESSAGE_CHARS),
        ip_address,
    })
}

fn contact_error(
    session: &Session,
    config: &AppConfig,
    security: &Security,
    form: &ContactForm,
    error: &str,
) -> Result<HttpResponse, AppError> {
    render(ContactTemplate {
        ctx: PageContext::build(session, config),
        error: Some(error.to_string()),
        name: form.name.clone(),
        email: form.email.clone(),
        subject: form.subject.clone(),
        message: form.message.clone(),
        captcha: Captcha::shown_if(security.captcha.enabled(), config),
    })
}

pub async fn form(
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
) -> Result<HttpResponse, AppError> {
    // Prefill from the session for logged-in users
    let me = session::current_user(&session);
    render(ContactTemplate {
        ctx: PageContext::build(&session, &config),
        error: None,
        name: me.as_ref().map(|u| u.username.clone()).unwrap_or_default(),
        email: me.as_ref().map(|u| u.email.clone()).unwrap_or_default(),
        subject: String::new(),
        message: String::new(),
        captcha: Captcha::shown_if(security.captcha.enabled(), &config),
    })
}

pub async fn submit(
    req: HttpRequest,
    pool: web::Data<DbPool>,
    config: web::Data<AppConfig>,
    security: web::Data<Security>,
    session: Session,
    form: web::Form<ContactForm>,
) -> Result<HttpResponse, AppError> {
    security.check_form(&req, &session, &form.csrf_token, "Contact form")?;

    let decision = security.throttle(&req, &session, RateAction::Contact);
    if decision.is_limited() {
        let msg = format!(
            "Too many messages sent. Please try again in {} minute(s).",
            decision.retry_after_minutes()
        );
        return contact_error(&session, &config, &security, &form, &msg);
    }

    if !security.verify_captcha(&req, &session, &form.recaptcha_response, "contact form").await {
        return contact_error(&session, &config, &security, &form, "Please complete the reCAPTCHA verification!");
    }

    let new_message = match validate_contact(&form, security.client_ip(&req).to_string()) {
        Ok(m) => m,
        Err(error) => return contact_error(&session, &config, &security, &form, &error),
    };

    match contact::create(&pool, &new_message).await {
        Ok(_) => {
            security.reset_throttle(&req, RateAction::Contact);
            security.record(
                &req,
                &session,
                SecurityEvent::ContactFormSubmitted,
                &format!("From: {}, Subject: {}", new_message.email, new_message.subject),
            );
            session::set_flash(&session, "Thank you for your message! We will get back to you soon.");
            Ok(see_other("/contact"))
        }
        Err(e) => {
            log::error!("Failed to store contact message: {e}");
            security.record(&req, &session, SecurityEvent::ContactFormError, &format!("From: {}", new_message.email));
            contact_error(&session, &config, &security, &form, "Failed to send message. Please try again.")
        }
    }
}
