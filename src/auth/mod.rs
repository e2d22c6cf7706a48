pub mod csrf;
pub mod middleware;
pub mod origin;
pub mod password;
pub mod rate_limit;
pub mod recaptcha;
pub mod session;
pub mod validate;

use std::net::IpAddr;
use std::sync::Arc;

use actix_session::Session;
use actix_web::HttpRequest;

use crate::audit::{SecurityEvent, SecurityLog};
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::user::Role;
use rate_limit::{RateAction, RateDecision, RateLimiter};
use recaptcha::CaptchaVerifier;
use session::CurrentUser;

/// Request-guard collaborators shared by all handlers.
pub struct Security {
    pub limiter: RateLimiter,
    pub log: SecurityLog,
    pub captcha: Arc<dyn CaptchaVerifier>,
    pub trust_proxy_headers: bool,
}

impl Security {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            limiter: RateLimiter::from_config(config),
            log: SecurityLog::new(&config.security_log_path),
            captcha: recaptcha::from_config(config),
            trust_proxy_headers: config.trust_proxy_headers,
        }
    }

    pub fn client_ip(&self, req: &HttpRequest) -> IpAddr {
        origin::client_ip(req, self.trust_proxy_headers)
    }

    /// Append an audit line attributed to the caller of `req`.
    pub fn record(&self, req: &HttpRequest, session: &Session, event: SecurityEvent, details: &str) {
        let ip = self.client_ip(req).to_string();
        self.log.write(event, &ip, session::get_user_id(session), details);
    }

    /// CSRF then origin validation for a state-changing form. Failures are
    /// audited with `context` and surface as `AppError::Csrf`.
    pub fn check_form(
        &self,
        req: &HttpRequest,
        session: &Session,
        submitted_token: &str,
        context: &str,
    ) -> Result<(), AppError> {
        if let Err(e) = csrf::validate_csrf(session, submitted_token) {
            self.record(req, session, SecurityEvent::CsrfValidationFailed, &format!("{context} with invalid CSRF token"));
            return Err(e);
        }
        if !origin::validate_request_origin(req) {
            self.record(req, session, SecurityEvent::InvalidRequestOrigin, &format!("{context} from suspicious origin"));
            return Err(AppError::Csrf);
        }
        Ok(())
    }

    /// Count an attempt at `action`; audits and returns the decision.
    pub fn throttle(&self, req: &HttpRequest, session: &Session, action: RateAction) -> RateDecision {
        let decision = self.limiter.check(action, self.client_ip(req));
        if decision.is_limited() {
            self.record(
                req,
                session,
                SecurityEvent::RateLimitExceeded,
                &format!("{} rate limit exceeded", action.as_str()),
            );
        }
        decision
    }

    pub fn reset_throttle(&self, req: &HttpRequest, action: RateAction) {
        self.limiter.reset(action, self.client_ip(req));
    }

    /// Verify the `g-recaptcha-response` token; audits failures.
    pub async fn verify_captcha(&self, req: &HttpRequest, session: &Session, token: &str, context: &str) -> bool {
        let ok = self.captcha.verify(token, self.client_ip(req)).await;
        if !ok {
            self.record(req, session, SecurityEvent::RecaptchaFailed, &format!("Failed reCAPTCHA on {context}"));
        }
        ok
    }

    /// `session::require_role`, auditing refusals as `UNAUTHORIZED_ACCESS`.
    pub fn require_role(
        &self,
        req: &HttpRequest,
        session: &Session,
        min: Role,
        what: &str,
    ) -> Result<CurrentUser, AppError> {
        match session::require_role(session, min) {
            Err(AppError::PermissionDenied(reason)) => Err(self.deny(req, session, &format!("{what} ({reason})"))),
            other => other,
        }
    }

    /// Audit a refused action and produce the 403 error for it.
    pub fn deny(&self, req: &HttpRequest, session: &Session, what: &str) -> AppError {
        self.record(req, session, SecurityEvent::UnauthorizedAccess, &format!("Attempted {what}"));
        AppError::PermissionDenied(what.to_string())
    }
}
