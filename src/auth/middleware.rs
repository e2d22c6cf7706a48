use actix_session::SessionExt;
use actix_web::{
    Error, HttpResponse,
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    middleware::{DefaultHeaders, Next},
    web,
};

use crate::audit::SecurityEvent;
use crate::auth::{Security, session};

pub const CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' https://www.google.com https://www.gstatic.com https://cdn.jsdelivr.net https://cdnjs.cloudflare.com; \
    style-src 'self' 'unsafe-inline' https://cdn.jsdelivr.net https://cdnjs.cloudflare.com; \
    img-src 'self' data: https:; \
    font-src 'self' data: https://cdn.jsdelivr.net https://cdnjs.cloudflare.com; \
    frame-src https://www.google.com/; \
    connect-src 'self' https://cdn.jsdelivr.net;";

/// Hardening headers attached to every response.
pub fn security_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("X-Frame-Options", "SAMEORIGIN"))
        .add(("X-Content-Type-Options", "nosniff"))
        .add(("X-XSS-Protection", "1; mode=block"))
        .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
        .add(("Content-Security-Policy", CONTENT_SECURITY_POLICY))
}

/// Session bookkeeping for every request: stamps new sessions and
/// periodically regenerates the session id.
pub async fn session_lifecycle(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let session = req.get_session();
    session::rotate_if_stale(&session, session::now());
    next.call(req).await
}

/// Middleware function that checks for an authenticated, non-idle session.
/// Redirects to /login (with `?timeout=1` after an idle timeout).
pub async fn require_auth(
    req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let session = req.get_session();

    let Some(user_id) = session::get_user_id(&session) else {
        let response = HttpResponse::SeeOther()
            .insert_header(("Location", "/login"))
            .finish();
        return Ok(req.into_response(response).map_into_right_body());
    };

    if !session::touch(&session, session::now()) {
        if let Some(security) = req.app_data::<web::Data<Security>>() {
            let ip = security.client_ip(req.request()).to_string();
            security.log.write(SecurityEvent::SessionTimeout, &ip, Some(user_id), "Idle session expired");
        }
        let response = HttpResponse::SeeOther()
            .insert_header(("Location", "/login?timeout=1"))
            .finish();
        return Ok(req.into_response(response).map_into_right_body());
    }

    next.call(req).await.map(|res| res.map_into_left_body())
}
