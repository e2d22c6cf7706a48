pub mod admin_handlers;
pub mod auth_handlers;
pub mod contact_handlers;
pub mod event_handlers;
pub mod home;
pub mod user_handlers;

use actix_web::{HttpResponse, middleware::from_fn, web};

use crate::auth::middleware::require_auth;

/// Register every route. Public routes come first; everything else sits in a
/// scope guarded by `require_auth`. Ids are constrained to digits so that
/// `/events/new` never reaches the `{id}` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Public routes
        .route("/", web::get().to(home::index))
        .route("/login", web::get().to(auth_handlers::login_page))
        .route("/login", web::post().to(auth_handlers::login_submit))
        .route("/register", web::get().to(auth_handlers::register_page))
        .route("/register", web::post().to(auth_handlers::register_submit))
        .route("/contact", web::get().to(contact_handlers::form))
        .route("/contact", web::post().to(contact_handlers::submit))
        .route("/events", web::get().to(event_handlers::list))
        .route("/events/{id:\\d+}", web::get().to(event_handlers::detail))
        // Protected routes
        .service(
            web::scope("")
                .wrap(from_fn(require_auth))
                .route("/logout", web::post().to(auth_handlers::logout))
                // Events
                .route("/events/new", web::get().to(event_handlers::new_form))
                .route("/events", web::post().to(event_handlers::create))
                .route("/events/{id:\\d+}/edit", web::get().to(event_handlers::edit_form))
                .route("/events/{id:\\d+}", web::post().to(event_handlers::update))
                .route("/events/{id:\\d+}/delete", web::get().to(event_handlers::delete_confirm))
                .route("/events/{id:\\d+}/delete", web::post().to(event_handlers::delete))
                .route("/events/{id:\\d+}/register", web::post().to(event_handlers::register))
                .route("/events/{id:\\d+}/unregister", web::post().to(event_handlers::unregister))
                // Account
                .route("/profile", web::get().to(user_handlers::profile))
                .route("/my-registrations", web::get().to(user_handlers::my_registrations))
                .route("/my-registrations/{id:\\d+}/cancel", web::post().to(user_handlers::cancel))
                // Admin
                .route("/admin", web::get().to(admin_handlers::dashboard::index))
                .route("/admin/stats", web::get().to(admin_handlers::dashboard::statistics))
                .route("/admin/users", web::get().to(admin_handlers::users::list))
                .route("/admin/users/{id:\\d+}/role", web::post().to(admin_handlers::users::change_role))
                .route("/admin/users/{id:\\d+}/delete", web::post().to(admin_handlers::users::delete))
                .route("/admin/events", web::get().to(admin_handlers::events::list))
                .route("/admin/events/{id:\\d+}/delete", web::post().to(admin_handlers::events::delete))
                .route("/admin/messages", web::get().to(admin_handlers::messages::list)),
        );
}

/// Fallback for unmatched routes.
pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/html; charset=utf-8")
        .body(include_str!("../../templates/errors/404.html"))
}
