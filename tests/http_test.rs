//! HTTP-level tests: routing, security guards, and end-to-end form flows.
//!
//! Each test builds the full app (session, security headers, routes) over a
//! fresh database and drives it with a cookie jar, the way a browser would.

mod common;

use std::sync::Arc;

use actix_session::{Session, SessionMiddleware, storage::CookieSessionStore};
use actix_web::cookie::{Cookie, Key};
use actix_web::http::{StatusCode, header};
use actix_web::{App, HttpResponse, middleware, test, web};
use regex::Regex;

use eventmanager::audit::SecurityLog;
use eventmanager::auth::rate_limit::RateLimiter;
use eventmanager::auth::recaptcha::DisabledCaptcha;
use eventmanager::auth::{self, Security, password, session};
use eventmanager::config::AppConfig;
use eventmanager::handlers;
use eventmanager::models::event;
use eventmanager::models::registration;
use eventmanager::models::user::{self, Role};
use common::*;

const PASSWORD: &str = "correct horse";

fn security(log: SecurityLog, trust_proxy_headers: bool) -> Security {
    Security {
        limiter: RateLimiter::from_config(&AppConfig::default()),
        log,
        captcha: Arc::new(DisabledCaptcha),
        trust_proxy_headers,
    }
}

macro_rules! test_app {
    ($pool:expr) => {
        test_app!($pool, security(SecurityLog::without_file(), false),)
    };
    ($pool:expr, $security:expr, $($path:expr => $handler:expr),*) => {{
        let config = AppConfig::default();
        let security = $security;
        test::init_service(
            App::new()
                .wrap(middleware::from_fn(auth::middleware::session_lifecycle))
                .wrap(auth::middleware::security_headers())
                .wrap(
                    SessionMiddleware::builder(CookieSessionStore::default(), Key::generate())
                        .cookie_secure(false)
                        .build(),
                )
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new(security))
                .app_data(web::Data::new(config))
                $(.route($path, web::get().to($handler)))*
                .configure(handlers::configure)
                .default_service(web::to(handlers::not_found)),
        )
        .await
    }};
}

/// Send a request with the jar's session cookie and keep the cookie the server returns.
macro_rules! send {
    ($app:expr, $jar:expr, $req:expr) => {{
        let mut req = $req;
        if let Some(c) = $jar.clone() {
            req = req.cookie(c);
        }
        let resp = test::call_service(&$app, req.to_request()).await;
        if let Some(c) = resp.response().cookies().find(|c| c.name() == "id") {
            $jar = Some(c.into_owned());
        }
        resp
    }};
}

/// GET `uri` and return the CSRF token embedded in the page.
macro_rules! csrf_token {
    ($app:expr, $jar:expr, $uri:expr) => {{
        let page = send!($app, $jar, test::TestRequest::get().uri($uri));
        assert_eq!(page.status(), StatusCode::OK, "GET {}", $uri);
        csrf_from(&test::read_body(page).await)
    }};
}

macro_rules! login {
    ($app:expr, $jar:expr, $user:expr, $pass:expr) => {{
        let token = csrf_token!($app, $jar, "/login");
        send!(
            $app,
            $jar,
            test::TestRequest::post()
                .uri("/login")
                .set_form([("username", $user), ("password", $pass), ("csrf_token", token.as_str())])
        )
    }};
}

fn csrf_from(body: &[u8]) -> String {
    let html = std::str::from_utf8(body).expect("utf-8 body");
    let re = Regex::new(r#"name="csrf_token" value="([0-9a-f]+)""#).unwrap();
    re.captures(html).expect("page has a CSRF field")[1].to_string()
}

fn location<B>(resp: &actix_web::dev::ServiceResponse<B>) -> String {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn user_with_password(pool: &eventmanager::db::DbPool, name: &str, role: Role) -> i64 {
    let hash = password::hash_password(PASSWORD).expect("Failed to hash password");
    create_user_with_hash(pool, name, role, &hash).await
}

#[actix_web::test]
async fn test_security_headers_on_every_response() {
    let db = setup_test_db().await;
    let app = test_app!(db.pool());

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers.get("X-Frame-Options").unwrap(), "SAMEORIGIN");
    assert_eq!(headers.get("X-Content-Type-Options").unwrap(), "nosniff");
    assert_eq!(headers.get("X-XSS-Protection").unwrap(), "1; mode=block");
    assert_eq!(headers.get("Referrer-Policy").unwrap(), "strict-origin-when-cross-origin");
    let csp = headers.get("Content-Security-Policy").unwrap().to_str().unwrap();
    assert!(csp.starts_with("default-src 'self'"));
}

#[actix_web::test]
async fn test_protected_routes_redirect_to_login() {
    let db = setup_test_db().await;
    let app = test_app!(db.pool());

    for uri in ["/profile", "/my-registrations", "/events/new", "/admin", "/admin/users"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "GET {uri}");
        assert_eq!(location(&resp), "/login", "GET {uri}");
    }
}

#[actix_web::test]
async fn test_public_pages_render() {
    let db = setup_test_db().await;
    let org = create_user(db.pool(), "org", Role::Organizer).await;
    let id = create_event(db.pool(), org, "Rust Meetup", "2099-01-01 10:00:00", 0).await;
    let app = test_app!(db.pool());

    for uri in ["/", "/events", "/events?category=Meetup&date_filter=upcoming&page=1", "/login", "/register", "/contact"] {
        let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");
    }

    let resp = test::call_service(&app, test::TestRequest::get().uri(&format!("/events/{id}")).to_request()).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("Rust Meetup"));

    let resp = test::call_service(&app, test::TestRequest::get().uri("/events/4242").to_request()).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_post_without_csrf_token_is_forbidden() {
    let db = setup_test_db().await;
    let app = test_app!(db.pool());

    let req = test::TestRequest::post()
        .uri("/login")
        .set_form([("username", "admin"), ("password", "admin123")])
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_post_from_foreign_origin_is_forbidden() {
    let db = setup_test_db().await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;

    let token = csrf_token!(app, jar, "/login");
    let resp = send!(
        app,
        jar,
        test::TestRequest::post()
            .uri("/login")
            .insert_header((header::REFERER, "https://evil.example.net/form"))
            .set_form([("username", "admin"), ("password", "admin123"), ("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_login_errors_are_reported() {
    let db = setup_test_db().await;
    user_with_password(db.pool(), "ana", Role::User).await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;

    let resp = login!(app, jar, "ana", "wrong password");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("Incorrect password!"));

    let resp = login!(app, jar, "nobody", PASSWORD);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("Username or email does not exist!"));

    let resp = login!(app, jar, "", "");
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("All fields are required!"));
}

#[actix_web::test]
async fn test_login_is_rate_limited() {
    let db = setup_test_db().await;
    user_with_password(db.pool(), "ana", Role::User).await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;

    for _ in 0..5 {
        let resp = login!(app, jar, "ana", "wrong password");
        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("Incorrect password!"));
    }

    // Even the right password is refused while the window is closed.
    let resp = login!(app, jar, "ana", PASSWORD);
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("Too many login attempts"));
}

#[actix_web::test]
async fn test_login_profile_logout() {
    let db = setup_test_db().await;
    user_with_password(db.pool(), "ana", Role::User).await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;

    let resp = login!(app, jar, "ana@example.com", PASSWORD);
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/");

    let resp = send!(app, jar, test::TestRequest::get().uri("/profile"));
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("ana@example.com"));
    let token = csrf_from(&body);

    let resp = send!(
        app,
        jar,
        test::TestRequest::post().uri("/logout").set_form([("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let resp = send!(app, jar, test::TestRequest::get().uri("/profile"));
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
}

#[actix_web::test]
async fn test_register_account() {
    let db = setup_test_db().await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;

    let token = csrf_token!(app, jar, "/register");
    let resp = send!(
        app,
        jar,
        test::TestRequest::post().uri("/register").set_form([
            ("username", "newbie"),
            ("email", "newbie@example.com"),
            ("password", "longenough"),
            ("confirm_password", "longenough"),
            ("csrf_token", token.as_str()),
        ])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login");

    let created = user::find_by_login(db.pool(), "newbie").await.unwrap().expect("user stored");
    assert_eq!(created.role, Role::User);
    assert!(password::verify_password("longenough", &created.password).unwrap());

    // Same username again is refused
    let token = csrf_token!(app, jar, "/register");
    let resp = send!(
        app,
        jar,
        test::TestRequest::post().uri("/register").set_form([
            ("username", "newbie"),
            ("email", "other@example.com"),
            ("password", "longenough"),
            ("confirm_password", "longenough"),
            ("csrf_token", token.as_str()),
        ])
    );
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("Username or email already exists!"));
}

#[actix_web::test]
async fn test_admin_pages_require_admin_role() {
    let db = setup_test_db().await;
    user_with_password(db.pool(), "ana", Role::User).await;
    user_with_password(db.pool(), "root", Role::Admin).await;
    let org = create_user(db.pool(), "org", Role::Organizer).await;
    create_event(db.pool(), org, "Rust Meetup", "2099-01-01 10:00:00", 5).await;
    let app = test_app!(db.pool());

    let mut user_jar: Option<Cookie<'static>> = None;
    login!(app, user_jar, "ana", PASSWORD);
    let resp = send!(app, user_jar, test::TestRequest::get().uri("/admin"));
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let mut admin_jar: Option<Cookie<'static>> = None;
    login!(app, admin_jar, "root", PASSWORD);
    for uri in ["/admin", "/admin/users", "/admin/events?status=upcoming", "/admin/stats", "/admin/messages"] {
        let resp = send!(app, admin_jar, test::TestRequest::get().uri(uri));
        assert_eq!(resp.status(), StatusCode::OK, "GET {uri}");
    }
}

#[actix_web::test]
async fn test_admin_cannot_demote_self_but_can_promote_others() {
    let db = setup_test_db().await;
    let root = user_with_password(db.pool(), "root", Role::Admin).await;
    let ana = create_user(db.pool(), "ana", Role::User).await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;
    login!(app, jar, "root", PASSWORD);

    let token = csrf_token!(app, jar, "/admin/users");
    let resp = send!(
        app,
        jar,
        test::TestRequest::post()
            .uri(&format!("/admin/users/{root}/role"))
            .set_form([("role", "user"), ("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(user::find_display_by_id(db.pool(), root).await.unwrap().unwrap().role, Role::Admin);

    let resp = send!(
        app,
        jar,
        test::TestRequest::post()
            .uri(&format!("/admin/users/{ana}/role"))
            .set_form([("role", "organizer"), ("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(user::find_display_by_id(db.pool(), ana).await.unwrap().unwrap().role, Role::Organizer);

    let resp = send!(
        app,
        jar,
        test::TestRequest::post()
            .uri(&format!("/admin/users/{ana}/delete"))
            .set_form([("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(user::find_display_by_id(db.pool(), ana).await.unwrap().is_none());
}

#[actix_web::test]
async fn test_organizer_event_lifecycle() {
    let db = setup_test_db().await;
    user_with_password(db.pool(), "org", Role::Organizer).await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;
    login!(app, jar, "org", PASSWORD);

    let token = csrf_token!(app, jar, "/events/new");
    let resp = send!(
        app,
        jar,
        test::TestRequest::post().uri("/events").set_form([
            ("title", "Rust Meetup"),
            ("description", "Talks and pizza for Rustaceans."),
            ("date", "2099-01-01T18:30"),
            ("location", "Main Hall"),
            ("category", "Meetup"),
            ("max_participants", "30"),
            ("csrf_token", token.as_str()),
        ])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    let target = location(&resp);
    let id: i64 = target.trim_start_matches("/events/").parse().expect("redirect to the new event");

    let stored = event::find_by_id(db.pool(), id).await.unwrap().unwrap();
    assert_eq!(stored.date, "2099-01-01 18:30:00");

    let resp = send!(app, jar, test::TestRequest::get().uri(&format!("/events/{id}/edit")));
    assert_eq!(resp.status(), StatusCode::OK);

    // Rejected update re-renders the form
    let token = csrf_token!(app, jar, &format!("/events/{id}/edit"));
    let resp = send!(
        app,
        jar,
        test::TestRequest::post().uri(&format!("/events/{id}")).set_form([
            ("title", "Hi"),
            ("description", "Talks and pizza for Rustaceans."),
            ("date", "2099-01-01T18:30"),
            ("location", "Main Hall"),
            ("category", "Meetup"),
            ("max_participants", "30"),
            ("csrf_token", token.as_str()),
        ])
    );
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("Title must be between 5 and 200 characters!"));

    let token = csrf_token!(app, jar, &format!("/events/{id}/delete"));
    let resp = send!(
        app,
        jar,
        test::TestRequest::post()
            .uri(&format!("/events/{id}/delete"))
            .set_form([("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(event::find_by_id(db.pool(), id).await.unwrap().is_none());
}

#[actix_web::test]
async fn test_only_owner_or_admin_may_edit() {
    let db = setup_test_db().await;
    let owner = create_user(db.pool(), "owner", Role::Organizer).await;
    user_with_password(db.pool(), "rival", Role::Organizer).await;
    user_with_password(db.pool(), "ana", Role::User).await;
    let id = create_event(db.pool(), owner, "Rust Meetup", "2099-01-01 10:00:00", 0).await;
    let app = test_app!(db.pool());

    let mut rival: Option<Cookie<'static>> = None;
    login!(app, rival, "rival", PASSWORD);
    let resp = send!(app, rival, test::TestRequest::get().uri(&format!("/events/{id}/edit")));
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let mut plain: Option<Cookie<'static>> = None;
    login!(app, plain, "ana", PASSWORD);
    let resp = send!(app, plain, test::TestRequest::get().uri("/events/new"));
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn test_register_and_cancel_from_my_registrations() {
    let db = setup_test_db().await;
    let org = create_user(db.pool(), "org", Role::Organizer).await;
    let ana = user_with_password(db.pool(), "ana", Role::User).await;
    let id = create_event(db.pool(), org, "Rust Meetup", "2099-01-01 10:00:00", 10).await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;
    login!(app, jar, "ana", PASSWORD);

    let token = csrf_token!(app, jar, &format!("/events/{id}"));
    let resp = send!(
        app,
        jar,
        test::TestRequest::post()
            .uri(&format!("/events/{id}/register"))
            .set_form([("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(registration::is_registered(db.pool(), ana, id).await.unwrap());

    let resp = send!(app, jar, test::TestRequest::get().uri("/my-registrations"));
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("Rust Meetup"));
    let token = csrf_from(&body);

    let resp = send!(
        app,
        jar,
        test::TestRequest::post()
            .uri(&format!("/my-registrations/{id}/cancel"))
            .set_form([("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/my-registrations");
    assert!(!registration::is_registered(db.pool(), ana, id).await.unwrap());
}

#[actix_web::test]
async fn test_contact_message_is_stored() {
    let db = setup_test_db().await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;

    let token = csrf_token!(app, jar, "/contact");
    let resp = send!(
        app,
        jar,
        test::TestRequest::post().uri("/contact").set_form([
            ("name", "Ana"),
            ("email", "ana@example.com"),
            ("subject", "Venue question"),
            ("message", "Is the hall wheelchair accessible?"),
            ("csrf_token", token.as_str()),
        ])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/contact");

    let page = eventmanager::models::contact::find_paginated(db.pool(), 1, 10).await.unwrap();
    assert_eq!(page.total_count, 1);
    assert_eq!(page.messages[0].subject, "Venue question");
}

#[actix_web::test]
async fn test_participant_emails_only_shown_to_managers() {
    let db = setup_test_db().await;
    let org = user_with_password(db.pool(), "org", Role::Organizer).await;
    let ana = user_with_password(db.pool(), "ana", Role::User).await;
    let bob = create_user(db.pool(), "bob", Role::User).await;
    let id = create_event(db.pool(), org, "Rust Meetup", "2099-01-01 10:00:00", 10).await;
    registration::register(db.pool(), ana, id, NOW).await.unwrap();
    registration::register(db.pool(), bob, id, NOW).await.unwrap();
    let app = test_app!(db.pool());

    let mut visitor: Option<Cookie<'static>> = None;
    login!(app, visitor, "ana", PASSWORD);
    let resp = send!(app, visitor, test::TestRequest::get().uri(&format!("/events/{id}")));
    assert_eq!(resp.status(), StatusCode::OK);
    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("bob"));
    assert!(!html.contains("bob@example.com"));
    assert!(html.contains("org@example.com"), "organizer contact is public");

    let mut owner: Option<Cookie<'static>> = None;
    login!(app, owner, "org", PASSWORD);
    let resp = send!(app, owner, test::TestRequest::get().uri(&format!("/events/{id}")));
    let body = test::read_body(resp).await;
    let html = std::str::from_utf8(&body).unwrap();
    assert!(html.contains("bob@example.com"));
    assert!(html.contains("ana@example.com"));
}

#[actix_web::test]
async fn test_admin_cannot_delete_own_account() {
    let db = setup_test_db().await;
    let root = user_with_password(db.pool(), "root", Role::Admin).await;
    let app = test_app!(db.pool());
    let mut jar: Option<Cookie<'static>> = None;
    login!(app, jar, "root", PASSWORD);

    let token = csrf_token!(app, jar, "/admin/users");
    let resp = send!(
        app,
        jar,
        test::TestRequest::post()
            .uri(&format!("/admin/users/{root}/delete"))
            .set_form([("csrf_token", token.as_str())])
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/admin/users");
    assert!(user::find_display_by_id(db.pool(), root).await.unwrap().is_some());

    let resp = send!(app, jar, test::TestRequest::get().uri("/admin/users"));
    let body = test::read_body(resp).await;
    assert!(std::str::from_utf8(&body).unwrap().contains("You cannot delete your own account!"));
}

/// Pushes the session's last activity past the idle timeout.
async fn age_session(session: Session) -> HttpResponse {
    let stale = session::now() - session::IDLE_TIMEOUT_SECS - 60;
    session.insert("last_activity", stale).unwrap();
    HttpResponse::Ok().finish()
}

#[actix_web::test]
async fn test_idle_session_times_out() {
    let db = setup_test_db().await;
    let ana = user_with_password(db.pool(), "ana", Role::User).await;
    let dir = tempfile::TempDir::new().unwrap();
    let log_path = dir.path().join("security.log");
    let app = test_app!(db.pool(), security(SecurityLog::new(&log_path), true), "/idle" => age_session);
    let mut jar: Option<Cookie<'static>> = None;
    login!(app, jar, "ana", PASSWORD);

    let resp = send!(app, jar, test::TestRequest::get().uri("/profile"));
    assert_eq!(resp.status(), StatusCode::OK);

    send!(app, jar, test::TestRequest::get().uri("/idle"));
    let resp = send!(
        app,
        jar,
        test::TestRequest::get()
            .uri("/profile")
            .insert_header(("X-Forwarded-For", "203.0.113.9, 10.0.0.1"))
    );
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&resp), "/login?timeout=1");

    // The expired session was destroyed, not just bounced.
    let resp = send!(app, jar, test::TestRequest::get().uri("/profile"));
    assert_eq!(location(&resp), "/login");

    let log = std::fs::read_to_string(&log_path).unwrap();
    let line = log.lines().find(|l| l.contains("[SESSION_TIMEOUT]")).expect("timeout audited");
    assert!(line.contains(&format!("[User: {ana}]")));
    assert!(line.contains("[IP: 203.0.113.9]"), "trusted proxy address recorded: {line}");
}
