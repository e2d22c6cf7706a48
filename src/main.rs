use actix_session::{SessionMiddleware, storage::CookieSessionStore};
use actix_web::{App, HttpServer, cookie::Key, middleware, web};

use eventmanager::auth::{self, Security};
use eventmanager::config::AppConfig;
use eventmanager::{db, handlers};

fn session_key(config: &AppConfig) -> Key {
    // Load from SESSION_KEY for persistent sessions across restarts
    match config.session_key.as_deref() {
        Some(val) if val.len() >= 64 => {
            log::info!("Using SESSION_KEY from environment");
            Key::from(val.as_bytes())
        }
        Some(val) => {
            log::warn!("SESSION_KEY too short ({} bytes, need 64+), generating random key", val.len());
            Key::generate()
        }
        None => {
            log::warn!("No SESSION_KEY set, generating random key (sessions lost on restart)");
            Key::generate()
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = AppConfig::from_env();

    let pool = db::init_pool(&config.database_url)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to open database {}: {e}", config.database_url)))?;
    db::run_migrations(&pool)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to run migrations: {e}")))?;

    let admin_hash = auth::password::hash_password(&config.admin_password)
        .map_err(|e| std::io::Error::other(format!("Failed to hash admin password: {e}")))?;
    db::seed_admin(&pool, &admin_hash)
        .await
        .map_err(|e| std::io::Error::other(format!("Failed to seed admin user: {e}")))?;

    let secret_key = session_key(&config);
    let cookie_secure = config.cookie_secure;
    let bind_addr = config.bind_addr.clone();

    let pool = web::Data::new(pool);
    let security = web::Data::new(Security::from_config(&config));
    let config = web::Data::new(config);

    log::info!("Starting {} at http://{bind_addr}", config.app_name);

    HttpServer::new(move || {
        let session_mw = SessionMiddleware::builder(CookieSessionStore::default(), secret_key.clone())
            .cookie_secure(cookie_secure)
            .cookie_http_only(true)
            .build();

        App::new()
            .wrap(middleware::from_fn(auth::middleware::session_lifecycle))
            .wrap(auth::middleware::security_headers())
            .wrap(session_mw)
            .wrap(middleware::Logger::default())
            .app_data(pool.clone())
            .app_data(security.clone())
            .app_data(config.clone())
            .configure(handlers::configure)
            // Default 404 handler (must be registered last)
            .default_service(web::to(handlers::not_found))
    })
    .bind(bind_addr)?
    .run()
    .await
}
