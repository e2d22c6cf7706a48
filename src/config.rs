use std::str::FromStr;

/// Runtime configuration, read once at start-up from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub database_url: String,
    pub session_key: Option<String>,
    pub cookie_secure: bool,
    pub app_name: String,
    pub admin_password: String,
    pub recaptcha_enabled: bool,
    pub recaptcha_site_key: String,
    pub recaptcha_secret_key: String,
    pub rate_limiting_enabled: bool,
    pub rate_limit_attempts: u32,
    pub rate_limit_window_secs: u64,
    pub security_log_path: String,
    pub trust_proxy_headers: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            database_url: "sqlite://data/events.db".to_string(),
            session_key: None,
            cookie_secure: false,
            app_name: "Event Manager".to_string(),
            admin_password: "admin123".to_string(),
            recaptcha_enabled: false,
            recaptcha_site_key: String::new(),
            recaptcha_secret_key: String::new(),
            rate_limiting_enabled: true,
            rate_limit_attempts: 5,
            rate_limit_window_secs: 300,
            security_log_path: "logs/security.log".to_string(),
            trust_proxy_headers: false,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            log::debug!("No .env file loaded: {e}");
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup; missing or malformed values keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();

        let admin_password = match lookup("ADMIN_PASSWORD") {
            Some(pw) if !pw.is_empty() => pw,
            _ => d.admin_password,
        };

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(d.bind_addr),
            database_url: lookup("DATABASE_URL").unwrap_or(d.database_url),
            session_key: lookup("SESSION_KEY"),
            cookie_secure: parse_or(&lookup, "COOKIE_SECURE", d.cookie_secure),
            app_name: lookup("APP_NAME").unwrap_or(d.app_name),
            admin_password,
            recaptcha_enabled: parse_or(&lookup, "ENABLE_RECAPTCHA", d.recaptcha_enabled),
            recaptcha_site_key: lookup("RECAPTCHA_SITE_KEY").unwrap_or(d.recaptcha_site_key),
            recaptcha_secret_key: lookup("RECAPTCHA_SECRET_KEY").unwrap_or(d.recaptcha_secret_key),
            rate_limiting_enabled: parse_or(&lookup, "ENABLE_RATE_LIMITING", d.rate_limiting_enabled),
            rate_limit_attempts: parse_or(&lookup, "RATE_LIMIT_ATTEMPTS", d.rate_limit_attempts),
            rate_limit_window_secs: parse_or(&lookup, "RATE_LIMIT_WINDOW", d.rate_limit_window_secs),
            security_log_path: lookup("SECURITY_LOG").unwrap_or(d.security_log_path),
            trust_proxy_headers: parse_or(&lookup, "TRUST_PROXY_HEADERS", d.trust_proxy_headers),
        }
    }
}

fn parse_or<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(v) => v,
            Err(_) => {
                log::warn!("Ignoring invalid value for {key}: {raw:?}");
                default
            }
        },
        None => default,
    }
}
