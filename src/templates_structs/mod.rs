// Template context structures for Askama templates, organized by domain.
// All types are re-exported: `use eventmanager::templates_structs::*`

use actix_session::Session;

use crate::auth::csrf;
use crate::auth::session::{CurrentUser, current_user, take_flash};
use crate::config::AppConfig;

/// Common context shared by all pages.
/// Templates access these as `ctx.user`, `ctx.csrf_token`, etc.
pub struct PageContext {
    pub user: Option<CurrentUser>,
    pub flash: Option<String>,
    pub app_name: String,
    pub csrf_token: String,
}

impl PageContext {
    /// Consumes the pending flash message and ensures a fresh CSRF token.
    pub fn build(session: &Session, config: &AppConfig) -> Self {
        Self {
            user: current_user(session),
            flash: take_flash(session),
            app_name: config.app_name.clone(),
            csrf_token: csrf::get_or_create_token(session),
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn username(&self) -> &str {
        self.user.as_ref().map_or("", |u| u.username.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_admin)
    }

    pub fn is_organizer(&self) -> bool {
        self.user.as_ref().is_some_and(CurrentUser::is_organizer)
    }
}

/// One `<option>` of a `<select>`, with selection precomputed.
pub struct SelectOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

impl SelectOption {
    pub fn list<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>, current: &str) -> Vec<Self> {
        pairs
            .into_iter()
            .map(|(value, label)| SelectOption {
                value: value.to_string(),
                label: label.to_string(),
                selected: value == current,
            })
            .collect()
    }
}

/// reCAPTCHA widget settings for a form page.
pub struct Captcha {
    pub show: bool,
    pub site_key: String,
}

impl Captcha {
    pub fn hidden() -> Self {
        Self { show: false, site_key: String::new() }
    }

    pub fn shown_if(show: bool, config: &AppConfig) -> Self {
        Self { show, site_key: config.recaptcha_site_key.clone() }
    }
}

mod admin;
mod common;
mod event;
mod user;

pub use self::admin::{
    AdminDashboardTemplate, AdminEventsTemplate, AdminMessagesTemplate, AdminStatsTemplate, AdminUserRow,
    AdminUsersTemplate,
};
pub use self::common::{ContactTemplate, HomeTemplate, LoginTemplate, RegisterTemplate};
pub use self::event::{EventDeleteTemplate, EventDetailTemplate, EventFormTemplate, EventListTemplate};
pub use self::user::{MyRegistrationsTemplate, ProfileTemplate};
